//! kirinuki - pick videos from a channel and upload them to FTP.

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

use std::env;

use kirinuki_ftp::cli::{self, CliCommand};

#[tokio::main]
async fn main() -> kirinuki_ftp::Result<()> {
    // Warnings only by default so log lines do not tear the progress bars
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args: Vec<String> = env::args().skip(1).collect();
    match cli::parse_args(&args) {
        Ok(CliCommand::Help) => {
            cli::print_usage();
            Ok(())
        }
        Ok(CliCommand::ListChannels) => {
            cli::print_channels();
            Ok(())
        }
        Ok(CliCommand::Run(options)) => cli::run(options).await,
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!();
            cli::print_usage();
            std::process::exit(2);
        }
    }
}
