//! CLI mode for kirinuki: pick a channel, select videos, push them to FTP.

mod progress;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use console::style;

use crate::catalog::YouTubePlaylist;
use crate::channel::Channel;
use crate::config::{API_KEY_ENV, AppConfig};
use crate::error::{Error, Result};
use crate::selector::{Selector, TerminalView};
use crate::transfer::{DestinationPlan, FtpDestination, TransferPipeline, YtDlp};

pub use progress::{BarProgress, print_report, print_selection, record_lines};

/// Options for a transfer run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliOptions {
    pub config_path: Option<PathBuf>,
    pub page_size: Option<usize>,
    pub channel: Option<Channel>,
}

/// What the command line asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliCommand {
    Help,
    ListChannels,
    Run(CliOptions),
}

/// Prints usage to stderr.
pub fn print_usage() {
    eprintln!("Usage: kirinuki [OPTIONS] [CHANNEL]");
    eprintln!();
    eprintln!("Browse a channel's uploads, select videos and upload them to FTP.");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --config <PATH>     Config file (default: {})", AppConfig::default_path().display());
    eprintln!("  --page-size <N>     Videos per page");
    eprintln!("  --channels          List supported channels");
    eprintln!("  -h, --help          Show this help");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  {API_KEY_ENV}     Overrides the API key from the config file");
    eprintln!("  RUST_LOG            Log level (default: warn)");
}

/// Parses arguments (without the program name).
///
/// # Errors
///
/// Returns [`Error::Configuration`] for unknown flags, missing or invalid
/// values, unknown channels, or more than one channel.
pub fn parse_args(args: &[String]) -> Result<CliCommand> {
    let mut options = CliOptions::default();
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(CliCommand::Help),
            "--channels" => return Ok(CliCommand::ListChannels),
            "--config" => {
                let value = iter.next().ok_or_else(|| missing_value("--config"))?;
                options.config_path = Some(PathBuf::from(value));
            }
            "--page-size" => {
                let value = iter.next().ok_or_else(|| missing_value("--page-size"))?;
                let size = value.parse().map_err(|_| {
                    Error::Configuration(format!("--page-size expects a number, got '{value}'"))
                })?;
                options.page_size = Some(size);
            }
            flag if flag.starts_with('-') => {
                return Err(Error::Configuration(format!("unknown option '{flag}'")));
            }
            name => {
                if options.channel.is_some() {
                    return Err(Error::Configuration(format!(
                        "only one channel may be given, got extra '{name}'"
                    )));
                }
                options.channel = Some(name.parse()?);
            }
        }
    }
    Ok(CliCommand::Run(options))
}

fn missing_value(flag: &str) -> Error {
    Error::Configuration(format!("{flag} requires a value"))
}

/// Prints the supported channels.
pub fn print_channels() {
    for (n, channel) in Channel::ALL.iter().enumerate() {
        println!("  {:>2}) {channel}  [{}]", n + 1, channel.namespace());
    }
}

/// Asks for a channel by number or name. Empty input or `q` cancels.
///
/// # Errors
///
/// Returns an error if the terminal cannot be read or written.
pub fn choose_channel<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> Result<Option<Channel>> {
    loop {
        writeln!(output, "Select a channel:")?;
        for (n, channel) in Channel::ALL.iter().enumerate() {
            writeln!(output, "  {:>2}) {channel}", n + 1)?;
        }
        write!(output, "Channel (number or name, empty to quit): ")?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let answer = line.trim();
        if answer.is_empty() || answer.eq_ignore_ascii_case("q") {
            return Ok(None);
        }
        let chosen = answer
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| Channel::ALL.get(i).copied())
            .or_else(|| answer.parse().ok());
        match chosen {
            Some(channel) => return Ok(Some(channel)),
            None => writeln!(output, "Unknown channel '{answer}'.\n")?,
        }
    }
}

/// Loads and validates the configuration for a run.
///
/// # Errors
///
/// Returns [`Error::Configuration`] if the file is malformed or a required
/// setting is missing.
pub fn load_config(options: &CliOptions) -> Result<(AppConfig, PathBuf)> {
    let path = options
        .config_path
        .clone()
        .unwrap_or_else(AppConfig::default_path);
    let mut config =
        AppConfig::load_or_create(&path)?.with_api_key_override(std::env::var(API_KEY_ENV).ok());
    if let Some(size) = options.page_size {
        config = config.with_page_size(size);
    }
    config.validate().map_err(|e| match e {
        Error::Configuration(msg) => {
            Error::Configuration(format!("{msg} (edit {})", path.display()))
        }
        other => other,
    })?;
    Ok((config, path))
}

/// Runs one select-and-transfer session.
///
/// Per-item failures are reported in the summary and do not make this
/// return an error.
///
/// # Errors
///
/// Returns an error for invalid configuration, a failed first catalog page,
/// or terminal I/O failures.
pub async fn run(options: CliOptions) -> Result<()> {
    let (config, path) = load_config(&options)?;
    log::info!("Loaded config from {}", path.display());

    let channel = match options.channel {
        Some(channel) => channel,
        None => {
            let stdin = io::stdin();
            match choose_channel(&mut stdin.lock(), &mut io::stdout())? {
                Some(channel) => channel,
                None => return Ok(()),
            }
        }
    };
    println!("{} {channel}", style("Channel:").bold());

    let catalog = YouTubePlaylist::new(
        &config.catalog.api_key,
        channel.playlist_id(),
        config.catalog.page_size,
    )?;
    let selector = Selector::new(config.catalog.page_size)?;
    let selection = {
        let mut view = TerminalView::new(channel.to_string())?;
        selector.run(&catalog, &mut view).await?
    };

    let items = match selection {
        None => {
            println!("Cancelled.");
            return Ok(());
        }
        Some(items) if items.is_empty() => {
            println!("No videos selected.");
            return Ok(());
        }
        Some(items) => items,
    };
    print_selection(&items);

    let pipeline = TransferPipeline::with_tokio_fs(
        YtDlp::from_config(&config.fetch),
        FtpDestination::from_config(&config.destination),
        DestinationPlan::new(&config.destination.target_directory, channel.namespace()),
    );
    let progress = BarProgress::new(items.len());
    let report = pipeline.run(&items, &progress).await;
    progress.finish();

    print_report(&report);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn parses_run_options() {
        let command = parse_args(&args(&["--config", "c.toml", "--page-size", "10", "akanelize"])).unwrap();
        assert_eq!(
            command,
            CliCommand::Run(CliOptions {
                config_path: Some(PathBuf::from("c.toml")),
                page_size: Some(10),
                channel: Some(Channel::AkaneLize),
            })
        );
        assert_eq!(parse_args(&[]).unwrap(), CliCommand::Run(CliOptions::default()));
    }

    #[test]
    fn help_and_channel_list_win() {
        assert_eq!(parse_args(&args(&["akanelize", "-h"])).unwrap(), CliCommand::Help);
        assert_eq!(parse_args(&args(&["--channels"])).unwrap(), CliCommand::ListChannels);
    }

    #[test]
    fn rejects_bad_arguments() {
        for bad in [
            &["--page-size"][..],
            &["--page-size", "many"],
            &["--config"],
            &["--verbose"],
            &["nobody"],
            &["akanelize", "aokumorin"],
        ] {
            assert!(
                matches!(parse_args(&args(bad)), Err(Error::Configuration(_))),
                "{bad:?}"
            );
        }
    }

    #[test]
    fn choose_channel_by_number_or_name() {
        let mut out = Vec::new();
        let chosen = choose_channel(&mut "2\n".as_bytes(), &mut out).unwrap();
        assert_eq!(chosen, Some(Channel::ALL[1]));

        let chosen = choose_channel(&mut "zzz\nsirayukihina\n".as_bytes(), &mut out).unwrap();
        assert_eq!(chosen, Some(Channel::SirayukiHina));
        assert!(String::from_utf8_lossy(&out).contains("Unknown channel 'zzz'"));
    }

    #[test]
    fn choose_channel_cancels() {
        let mut out = Vec::new();
        assert_eq!(choose_channel(&mut "\n".as_bytes(), &mut out).unwrap(), None);
        assert_eq!(choose_channel(&mut "q\n".as_bytes(), &mut out).unwrap(), None);
        assert_eq!(choose_channel(&mut "".as_bytes(), &mut out).unwrap(), None);
        assert_eq!(choose_channel(&mut "0\n11\n".as_bytes(), &mut out).unwrap(), None);
    }

    #[test]
    fn load_config_applies_overrides_and_validates() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[catalog]\napi_key = \"k\"\n[destination]\nhost = \"ftp.example.com\"\n",
        )
        .unwrap();

        let options = CliOptions {
            config_path: Some(path.clone()),
            page_size: Some(7),
            channel: None,
        };
        let (config, loaded_from) = load_config(&options).unwrap();
        assert_eq!(loaded_from, path);
        assert_eq!(config.catalog.page_size, 7);

        let options = CliOptions {
            page_size: Some(0),
            ..options
        };
        assert!(matches!(load_config(&options), Err(Error::Configuration(_))));
    }
}
