//! Progress bars and summary reporting for CLI transfers.

use std::sync::Mutex;
use std::time::Duration;

use console::style;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use crate::catalog::Item;
use crate::error::Error;
use crate::format::format_duration;
use crate::transfer::{BatchReport, ProgressUpdate, Stage, TransferProgress};

const SEPARATOR: &str = "────────────────────────────────────────────────────────────";

/// Creates a percentage bar for one stage of one item.
fn make_stage_bar(stage: Stage, title: &str) -> ProgressBar {
    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:>8} [{bar:40.cyan/blue}] {pos:>3}% {msg}",
        )
        .expect("progress template is valid")
        .progress_chars("━━╌"),
    );
    bar.set_prefix(stage.to_string());
    bar.set_message(title.to_string());
    bar
}

/// Creates the bar counting items through the fetch stage.
fn make_total_bar(count: u64) -> ProgressBar {
    let bar = ProgressBar::new(count);
    bar.set_style(
        ProgressStyle::with_template("   Total [{bar:40.green/white}] {pos}/{len} {elapsed}")
            .expect("template valid")
            .progress_chars("━━╌"),
    );
    bar
}

/// Renders pipeline events as indicatif bars.
pub struct BarProgress {
    multi: MultiProgress,
    total: ProgressBar,
    current: Mutex<Option<ProgressBar>>,
}

impl BarProgress {
    #[must_use]
    pub fn new(items: usize) -> Self {
        let multi = MultiProgress::new();
        let total = multi.add(make_total_bar(items as u64));
        total.enable_steady_tick(Duration::from_millis(250));
        Self {
            multi,
            total,
            current: Mutex::new(None),
        }
    }

    /// Clears all bars before the summary is printed.
    pub fn finish(&self) {
        if let Some(bar) = self.take_current() {
            bar.finish_and_clear();
        }
        self.total.finish_and_clear();
        self.multi.clear().ok();
    }

    fn take_current(&self) -> Option<ProgressBar> {
        self.current.lock().ok().and_then(|mut c| c.take())
    }

    fn println(&self, line: String) {
        let _ = self.multi.println(line);
    }
}

impl TransferProgress for BarProgress {
    fn on_stage_start(&self, item: &Item, stage: Stage) {
        let bar = self
            .multi
            .insert_before(&self.total, make_stage_bar(stage, &item.title));
        bar.enable_steady_tick(Duration::from_millis(250));
        if let Ok(mut current) = self.current.lock()
            && let Some(previous) = current.replace(bar)
        {
            previous.finish_and_clear();
        }
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn on_progress(&self, item: &Item, _stage: Stage, update: &ProgressUpdate) {
        let Ok(current) = self.current.lock() else {
            return;
        };
        let Some(bar) = current.as_ref() else {
            return;
        };
        bar.set_position(update.percent.round() as u64);
        let mut message = item.title.clone();
        if let Some(rate) = &update.rate {
            message.push_str(&format!(" @ {rate}"));
        }
        if let Some(eta) = &update.eta {
            message.push_str(&format!(" ETA {eta}"));
        }
        bar.set_message(message);
    }

    fn on_stage_complete(&self, item: &Item, stage: Stage, detail: &str) {
        if let Some(bar) = self.take_current() {
            bar.finish_and_clear();
        }
        match stage {
            Stage::Fetch => self.total.inc(1),
            Stage::Push => self.println(format!(
                "  {} {} -> {detail}",
                style("✓").green(),
                item.title
            )),
        }
    }

    fn on_error(&self, item: &Item, stage: Stage, error: &Error) {
        if let Some(bar) = self.take_current() {
            bar.abandon();
        }
        if stage == Stage::Fetch {
            self.total.inc(1);
        }
        self.println(format!(
            "  {} {} ({stage}): {error}",
            style("✗").red(),
            item.title
        ));
    }

    fn on_connecting(&self) {
        self.println(format!("  {}", style("Connecting to the FTP server...").dim()));
    }
}

/// Prints the selection about to be transferred.
pub fn print_selection(items: &[Item]) {
    println!("\n{SEPARATOR}");
    println!("Selected videos:");
    println!("{SEPARATOR}");
    for item in items {
        println!("  {} ({})", item.title, item.id);
    }
    println!("{SEPARATOR}");
    println!("  {} video(s)", items.len());
    println!("{SEPARATOR}\n");
}

/// One summary line per record; every item gets a success or failure line.
#[must_use]
pub fn record_lines(report: &BatchReport) -> Vec<String> {
    report
        .records()
        .iter()
        .map(|record| {
            let title = &record.item.title;
            match (&record.fetch, &record.push) {
                (Ok(_), Some(Ok(remote))) => format!("{} {title} -> {remote}", style("✓").green()),
                (Err(e), _) => format!("{} {title}: download failed: {e}", style("✗").red()),
                (Ok(_), Some(Err(e))) => format!("{} {title}: upload failed: {e}", style("✗").red()),
                (Ok(_), None) => format!("{} {title}: not uploaded", style("-").yellow()),
            }
        })
        .collect()
}

/// Prints the batch summary.
pub fn print_report(report: &BatchReport) {
    println!("\n{SEPARATOR}");
    println!("Transfer Summary");
    println!("{SEPARATOR}");

    for line in record_lines(report) {
        println!("  {line}");
    }

    println!("{SEPARATOR}");
    println!("  Uploaded:          {}/{}", report.succeeded(), report.total());
    if report.fetch_failures() > 0 {
        println!("  Download failures: {}", report.fetch_failures());
    }
    if report.push_failures() > 0 {
        println!("  Upload failures:   {}", report.push_failures());
    }
    if report.push_skipped() > 0 {
        println!("  Not uploaded:      {}", report.push_skipped());
    }
    println!("  Total time:        {}", format_duration(report.elapsed()));
    if let Some(e) = report.connection_error() {
        println!("  {} {e}", style("Uploads stopped:").red());
    }
    for e in report.cleanup_errors() {
        println!("  {} {e}", style("Cleanup:").yellow());
    }
    println!("{SEPARATOR}");
}
