//! Batch outcome types.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::catalog::Item;
use crate::error::Error;

/// Outcome of one selected item.
#[derive(Debug)]
pub struct TransferRecord {
    pub item: Item,
    /// Local artifact path, or why the fetch failed.
    pub fetch: Result<PathBuf, Error>,
    /// Remote path, or why the push failed. `None` if no push was attempted.
    pub push: Option<Result<String, Error>>,
}

impl TransferRecord {
    /// Returns true if the item was both fetched and pushed.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.fetch.is_ok() && matches!(self.push, Some(Ok(_)))
    }

    /// Returns true if the item was fetched but never pushed.
    #[must_use]
    pub const fn is_push_skipped(&self) -> bool {
        self.fetch.is_ok() && self.push.is_none()
    }
}

/// Immutable summary of a finished batch.
#[derive(Debug)]
pub struct BatchReport {
    records: Vec<TransferRecord>,
    connection_error: Option<Error>,
    cleanup_errors: Vec<Error>,
    elapsed: Duration,
}

impl BatchReport {
    /// Number of items in the batch.
    #[must_use]
    pub fn total(&self) -> usize {
        self.records.len()
    }

    /// Items fetched and pushed.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.records.iter().filter(|r| r.is_success()).count()
    }

    /// Items that could not be fetched.
    #[must_use]
    pub fn fetch_failures(&self) -> usize {
        self.records.iter().filter(|r| r.fetch.is_err()).count()
    }

    /// Items whose push was attempted and failed.
    #[must_use]
    pub fn push_failures(&self) -> usize {
        self.records
            .iter()
            .filter(|r| matches!(r.push, Some(Err(_))))
            .count()
    }

    /// Items fetched but never pushed, because the push stage was aborted.
    #[must_use]
    pub fn push_skipped(&self) -> usize {
        self.records.iter().filter(|r| r.is_push_skipped()).count()
    }

    /// Per-item records in selection order.
    #[must_use]
    pub fn records(&self) -> &[TransferRecord] {
        &self.records
    }

    /// Error that aborted the push stage, if any.
    #[must_use]
    pub const fn connection_error(&self) -> Option<&Error> {
        self.connection_error.as_ref()
    }

    #[must_use]
    pub fn cleanup_errors(&self) -> &[Error] {
        &self.cleanup_errors
    }

    /// Wall time of the whole batch, cleanup included.
    #[must_use]
    pub const fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Returns true if every item succeeded and nothing else went wrong.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.succeeded() == self.total()
            && self.connection_error.is_none()
            && self.cleanup_errors.is_empty()
    }
}

/// Builder for accumulating a [`BatchReport`] while the pipeline runs.
pub struct BatchReportBuilder {
    records: Vec<TransferRecord>,
    connection_error: Option<Error>,
    cleanup_errors: Vec<Error>,
    start_time: Instant,
}

impl Default for BatchReportBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchReportBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            connection_error: None,
            cleanup_errors: Vec::new(),
            start_time: Instant::now(),
        }
    }

    pub fn add_record(&mut self, record: TransferRecord) {
        self.records.push(record);
    }

    /// Records the error that aborted the push stage. Only the first is kept.
    pub fn set_connection_error(&mut self, error: Error) {
        if self.connection_error.is_none() {
            self.connection_error = Some(error);
        }
    }

    pub fn add_cleanup_error(&mut self, error: Error) {
        self.cleanup_errors.push(error);
    }

    #[must_use]
    pub fn build(self) -> BatchReport {
        BatchReport {
            records: self.records,
            connection_error: self.connection_error,
            cleanup_errors: self.cleanup_errors,
            elapsed: self.start_time.elapsed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(n: usize, fetch_ok: bool, push: Option<bool>) -> TransferRecord {
        let item = Item::new(format!("vid{n}"), format!("Video {n}"));
        TransferRecord {
            item,
            fetch: if fetch_ok {
                Ok(PathBuf::from(format!("downloads/vid{n}.mp4")))
            } else {
                Err(Error::Fetch("unavailable".to_string()))
            },
            push: push.map(|ok| {
                if ok {
                    Ok(format!("/r/Ine/Video {n}.mp4"))
                } else {
                    Err(Error::Push("550".to_string()))
                }
            }),
        }
    }

    #[test]
    fn empty_report_is_clean() {
        let report = BatchReportBuilder::new().build();
        assert_eq!(report.total(), 0);
        assert!(report.is_clean());
    }

    #[test]
    fn counts_partition_records() {
        let mut builder = BatchReportBuilder::new();
        builder.add_record(record(0, true, Some(true)));
        builder.add_record(record(1, false, None));
        builder.add_record(record(2, true, Some(false)));
        builder.add_record(record(3, true, None));
        let report = builder.build();

        assert_eq!(report.total(), 4);
        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.fetch_failures(), 1);
        assert_eq!(report.push_failures(), 1);
        assert_eq!(report.push_skipped(), 1);
        assert_eq!(
            report.succeeded()
                + report.fetch_failures()
                + report.push_failures()
                + report.push_skipped(),
            report.total()
        );
        assert!(!report.is_clean());
    }

    #[test]
    fn first_connection_error_wins() {
        let mut builder = BatchReportBuilder::new();
        builder.set_connection_error(Error::Connection("first".to_string()));
        builder.set_connection_error(Error::Connection("second".to_string()));
        let report = builder.build();
        assert!(matches!(
            report.connection_error(),
            Some(Error::Connection(msg)) if msg == "first"
        ));
    }

    #[test]
    fn cleanup_errors_make_report_unclean() {
        let mut builder = BatchReportBuilder::new();
        builder.add_record(record(0, true, Some(true)));
        builder.add_cleanup_error(Error::Cleanup("busy".to_string()));
        let report = builder.build();
        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.cleanup_errors().len(), 1);
        assert!(!report.is_clean());
    }
}
