//! Two-stage transfer of selected items: fetch to local storage, then push
//! to the remote destination.

mod ftp;
mod pipeline;
mod report;
mod ytdlp;

pub use ftp::{FtpDestination, FtpSession};
pub use pipeline::{DestinationPlan, TransferPipeline};
pub use report::{BatchReport, BatchReportBuilder, TransferRecord};
pub use ytdlp::{YtDlp, parse_progress_line};

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;

use crate::catalog::Item;
use crate::error::{Error, Result};

/// One progress report from a running stage.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    /// Completion in percent, `0.0..=100.0`.
    pub percent: f32,
    /// Human-readable transfer rate, if known.
    pub rate: Option<String>,
    /// Human-readable time remaining, if known.
    pub eta: Option<String>,
}

impl ProgressUpdate {
    #[must_use]
    pub const fn percent(percent: f32) -> Self {
        Self {
            percent,
            rate: None,
            eta: None,
        }
    }
}

/// Stage of the per-item transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Fetch,
    Push,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fetch => f.write_str("download"),
            Self::Push => f.write_str("upload"),
        }
    }
}

/// Callback a stage uses to report progress.
pub type ProgressFn<'a> = &'a (dyn Fn(ProgressUpdate) + Send + Sync);

/// Trait for receiving transfer progress events.
///
/// All methods have default no-op implementations.
pub trait TransferProgress: Send + Sync {
    /// Called when a stage starts for an item.
    fn on_stage_start(&self, _item: &Item, _stage: Stage) {}

    /// Called with clamped, non-decreasing progress for the running stage.
    fn on_progress(&self, _item: &Item, _stage: Stage, _update: &ProgressUpdate) {}

    /// Called when a stage finishes; `detail` is the local or remote path.
    fn on_stage_complete(&self, _item: &Item, _stage: Stage, _detail: &str) {}

    /// Called when a stage fails for an item.
    fn on_error(&self, _item: &Item, _stage: Stage, _error: &Error) {}

    /// Called before the remote session is opened.
    fn on_connecting(&self) {}
}

/// A null progress implementation that ignores all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl TransferProgress for NoProgress {}

/// Fetches an item to a local file.
///
/// Every file a fetch leaves in [`ItemFetcher::work_dir`], finished or
/// partial, is named `{item.id}.` followed by anything. The pipeline relies
/// on this to sweep leftovers of failed fetches.
#[async_trait]
pub trait ItemFetcher: Send + Sync {
    /// Directory the fetcher writes artifacts into.
    fn work_dir(&self) -> &Path;

    /// Fetches `item` and returns the path of the local artifact.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Fetch`] if the item could not be fetched.
    async fn fetch(&self, item: &Item, on_progress: ProgressFn<'_>) -> Result<PathBuf>;
}

/// A remote destination that can open push sessions.
#[async_trait]
pub trait Destination: Send + Sync {
    /// Opens an authenticated session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] if the destination is unreachable or
    /// rejects the credentials.
    async fn connect(&self) -> Result<Box<dyn PushSession>>;
}

/// An open session with a remote destination.
#[async_trait]
pub trait PushSession: Send {
    /// Uploads `local` to the absolute remote path `remote`, creating parent
    /// directories as needed. Returns the remote path written.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] if the session was lost and
    /// [`Error::Push`] for failures limited to this file.
    async fn push(&mut self, local: &Path, remote: &str, on_progress: ProgressFn<'_>)
    -> Result<String>;

    /// Ends the session.
    ///
    /// # Errors
    ///
    /// Returns an error if the goodbye exchange fails.
    async fn close(&mut self) -> Result<()>;
}

/// Replaces path separators in a title so it stays a single path segment.
#[must_use]
pub fn sanitize_title(title: &str) -> String {
    title.replace(['/', '\\'], "_")
}

/// Builds `{root}/{namespace}/{title}{.ext}` for an uploaded artifact.
///
/// The extension is taken from `local`. The result is always absolute:
/// `root` is anchored at `/` and its trailing slashes are trimmed, so an
/// empty root places the namespace directly under `/`.
#[must_use]
pub fn destination_path(root: &str, namespace: &str, title: &str, local: &Path) -> String {
    let root = root.trim_matches('/');
    let root = if root.is_empty() {
        String::new()
    } else {
        format!("/{root}")
    };
    let namespace = namespace.replace(' ', "_");
    let ext = local
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{e}"))
        .unwrap_or_default();
    format!("{root}/{namespace}/{}{ext}", sanitize_title(title))
}

/// High-water mark for one stage's percentage.
///
/// Non-negative `f32` values order the same as their bit patterns, so the
/// maximum can be kept with an integer `fetch_max`.
#[derive(Debug, Default)]
pub(crate) struct PercentClamp {
    high: AtomicU32,
}

impl PercentClamp {
    pub(crate) const fn new() -> Self {
        Self {
            high: AtomicU32::new(0),
        }
    }

    /// Clamps `percent` to `[0, 100]` and returns it, or the previous high
    /// value if that was larger.
    pub(crate) fn advance(&self, percent: f32) -> f32 {
        // Also folds -0.0, whose bit pattern would outrank every positive value
        let percent = if percent.is_nan() || percent <= 0.0 {
            0.0
        } else {
            percent.min(100.0)
        };
        let previous = f32::from_bits(self.high.fetch_max(percent.to_bits(), Ordering::Relaxed));
        previous.max(percent)
    }
}
