//! kirinuki-ftp - browse a YouTube channel's uploads, pick videos and relay
//! them to an FTP server.
//!
//! The library is split into a paged catalog with a page cache, an
//! interactive selector built on a pure state machine, and a sequential
//! fetch-then-push transfer pipeline. Every external system sits behind a
//! trait so the core can run against in-memory fakes.
//!
//! # Example
//!
//! ```no_run
//! use kirinuki_ftp::{
//!     DestinationPlan, FtpDestination, Item, NoProgress, TransferPipeline, YtDlp,
//! };
//!
//! # async fn example() {
//! let pipeline = TransferPipeline::with_tokio_fs(
//!     YtDlp::new("yt-dlp", "downloads"),
//!     FtpDestination::new("ftp.example.com", 21, "user", "secret"),
//!     DestinationPlan::new("/videos", "SirayukiHina"),
//! );
//!
//! let items = vec![Item::new("dQw4w9WgXcQ", "Some clip")];
//! let report = pipeline.run(&items, &NoProgress).await;
//! println!("{}/{} uploaded", report.succeeded(), report.total());
//! # }
//! ```

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod catalog;
pub mod channel;
#[cfg(all(feature = "cli", feature = "tui"))]
pub mod cli;
pub mod config;
pub mod error;
pub mod format;
pub mod fs;
pub mod selector;
pub mod transfer;

// Re-export main types for convenience
pub use catalog::{Item, Page, PageCache, PageFetcher, YouTubePlaylist};
pub use channel::Channel;
pub use config::{AppConfig, CatalogConfig, DestinationConfig, FetchConfig};
pub use error::{Error, Result};
pub use format::{format_bytes, format_duration, format_rate};
pub use fs::{FileSystem, TokioFileSystem};
pub use selector::{Command, PageView, Phase, SelectionSet, Selector, SelectorView, SessionState, VirtualIndex};
pub use transfer::{
    BatchReport, Destination, DestinationPlan, FtpDestination, ItemFetcher, NoProgress,
    ProgressUpdate, PushSession, Stage, TransferPipeline, TransferProgress, TransferRecord, YtDlp,
};
