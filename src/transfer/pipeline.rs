//! Sequential fetch-then-push over a batch of items.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::report::{BatchReport, BatchReportBuilder, TransferRecord};
use super::{
    Destination, ItemFetcher, PercentClamp, ProgressUpdate, PushSession, Stage, TransferProgress,
    destination_path,
};
use crate::catalog::Item;
use crate::error::{Error, Result};
use crate::fs::{FileSystem, TokioFileSystem};

/// Where pushed artifacts land on the remote side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationPlan {
    /// Absolute remote directory all namespaces live under.
    pub target_root: String,
    /// Per-source subdirectory, e.g. the channel name.
    pub namespace: String,
}

impl DestinationPlan {
    #[must_use]
    pub fn new(target_root: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            target_root: target_root.into(),
            namespace: namespace.into(),
        }
    }

    /// Remote path for `item` given its local artifact.
    #[must_use]
    pub fn remote_path(&self, item: &Item, local: &Path) -> String {
        let title = if item.title.trim().is_empty() {
            &item.id
        } else {
            &item.title
        };
        destination_path(&self.target_root, &self.namespace, title, local)
    }
}

/// State of the push stage across a batch.
enum PushStage {
    /// No session opened yet.
    Idle,
    Open(Box<dyn PushSession>),
    /// Connection failed or was lost; no further pushes.
    Aborted,
}

/// Runs every selected item through fetch then push, one at a time.
pub struct TransferPipeline<Fe, D, F: FileSystem = TokioFileSystem> {
    fetcher: Fe,
    destination: D,
    fs: F,
    plan: DestinationPlan,
}

impl<Fe: ItemFetcher, D: Destination> TransferPipeline<Fe, D, TokioFileSystem> {
    /// Creates a pipeline using the real file system.
    #[must_use]
    pub const fn with_tokio_fs(fetcher: Fe, destination: D, plan: DestinationPlan) -> Self {
        Self::new(fetcher, destination, TokioFileSystem, plan)
    }
}

impl<Fe: ItemFetcher, D: Destination, F: FileSystem> TransferPipeline<Fe, D, F> {
    #[must_use]
    pub const fn new(fetcher: Fe, destination: D, fs: F, plan: DestinationPlan) -> Self {
        Self {
            fetcher,
            destination,
            fs,
            plan,
        }
    }

    /// Transfers `items` in order and reports every outcome.
    ///
    /// Per-item failures never stop the batch. A connection failure stops
    /// the push stage only: later items are still fetched and then left
    /// unpushed. Local artifacts are removed at the end whatever happened.
    pub async fn run(&self, items: &[Item], progress: &dyn TransferProgress) -> BatchReport {
        let mut builder = BatchReportBuilder::new();
        let mut stage = PushStage::Idle;
        let mut artifacts: Vec<PathBuf> = Vec::new();

        let work_dir = self.fetcher.work_dir();
        if let Err(e) = self.fs.create_dir_all(work_dir).await {
            log::error!("Could not create {}: {e}", work_dir.display());
        }

        log::info!("Transferring {} item(s)", items.len());
        for item in items {
            let fetch = self.fetch(item, progress).await;
            let push = match &fetch {
                Ok(local) => {
                    artifacts.push(local.clone());
                    self.push(item, local, &mut stage, &mut builder, progress)
                        .await
                }
                Err(_) => None,
            };
            builder.add_record(TransferRecord {
                item: item.clone(),
                fetch,
                push,
            });
        }

        if let PushStage::Open(mut session) = stage
            && let Err(e) = session.close().await
        {
            log::warn!("Closing the remote session failed: {e}");
        }

        self.cleanup(items, &artifacts, &mut builder).await;
        builder.build()
    }

    async fn fetch(&self, item: &Item, progress: &dyn TransferProgress) -> Result<PathBuf> {
        log::info!("Fetching {} ({})", item.id, item.title);
        progress.on_stage_start(item, Stage::Fetch);

        let clamp = PercentClamp::new();
        let on_progress = |update: ProgressUpdate| {
            let percent = clamp.advance(update.percent);
            progress.on_progress(item, Stage::Fetch, &ProgressUpdate { percent, ..update });
        };

        match self.fetcher.fetch(item, &on_progress).await {
            Ok(local) => {
                progress.on_stage_complete(item, Stage::Fetch, &local.display().to_string());
                Ok(local)
            }
            Err(e) => {
                log::error!("Fetch of {} failed: {e}", item.id);
                progress.on_error(item, Stage::Fetch, &e);
                Err(e)
            }
        }
    }

    /// Pushes one fetched artifact. `None` means no push was attempted.
    async fn push(
        &self,
        item: &Item,
        local: &Path,
        stage: &mut PushStage,
        builder: &mut BatchReportBuilder,
        progress: &dyn TransferProgress,
    ) -> Option<Result<String>> {
        if matches!(stage, PushStage::Aborted) {
            return None;
        }

        if !self.fs.file_exists(local).await {
            let e = Error::Push(format!("local file {} is missing", local.display()));
            log::error!("Push of {} failed: {e}", item.id);
            progress.on_error(item, Stage::Push, &e);
            return Some(Err(e));
        }

        if matches!(stage, PushStage::Idle) {
            progress.on_connecting();
            match self.destination.connect().await {
                Ok(session) => *stage = PushStage::Open(session),
                Err(e) => {
                    log::error!("Could not connect to the destination: {e}");
                    progress.on_error(item, Stage::Push, &e);
                    builder.set_connection_error(e);
                    *stage = PushStage::Aborted;
                    return None;
                }
            }
        }
        let PushStage::Open(session) = stage else {
            return None;
        };

        let remote = self.plan.remote_path(item, local);
        log::info!("Pushing {} to {remote}", local.display());
        progress.on_stage_start(item, Stage::Push);

        let clamp = PercentClamp::new();
        let on_progress = |update: ProgressUpdate| {
            let percent = clamp.advance(update.percent);
            progress.on_progress(item, Stage::Push, &ProgressUpdate { percent, ..update });
        };

        match session.push(local, &remote, &on_progress).await {
            Ok(written) => {
                progress.on_stage_complete(item, Stage::Push, &written);
                Some(Ok(written))
            }
            Err(e) if e.is_connection() => {
                log::error!("Lost the destination while pushing {}: {e}", item.id);
                progress.on_error(item, Stage::Push, &e);
                builder.set_connection_error(e);
                *stage = PushStage::Aborted;
                None
            }
            Err(e) => {
                let e = match e {
                    Error::Push(_) => e,
                    other => Error::Push(other.to_string()),
                };
                log::error!("Push of {} failed: {e}", item.id);
                progress.on_error(item, Stage::Push, &e);
                Some(Err(e))
            }
        }
    }

    async fn cleanup(&self, items: &[Item], artifacts: &[PathBuf], builder: &mut BatchReportBuilder) {
        for path in artifacts {
            self.remove_artifact(path, builder).await;
        }

        let work_dir = self.fetcher.work_dir();
        for path in self.leftovers(items, artifacts, work_dir, builder).await {
            log::debug!("Removing leftover {}", path.display());
            self.remove_artifact(&path, builder).await;
        }

        match self.fs.remove_dir(work_dir).await {
            Ok(()) => log::info!("Removed {}", work_dir.display()),
            Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::DirectoryNotEmpty) => {}
            Err(e) => {
                log::warn!("Could not remove {}: {e}", work_dir.display());
                builder.add_cleanup_error(Error::Cleanup(format!("{}: {e}", work_dir.display())));
            }
        }
    }

    async fn remove_artifact(&self, path: &Path, builder: &mut BatchReportBuilder) {
        match self.fs.remove_file(path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                log::warn!("Could not remove {}: {e}", path.display());
                builder.add_cleanup_error(Error::Cleanup(format!("{}: {e}", path.display())));
            }
        }
    }

    /// Work directory entries named `{id}.…` for any item in the batch,
    /// other than the artifacts already handled.
    async fn leftovers(
        &self,
        items: &[Item],
        artifacts: &[PathBuf],
        work_dir: &Path,
        builder: &mut BatchReportBuilder,
    ) -> Vec<PathBuf> {
        let entries = match self.fs.list_dir(work_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                log::warn!("Could not list {}: {e}", work_dir.display());
                builder.add_cleanup_error(Error::Cleanup(format!("{}: {e}", work_dir.display())));
                return Vec::new();
            }
        };
        let prefixes: Vec<String> = items.iter().map(|item| format!("{}.", item.id)).collect();
        entries
            .into_iter()
            .filter(|path| !artifacts.contains(path))
            .filter(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| prefixes.iter().any(|p| name.starts_with(p.as_str())))
            })
            .collect()
    }
}
