//! File system abstraction for testability.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Abstraction over the local file operations the pipeline performs.
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Checks if a file exists at the given path.
    async fn file_exists(&self, path: &Path) -> bool;

    /// Creates all directories in the given path.
    async fn create_dir_all(&self, path: &Path) -> std::io::Result<()>;

    /// Removes a single file.
    async fn remove_file(&self, path: &Path) -> std::io::Result<()>;

    /// Removes an empty directory.
    async fn remove_dir(&self, path: &Path) -> std::io::Result<()>;

    /// Lists the entries directly inside a directory.
    async fn list_dir(&self, path: &Path) -> std::io::Result<Vec<PathBuf>>;
}

/// Default file system implementation using `tokio::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioFileSystem;

impl TokioFileSystem {
    /// Creates a new `TokioFileSystem` instance.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FileSystem for TokioFileSystem {
    async fn file_exists(&self, path: &Path) -> bool {
        tokio::fs::metadata(path).await.is_ok_and(|m| m.is_file())
    }

    async fn create_dir_all(&self, path: &Path) -> std::io::Result<()> {
        tokio::fs::create_dir_all(path).await
    }

    async fn remove_file(&self, path: &Path) -> std::io::Result<()> {
        tokio::fs::remove_file(path).await
    }

    async fn remove_dir(&self, path: &Path) -> std::io::Result<()> {
        tokio::fs::remove_dir(path).await
    }

    async fn list_dir(&self, path: &Path) -> std::io::Result<Vec<PathBuf>> {
        let mut entries = tokio::fs::read_dir(path).await?;
        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            paths.push(entry.path());
        }
        Ok(paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn tokio_fs_file_exists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.mp4");
        std::fs::File::create(&path).unwrap();

        let fs = TokioFileSystem::new();
        assert!(fs.file_exists(&path).await);
        assert!(!fs.file_exists(&dir.path().join("nonexistent.mp4")).await);
        // Directories are not artifacts
        assert!(!fs.file_exists(dir.path()).await);
    }

    #[tokio::test]
    async fn tokio_fs_create_dir_all() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a/b/c");

        let fs = TokioFileSystem::new();
        fs.create_dir_all(&nested).await.unwrap();
        assert!(nested.exists());
    }

    #[tokio::test]
    async fn tokio_fs_remove_file_and_dir() {
        let dir = TempDir::new().unwrap();
        let work = dir.path().join("downloads");
        std::fs::create_dir(&work).unwrap();
        let path = work.join("abc123.mp4");
        std::fs::write(&path, b"video").unwrap();

        let fs = TokioFileSystem::new();
        assert!(fs.remove_dir(&work).await.is_err());
        fs.remove_file(&path).await.unwrap();
        fs.remove_dir(&work).await.unwrap();
        assert!(!work.exists());
    }

    #[tokio::test]
    async fn tokio_fs_list_dir() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("abc.mp4.part"), b"").unwrap();
        std::fs::write(dir.path().join("def.webm"), b"").unwrap();

        let fs = TokioFileSystem::new();
        let mut listed = fs.list_dir(dir.path()).await.unwrap();
        listed.sort();
        assert_eq!(
            listed,
            [dir.path().join("abc.mp4.part"), dir.path().join("def.webm")]
        );
        let missing = fs.list_dir(&dir.path().join("missing")).await.unwrap_err();
        assert_eq!(missing.kind(), std::io::ErrorKind::NotFound);
    }
}
