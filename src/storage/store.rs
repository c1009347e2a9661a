//! Durable file store.
//!
//! All paths handed to a [`FileStore`] are relative to the store's root;
//! absolute paths and `..` components are refused.

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};

/// Errors raised by a file store.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to delete {path}: {source}")]
    Delete {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to list {path}: {source}")]
    List {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("path escapes the store root: {0}")]
    InvalidPath(PathBuf),
}

/// Hierarchical storage used to persist sessions.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Create a directory and any missing parents. Succeeds if it exists.
    async fn create_dir_all(&self, path: &Path) -> Result<(), StorageError>;

    /// Write a whole file, replacing any previous contents.
    async fn write(&self, path: &Path, contents: &str) -> Result<(), StorageError>;

    async fn read_to_string(&self, path: &Path) -> Result<String, StorageError>;

    async fn remove_file(&self, path: &Path) -> Result<(), StorageError>;

    /// Remove a directory and everything below it.
    async fn remove_dir_all(&self, path: &Path) -> Result<(), StorageError>;

    /// Names of the entries directly inside `path`, sorted.
    async fn list_dir(&self, path: &Path) -> Result<Vec<String>, StorageError>;
}

/// File store on the local filesystem, rooted at a base directory.
#[derive(Debug, Clone)]
pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a store-relative path to a real one.
    pub fn resolve(&self, path: &Path) -> Result<PathBuf, StorageError> {
        let safe = path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !safe {
            return Err(StorageError::InvalidPath(path.to_path_buf()));
        }
        Ok(self.root.join(path))
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn create_dir_all(&self, path: &Path) -> Result<(), StorageError> {
        let full = self.resolve(path)?;
        tokio::fs::create_dir_all(&full)
            .await
            .map_err(|source| StorageError::CreateDir { path: full, source })
    }

    async fn write(&self, path: &Path, contents: &str) -> Result<(), StorageError> {
        let full = self.resolve(path)?;
        tokio::fs::write(&full, contents)
            .await
            .map_err(|source| StorageError::Write { path: full, source })
    }

    async fn read_to_string(&self, path: &Path) -> Result<String, StorageError> {
        let full = self.resolve(path)?;
        tokio::fs::read_to_string(&full)
            .await
            .map_err(|source| StorageError::Read { path: full, source })
    }

    async fn remove_file(&self, path: &Path) -> Result<(), StorageError> {
        let full = self.resolve(path)?;
        tokio::fs::remove_file(&full)
            .await
            .map_err(|source| StorageError::Delete { path: full, source })
    }

    async fn remove_dir_all(&self, path: &Path) -> Result<(), StorageError> {
        let full = self.resolve(path)?;
        tokio::fs::remove_dir_all(&full)
            .await
            .map_err(|source| StorageError::Delete { path: full, source })
    }

    async fn list_dir(&self, path: &Path) -> Result<Vec<String>, StorageError> {
        let full = self.resolve(path)?;
        let list_err = |source| StorageError::List {
            path: full.clone(),
            source,
        };

        let mut entries = tokio::fs::read_dir(&full).await.map_err(list_err)?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(list_err)? {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_read_list_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileStore::new(dir.path());

        store.create_dir_all(Path::new("files/a/b")).await.unwrap();
        // Idempotent.
        store.create_dir_all(Path::new("files/a/b")).await.unwrap();

        store.write(Path::new("files/a/b/2.txt"), "two").await.unwrap();
        store.write(Path::new("files/a/b/1.txt"), "one").await.unwrap();

        assert_eq!(
            store.list_dir(Path::new("files/a/b")).await.unwrap(),
            vec!["1.txt", "2.txt"]
        );
        assert_eq!(
            store.read_to_string(Path::new("files/a/b/2.txt")).await.unwrap(),
            "two"
        );

        store.remove_file(Path::new("files/a/b/1.txt")).await.unwrap();
        assert_eq!(
            store.list_dir(Path::new("files/a/b")).await.unwrap(),
            vec!["2.txt"]
        );

        store.remove_dir_all(Path::new("files/a")).await.unwrap();
        assert!(store.list_dir(Path::new("files")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_parent_traversal_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileStore::new(dir.path());

        let result = store.write(Path::new("../escape.txt"), "x").await;
        assert!(matches!(result, Err(StorageError::InvalidPath(_))));
        assert!(store.resolve(Path::new("/etc/passwd")).is_err());
    }

    #[tokio::test]
    async fn test_write_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileStore::new(dir.path());

        let result = store.write(Path::new("missing/file.txt"), "x").await;
        assert!(matches!(result, Err(StorageError::Write { .. })));
    }
}
