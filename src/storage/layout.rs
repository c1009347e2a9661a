//! On-disk layout of recorded sessions and read access to past sessions.
//!
//! ```text
//! files/{SessionId}/
//!   {SessionId}-Acc.txt
//!   {SessionId}-Gyro.txt
//!   {SessionId}-GPS.txt
//!   {SessionId}-Config.txt
//! ```

use crate::sensor::SensorKind;
use crate::session::SessionId;
use crate::storage::store::{FileStore, StorageError};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Directory, under the store root, that holds one folder per session.
pub const FILES_DIR: &str = "files";

/// Suffix of the session configuration file.
pub const CONFIG_SUFFIX: &str = "Config";

/// Path helpers for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionLayout {
    id: SessionId,
}

impl SessionLayout {
    pub fn new(id: SessionId) -> Self {
        Self { id }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// `files/{id}`
    pub fn directory(&self) -> PathBuf {
        Path::new(FILES_DIR).join(self.id.as_str())
    }

    /// `files/{id}/{id}-{suffix}.txt`
    pub fn stream_file(&self, kind: SensorKind) -> PathBuf {
        self.file_with_suffix(kind.file_suffix())
    }

    /// `files/{id}/{id}-Config.txt`
    pub fn config_file(&self) -> PathBuf {
        self.file_with_suffix(CONFIG_SUFFIX)
    }

    fn file_with_suffix(&self, suffix: &str) -> PathBuf {
        self.directory().join(format!("{}-{suffix}.txt", self.id))
    }
}

/// Read and housekeeping access to recorded sessions.
#[derive(Clone)]
pub struct SessionArchive {
    store: Arc<dyn FileStore>,
}

impl SessionArchive {
    pub fn new(store: Arc<dyn FileStore>) -> Self {
        Self { store }
    }

    /// Session folder names, oldest first. Empty when nothing was recorded yet.
    pub async fn list_sessions(&self) -> Result<Vec<String>, StorageError> {
        match self.store.list_dir(Path::new(FILES_DIR)).await {
            Ok(names) => Ok(names),
            Err(StorageError::List { source, .. })
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    /// File names inside one session folder.
    pub async fn list_session_files(&self, session: &str) -> Result<Vec<String>, StorageError> {
        let dir = session_dir(session)?;
        self.store.list_dir(&dir).await
    }

    pub async fn read_session_file(
        &self,
        session: &str,
        file: &str,
    ) -> Result<String, StorageError> {
        let path = session_dir(session)?.join(single_component(file)?);
        self.store.read_to_string(&path).await
    }

    pub async fn delete_session_file(&self, session: &str, file: &str) -> Result<(), StorageError> {
        let path = session_dir(session)?.join(single_component(file)?);
        self.store.remove_file(&path).await
    }

    /// Remove a session folder with every file in it.
    pub async fn delete_session(&self, session: &str) -> Result<(), StorageError> {
        let dir = session_dir(session)?;
        self.store.remove_dir_all(&dir).await
    }
}

fn session_dir(session: &str) -> Result<PathBuf, StorageError> {
    Ok(Path::new(FILES_DIR).join(single_component(session)?))
}

/// Names coming from users must be a single plain path component.
fn single_component(name: &str) -> Result<&str, StorageError> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(std::path::Component::Normal(_)), None) => Ok(name),
        _ => Err(StorageError::InvalidPath(PathBuf::from(name))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::store::LocalFileStore;
    use chrono::NaiveDate;

    fn layout() -> SessionLayout {
        let at = NaiveDate::from_ymd_opt(2023, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 5)
            .unwrap();
        SessionLayout::new(SessionId::from_datetime(&at))
    }

    #[test]
    fn test_layout_paths() {
        let layout = layout();
        assert_eq!(layout.directory(), PathBuf::from("files/2023-01-02_03-04-05"));
        assert_eq!(
            layout.stream_file(SensorKind::Accelerometer),
            PathBuf::from("files/2023-01-02_03-04-05/2023-01-02_03-04-05-Acc.txt")
        );
        assert_eq!(
            layout.stream_file(SensorKind::Gps),
            PathBuf::from("files/2023-01-02_03-04-05/2023-01-02_03-04-05-GPS.txt")
        );
        assert_eq!(
            layout.config_file(),
            PathBuf::from("files/2023-01-02_03-04-05/2023-01-02_03-04-05-Config.txt")
        );
    }

    #[test]
    fn test_single_component_validation() {
        assert!(single_component("2023-01-02_03-04-05").is_ok());
        assert!(single_component("a/b").is_err());
        assert!(single_component("..").is_err());
        assert!(single_component("").is_err());
    }

    #[tokio::test]
    async fn test_archive_browsing() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(LocalFileStore::new(dir.path()));
        let archive = SessionArchive::new(store.clone());

        assert!(archive.list_sessions().await.unwrap().is_empty());

        let layout = layout();
        store.create_dir_all(&layout.directory()).await.unwrap();
        store
            .write(&layout.stream_file(SensorKind::Gyro), "x;y;z;date")
            .await
            .unwrap();

        assert_eq!(
            archive.list_sessions().await.unwrap(),
            vec!["2023-01-02_03-04-05"]
        );
        let files = archive
            .list_session_files("2023-01-02_03-04-05")
            .await
            .unwrap();
        assert_eq!(files, vec!["2023-01-02_03-04-05-Gyro.txt"]);
        assert_eq!(
            archive
                .read_session_file("2023-01-02_03-04-05", &files[0])
                .await
                .unwrap(),
            "x;y;z;date"
        );

        archive
            .delete_session_file("2023-01-02_03-04-05", &files[0])
            .await
            .unwrap();
        assert!(archive
            .list_session_files("2023-01-02_03-04-05")
            .await
            .unwrap()
            .is_empty());

        archive.delete_session("2023-01-02_03-04-05").await.unwrap();
        assert!(archive.list_sessions().await.unwrap().is_empty());
        assert!(archive.delete_session("../x").await.is_err());
    }
}
