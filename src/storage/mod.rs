//! Durable storage for recorded sessions.

pub mod layout;
pub mod store;

// Re-export commonly used types
pub use layout::{SessionArchive, SessionLayout, CONFIG_SUFFIX, FILES_DIR};
pub use store::{FileStore, LocalFileStore, StorageError};
