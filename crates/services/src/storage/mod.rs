//! Object storage seam: named buckets holding opaque blobs.

pub mod local;

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;

pub use local::LocalStorage;

pub const ASSIGNMENTS_BUCKET: &str = "assignments";
pub const SUBMISSIONS_BUCKET: &str = "submissions";
pub const CHAT_FILES_BUCKET: &str = "chat-files";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Object not found: {0}")]
    NotFound(String),
    #[error("Invalid object path: {0}")]
    InvalidPath(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> StorageResult<()>;

    async fn download(&self, bucket: &str, path: &str) -> StorageResult<StoredObject>;

    /// Unauthenticated URL for objects in public buckets; `None` otherwise.
    fn public_url(&self, bucket: &str, path: &str) -> Option<String>;

    fn is_public(&self, bucket: &str) -> bool;
}

/// `<prefix>/<millis>.<ext>`, the extension taken from the uploaded name.
pub fn object_path(prefix: &str, file_name: &str) -> String {
    let millis = Utc::now().timestamp_millis();
    match file_name.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()) => {
            format!("{}/{}.{}", prefix, millis, ext.to_ascii_lowercase())
        }
        _ => format!("{}/{}", prefix, millis),
    }
}
