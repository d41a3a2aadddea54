use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use studyx_config::StorageSettings;
use tracing::debug;

use super::{ObjectStorage, StorageError, StorageResult, StoredObject};

const META_SUFFIX: &str = ".content-type";

/// Buckets as directories under a root; each object's content type is kept
/// in a sibling file.
pub struct LocalStorage {
    root: PathBuf,
    public_base_url: String,
    public_buckets: Vec<String>,
}

impl LocalStorage {
    pub fn new(settings: &StorageSettings) -> Self {
        Self {
            root: PathBuf::from(&settings.root_dir),
            public_base_url: settings.public_base_url.trim_end_matches('/').to_string(),
            public_buckets: settings.public_buckets.clone(),
        }
    }

    fn resolve(&self, bucket: &str, path: &str) -> StorageResult<PathBuf> {
        let safe = |p: &str| {
            !p.is_empty()
                && Path::new(p)
                    .components()
                    .all(|c| matches!(c, Component::Normal(_)))
        };
        if !safe(bucket) || bucket.contains('/') || !safe(path) || path.ends_with(META_SUFFIX) {
            return Err(StorageError::InvalidPath(format!("{}/{}", bucket, path)));
        }
        Ok(self.root.join(bucket).join(path))
    }
}

fn meta_path(file: &Path) -> PathBuf {
    let mut name = file.as_os_str().to_owned();
    name.push(META_SUFFIX);
    PathBuf::from(name)
}

#[async_trait]
impl ObjectStorage for LocalStorage {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> StorageResult<()> {
        let file = self.resolve(bucket, path)?;
        if let Some(parent) = file.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let size = bytes.len();
        tokio::fs::write(&file, bytes).await?;
        tokio::fs::write(meta_path(&file), content_type.as_bytes()).await?;
        debug!(bucket, path, size, "Object stored");
        Ok(())
    }

    async fn download(&self, bucket: &str, path: &str) -> StorageResult<StoredObject> {
        let file = self.resolve(bucket, path)?;
        let bytes = match tokio::fs::read(&file).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(format!("{}/{}", bucket, path)));
            }
            Err(e) => return Err(e.into()),
        };
        let content_type = tokio::fs::read_to_string(meta_path(&file))
            .await
            .unwrap_or_else(|_| "application/octet-stream".to_string());
        Ok(StoredObject {
            bytes,
            content_type,
        })
    }

    fn public_url(&self, bucket: &str, path: &str) -> Option<String> {
        self.is_public(bucket)
            .then(|| format!("{}/{}/{}", self.public_base_url, bucket, path))
    }

    fn is_public(&self, bucket: &str) -> bool {
        self.public_buckets.iter().any(|b| b == bucket)
    }
}
