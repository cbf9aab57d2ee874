//! Object storage for uploaded audio.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    #[error("Invalid object key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Where upload bytes end up.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` under `key` and return its public URL.
    async fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<String, BlobError>;

    /// Remove `key`. Deleting a missing object is not an error.
    async fn delete(&self, key: &str) -> Result<(), BlobError>;
}

/// Object key for an upload: `music/<epoch-millis>-<sanitized name>`.
pub fn object_key(now_millis: i64, original_name: &str) -> String {
    let base = Path::new(original_name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("");
    let sanitized: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let sanitized = sanitized.trim_start_matches('.');
    let name = if sanitized.is_empty() { "upload" } else { sanitized };

    format!("music/{now_millis}-{name}")
}

/// Recover the object key from a URL: its last two path segments.
pub fn key_from_url(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next()?;
    let mut segments = path.rsplit('/');
    let name = segments.next().filter(|s| !s.is_empty())?;
    let folder = segments.next().filter(|s| !s.is_empty())?;
    Some(format!("{folder}/{name}"))
}

/// Files under a local directory, served back from `public_url`.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
    public_url: String,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>, public_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_url: public_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, BlobError> {
        let relative = Path::new(key);
        let safe = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(BlobError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<String, BlobError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;

        debug!(target: "server::blob", key, content_type, size = bytes.len(), "Stored upload");
        Ok(format!("{}/{}", self.public_url, key))
    }

    async fn delete(&self, key: &str) -> Result<(), BlobError> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
pub use memory::MemoryBlobStore;

#[cfg(test)]
mod memory {
    use super::{BlobError, BlobStore};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Blob store held in a map, with a switch to make every call fail.
    #[derive(Debug, Default)]
    pub struct MemoryBlobStore {
        objects: Mutex<HashMap<String, (Vec<u8>, String)>>,
        failing: AtomicBool,
    }

    impl MemoryBlobStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn fail(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }

        pub fn content_type(&self, key: &str) -> Option<String> {
            self.objects.lock().get(key).map(|(_, ct)| ct.clone())
        }

        pub fn contains(&self, key: &str) -> bool {
            self.objects.lock().contains_key(key)
        }

        fn check(&self) -> Result<(), BlobError> {
            if self.failing.load(Ordering::SeqCst) {
                Err(BlobError::Io(std::io::Error::other("bucket unreachable")))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl BlobStore for MemoryBlobStore {
        async fn put(
            &self,
            key: &str,
            bytes: &[u8],
            content_type: &str,
        ) -> Result<String, BlobError> {
            self.check()?;
            self.objects
                .lock()
                .insert(key.to_string(), (bytes.to_vec(), content_type.to_string()));
            Ok(format!("memory://bucket/{key}"))
        }

        async fn delete(&self, key: &str) -> Result<(), BlobError> {
            self.check()?;
            self.objects.lock().remove(key);
            Ok(())
        }
    }
}
