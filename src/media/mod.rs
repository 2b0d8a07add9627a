pub mod s3;

use async_trait::async_trait;
use thiserror::Error;

pub use s3::S3MediaStore;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Media uploads are not configured")]
    NotConfigured,
    #[error("Upload failed: {0}")]
    Upload(String),
}

/// Object storage for listing photos, banners and blog covers.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Stores `bytes` under `key` and returns the public URL.
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str)
        -> Result<String, MediaError>;
}
