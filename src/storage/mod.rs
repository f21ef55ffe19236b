// src/storage/mod.rs
// DOCUMENTATION: Object storage seam
// PURPOSE: Bucket and object operations used by the photo pipeline

pub mod memory;
pub mod rest;

pub use memory::MemoryObjectStorage;
pub use rest::RestObjectStorage;

use crate::errors::VangoError;
use async_trait::async_trait;

/// Settings applied when a bucket is created
#[derive(Debug, Clone)]
pub struct BucketOptions {
    pub public: bool,
    pub file_size_limit: u64,
    pub allowed_mime_types: Vec<String>,
}

/// Bucket/object operations of the managed backend's storage
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool, VangoError>;

    /// Create a bucket. Creating one that already exists is not an error.
    async fn create_bucket(&self, bucket: &str, options: &BucketOptions) -> Result<(), VangoError>;

    /// Store an object; never overwrites an existing key
    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), VangoError>;

    fn public_url(&self, bucket: &str, key: &str) -> String;

    /// Time-limited read URL for a private object
    async fn signed_url(&self, bucket: &str, key: &str, expires_in: u64)
        -> Result<String, VangoError>;

    /// True when the object existed and was removed
    async fn remove(&self, bucket: &str, key: &str) -> Result<bool, VangoError>;

    /// Keys of every object under `prefix`, at any depth, sorted
    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, VangoError>;
}
