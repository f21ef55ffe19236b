// src/storage/memory.rs

use crate::errors::VangoError;
use crate::storage::{BucketOptions, ObjectStorage};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// In-memory buckets, keyed by bucket name then object key
pub struct MemoryObjectStorage {
    base_url: String,
    buckets: RwLock<HashMap<String, BTreeMap<String, StoredObject>>>,
}

impl MemoryObjectStorage {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            buckets: RwLock::new(HashMap::new()),
        }
    }

    pub async fn get(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        let buckets = self.buckets.read().await;
        buckets.get(bucket).and_then(|b| b.get(key)).cloned()
    }
}

#[async_trait]
impl ObjectStorage for MemoryObjectStorage {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool, VangoError> {
        Ok(self.buckets.read().await.contains_key(bucket))
    }

    async fn create_bucket(&self, bucket: &str, _options: &BucketOptions) -> Result<(), VangoError> {
        self.buckets
            .write()
            .await
            .entry(bucket.to_string())
            .or_default();
        Ok(())
    }

    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), VangoError> {
        let mut buckets = self.buckets.write().await;
        let objects = buckets
            .get_mut(bucket)
            .ok_or_else(|| VangoError::StorageError(format!("Bucket not found: {}", bucket)))?;

        if objects.contains_key(key) {
            return Err(VangoError::AlreadyExists(key.to_string()));
        }

        objects.insert(
            key.to_string(),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    fn public_url(&self, bucket: &str, key: &str) -> String {
        format!("{}/storage/v1/object/public/{}/{}", self.base_url, bucket, key)
    }

    async fn signed_url(
        &self,
        bucket: &str,
        key: &str,
        expires_in: u64,
    ) -> Result<String, VangoError> {
        if self.get(bucket, key).await.is_none() {
            return Err(VangoError::StorageError(format!("Object not found: {}", key)));
        }

        let expires_at = chrono::Utc::now().timestamp() + expires_in as i64;
        Ok(format!(
            "{}/storage/v1/object/sign/{}/{}?expires={}",
            self.base_url, bucket, key, expires_at
        ))
    }

    async fn remove(&self, bucket: &str, key: &str) -> Result<bool, VangoError> {
        let mut buckets = self.buckets.write().await;
        Ok(buckets
            .get_mut(bucket)
            .map(|objects| objects.remove(key).is_some())
            .unwrap_or(false))
    }

    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, VangoError> {
        let buckets = self.buckets.read().await;
        Ok(buckets
            .get(bucket)
            .map(|objects| {
                objects
                    .keys()
                    .filter(|k| k.starts_with(prefix))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}
