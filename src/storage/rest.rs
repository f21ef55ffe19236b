// src/storage/rest.rs
// DOCUMENTATION: Managed backend storage REST client
// PURPOSE: Bucket/object calls against <backend>/storage/v1

use crate::errors::VangoError;
use crate::storage::{BucketOptions, ObjectStorage};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;

/// Page size for object listing
const LIST_LIMIT: usize = 1000;

/// Storage API client authenticated with the backend anon key
pub struct RestObjectStorage {
    client: Client,
    /// e.g. https://project.backend.example/storage/v1
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct ListEntry {
    name: String,
    /// Folders come back without an id
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SignedUrlResponse {
    #[serde(rename = "signedURL")]
    signed_url: String,
}

impl RestObjectStorage {
    pub fn new(client: Client, backend_url: &str, api_key: String) -> Self {
        Self {
            client,
            base_url: format!("{}/storage/v1", backend_url.trim_end_matches('/')),
            api_key,
        }
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn send(&self, builder: reqwest::RequestBuilder, what: &str) -> Result<Response, VangoError> {
        self.authorized(builder).send().await.map_err(|e| {
            log::error!("Storage request ({}) failed: {}", what, e);
            VangoError::StorageError(format!("{} request failed: {}", what, e))
        })
    }

    async fn fail(response: Response, what: &str) -> VangoError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        log::error!("Storage API error during {} ({}): {}", what, status, body);
        VangoError::StorageError(format!("{} failed with {}: {}", what, status, body))
    }
}

#[async_trait]
impl ObjectStorage for RestObjectStorage {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool, VangoError> {
        let url = format!("{}/bucket/{}", self.base_url, bucket);
        let response = self.send(self.client.get(&url), "get bucket").await?;

        match response.status() {
            s if s.is_success() => Ok(true),
            StatusCode::NOT_FOUND | StatusCode::BAD_REQUEST => Ok(false),
            _ => Err(Self::fail(response, "get bucket").await),
        }
    }

    async fn create_bucket(&self, bucket: &str, options: &BucketOptions) -> Result<(), VangoError> {
        let url = format!("{}/bucket", self.base_url);
        let body = json!({
            "id": bucket,
            "name": bucket,
            "public": options.public,
            "file_size_limit": options.file_size_limit,
            "allowed_mime_types": options.allowed_mime_types,
        });

        let response = self.send(self.client.post(&url).json(&body), "create bucket").await?;
        let status = response.status();

        if status.is_success() {
            log::info!("Created storage bucket {}", bucket);
            return Ok(());
        }

        // A concurrent creator won the race
        let text = response.text().await.unwrap_or_default();
        if status == StatusCode::CONFLICT || text.to_lowercase().contains("already exists") {
            log::debug!("Bucket {} already exists", bucket);
            return Ok(());
        }

        log::error!("Storage API error during create bucket ({}): {}", status, text);
        Err(VangoError::StorageError(format!(
            "create bucket failed with {}: {}",
            status, text
        )))
    }

    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), VangoError> {
        let url = format!("{}/object/{}/{}", self.base_url, bucket, key);
        let builder = self
            .client
            .post(&url)
            .header("content-type", content_type)
            .header("cache-control", "max-age=3600")
            .header("x-upsert", "false")
            .body(bytes);

        let response = self.send(builder, "upload").await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::fail(response, "upload").await)
        }
    }

    fn public_url(&self, bucket: &str, key: &str) -> String {
        format!("{}/object/public/{}/{}", self.base_url, bucket, key)
    }

    async fn signed_url(
        &self,
        bucket: &str,
        key: &str,
        expires_in: u64,
    ) -> Result<String, VangoError> {
        let url = format!("{}/object/sign/{}/{}", self.base_url, bucket, key);
        let builder = self.client.post(&url).json(&json!({ "expiresIn": expires_in }));

        let response = self.send(builder, "sign").await?;
        if !response.status().is_success() {
            return Err(Self::fail(response, "sign").await);
        }

        let signed: SignedUrlResponse = response.json().await.map_err(|e| {
            log::error!("Failed to parse signed URL response: {}", e);
            VangoError::StorageError(format!("Parse error: {}", e))
        })?;

        Ok(format!("{}{}", self.base_url, signed.signed_url))
    }

    async fn remove(&self, bucket: &str, key: &str) -> Result<bool, VangoError> {
        let url = format!("{}/object/{}", self.base_url, bucket);
        let builder = self.client.delete(&url).json(&json!({ "prefixes": [key] }));

        let response = self.send(builder, "remove").await?;
        if !response.status().is_success() {
            return Err(Self::fail(response, "remove").await);
        }

        let removed: Vec<serde_json::Value> = response.json().await.map_err(|e| {
            log::error!("Failed to parse remove response: {}", e);
            VangoError::StorageError(format!("Parse error: {}", e))
        })?;

        Ok(!removed.is_empty())
    }

    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, VangoError> {
        let url = format!("{}/object/list/{}", self.base_url, bucket);
        let mut keys = Vec::new();
        let mut folders = vec![prefix.trim_end_matches('/').to_string()];

        // The list endpoint is one level deep; descend into folders ourselves
        while let Some(folder) = folders.pop() {
            let mut offset = 0;
            loop {
                let body = json!({
                    "prefix": folder,
                    "limit": LIST_LIMIT,
                    "offset": offset,
                    "sortBy": { "column": "name", "order": "asc" },
                });

                let response = self.send(self.client.post(&url).json(&body), "list").await?;
                if !response.status().is_success() {
                    return Err(Self::fail(response, "list").await);
                }

                let entries: Vec<ListEntry> = response.json().await.map_err(|e| {
                    log::error!("Failed to parse list response: {}", e);
                    VangoError::StorageError(format!("Parse error: {}", e))
                })?;

                let page_len = entries.len();
                for entry in entries {
                    let key = if folder.is_empty() {
                        entry.name.clone()
                    } else {
                        format!("{}/{}", folder, entry.name)
                    };

                    if entry.id.is_some() {
                        keys.push(key);
                    } else {
                        folders.push(key);
                    }
                }

                if page_len < LIST_LIMIT {
                    break;
                }
                offset += page_len;
            }
        }

        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_url_layout() {
        let storage = RestObjectStorage::new(
            Client::new(),
            "https://backend.example/",
            "anon".to_string(),
        );
        assert_eq!(
            storage.public_url("booking-photos", "b1/u1/1700000000000.jpg"),
            "https://backend.example/storage/v1/object/public/booking-photos/b1/u1/1700000000000.jpg"
        );
    }
}
