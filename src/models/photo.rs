// src/models/photo.rs

use serde::{Deserialize, Serialize};

/// An image file moving through the photo pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct PhotoFile {
    /// Original file name, used for the stored extension
    pub name: String,
    /// MIME type as reported by the client
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl PhotoFile {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Extension for the storage key: from the file name when it is plain
    /// ASCII alphanumeric, else from the MIME type
    pub fn extension(&self) -> String {
        if let Some((stem, ext)) = self.name.rsplit_once('.') {
            if !stem.is_empty() && !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric())
            {
                return ext.to_ascii_lowercase();
            }
        }

        match self.content_type.as_str() {
            "image/png" => "png",
            "image/webp" => "webp",
            _ => "jpg",
        }
        .to_string()
    }
}

/// Reference to a stored photo
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadResult {
    /// Publicly resolvable URL
    pub url: String,
    /// Object key inside the bucket
    pub path: String,
}

/// Body of POST /bookings/{booking_id}/photos
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoUploadRequest {
    pub user_id: Option<String>,
    pub data_url: Option<String>,
    pub file_name: Option<String>,
    /// Re-encode (and downscale) before storing; defaults to true
    pub compress: Option<bool>,
}

/// Body of POST /photos/signed-url
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedUrlRequest {
    pub path: Option<String>,
    pub expires_in: Option<u64>,
}

/// Query of DELETE /photos
#[derive(Debug, Deserialize)]
pub struct PhotoPathQuery {
    pub path: String,
}
