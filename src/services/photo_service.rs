// src/services/photo_service.rs
// DOCUMENTATION: Booking photo pipeline
// PURPOSE: Validate, compress, store, sign, list and delete booking photos

use crate::config::BackendClient;
use crate::errors::VangoError;
use crate::models::{PhotoFile, UploadResult};
use crate::storage::{BucketOptions, ObjectStorage};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Utc;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::GenericImageView;
use std::sync::Arc;

/// Largest accepted upload (5 MiB)
pub const MAX_FILE_SIZE: usize = 5 * 1024 * 1024;

pub const ALLOWED_MIME_TYPES: [&str; 4] = ["image/jpeg", "image/jpg", "image/png", "image/webp"];

/// Default width limit for compress_image
pub const DEFAULT_MAX_WIDTH: u32 = 1920;

/// JPEG quality used when re-encoding (0.8)
pub const JPEG_QUALITY: u8 = 80;

/// Default lifetime of signed URLs in seconds
pub const DEFAULT_SIGNED_URL_TTL: u64 = 3600;

pub struct PhotoService {
    storage: Arc<dyn ObjectStorage>,
    bucket: String,
}

impl PhotoService {
    pub fn new(backend: &BackendClient, bucket: impl Into<String>) -> Self {
        Self {
            storage: backend.storage.clone(),
            bucket: bucket.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Make sure the photo bucket exists
    /// DOCUMENTATION: Check-then-create. Two callers may both create; the
    /// storage layer accepts the duplicate.
    pub async fn initialize_bucket(&self) -> bool {
        match self.storage.bucket_exists(&self.bucket).await {
            Ok(true) => {
                log::debug!("Photo bucket {} already exists", self.bucket);
                true
            }
            Ok(false) => {
                let options = BucketOptions {
                    public: true,
                    file_size_limit: MAX_FILE_SIZE as u64,
                    allowed_mime_types: ALLOWED_MIME_TYPES.iter().map(|m| m.to_string()).collect(),
                };

                match self.storage.create_bucket(&self.bucket, &options).await {
                    Ok(()) => {
                        log::info!("Photo bucket {} initialized", self.bucket);
                        true
                    }
                    Err(e) => {
                        log::error!("Failed to create photo bucket {}: {}", self.bucket, e);
                        false
                    }
                }
            }
            Err(e) => {
                log::error!("Failed to check photo bucket {}: {}", self.bucket, e);
                false
            }
        }
    }

    /// MIME type on the allow-list and size at most MAX_FILE_SIZE
    pub(crate) fn validate_file(file: &PhotoFile) -> bool {
        if !ALLOWED_MIME_TYPES.contains(&file.content_type.as_str()) {
            log::warn!("Rejected photo {}: type {} not allowed", file.name, file.content_type);
            return false;
        }

        if file.size() > MAX_FILE_SIZE {
            log::warn!("Rejected photo {}: {} bytes exceeds limit", file.name, file.size());
            return false;
        }

        true
    }

    /// validate_file as a ValidationError
    pub(crate) fn ensure_valid_file(file: &PhotoFile) -> Result<(), VangoError> {
        if Self::validate_file(file) {
            Ok(())
        } else {
            Err(VangoError::ValidationError(format!(
                "Photo must be JPEG, PNG or WebP and at most {} bytes",
                MAX_FILE_SIZE
            )))
        }
    }

    /// Downscale to `max_width` (keeping aspect ratio) and re-encode as JPEG
    /// DOCUMENTATION: Any decode or encode failure returns the input as is.
    pub fn compress_image(file: PhotoFile, max_width: u32) -> PhotoFile {
        match reencode_jpeg(&file.bytes, max_width.max(1)) {
            Ok(bytes) => {
                log::debug!(
                    "Compressed {} from {} to {} bytes",
                    file.name,
                    file.size(),
                    bytes.len()
                );
                PhotoFile {
                    name: jpeg_name(&file.name),
                    content_type: "image/jpeg".to_string(),
                    bytes,
                }
            }
            Err(e) => {
                log::warn!("Compression failed for {}, keeping original: {}", file.name, e);
                file
            }
        }
    }

    /// Store a photo under <booking_id>/<user_id>/<epoch_ms>.<ext>
    /// DOCUMENTATION: Uniqueness of the key relies on the millisecond
    /// timestamp; the store refuses to overwrite on a collision.
    pub async fn upload_photo(
        &self,
        file: PhotoFile,
        booking_id: &str,
        user_id: &str,
    ) -> Result<UploadResult, VangoError> {
        check_segment("bookingId", booking_id)?;
        check_segment("userId", user_id)?;

        Self::ensure_valid_file(&file)?;

        let path = format!(
            "{}/{}/{}.{}",
            booking_id,
            user_id,
            Utc::now().timestamp_millis(),
            file.extension()
        );

        let content_type = file.content_type.clone();
        self.storage
            .upload(&self.bucket, &path, file.bytes, &content_type)
            .await?;

        let url = self.storage.public_url(&self.bucket, &path);
        log::info!("Uploaded photo {} for booking {}", path, booking_id);

        Ok(UploadResult { url, path })
    }

    /// Decode a `data:` URL and upload the result
    pub async fn upload_base64_photo(
        &self,
        data_url: &str,
        file_name: Option<&str>,
        booking_id: &str,
        user_id: &str,
    ) -> Result<UploadResult, VangoError> {
        let file = decode_data_url(data_url, file_name)?;
        self.upload_photo(file, booking_id, user_id).await
    }

    pub async fn get_signed_url(&self, path: &str, expires_in: u64) -> Result<String, VangoError> {
        check_path(path)?;
        self.storage.signed_url(&self.bucket, path, expires_in).await
    }

    /// True when the object existed
    pub async fn delete_photo(&self, path: &str) -> Result<bool, VangoError> {
        check_path(path)?;
        let removed = self.storage.remove(&self.bucket, path).await?;
        if removed {
            log::info!("Deleted photo {}", path);
        }
        Ok(removed)
    }

    /// Public URLs of every photo stored for the booking
    pub async fn list_booking_photos(&self, booking_id: &str) -> Result<Vec<String>, VangoError> {
        check_segment("bookingId", booking_id)?;

        let keys = self
            .storage
            .list(&self.bucket, &format!("{}/", booking_id))
            .await?;

        Ok(keys
            .iter()
            .map(|key| self.storage.public_url(&self.bucket, key))
            .collect())
    }
}

/// Parse `data:<mime>[;params];base64,<payload>` into a photo file
pub fn decode_data_url(data_url: &str, file_name: Option<&str>) -> Result<PhotoFile, VangoError> {
    let rest = data_url
        .strip_prefix("data:")
        .ok_or_else(|| VangoError::InvalidInput("Expected a data URL".to_string()))?;

    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| VangoError::InvalidInput("Malformed data URL".to_string()))?;

    let mut params = meta.split(';');
    let content_type = params.next().unwrap_or_default().to_lowercase();
    if !params.any(|p| p.eq_ignore_ascii_case("base64")) {
        return Err(VangoError::InvalidInput("Data URL is not base64 encoded".to_string()));
    }

    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| VangoError::InvalidInput(format!("Invalid base64 payload: {}", e)))?;

    let mut file = PhotoFile::new("", content_type, bytes);
    file.name = match file_name {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => format!("photo.{}", file.extension()),
    };

    Ok(file)
}

fn reencode_jpeg(bytes: &[u8], max_width: u32) -> Result<Vec<u8>, image::ImageError> {
    let mut img = image::load_from_memory(bytes)?;
    let (width, height) = img.dimensions();

    if width > max_width {
        let scale = max_width as f64 / width as f64;
        let new_height = ((height as f64) * scale).round().max(1.0) as u32;
        img = img.resize_exact(max_width, new_height, FilterType::Triangle);
    }

    let rgb = img.to_rgb8();
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY).encode_image(&rgb)?;
    Ok(out)
}

fn jpeg_name(name: &str) -> String {
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => format!("{}.jpg", stem),
        _ => format!("{}.jpg", name),
    }
}

fn check_segment(field: &str, value: &str) -> Result<(), VangoError> {
    if value.is_empty() || value.contains('/') || value == "." || value == ".." {
        return Err(VangoError::InvalidInput(format!("Invalid {}: {:?}", field, value)));
    }
    Ok(())
}

fn check_path(path: &str) -> Result<(), VangoError> {
    if path.is_empty() || path.starts_with('/') || path.split('/').any(|s| s == "..") {
        return Err(VangoError::InvalidInput(format!("Invalid photo path: {:?}", path)));
    }
    Ok(())
}
