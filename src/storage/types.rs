//! Types for media uploads

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// An image picked for upload
#[derive(Debug, Clone, PartialEq)]
pub struct MediaFile {
    /// Original file name, used for the object key's extension
    pub name: String,

    /// Raw file contents
    pub bytes: Bytes,

    /// MIME type sent with the upload
    pub content_type: String,
}

impl MediaFile {
    /// Create a new media file, guessing the content type from the extension
    pub fn new(name: &str, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.to_string(),
            bytes: bytes.into(),
            content_type: content_type_for(name).to_string(),
        }
    }

    /// Override the content type
    pub fn with_content_type(mut self, content_type: &str) -> Self {
        self.content_type = content_type.to_string();
        self
    }

    /// Lower-cased extension, defaulting to `jpg`
    pub fn extension(&self) -> String {
        std::path::Path::new(&self.name)
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .unwrap_or_else(|| "jpg".to_string())
    }
}

fn content_type_for(name: &str) -> &'static str {
    let lower = name.to_lowercase();
    if lower.ends_with(".png") {
        "image/png"
    } else if lower.ends_with(".gif") {
        "image/gif"
    } else if lower.ends_with(".webp") {
        "image/webp"
    } else if lower.ends_with(".heic") {
        "image/heic"
    } else {
        "image/jpeg"
    }
}

/// Options applied to every upload
#[derive(Debug, Clone)]
pub struct UploadOptions {
    /// The cache control header value
    pub cache_control: String,

    /// Whether to overwrite an existing object at the same key
    pub upsert: bool,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            cache_control: "3600".to_string(),
            upsert: false,
        }
    }
}

/// One file that did not make it to the media host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedUpload {
    pub name: String,
    pub reason: String,
}

/// Outcome of uploading several files one after another
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadBatch {
    /// Public URLs, in the order the files were given
    pub uploaded: Vec<String>,

    /// Files that failed, in the order they were given
    pub failed: Vec<FailedUpload>,
}

impl UploadBatch {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// True when files were given and none of them uploaded
    pub fn is_total_failure(&self) -> bool {
        self.uploaded.is_empty() && !self.failed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_follows_extension() {
        assert_eq!(MediaFile::new("a.PNG", vec![1u8]).content_type, "image/png");
        assert_eq!(MediaFile::new("photo", vec![1u8]).content_type, "image/jpeg");
        assert_eq!(MediaFile::new("photo", vec![1u8]).extension(), "jpg");
    }

    #[test]
    fn batch_failure_states() {
        let mut batch = UploadBatch::default();
        assert!(batch.is_complete());
        assert!(!batch.is_total_failure());

        batch.failed.push(FailedUpload {
            name: "a.jpg".into(),
            reason: "timeout".into(),
        });
        assert!(batch.is_total_failure());

        batch.uploaded.push("https://cdn/b.jpg".into());
        assert!(!batch.is_total_failure());
        assert!(!batch.is_complete());
    }
}
