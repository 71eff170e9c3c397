//! Media host for issue images

mod types;

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{multipart, Client};
use uuid::Uuid;

use crate::context::RequestContext;
use crate::error::{Error, Result};
use crate::fetch::error_message;

pub use types::*;

/// Accepts uploaded images and hands back stable public URLs
#[async_trait]
pub trait MediaHost: Send + Sync {
    /// Upload one file, returning its public URL
    async fn upload(&self, ctx: &RequestContext, file: &MediaFile) -> Result<String>;

    /// Upload files one after another.
    ///
    /// A failed file does not stop the rest; the batch records both outcomes.
    async fn upload_many(&self, ctx: &RequestContext, files: &[MediaFile]) -> UploadBatch {
        let mut batch = UploadBatch::default();
        for file in files {
            match self.upload(ctx, file).await {
                Ok(url) => batch.uploaded.push(url),
                Err(err) => {
                    warn!("Upload of {} failed: {}", file.name, err);
                    batch.failed.push(FailedUpload {
                        name: file.name.clone(),
                        reason: err.to_string(),
                    });
                }
            }
        }
        batch
    }
}

/// Media host backed by a public Supabase Storage bucket
pub struct StorageMediaHost {
    /// The base URL for the Supabase project
    url: String,

    /// The anonymous API key for the Supabase project
    key: String,

    /// Bucket objects are written to
    bucket: String,

    /// HTTP client used for requests
    client: Client,

    options: UploadOptions,
    timeout: Option<Duration>,
}

impl StorageMediaHost {
    /// Create a new media host for `bucket`
    pub fn new(url: &str, key: &str, bucket: &str, client: Client) -> Self {
        Self {
            url: url.trim_end_matches('/').to_string(),
            key: key.to_string(),
            bucket: bucket.to_string(),
            client,
            options: UploadOptions::default(),
            timeout: None,
        }
    }

    /// Set the upload options
    pub fn with_options(mut self, options: UploadOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the per-request timeout
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Get the public URL for an object key
    pub fn public_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.url, self.bucket, path
        )
    }

    /// Object key for a new upload: `issues/<owner>/<uuid>.<ext>`
    fn object_path(&self, ctx: &RequestContext, file: &MediaFile) -> String {
        let owner = ctx
            .session()
            .map(|s| s.user_id().to_string())
            .unwrap_or_else(|| "anonymous".to_string());
        format!("issues/{}/{}.{}", owner, Uuid::new_v4(), file.extension())
    }
}

#[async_trait]
impl MediaHost for StorageMediaHost {
    async fn upload(&self, ctx: &RequestContext, file: &MediaFile) -> Result<String> {
        let path = self.object_path(ctx, file);
        let url = format!("{}/storage/v1/object/{}/{}", self.url, self.bucket, path);
        debug!("Uploading {} ({} bytes) to {}", file.name, file.bytes.len(), path);

        let part = multipart::Part::bytes(file.bytes.to_vec())
            .file_name(file.name.clone())
            .mime_str(&file.content_type)
            .map_err(|e| Error::upload(format!("invalid content type {}: {}", file.content_type, e)))?;
        let form = multipart::Form::new().part("file", part);

        let token = ctx.access_token().unwrap_or(&self.key);
        let mut request = self
            .client
            .post(&url)
            .header("apikey", &self.key)
            .header("Authorization", format!("Bearer {}", token))
            .header("Cache-Control", format!("max-age={}", self.options.cache_control))
            .header("x-upsert", self.options.upsert.to_string())
            .multipart(form);
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::upload(format!("{}: {}", file.name, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(Error::upload(format!(
                "{} rejected with status {}: {}",
                file.name,
                status.as_u16(),
                error_message(&text)
            )));
        }

        Ok(self.public_url(&path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_upload_returns_public_url() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path_regex(r"^/storage/v1/object/issue-images/issues/anonymous/[0-9a-f-]+\.png$"))
            .and(header("apikey", "anon"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "Key": "issue-images/issues/x.png" })),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let host = StorageMediaHost::new(&mock_server.uri(), "anon", "issue-images", Client::new());
        let url = host
            .upload(&RequestContext::anonymous(), &MediaFile::new("pothole.png", vec![1u8, 2, 3]))
            .await
            .unwrap();

        let prefix = format!("{}/storage/v1/object/public/issue-images/issues/anonymous/", mock_server.uri());
        assert!(url.starts_with(&prefix));
        assert!(url.ends_with(".png"));
    }

    #[tokio::test]
    async fn test_upload_many_keeps_going_after_failure() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path_regex(r"\.gif$"))
            .respond_with(
                ResponseTemplate::new(413).set_body_json(json!({ "error": "Payload too large" })),
            )
            .mount(&mock_server)
            .await;
        Mock::given(method("POST"))
            .and(path_regex(r"\.jpg$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "Key": "k" })))
            .mount(&mock_server)
            .await;

        let host = StorageMediaHost::new(&mock_server.uri(), "anon", "issue-images", Client::new());
        let files = vec![
            MediaFile::new("a.jpg", vec![1u8]),
            MediaFile::new("b.gif", vec![2u8]),
            MediaFile::new("c.jpg", vec![3u8]),
        ];
        let batch = host.upload_many(&RequestContext::anonymous(), &files).await;

        assert_eq!(batch.uploaded.len(), 2);
        assert_eq!(batch.failed.len(), 1);
        assert_eq!(batch.failed[0].name, "b.gif");
        assert!(batch.failed[0].reason.contains("Payload too large"));
    }
}
