//! Configuration for the civic-connect client

use std::time::Duration;
use url::Url;

use crate::error::{Error, Result};

const DEFAULT_MEDIA_BUCKET: &str = "issue-images";
const DEFAULT_GEOCODER_URL: &str = "https://nominatim.openstreetmap.org";

/// Endpoint and credential configuration, usually loaded from the environment
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the Supabase project
    pub url: Url,
    /// Anonymous (publishable) API key
    pub anon_key: String,
    /// Service role key, needed only for the signup rollback
    pub service_role_key: Option<String>,
    /// Storage bucket holding issue images
    pub media_bucket: String,
    /// Base URL of the reverse geocoding service
    pub geocoder_url: Url,
}

impl Config {
    /// Creates a new configuration, validating the URL and key.
    pub fn new(url_str: &str, anon_key: impl Into<String>) -> Result<Self> {
        let url = Url::parse(url_str)?;
        let anon_key = anon_key.into();
        if anon_key.is_empty() {
            return Err(Error::config("anon_key cannot be empty"));
        }
        Ok(Self {
            url,
            anon_key,
            service_role_key: None,
            media_bucket: DEFAULT_MEDIA_BUCKET.to_string(),
            geocoder_url: Url::parse(DEFAULT_GEOCODER_URL)?,
        })
    }

    /// Reads `SUPABASE_URL`, `SUPABASE_ANON_KEY` and the optional overrides.
    pub fn from_env() -> Result<Self> {
        let url_str = std::env::var("SUPABASE_URL")
            .map_err(|_| Error::config("SUPABASE_URL environment variable not found"))?;
        let anon_key = std::env::var("SUPABASE_ANON_KEY")
            .map_err(|_| Error::config("SUPABASE_ANON_KEY environment variable not found"))?;

        let mut config = Self::new(&url_str, anon_key)?;
        if let Ok(key) = std::env::var("SUPABASE_SERVICE_ROLE_KEY") {
            if !key.is_empty() {
                config.service_role_key = Some(key);
            }
        }
        if let Ok(bucket) = std::env::var("CIVIC_MEDIA_BUCKET") {
            config.media_bucket = bucket;
        }
        if let Ok(geocoder) = std::env::var("CIVIC_GEOCODER_URL") {
            config.geocoder_url = Url::parse(&geocoder)?;
        }
        Ok(config)
    }

    /// Set the service role key
    pub fn with_service_role_key(mut self, key: &str) -> Self {
        self.service_role_key = Some(key.to_string());
        self
    }

    /// Set the media bucket
    pub fn with_media_bucket(mut self, bucket: &str) -> Self {
        self.media_bucket = bucket.to_string();
        self
    }

    /// Set the geocoder base URL
    pub fn with_geocoder_url(mut self, url: &str) -> Result<Self> {
        self.geocoder_url = Url::parse(url)?;
        Ok(self)
    }

    /// Project base URL without a trailing slash
    pub fn base_url(&self) -> String {
        self.url.as_str().trim_end_matches('/').to_string()
    }
}

/// How issue vote and comment counters are kept in sync with their rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterSync {
    /// Store triggers recount in the same transaction as the row change
    StoreManaged,
    /// The client counts rows after each mutation and writes the totals back
    Recount,
}

/// What to do when only some images of a report upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadPolicy {
    /// Submit with the images that made it, reporting the rest
    AllowPartial,
    /// Any failed image aborts the submission
    AllOrNothing,
}

/// Behavioural options for the client
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// The request timeout
    pub request_timeout: Option<Duration>,

    /// Counter maintenance strategy
    pub counter_sync: CounterSync,

    /// Image upload failure policy
    pub upload_policy: UploadPolicy,

    /// The database schema
    pub db_schema: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            request_timeout: Some(Duration::from_secs(30)),
            counter_sync: CounterSync::StoreManaged,
            upload_policy: UploadPolicy::AllowPartial,
            db_schema: "public".to_string(),
        }
    }
}

impl ClientOptions {
    /// Set the request timeout
    pub fn with_request_timeout(mut self, value: Option<Duration>) -> Self {
        self.request_timeout = value;
        self
    }

    /// Set the counter sync strategy
    pub fn with_counter_sync(mut self, value: CounterSync) -> Self {
        self.counter_sync = value;
        self
    }

    /// Set the upload policy
    pub fn with_upload_policy(mut self, value: UploadPolicy) -> Self {
        self.upload_policy = value;
        self
    }

    /// Set the database schema
    pub fn with_db_schema(mut self, value: &str) -> Self {
        self.db_schema = value.to_string();
        self
    }
}
