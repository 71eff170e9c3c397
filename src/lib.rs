//! Civic issue reporting client
//!
//! Citizens report local infrastructure problems, vote and comment on them,
//! and follow a community feed and leaderboard; administrators triage issues
//! and post tenders; contractors bid. All state lives in a Supabase project
//! (auth, PostgREST, storage) plus a reverse geocoder; this crate is the typed
//! data access and workflow layer over those collaborators.

pub mod api;
pub mod auth;
pub mod config;
pub mod context;
pub mod error;
pub mod fetch;
pub mod geocode;
pub mod heatmap;
pub mod leaderboard;
pub mod lifecycle;
pub mod memory;
pub mod models;
pub mod postgrest;
pub mod report;
pub mod storage;

use std::sync::Arc;

use reqwest::Client;

use crate::api::{
    Accounts, Community, FeedbackApi, HeatmapApi, Issues, LeaderboardApi, Notifications,
    Officials, Tenders,
};
use crate::auth::{GoTrueAuth, IdentityProvider};
use crate::config::{ClientOptions, Config};
use crate::geocode::{Geocoder, NominatimGeocoder};
use crate::postgrest::{PostgrestStore, RecordStore};
use crate::report::LocationCapture;
use crate::storage::{MediaHost, StorageMediaHost};

/// The main entry point: one handle per screen family over shared collaborators
pub struct CivicClient {
    pub(crate) identity: Arc<dyn IdentityProvider>,
    pub(crate) store: Arc<dyn RecordStore>,
    pub(crate) media: Arc<dyn MediaHost>,
    pub(crate) geocoder: Arc<dyn Geocoder>,
    pub(crate) options: ClientOptions,
}

impl CivicClient {
    /// Create a client talking to the Supabase project in `config`
    ///
    /// # Example
    ///
    /// ```
    /// use civic_connect::{CivicClient, config::Config};
    ///
    /// let config = Config::new("https://your-project-url.supabase.co", "your-anon-key").unwrap();
    /// let client = CivicClient::new(config);
    /// ```
    pub fn new(config: Config) -> Self {
        Self::new_with_options(config, ClientOptions::default())
    }

    /// Create a client with custom options
    pub fn new_with_options(config: Config, options: ClientOptions) -> Self {
        let http_client = Client::new();
        let url = config.base_url();
        let timeout = options.request_timeout;

        let identity = GoTrueAuth::new(&url, &config.anon_key, http_client.clone())
            .with_service_role_key(config.service_role_key.clone())
            .with_timeout(timeout);
        let store = PostgrestStore::new(&url, &config.anon_key, http_client.clone())
            .with_schema(&options.db_schema)
            .with_timeout(timeout);
        let media = StorageMediaHost::new(
            &url,
            &config.anon_key,
            &config.media_bucket,
            http_client.clone(),
        )
        .with_timeout(timeout);
        let geocoder =
            NominatimGeocoder::new(config.geocoder_url.as_str(), http_client).with_timeout(timeout);

        Self::with_backends(
            Arc::new(identity),
            Arc::new(store),
            Arc::new(media),
            Arc::new(geocoder),
            options,
        )
    }

    /// Create a client over arbitrary collaborators, such as the in-memory ones
    pub fn with_backends(
        identity: Arc<dyn IdentityProvider>,
        store: Arc<dyn RecordStore>,
        media: Arc<dyn MediaHost>,
        geocoder: Arc<dyn Geocoder>,
        options: ClientOptions,
    ) -> Self {
        Self {
            identity,
            store,
            media,
            geocoder,
            options,
        }
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Sign up, sign in, sessions and profiles
    pub fn accounts(&self) -> Accounts<'_> {
        Accounts::new(self)
    }

    /// Issue reports, voting and comments
    pub fn issues(&self) -> Issues<'_> {
        Issues::new(self)
    }

    pub fn community(&self) -> Community<'_> {
        Community::new(self)
    }

    pub fn tenders(&self) -> Tenders<'_> {
        Tenders::new(self)
    }

    pub fn feedback(&self) -> FeedbackApi<'_> {
        FeedbackApi::new(self)
    }

    pub fn notifications(&self) -> Notifications<'_> {
        Notifications::new(self)
    }

    pub fn officials(&self) -> Officials<'_> {
        Officials::new(self)
    }

    pub fn leaderboard(&self) -> LeaderboardApi<'_> {
        LeaderboardApi::new(self)
    }

    pub fn heatmap(&self) -> HeatmapApi<'_> {
        HeatmapApi::new(self)
    }

    /// Location capture for the report form, using this client's geocoder
    pub fn location_capture(&self) -> LocationCapture<'_> {
        LocationCapture::new(self.geocoder.as_ref())
    }
}

/// A convenience module for common imports
pub mod prelude {
    pub use crate::api::{HomeRoute, IssueSubmission, SignInOutcome, SignUpRequest, VoteOutcome};
    pub use crate::config::{ClientOptions, Config, CounterSync, UploadPolicy};
    pub use crate::context::RequestContext;
    pub use crate::error::{Error, Result};
    pub use crate::models::*;
    pub use crate::report::{Coordinates, IssueDraft, LocationFields, MapPick};
    pub use crate::storage::MediaFile;
    pub use crate::CivicClient;
}
