//! Identity provider: accounts, sessions and verification

mod session;
mod types;

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde_json::{json, Value};

use crate::error::{Error, Result};
use crate::fetch::Fetch;
use crate::models::UserType;

pub use session::*;
pub use types::*;

/// Operations the app consumes from the identity provider
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create an account, embedding `metadata` into the identity record
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &UserMetadata,
    ) -> Result<SignUpResponse>;

    /// Exchange credentials for a session
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session>;

    /// Revoke the session
    async fn sign_out(&self, session: &Session) -> Result<()>;

    /// Resolve the user an access token belongs to
    async fn get_user(&self, access_token: &str) -> Result<AuthUser>;

    /// Trade a refresh token for a new session
    async fn refresh_session(&self, refresh_token: &str) -> Result<Session>;

    /// Send the signup confirmation email again
    async fn resend_verification(&self, email: &str) -> Result<()>;

    /// Remove an identity; requires elevated credentials
    async fn delete_user(&self, user_id: &str) -> Result<()>;

    /// Set the server-controlled role claim (`app_metadata.user_type`);
    /// requires elevated credentials
    async fn grant_role(&self, user_id: &str, role: UserType) -> Result<AuthUser>;
}

/// Client for the Supabase Auth (GoTrue) REST API
pub struct GoTrueAuth {
    /// The base URL for the Supabase project
    url: String,

    /// The anonymous API key for the Supabase project
    key: String,

    /// Service role key for admin endpoints
    service_role_key: Option<String>,

    /// HTTP client used for requests
    client: Client,

    /// Per-request timeout
    timeout: Option<Duration>,
}

impl GoTrueAuth {
    /// Create a new auth client
    pub fn new(url: &str, key: &str, client: Client) -> Self {
        Self {
            url: url.trim_end_matches('/').to_string(),
            key: key.to_string(),
            service_role_key: None,
            client,
            timeout: None,
        }
    }

    /// Enable admin endpoints with a service role key
    pub fn with_service_role_key(mut self, key: Option<String>) -> Self {
        self.service_role_key = key;
        self
    }

    /// Set the per-request timeout
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn get_auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1{}", self.url, path)
    }

    fn service_key(&self, action: &str) -> Result<&str> {
        self.service_role_key
            .as_deref()
            .ok_or_else(|| Error::auth(format!("{} requires the service role key", action)))
    }
}

/// Identity provider messages are surfaced verbatim as auth errors
fn into_auth_error(err: Error) -> Error {
    match err {
        Error::Api { message, .. } => Error::Auth(message),
        other => other,
    }
}

#[async_trait]
impl IdentityProvider for GoTrueAuth {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &UserMetadata,
    ) -> Result<SignUpResponse> {
        let url = self.get_auth_url("/signup");
        let body = json!({
            "email": email,
            "password": password,
            "data": metadata,
        });

        let value = Fetch::post(&self.client, &url)
            .api_key(&self.key)
            .timeout(self.timeout)
            .json(&body)?
            .execute::<Value>()
            .await
            .map_err(into_auth_error)?;

        SignUpResponse::from_value(value)
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session> {
        let url = self.get_auth_url("/token");
        let body = json!({ "email": email, "password": password });

        Fetch::post(&self.client, &url)
            .api_key(&self.key)
            .query_param("grant_type", "password")
            .timeout(self.timeout)
            .json(&body)?
            .execute::<Session>()
            .await
            .map_err(into_auth_error)
    }

    async fn sign_out(&self, session: &Session) -> Result<()> {
        let url = self.get_auth_url("/logout");

        Fetch::post(&self.client, &url)
            .api_key(&self.key)
            .bearer_auth(&session.access_token)
            .timeout(self.timeout)
            .execute_empty()
            .await
            .map_err(into_auth_error)
    }

    async fn get_user(&self, access_token: &str) -> Result<AuthUser> {
        let url = self.get_auth_url("/user");

        Fetch::get(&self.client, &url)
            .api_key(&self.key)
            .bearer_auth(access_token)
            .timeout(self.timeout)
            .execute::<AuthUser>()
            .await
            .map_err(into_auth_error)
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session> {
        let url = self.get_auth_url("/token");
        let body = json!({ "refresh_token": refresh_token });

        Fetch::post(&self.client, &url)
            .api_key(&self.key)
            .query_param("grant_type", "refresh_token")
            .timeout(self.timeout)
            .json(&body)?
            .execute::<Session>()
            .await
            .map_err(into_auth_error)
    }

    async fn resend_verification(&self, email: &str) -> Result<()> {
        let url = self.get_auth_url("/resend");
        let body = json!({ "type": "signup", "email": email });

        Fetch::post(&self.client, &url)
            .api_key(&self.key)
            .timeout(self.timeout)
            .json(&body)?
            .execute_empty()
            .await
            .map_err(into_auth_error)
    }

    async fn delete_user(&self, user_id: &str) -> Result<()> {
        let service_key = self.service_key("deleting a user")?;
        let url = self.get_auth_url(&format!("/admin/users/{}", user_id));
        debug!("Deleting identity {}", user_id);

        Fetch::delete(&self.client, &url)
            .api_key(service_key)
            .bearer_auth(service_key)
            .timeout(self.timeout)
            .execute_empty()
            .await
            .map_err(into_auth_error)
    }

    async fn grant_role(&self, user_id: &str, role: UserType) -> Result<AuthUser> {
        let service_key = self.service_key("granting a role")?;
        let url = self.get_auth_url(&format!("/admin/users/{}", user_id));
        let body = json!({ "app_metadata": { "user_type": role } });
        debug!("Granting {} to {}", role, user_id);

        Fetch::put(&self.client, &url)
            .api_key(service_key)
            .bearer_auth(service_key)
            .timeout(self.timeout)
            .json(&body)?
            .execute::<AuthUser>()
            .await
            .map_err(into_auth_error)
    }
}
