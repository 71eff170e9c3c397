//! Session data returned by the identity provider

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::AuthUser;

/// Session data
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    /// The access token
    pub access_token: String,

    /// The refresh token
    pub refresh_token: String,

    /// The token type
    #[serde(default = "default_token_type")]
    pub token_type: String,

    /// The expiry time in seconds
    pub expires_in: i64,

    /// The expiry timestamp (unix seconds)
    pub expires_at: Option<i64>,

    /// The authenticated user
    pub user: AuthUser,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl Session {
    /// Create a new session expiring `expires_in` seconds from now
    pub fn new(access_token: String, refresh_token: String, user: AuthUser, expires_in: i64) -> Self {
        Self {
            access_token,
            refresh_token,
            token_type: default_token_type(),
            expires_in,
            expires_at: Some(Utc::now().timestamp() + expires_in),
            user,
        }
    }

    /// Check if the session has expired
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => Utc::now().timestamp() >= expires_at,
            None => false,
        }
    }

    /// The user id the session was issued for
    pub fn user_id(&self) -> &str {
        &self.user.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_session_is_not_expired() {
        let session = Session::new("a".into(), "r".into(), AuthUser::new("u1", "a@b.c"), 3600);
        assert!(!session.is_expired());
        assert_eq!(session.user_id(), "u1");
    }

    #[test]
    fn past_expiry_is_expired() {
        let mut session = Session::new("a".into(), "r".into(), AuthUser::new("u1", "a@b.c"), 3600);
        session.expires_at = Some(Utc::now().timestamp() - 1);
        assert!(session.is_expired());
    }
}
