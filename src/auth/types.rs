//! Types for authentication and user management

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::Session;
use crate::models::UserType;

/// User record as held by the identity provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthUser {
    /// The user ID
    pub id: String,

    /// The user's email address
    pub email: Option<String>,

    /// Server-controlled metadata; not writable by the user
    #[serde(default)]
    pub app_metadata: Map<String, Value>,

    /// Metadata supplied by the user at signup
    #[serde(default)]
    pub user_metadata: Map<String, Value>,

    /// When the email was confirmed
    pub email_confirmed_at: Option<String>,

    /// The last sign-in time
    pub last_sign_in_at: Option<String>,

    /// The creation time
    pub created_at: Option<String>,
}

impl AuthUser {
    /// Bare user with only id and email set
    pub fn new(id: &str, email: &str) -> Self {
        Self {
            id: id.to_string(),
            email: Some(email.to_string()),
            app_metadata: Map::new(),
            user_metadata: Map::new(),
            email_confirmed_at: None,
            last_sign_in_at: None,
            created_at: None,
        }
    }

    /// User type the account declared for itself at signup.
    ///
    /// Only suitable for routing. Anything unrecognised reads as a citizen.
    pub fn declared_user_type(&self) -> UserType {
        self.user_metadata
            .get("user_type")
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }

    /// Role granted by the backend through `app_metadata.user_type`.
    ///
    /// This is the only value permission checks consult.
    pub fn verified_role(&self) -> UserType {
        self.app_metadata
            .get("user_type")
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
            .unwrap_or(UserType::Citizen)
    }

    /// Whether the email address has been confirmed
    pub fn is_email_confirmed(&self) -> bool {
        self.email_confirmed_at.is_some()
    }
}

/// Metadata embedded into the identity record at signup
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UserMetadata {
    pub user_type: UserType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
}

/// Result of account creation.
///
/// `session` is absent when the project requires email confirmation first.
#[derive(Debug, Clone, PartialEq)]
pub struct SignUpResponse {
    pub user: AuthUser,
    pub session: Option<Session>,
}

impl SignUpResponse {
    /// Normalises the two shapes `/signup` answers with
    pub(crate) fn from_value(value: Value) -> crate::error::Result<Self> {
        if value.get("access_token").is_some() {
            let session: Session = serde_json::from_value(value)?;
            return Ok(Self {
                user: session.user.clone(),
                session: Some(session),
            });
        }
        let user_value = match value.get("user") {
            Some(user) => user.clone(),
            None => value,
        };
        Ok(Self {
            user: serde_json::from_value(user_value)?,
            session: None,
        })
    }
}
