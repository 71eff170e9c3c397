//! Data access layer
//!
//! Each handle borrows the [`CivicClient`] and groups the operations of one
//! screen family. Every operation returns `Result<T>`; failures never escape
//! as panics. Operations that act on behalf of a user re-resolve the caller
//! from the context's access token instead of trusting a supplied user id.

mod accounts;
mod community;
mod feedback;
mod heatmap;
mod issues;
mod leaderboard;
mod notifications;
mod officials;
mod tenders;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::auth::AuthUser;
use crate::context::RequestContext;
use crate::error::{Error, Result};
use crate::models::UserType;
use crate::CivicClient;

pub use accounts::*;
pub use community::*;
pub use feedback::*;
pub use heatmap::*;
pub use issues::*;
pub use leaderboard::*;
pub use notifications::*;
pub use officials::*;
pub use tenders::*;

/// Reporter/author columns embedded into list reads
pub(crate) const PROFILE_SUMMARY: &str = "full_name,email,user_type";

impl CivicClient {
    /// The signed-in caller, as the identity provider sees them right now
    pub(crate) async fn resolve_actor(&self, ctx: &RequestContext) -> Result<AuthUser> {
        let session = ctx.require_session()?;
        self.identity.get_user(&session.access_token).await
    }

    /// Resolve the caller and require a verified role
    pub(crate) async fn require_role(&self, ctx: &RequestContext, role: UserType) -> Result<AuthUser> {
        let user = self.resolve_actor(ctx).await?;
        if user.verified_role() != role {
            return Err(Error::forbidden(format!(
                "this action requires the {} role",
                role
            )));
        }
        Ok(user)
    }
}

pub(crate) fn decode<T: DeserializeOwned>(row: Value) -> Result<T> {
    Ok(serde_json::from_value(row)?)
}

pub(crate) fn decode_all<T: DeserializeOwned>(rows: Vec<Value>) -> Result<Vec<T>> {
    rows.into_iter().map(decode).collect()
}

/// First row, or `NotFound` naming what was looked up
pub(crate) fn first<T: DeserializeOwned>(rows: Vec<Value>, what: impl std::fmt::Display) -> Result<T> {
    match rows.into_iter().next() {
        Some(row) => decode(row),
        None => Err(Error::not_found(what)),
    }
}

/// Trimmed text, or a validation error naming the field
pub(crate) fn require_text<'a>(value: &'a str, field: &str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(Error::validation(format!("{} is required", field)))
    } else {
        Ok(trimmed)
    }
}

pub(crate) fn validate_email(email: &str) -> Result<()> {
    let email = email.trim();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(Error::validation("Please enter a valid email address"))
    }
}

/// 10 to 15 digits, allowing a leading `+` and common separators
pub(crate) fn validate_phone(phone: &str) -> Result<()> {
    let phone = phone.trim();
    let allowed = phone
        .chars()
        .enumerate()
        .all(|(i, c)| c.is_ascii_digit() || matches!(c, ' ' | '-' | '(' | ')') || (c == '+' && i == 0));
    let digits = phone.chars().filter(char::is_ascii_digit).count();
    if allowed && (10..=15).contains(&digits) {
        Ok(())
    } else {
        Err(Error::validation("Please enter a valid phone number"))
    }
}
