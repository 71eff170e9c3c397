use chrono::Utc;
use log::{debug, error, info, warn};
use serde_json::json;

use super::{decode_all, first, validate_email, validate_phone};
use crate::auth::{AuthUser, Session, UserMetadata};
use crate::context::RequestContext;
use crate::error::{Error, Result};
use crate::models::{NewProfile, Profile, ProfileUpdate, UserType};
use crate::postgrest::{Filter, Query, Table};
use crate::CivicClient;

const MIN_PASSWORD_LEN: usize = 6;

/// Everything the signup form collects
#[derive(Debug, Clone, PartialEq)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub user_type: UserType,
    pub full_name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
}

impl SignUpRequest {
    pub fn new(email: &str, password: &str, user_type: UserType) -> Self {
        Self {
            email: email.trim().to_string(),
            password: password.to_string(),
            user_type,
            full_name: None,
            first_name: None,
            last_name: None,
            phone: None,
            address: None,
            city: None,
            state: None,
            postal_code: None,
        }
    }

    /// Set the display name; first and last name are split from it
    pub fn with_name(mut self, full_name: &str) -> Self {
        let full_name = full_name.trim();
        let mut parts = full_name.splitn(2, ' ');
        self.first_name = parts.next().filter(|s| !s.is_empty()).map(str::to_string);
        self.last_name = parts.next().map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        self.full_name = Some(full_name.to_string()).filter(|s| !s.is_empty());
        self
    }

    pub fn with_phone(mut self, phone: &str) -> Self {
        self.phone = Some(phone.trim().to_string());
        self
    }

    pub fn with_address(mut self, address: &str, city: &str, state: &str, postal_code: &str) -> Self {
        self.address = Some(address.to_string());
        self.city = Some(city.to_string());
        self.state = Some(state.to_string());
        self.postal_code = Some(postal_code.to_string());
        self
    }

    /// Client-side checks; no network call is made when this fails
    pub fn validate(&self) -> Result<()> {
        if self.email.is_empty() || self.password.is_empty() {
            return Err(Error::validation("Email and password are required"));
        }
        validate_email(&self.email)?;
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(Error::validation(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }
        if let Some(phone) = self.phone.as_deref().filter(|p| !p.is_empty()) {
            validate_phone(phone)?;
        }
        Ok(())
    }

    fn profile_for(&self, user_id: &str) -> NewProfile {
        NewProfile {
            id: user_id.to_string(),
            email: self.email.clone(),
            user_type: self.user_type,
            full_name: self.full_name.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            phone: self.phone.clone(),
            address: self.address.clone(),
            city: self.city.clone(),
            state: self.state.clone(),
            postal_code: self.postal_code.clone(),
            is_verified: false,
            created_at: Utc::now(),
        }
    }
}

/// Result of a completed signup
#[derive(Debug, Clone, PartialEq)]
pub struct SignUpOutcome {
    pub user: AuthUser,
    /// Absent when the project requires email confirmation first
    pub session: Option<Session>,
    pub profile: Profile,
}

/// Result of a sign-in
#[derive(Debug, Clone, PartialEq)]
pub struct SignInOutcome {
    pub user: AuthUser,
    pub session: Session,
    /// The profile as stamped with the login time; `None` if the stamp failed
    pub profile: Option<Profile>,
}

impl SignInOutcome {
    /// Request context acting as the signed-in user
    pub fn context(&self) -> RequestContext {
        RequestContext::authenticated(self.session.clone())
    }
}

/// Where the app lands after sign-in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HomeRoute {
    CitizenTabs,
    AdminDashboard,
    TenderDashboard,
}

impl HomeRoute {
    /// Routing uses the declared user type; it grants no permissions
    pub fn for_user(user: &AuthUser) -> Self {
        match user.declared_user_type() {
            UserType::Citizen => HomeRoute::CitizenTabs,
            UserType::Administrator => HomeRoute::AdminDashboard,
            UserType::Contractor => HomeRoute::TenderDashboard,
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            HomeRoute::CitizenTabs => "/(tabs)",
            HomeRoute::AdminDashboard => "/admin-dashboard",
            HomeRoute::TenderDashboard => "/tender-dashboard",
        }
    }
}

/// Account and profile operations
pub struct Accounts<'a> {
    client: &'a CivicClient,
}

impl<'a> Accounts<'a> {
    pub(crate) fn new(client: &'a CivicClient) -> Self {
        Self { client }
    }

    /// Create an identity, then its profile row.
    ///
    /// If the profile insert fails the identity is deleted again and any
    /// session signed out. When that rollback fails too, the result is
    /// `Error::PartialFailure` carrying both errors.
    pub async fn sign_up(&self, request: SignUpRequest) -> Result<SignUpOutcome> {
        request.validate()?;
        debug!("Signing up {} as {}", request.email, request.user_type);

        let metadata = UserMetadata {
            user_type: request.user_type,
            full_name: request.full_name.clone(),
        };
        let created = self
            .client
            .identity
            .sign_up(&request.email, &request.password, &metadata)
            .await?;

        let ctx = match &created.session {
            Some(session) => RequestContext::authenticated(session.clone()),
            None => RequestContext::anonymous(),
        };
        let row = serde_json::to_value(request.profile_for(&created.user.id))?;

        match self.client.store.insert(&ctx, Table::Profiles, row).await {
            Ok(profile) => {
                info!("Created account {} ({})", created.user.id, request.user_type);
                Ok(SignUpOutcome {
                    user: created.user,
                    session: created.session,
                    profile: serde_json::from_value(profile)?,
                })
            }
            Err(err) => {
                warn!("Profile insert for {} failed, rolling back: {}", created.user.id, err);
                Err(self.roll_back_identity(&created.user.id, created.session.as_ref(), err).await)
            }
        }
    }

    async fn roll_back_identity(&self, user_id: &str, session: Option<&Session>, cause: Error) -> Error {
        let deleted = self.client.identity.delete_user(user_id).await;
        if let Some(session) = session {
            if let Err(err) = self.client.identity.sign_out(session).await {
                debug!("Sign-out during rollback failed: {}", err);
            }
        }
        match deleted {
            Ok(()) => {
                info!("Rolled back identity {}", user_id);
                cause
            }
            Err(compensation) => {
                error!("Could not delete orphaned identity {}: {}", user_id, compensation);
                Error::PartialFailure {
                    step: "profile insert",
                    source: Box::new(cause),
                    compensation: Some(Box::new(compensation)),
                }
            }
        }
    }

    /// Exchange credentials for a session and stamp `last_login_at`.
    ///
    /// The stamp is best-effort; its failure does not fail the sign-in.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<SignInOutcome> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(Error::validation("Please fill in all fields"));
        }
        let session = self
            .client
            .identity
            .sign_in_with_password(email.trim(), password)
            .await?;
        info!("Signed in {}", session.user_id());

        let ctx = RequestContext::authenticated(session.clone());
        let stamp = self
            .client
            .store
            .update(
                &ctx,
                Table::Profiles,
                &[Filter::eq("id", session.user_id())],
                json!({ "last_login_at": Utc::now() }),
            )
            .await;
        let profile = match stamp.and_then(|rows| first::<Profile>(rows, "profile")) {
            Ok(profile) => Some(profile),
            Err(err) => {
                warn!("Could not stamp last login for {}: {}", session.user_id(), err);
                None
            }
        };

        Ok(SignInOutcome {
            user: session.user.clone(),
            session,
            profile,
        })
    }

    pub async fn sign_out(&self, ctx: &RequestContext) -> Result<()> {
        let session = ctx.require_session()?;
        self.client.identity.sign_out(session).await?;
        info!("Signed out {}", session.user_id());
        Ok(())
    }

    /// The caller as the identity provider currently sees them
    pub async fn current_user(&self, ctx: &RequestContext) -> Result<AuthUser> {
        self.client.resolve_actor(ctx).await
    }

    pub async fn refresh_session(&self, session: &Session) -> Result<Session> {
        self.client
            .identity
            .refresh_session(&session.refresh_token)
            .await
    }

    pub async fn resend_verification(&self, email: &str) -> Result<()> {
        validate_email(email)?;
        self.client.identity.resend_verification(email.trim()).await
    }

    pub async fn get_profile(&self, ctx: &RequestContext, user_id: &str) -> Result<Profile> {
        let rows = self
            .client
            .store
            .select(ctx, Table::Profiles, &Query::new().eq("id", user_id).limit(1))
            .await?;
        first(rows, format!("profile {}", user_id))
    }

    /// Update the caller's own profile
    pub async fn update_profile(&self, ctx: &RequestContext, update: ProfileUpdate) -> Result<Profile> {
        if update.is_empty() {
            return Err(Error::validation("Nothing to update"));
        }
        if let Some(phone) = update.phone.as_deref().filter(|p| !p.is_empty()) {
            validate_phone(phone)?;
        }
        let actor = self.client.resolve_actor(ctx).await?;
        let rows = self
            .client
            .store
            .update(
                ctx,
                Table::Profiles,
                &[Filter::eq("id", &actor.id)],
                serde_json::to_value(&update)?,
            )
            .await?;
        info!("Updated profile {}", actor.id);
        first(rows, format!("profile {}", actor.id))
    }

    /// All profiles, newest first; administrators only
    pub async fn list_profiles(&self, ctx: &RequestContext) -> Result<Vec<Profile>> {
        self.client.require_role(ctx, UserType::Administrator).await?;
        let rows = self
            .client
            .store
            .select(ctx, Table::Profiles, &Query::new().newest_first())
            .await?;
        decode_all(rows)
    }

    /// Grant a verified role to another account; administrators only.
    ///
    /// The claim lives with the identity provider. The profile's displayed
    /// type follows it on a best-effort basis.
    pub async fn grant_role(&self, ctx: &RequestContext, user_id: &str, role: UserType) -> Result<AuthUser> {
        let admin = self
            .client
            .require_role(ctx, UserType::Administrator)
            .await?;
        let user = self.client.identity.grant_role(user_id, role).await?;
        info!("{} granted {} to {}", admin.id, role, user_id);

        let synced = self
            .client
            .store
            .update(
                ctx,
                Table::Profiles,
                &[Filter::eq("id", user_id)],
                json!({ "user_type": role }),
            )
            .await;
        match synced {
            Ok(rows) if rows.is_empty() => warn!("No profile for {} to record {}", user_id, role),
            Ok(_) => {}
            Err(err) => warn!("Could not record {} on profile {}: {}", role, user_id, err),
        }
        Ok(user)
    }

    pub fn home_route(&self, user: &AuthUser) -> HomeRoute {
        HomeRoute::for_user(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user_declaring(user_type: &str) -> AuthUser {
        serde_json::from_value(json!({
            "id": "u1",
            "user_metadata": { "user_type": user_type }
        }))
        .unwrap()
    }

    #[test]
    fn routes_follow_declared_type() {
        assert_eq!(HomeRoute::for_user(&user_declaring("citizen")), HomeRoute::CitizenTabs);
        assert_eq!(HomeRoute::for_user(&user_declaring("user")), HomeRoute::CitizenTabs);
        assert_eq!(HomeRoute::for_user(&user_declaring("admin")), HomeRoute::AdminDashboard);
        assert_eq!(HomeRoute::for_user(&user_declaring("tender")), HomeRoute::TenderDashboard);
        assert_eq!(HomeRoute::TenderDashboard.path(), "/tender-dashboard");
    }

    #[test]
    fn signup_request_checks() {
        assert!(SignUpRequest::new("", "secret1", UserType::Citizen).validate().is_err());
        assert!(SignUpRequest::new("a@b.co", "123", UserType::Citizen).validate().is_err());
        assert!(SignUpRequest::new("a@b.co", "secret1", UserType::Citizen)
            .with_phone("12")
            .validate()
            .is_err());
        assert!(SignUpRequest::new("a@b.co", "secret1", UserType::Citizen)
            .with_phone("+91 98450 12345")
            .validate()
            .is_ok());
    }

    #[test]
    fn name_is_split() {
        let request = SignUpRequest::new("a@b.co", "secret1", UserType::Citizen).with_name("Asha Rao Kumar");
        assert_eq!(request.first_name.as_deref(), Some("Asha"));
        assert_eq!(request.last_name.as_deref(), Some("Rao Kumar"));
        assert_eq!(request.full_name.as_deref(), Some("Asha Rao Kumar"));
    }
}
