use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::{AuthUser, IdentityProvider, Session, SignUpResponse, UserMetadata};
use crate::error::{Error, Result};
use crate::models::UserType;

const SESSION_TTL_SECS: i64 = 3600;

struct Account {
    user: AuthUser,
    password: String,
}

#[derive(Default)]
struct Registry {
    accounts: HashMap<String, Account>,
    /// access token → user id
    access: HashMap<String, String>,
    /// refresh token → user id
    refresh: HashMap<String, String>,
    resent: Vec<String>,
}

/// Identity provider held in memory, with GoTrue's observable behaviour
pub struct MemoryIdentity {
    registry: RwLock<Registry>,
    confirm_email: bool,
    admin_enabled: bool,
}

impl Default for MemoryIdentity {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryIdentity {
    /// Accounts are confirmed on signup and the admin API is available
    pub fn new() -> Self {
        Self {
            registry: RwLock::new(Registry::default()),
            confirm_email: false,
            admin_enabled: true,
        }
    }

    /// Signup returns no session and sign-in is refused until [`MemoryIdentity::confirm`]
    pub fn requiring_confirmation(mut self) -> Self {
        self.confirm_email = true;
        self
    }

    /// Behave as if no service role key was configured
    pub fn without_admin(mut self) -> Self {
        self.admin_enabled = false;
        self
    }

    /// Mark an email address as confirmed
    pub fn confirm(&self, email: &str) -> bool {
        let mut registry = self.registry.write().unwrap_or_else(PoisonError::into_inner);
        match registry
            .accounts
            .values_mut()
            .find(|a| a.user.email.as_deref() == Some(email))
        {
            Some(account) => {
                account.user.email_confirmed_at = Some(now());
                true
            }
            None => false,
        }
    }

    /// Set the server-controlled role claim, as an operator would from the dashboard
    pub fn grant_role(&self, user_id: &str, role: UserType) -> bool {
        self.write_role(user_id, role).is_some()
    }

    fn write_role(&self, user_id: &str, role: UserType) -> Option<AuthUser> {
        let mut registry = self.registry.write().unwrap_or_else(PoisonError::into_inner);
        let account = registry.accounts.get_mut(user_id)?;
        account
            .user
            .app_metadata
            .insert("user_type".to_string(), json!(role.as_str()));
        Some(account.user.clone())
    }

    pub fn user_count(&self) -> usize {
        self.registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .accounts
            .len()
    }

    /// Emails a verification resend was requested for
    pub fn resent_verifications(&self) -> Vec<String> {
        self.registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .resent
            .clone()
    }

    fn issue_session(registry: &mut Registry, user: &AuthUser) -> Session {
        let access = format!("mem-access-{}", Uuid::new_v4());
        let refresh = format!("mem-refresh-{}", Uuid::new_v4());
        registry.access.insert(access.clone(), user.id.clone());
        registry.refresh.insert(refresh.clone(), user.id.clone());
        Session::new(access, refresh, user.clone(), SESSION_TTL_SECS)
    }
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[async_trait]
impl IdentityProvider for MemoryIdentity {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &UserMetadata,
    ) -> Result<SignUpResponse> {
        if password.len() < 6 {
            return Err(Error::auth("Password should be at least 6 characters"));
        }
        let mut registry = self.registry.write().unwrap_or_else(PoisonError::into_inner);
        if registry
            .accounts
            .values()
            .any(|a| a.user.email.as_deref() == Some(email))
        {
            return Err(Error::auth("User already registered"));
        }

        let mut user = AuthUser::new(&Uuid::new_v4().to_string(), email);
        user.created_at = Some(now());
        user.app_metadata
            .insert("provider".to_string(), json!("email"));
        // Mirrors the signup trigger: only self-service roles are claimed
        let claimed = match metadata.user_type {
            UserType::Contractor => UserType::Contractor,
            UserType::Citizen | UserType::Administrator => UserType::Citizen,
        };
        user.app_metadata
            .insert("user_type".to_string(), json!(claimed.as_str()));
        if let Value::Object(data) = serde_json::to_value(metadata)? {
            user.user_metadata = data;
        }
        if !self.confirm_email {
            user.email_confirmed_at = user.created_at.clone();
        }

        registry.accounts.insert(
            user.id.clone(),
            Account {
                user: user.clone(),
                password: password.to_string(),
            },
        );

        let session = if self.confirm_email {
            None
        } else {
            Some(Self::issue_session(&mut registry, &user))
        };
        Ok(SignUpResponse { user, session })
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session> {
        let mut registry = self.registry.write().unwrap_or_else(PoisonError::into_inner);
        let user = registry
            .accounts
            .values_mut()
            .find(|a| a.user.email.as_deref() == Some(email) && a.password == password)
            .map(|a| {
                a.user.last_sign_in_at = Some(now());
                a.user.clone()
            })
            .ok_or_else(|| Error::auth("Invalid login credentials"))?;
        if self.confirm_email && !user.is_email_confirmed() {
            return Err(Error::auth("Email not confirmed"));
        }
        Ok(Self::issue_session(&mut registry, &user))
    }

    async fn sign_out(&self, session: &Session) -> Result<()> {
        let mut registry = self.registry.write().unwrap_or_else(PoisonError::into_inner);
        registry.access.remove(&session.access_token);
        registry.refresh.remove(&session.refresh_token);
        Ok(())
    }

    async fn get_user(&self, access_token: &str) -> Result<AuthUser> {
        let registry = self.registry.read().unwrap_or_else(PoisonError::into_inner);
        registry
            .access
            .get(access_token)
            .and_then(|id| registry.accounts.get(id))
            .map(|a| a.user.clone())
            .ok_or_else(|| Error::auth("invalid JWT: unable to parse or verify signature"))
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session> {
        let mut registry = self.registry.write().unwrap_or_else(PoisonError::into_inner);
        let user_id = registry
            .refresh
            .remove(refresh_token)
            .ok_or_else(|| Error::auth("Invalid Refresh Token: Refresh Token Not Found"))?;
        let user = registry
            .accounts
            .get(&user_id)
            .map(|a| a.user.clone())
            .ok_or_else(|| Error::auth("User not found"))?;
        Ok(Self::issue_session(&mut registry, &user))
    }

    async fn resend_verification(&self, email: &str) -> Result<()> {
        let mut registry = self.registry.write().unwrap_or_else(PoisonError::into_inner);
        registry.resent.push(email.to_string());
        Ok(())
    }

    async fn delete_user(&self, user_id: &str) -> Result<()> {
        if !self.admin_enabled {
            return Err(Error::auth("deleting a user requires the service role key"));
        }
        let mut registry = self.registry.write().unwrap_or_else(PoisonError::into_inner);
        if registry.accounts.remove(user_id).is_none() {
            return Err(Error::auth("User not found"));
        }
        registry.access.retain(|_, id| id != user_id);
        registry.refresh.retain(|_, id| id != user_id);
        Ok(())
    }

    async fn grant_role(&self, user_id: &str, role: UserType) -> Result<AuthUser> {
        if !self.admin_enabled {
            return Err(Error::auth("granting a role requires the service role key"));
        }
        self.write_role(user_id, role)
            .ok_or_else(|| Error::auth("User not found"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn citizen() -> UserMetadata {
        UserMetadata {
            user_type: UserType::Citizen,
            full_name: Some("Asha".into()),
        }
    }

    #[tokio::test]
    async fn signup_then_sign_in() {
        let identity = MemoryIdentity::new();
        let created = identity.sign_up("a@b.c", "secret1", &citizen()).await.unwrap();
        assert!(created.session.is_some());
        assert_eq!(created.user.declared_user_type(), UserType::Citizen);

        let session = identity.sign_in_with_password("a@b.c", "secret1").await.unwrap();
        let user = identity.get_user(&session.access_token).await.unwrap();
        assert_eq!(user.id, created.user.id);

        identity.sign_out(&session).await.unwrap();
        assert!(identity.get_user(&session.access_token).await.is_err());
    }

    #[tokio::test]
    async fn duplicate_email_and_bad_password() {
        let identity = MemoryIdentity::new();
        identity.sign_up("a@b.c", "secret1", &citizen()).await.unwrap();
        match identity.sign_up("a@b.c", "secret1", &citizen()).await {
            Err(Error::Auth(msg)) => assert_eq!(msg, "User already registered"),
            other => panic!("Expected Auth error, got {:?}", other),
        }
        match identity.sign_in_with_password("a@b.c", "wrong").await {
            Err(Error::Auth(msg)) => assert_eq!(msg, "Invalid login credentials"),
            other => panic!("Expected Auth error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn confirmation_gate() {
        let identity = MemoryIdentity::new().requiring_confirmation();
        let created = identity.sign_up("a@b.c", "secret1", &citizen()).await.unwrap();
        assert!(created.session.is_none());
        assert!(identity.sign_in_with_password("a@b.c", "secret1").await.is_err());
        assert!(identity.confirm("a@b.c"));
        assert!(identity.sign_in_with_password("a@b.c", "secret1").await.is_ok());
    }

    #[tokio::test]
    async fn refresh_rotates_tokens() {
        let identity = MemoryIdentity::new();
        let session = identity
            .sign_up("a@b.c", "secret1", &citizen())
            .await
            .unwrap()
            .session
            .unwrap();
        let next = identity.refresh_session(&session.refresh_token).await.unwrap();
        assert_ne!(next.access_token, session.access_token);
        assert!(identity.refresh_session(&session.refresh_token).await.is_err());
    }

    #[tokio::test]
    async fn role_comes_from_grant_only() {
        let identity = MemoryIdentity::new();
        let admin = UserMetadata {
            user_type: UserType::Administrator,
            full_name: None,
        };
        let created = identity.sign_up("boss@city.gov", "secret1", &admin).await.unwrap();
        assert_eq!(created.user.verified_role(), UserType::Citizen);

        identity.grant_role(&created.user.id, UserType::Administrator);
        let token = created.session.unwrap().access_token;
        let user = identity.get_user(&token).await.unwrap();
        assert_eq!(user.verified_role(), UserType::Administrator);
    }

    #[tokio::test]
    async fn contractors_claim_their_role_at_signup() {
        let identity = MemoryIdentity::new();
        let contractor = UserMetadata {
            user_type: UserType::Contractor,
            full_name: None,
        };
        let created = identity.sign_up("crew@example.com", "secret1", &contractor).await.unwrap();
        assert_eq!(created.user.verified_role(), UserType::Contractor);
    }

    #[tokio::test]
    async fn admin_grant_needs_service_access() {
        let identity = MemoryIdentity::new().without_admin();
        let created = identity.sign_up("a@b.c", "secret1", &citizen()).await.unwrap();
        assert!(matches!(
            IdentityProvider::grant_role(&identity, &created.user.id, UserType::Administrator).await,
            Err(Error::Auth(_))
        ));

        let identity = MemoryIdentity::new();
        assert!(matches!(
            IdentityProvider::grant_role(&identity, "nobody", UserType::Administrator).await,
            Err(Error::Auth(_))
        ));
    }
}
