//! Per-call credentials
//!
//! Every data access operation takes a `RequestContext` instead of reading a
//! process-wide session, so several sessions can coexist in one process.

use crate::auth::Session;
use crate::error::{Error, Result};

/// Credentials a single call runs with
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    session: Option<Session>,
}

impl RequestContext {
    /// Context carrying only the project API key
    pub fn anonymous() -> Self {
        Self { session: None }
    }

    /// Context acting on behalf of a signed-in user
    pub fn authenticated(session: Session) -> Self {
        Self {
            session: Some(session),
        }
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Bearer token to send, if any
    pub fn access_token(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.access_token.as_str())
    }

    /// The session, or an auth error for anonymous contexts
    pub fn require_session(&self) -> Result<&Session> {
        self.session
            .as_ref()
            .ok_or_else(|| Error::auth("You must be signed in to do this"))
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }
}

impl From<Session> for RequestContext {
    fn from(session: Session) -> Self {
        Self::authenticated(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthUser;

    #[test]
    fn anonymous_context_has_no_token() {
        let ctx = RequestContext::anonymous();
        assert!(ctx.access_token().is_none());
        assert!(matches!(ctx.require_session(), Err(Error::Auth(_))));
    }

    #[test]
    fn authenticated_context_exposes_token() {
        let session = Session::new("tok".into(), "r".into(), AuthUser::new("u1", "a@b.c"), 60);
        let ctx = RequestContext::from(session);
        assert_eq!(ctx.access_token(), Some("tok"));
        assert_eq!(ctx.require_session().unwrap().user_id(), "u1");
    }
}
