#![allow(dead_code)]

use std::sync::Arc;

use civic_connect::memory::{MemoryIdentity, MemoryMediaHost, MemoryStore, StaticGeocoder};
use civic_connect::prelude::*;

/// A client over in-memory backends, with handles kept for inspection
pub struct Harness {
    pub client: CivicClient,
    pub identity: Arc<MemoryIdentity>,
    pub store: Arc<MemoryStore>,
    pub media: Arc<MemoryMediaHost>,
}

impl Harness {
    pub fn new() -> Self {
        Self::build(MemoryIdentity::new(), MemoryStore::new(), ClientOptions::default())
    }

    pub fn with_options(options: ClientOptions) -> Self {
        Self::build(MemoryIdentity::new(), MemoryStore::new(), options)
    }

    pub fn build(identity: MemoryIdentity, store: MemoryStore, options: ClientOptions) -> Self {
        let identity = Arc::new(identity);
        let store = Arc::new(store);
        let media = Arc::new(MemoryMediaHost::default());
        let client = CivicClient::with_backends(
            identity.clone(),
            store.clone(),
            media.clone(),
            Arc::new(StaticGeocoder::new()),
            options,
        );
        Self {
            client,
            identity,
            store,
            media,
        }
    }

    /// Sign up and return a context for the new account.
    ///
    /// Administrators cannot claim their role at signup, so it is granted
    /// the way an operator would.
    pub async fn account(&self, email: &str, name: &str, role: UserType) -> RequestContext {
        let request = SignUpRequest::new(email, "secret1", role).with_name(name);
        let outcome = self
            .client
            .accounts()
            .sign_up(request)
            .await
            .expect("signup");
        if role == UserType::Administrator {
            self.identity.grant_role(&outcome.user.id, role);
        }
        RequestContext::authenticated(outcome.session.expect("session"))
    }

    pub async fn citizen(&self, email: &str) -> RequestContext {
        self.account(email, "Test Citizen", UserType::Citizen).await
    }

    pub async fn admin(&self) -> RequestContext {
        self.account("clerk@city.example", "City Clerk", UserType::Administrator)
            .await
    }

    pub async fn contractor(&self, email: &str) -> RequestContext {
        self.account(email, "Build Co", UserType::Contractor).await
    }
}

pub fn draft(title: &str, category: IssueCategory) -> IssueDraft {
    IssueDraft::new(title, "Reported from the street", category)
}

pub fn located(title: &str, category: IssueCategory, area: &str, lat: f64, lng: f64) -> IssueDraft {
    draft(title, category).with_location(LocationFields {
        latitude: Some(lat),
        longitude: Some(lng),
        area: Some(area.to_string()),
        ..Default::default()
    })
}
