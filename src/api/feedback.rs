use log::info;

use super::{decode, decode_all, require_text};
use crate::context::RequestContext;
use crate::error::Result;
use crate::models::{Feedback, FeedbackRow, NewFeedback, UserType};
use crate::postgrest::{Query, Table};
use crate::CivicClient;

/// App feedback
pub struct FeedbackApi<'a> {
    client: &'a CivicClient,
}

impl<'a> FeedbackApi<'a> {
    pub(crate) fn new(client: &'a CivicClient) -> Self {
        Self { client }
    }

    /// Store feedback. Signed-out callers and anonymous submissions carry no user id.
    pub async fn submit(&self, ctx: &RequestContext, feedback: NewFeedback) -> Result<Feedback> {
        let content = require_text(&feedback.content, "content")?;
        let author = if feedback.anonymous || !ctx.is_authenticated() {
            None
        } else {
            Some(self.client.resolve_actor(ctx).await?.id)
        };

        let row = FeedbackRow {
            user_id: author.as_deref(),
            content,
        };
        let stored = self
            .client
            .store
            .insert(ctx, Table::Feedback, serde_json::to_value(&row)?)
            .await?;
        info!("Feedback received ({})", if author.is_some() { "signed" } else { "anonymous" });
        decode(stored)
    }

    /// All feedback, newest first; administrators only
    pub async fn list(&self, ctx: &RequestContext) -> Result<Vec<Feedback>> {
        self.client
            .require_role(ctx, UserType::Administrator)
            .await?;
        let rows = self
            .client
            .store
            .select(ctx, Table::Feedback, &Query::new().newest_first())
            .await?;
        decode_all(rows)
    }
}
