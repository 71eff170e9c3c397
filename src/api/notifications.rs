use chrono::Utc;
use log::debug;
use serde_json::json;

use super::{decode_all, first};
use crate::context::RequestContext;
use crate::error::Result;
use crate::models::Notification;
use crate::postgrest::{Filter, Query, Table};
use crate::CivicClient;

/// The caller's notifications
pub struct Notifications<'a> {
    client: &'a CivicClient,
}

impl<'a> Notifications<'a> {
    pub(crate) fn new(client: &'a CivicClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, ctx: &RequestContext) -> Result<Vec<Notification>> {
        let actor = self.client.resolve_actor(ctx).await?;
        let query = Query::new().eq("user_id", &actor.id).newest_first();
        let rows = self
            .client
            .store
            .select(ctx, Table::Notifications, &query)
            .await?;
        decode_all(rows)
    }

    pub async fn mark_read(&self, ctx: &RequestContext, notification_id: &str) -> Result<Notification> {
        let actor = self.client.resolve_actor(ctx).await?;
        let rows = self
            .client
            .store
            .update(
                ctx,
                Table::Notifications,
                &[
                    Filter::eq("id", notification_id),
                    Filter::eq("user_id", &actor.id),
                ],
                json!({ "is_read": true, "read_at": Utc::now() }),
            )
            .await?;
        debug!("Marked notification {} read", notification_id);
        first(rows, format!("notification {}", notification_id))
    }

    pub async fn unread_count(&self, ctx: &RequestContext) -> Result<u64> {
        let actor = self.client.resolve_actor(ctx).await?;
        self.client
            .store
            .count(
                ctx,
                Table::Notifications,
                &[Filter::eq("user_id", &actor.id), Filter::eq("is_read", false)],
            )
            .await
    }
}
