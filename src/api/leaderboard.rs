use log::debug;
use serde_json::json;

use super::decode;
use crate::context::RequestContext;
use crate::error::Result;
use crate::leaderboard::{LeaderboardCategory, LeaderboardRow, LeaderboardView};
use crate::models::Period;
use crate::CivicClient;

pub struct LeaderboardApi<'a> {
    client: &'a CivicClient,
}

impl<'a> LeaderboardApi<'a> {
    pub(crate) fn new(client: &'a CivicClient) -> Self {
        Self { client }
    }

    /// Per-user activity is aggregated by the `get_leaderboard` procedure;
    /// ranking by `category` happens locally.
    pub async fn fetch(
        &self,
        ctx: &RequestContext,
        period: Period,
        category: LeaderboardCategory,
    ) -> Result<LeaderboardView> {
        let rows = self
            .client
            .store
            .rpc(ctx, "get_leaderboard", json!({ "p_window": period.as_str() }))
            .await?;
        let rows: Vec<LeaderboardRow> = decode(rows)?;
        debug!("Leaderboard for {} has {} users", period, rows.len());
        Ok(LeaderboardView::build(rows, period, category))
    }
}
