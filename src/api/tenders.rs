use log::info;

use super::{decode, decode_all, first, require_text};
use crate::context::RequestContext;
use crate::error::{Error, Result};
use crate::models::{Bid, BidRow, BidStatus, NewBid, NewTender, Tender, TenderRow, TenderStatus, UserType};
use crate::postgrest::{Query, Table};
use crate::CivicClient;

const TENDER_SELECT: &str = "*, bids!tender_id(*)";

/// Tenders and contractor bids
pub struct Tenders<'a> {
    client: &'a CivicClient,
}

impl<'a> Tenders<'a> {
    pub(crate) fn new(client: &'a CivicClient) -> Self {
        Self { client }
    }

    /// Post a tender; administrators only
    pub async fn create_tender(&self, ctx: &RequestContext, tender: NewTender) -> Result<Tender> {
        require_text(&tender.title, "title")?;
        require_text(&tender.description, "description")?;
        require_text(&tender.category, "category")?;
        let actor = self
            .client
            .require_role(ctx, UserType::Administrator)
            .await?;

        let row = TenderRow {
            posted_by: &actor.id,
            tender: &tender,
            status: TenderStatus::Available,
        };
        let stored = self
            .client
            .store
            .insert(ctx, Table::Tenders, serde_json::to_value(&row)?)
            .await?;
        let tender: Tender = decode(stored)?;
        info!("Tender {} posted by {}", tender.id, actor.id);
        Ok(tender)
    }

    /// Tenders with their bids, newest first
    pub async fn list_tenders(&self, ctx: &RequestContext, status: Option<TenderStatus>) -> Result<Vec<Tender>> {
        let mut query = Query::new().select(TENDER_SELECT).newest_first();
        if let Some(status) = status {
            query = query.eq("status", status.as_str());
        }
        let rows = self.client.store.select(ctx, Table::Tenders, &query).await?;
        decode_all(rows)
    }

    pub async fn get_tender(&self, ctx: &RequestContext, tender_id: &str) -> Result<Tender> {
        let query = Query::new()
            .select(TENDER_SELECT)
            .eq("id", tender_id)
            .limit(1);
        let rows = self.client.store.select(ctx, Table::Tenders, &query).await?;
        first(rows, format!("tender {}", tender_id))
    }

    /// Bid on an open tender; contractors only, one bid per tender
    pub async fn submit_bid(&self, ctx: &RequestContext, tender_id: &str, bid: NewBid) -> Result<Bid> {
        if !bid.amount.is_finite() || bid.amount <= 0.0 {
            return Err(Error::validation("Please enter a valid bid amount"));
        }
        let details = require_text(&bid.details, "details")?;
        let actor = self
            .client
            .require_role(ctx, UserType::Contractor)
            .await?;

        let tender = self.get_tender(ctx, tender_id).await?;
        if tender.status != TenderStatus::Available {
            return Err(Error::validation(format!(
                "tender {} is {} and no longer accepts bids",
                tender_id, tender.status
            )));
        }
        if tender.bids.iter().any(|b| b.user_id == actor.id) {
            return Err(Error::validation("You have already bid on this tender"));
        }

        let row = BidRow {
            tender_id,
            user_id: &actor.id,
            amount: bid.amount,
            details,
            status: BidStatus::Submitted,
        };
        let stored = self
            .client
            .store
            .insert(ctx, Table::Bids, serde_json::to_value(&row)?)
            .await?;
        info!("Bid of {:.2} on tender {} by {}", bid.amount, tender_id, actor.id);
        decode(stored)
    }

    /// The caller's bids, newest first
    pub async fn my_bids(&self, ctx: &RequestContext) -> Result<Vec<Bid>> {
        let actor = self.client.resolve_actor(ctx).await?;
        let query = Query::new().eq("user_id", &actor.id).newest_first();
        let rows = self.client.store.select(ctx, Table::Bids, &query).await?;
        decode_all(rows)
    }
}
