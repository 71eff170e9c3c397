use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{BidStatus, IssuePriority, ProfileSummary, TenderStatus};

/// City-posted remediation job open for contractor bids
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tender {
    pub id: String,
    pub posted_by: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub location: Option<String>,
    pub estimated_budget: Option<String>,
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub priority: IssuePriority,
    #[serde(default)]
    pub status: TenderStatus,
    #[serde(default)]
    pub requirements: Vec<String>,
    pub created_at: Option<DateTime<Utc>>,
    /// Embedded bids, present on list reads
    #[serde(default)]
    pub bids: Vec<Bid>,
}

/// Insert payload for a tender
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NewTender {
    pub title: String,
    pub description: String,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_budget: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,
    pub priority: IssuePriority,
    pub requirements: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct TenderRow<'a> {
    pub posted_by: &'a str,
    #[serde(flatten)]
    pub tender: &'a NewTender,
    pub status: TenderStatus,
}

/// Contractor's priced proposal against a tender
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Bid {
    pub id: String,
    #[serde(default)]
    pub tender_id: Option<String>,
    pub user_id: String,
    pub amount: f64,
    pub details: String,
    #[serde(default)]
    pub status: BidStatus,
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bidder: Option<ProfileSummary>,
}

/// Caller-supplied bid
#[derive(Debug, Clone, PartialEq)]
pub struct NewBid {
    pub amount: f64,
    pub details: String,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct BidRow<'a> {
    pub tender_id: &'a str,
    pub user_id: &'a str,
    pub amount: f64,
    pub details: &'a str,
    pub status: BidStatus,
}
