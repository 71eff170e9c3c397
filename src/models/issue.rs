use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{IssueCategory, IssuePriority, IssueStatus, ProfileSummary};

/// A citizen-reported infrastructure problem
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Issue {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub description: String,
    pub category: IssueCategory,
    #[serde(default)]
    pub priority: IssuePriority,
    #[serde(default)]
    pub status: IssueStatus,
    pub location_name: Option<String>,
    pub address: Option<String>,
    pub area: Option<String>,
    pub ward: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub upvotes: i64,
    #[serde(default)]
    pub downvotes: i64,
    #[serde(default)]
    pub comments_count: i64,
    pub assigned_to: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    /// Embedded reporter profile, present on list reads
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reporter: Option<ProfileSummary>,
}

impl Issue {
    /// Net score shown next to the vote buttons
    pub fn score(&self) -> i64 {
        self.upvotes - self.downvotes
    }
}

/// Insert payload for an issue row
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NewIssue {
    pub title: String,
    pub description: String,
    pub category: IssueCategory,
    pub priority: IssuePriority,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ward: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    pub images: Vec<String>,
}

/// Row written by the data access layer, carrying the server-resolved reporter
#[derive(Debug, Clone, Serialize)]
pub(crate) struct IssueRow<'a> {
    pub user_id: &'a str,
    #[serde(flatten)]
    pub issue: &'a NewIssue,
    pub status: IssueStatus,
    pub upvotes: i64,
    pub downvotes: i64,
    pub comments_count: i64,
}

/// Partial update of an issue's descriptive fields
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct IssuePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<IssueCategory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<IssuePriority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ward: Option<String>,
}

/// Geographic rectangle, inclusive on every edge
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub min_lng: f64,
    pub max_lat: f64,
    pub max_lng: f64,
}

impl BoundingBox {
    pub fn contains(&self, lat: f64, lng: f64) -> bool {
        lat >= self.min_lat && lat <= self.max_lat && lng >= self.min_lng && lng <= self.max_lng
    }
}

/// Optional predicates for issue lists; all present predicates must hold
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IssueFilter {
    pub status: Option<IssueStatus>,
    pub category: Option<IssueCategory>,
    pub priority: Option<IssuePriority>,
    pub area: Option<String>,
    pub ward: Option<String>,
    pub bounds: Option<BoundingBox>,
    pub reporter: Option<String>,
    pub created_since: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

impl IssueFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: IssueStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn category(mut self, category: IssueCategory) -> Self {
        self.category = Some(category);
        self
    }

    pub fn priority(mut self, priority: IssuePriority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn area(mut self, area: &str) -> Self {
        self.area = Some(area.to_string());
        self
    }

    pub fn ward(mut self, ward: &str) -> Self {
        self.ward = Some(ward.to_string());
        self
    }

    pub fn within(mut self, bounds: BoundingBox) -> Self {
        self.bounds = Some(bounds);
        self
    }

    pub fn reported_by(mut self, user_id: &str) -> Self {
        self.reporter = Some(user_id.to_string());
        self
    }

    pub fn created_since(mut self, since: DateTime<Utc>) -> Self {
        self.created_since = Some(since);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Dashboard counters over the whole issue table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IssueStats {
    pub total: u64,
    pub pending: u64,
    pub in_progress: u64,
    pub resolved: u64,
    pub high_priority: u64,
}
