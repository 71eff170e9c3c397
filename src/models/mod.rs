//! Row types and closed enums for every table the app touches

mod comment;
mod community;
mod feedback;
mod issue;
mod notification;
mod official;
mod profile;
mod tender;
mod vote;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

pub use comment::*;
pub use community::*;
pub use feedback::*;
pub use issue::*;
pub use notification::*;
pub use official::*;
pub use profile::*;
pub use tender::*;
pub use vote::*;

fn unknown_variant(kind: &str, value: &str) -> Error {
    Error::validation(format!("unknown {}: {}", kind, value))
}

/// Account role, declared at signup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserType {
    #[default]
    #[serde(alias = "user")]
    Citizen,
    #[serde(alias = "admin")]
    Administrator,
    #[serde(alias = "tender")]
    Contractor,
}

impl UserType {
    /// Convert the user type to its string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            UserType::Citizen => "citizen",
            UserType::Administrator => "administrator",
            UserType::Contractor => "contractor",
        }
    }
}

impl FromStr for UserType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "citizen" | "user" => Ok(UserType::Citizen),
            "administrator" | "admin" => Ok(UserType::Administrator),
            "contractor" | "tender" => Ok(UserType::Contractor),
            other => Err(unknown_variant("user type", other)),
        }
    }
}

/// Issue category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCategory {
    Roads,
    Utilities,
    Environment,
    Safety,
    Other,
}

impl IssueCategory {
    pub const ALL: [IssueCategory; 5] = [
        IssueCategory::Roads,
        IssueCategory::Utilities,
        IssueCategory::Environment,
        IssueCategory::Safety,
        IssueCategory::Other,
    ];

    /// Convert the category to its string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueCategory::Roads => "roads",
            IssueCategory::Utilities => "utilities",
            IssueCategory::Environment => "environment",
            IssueCategory::Safety => "safety",
            IssueCategory::Other => "other",
        }
    }
}

impl FromStr for IssueCategory {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IssueCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| unknown_variant("issue category", s))
    }
}

/// Issue priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IssuePriority {
    Low,
    #[default]
    Medium,
    High,
}

impl IssuePriority {
    /// Convert the priority to its string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            IssuePriority::Low => "low",
            IssuePriority::Medium => "medium",
            IssuePriority::High => "high",
        }
    }
}

impl FromStr for IssuePriority {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(IssuePriority::Low),
            "medium" => Ok(IssuePriority::Medium),
            "high" => Ok(IssuePriority::High),
            other => Err(unknown_variant("issue priority", other)),
        }
    }
}

/// Administrative workflow state of an issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    #[default]
    Pending,
    #[serde(alias = "in-progress")]
    InProgress,
    Resolved,
}

impl IssueStatus {
    /// Convert the status to its string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueStatus::Pending => "pending",
            IssueStatus::InProgress => "in_progress",
            IssueStatus::Resolved => "resolved",
        }
    }
}

impl FromStr for IssueStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(IssueStatus::Pending),
            "in_progress" | "in-progress" => Ok(IssueStatus::InProgress),
            "resolved" => Ok(IssueStatus::Resolved),
            other => Err(unknown_variant("issue status", other)),
        }
    }
}

/// Direction of a vote on an issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteType {
    Upvote,
    Downvote,
}

impl VoteType {
    /// Convert the vote type to its string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteType::Upvote => "upvote",
            VoteType::Downvote => "downvote",
        }
    }
}

/// Tender lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TenderStatus {
    #[default]
    Available,
    Bidded,
    Won,
    Completed,
}

impl TenderStatus {
    /// Convert the status to its string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            TenderStatus::Available => "available",
            TenderStatus::Bidded => "bidded",
            TenderStatus::Won => "won",
            TenderStatus::Completed => "completed",
        }
    }
}

/// Bid review state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BidStatus {
    #[default]
    Submitted,
    Accepted,
    Rejected,
}

impl BidStatus {
    /// Convert the status to its string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            BidStatus::Submitted => "submitted",
            BidStatus::Accepted => "accepted",
            BidStatus::Rejected => "rejected",
        }
    }
}

/// Community feed category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PostCategory {
    #[default]
    Discussions,
    Announcements,
    Suggestions,
    Events,
}

impl PostCategory {
    /// Convert the category to its string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            PostCategory::Discussions => "discussions",
            PostCategory::Announcements => "announcements",
            PostCategory::Suggestions => "suggestions",
            PostCategory::Events => "events",
        }
    }
}

/// Reporting window used by the leaderboard and the heatmap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    Week,
    #[default]
    Month,
    Quarter,
    Year,
}

impl Period {
    /// Convert the period to its string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Week => "week",
            Period::Month => "month",
            Period::Quarter => "quarter",
            Period::Year => "year",
        }
    }

    /// Length of the window in days
    pub fn days(&self) -> i64 {
        match self {
            Period::Week => 7,
            Period::Month => 30,
            Period::Quarter => 90,
            Period::Year => 365,
        }
    }

    /// Start of the window ending at `now`
    pub fn since(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::days(self.days())
    }
}

impl FromStr for Period {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "week" => Ok(Period::Week),
            "month" => Ok(Period::Month),
            "quarter" => Ok(Period::Quarter),
            "year" => Ok(Period::Year),
            other => Err(unknown_variant("period", other)),
        }
    }
}

macro_rules! display_as_str {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        })*
    };
}

display_as_str!(
    UserType,
    IssueCategory,
    IssuePriority,
    IssueStatus,
    VoteType,
    TenderStatus,
    BidStatus,
    PostCategory,
    Period
);
