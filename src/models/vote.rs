use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::VoteType;

/// One user's vote on one issue; unique per (issue_id, user_id)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Vote {
    pub id: String,
    pub issue_id: String,
    pub user_id: String,
    pub vote_type: VoteType,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct NewVote<'a> {
    pub issue_id: &'a str,
    pub user_id: &'a str,
    pub vote_type: VoteType,
}
