use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{PostCategory, ProfileSummary};

/// Community feed post
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommunityPost {
    pub id: String,
    pub user_id: String,
    pub content: String,
    #[serde(default)]
    pub category: PostCategory,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub likes: i64,
    #[serde(default)]
    pub comments: i64,
    #[serde(default)]
    pub shares: i64,
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<ProfileSummary>,
}

/// Caller-supplied post body
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewPost {
    pub content: String,
    pub category: PostCategory,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct PostRow<'a> {
    pub user_id: &'a str,
    pub content: &'a str,
    pub category: PostCategory,
    pub tags: &'a [String],
    pub likes: i64,
    pub comments: i64,
    pub shares: i64,
}

/// Persisted post counter bumped through the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostCounter {
    Likes,
    Shares,
}

impl PostCounter {
    pub fn column(&self) -> &'static str {
        match self {
            PostCounter::Likes => "likes",
            PostCounter::Shares => "shares",
        }
    }
}
