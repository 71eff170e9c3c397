use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ProfileSummary;

/// Comment on an issue; immutable once written
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Comment {
    pub id: String,
    pub issue_id: String,
    pub user_id: String,
    pub content: String,
    #[serde(default)]
    pub attachments: Vec<String>,
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<ProfileSummary>,
}

/// Caller-supplied comment body
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewComment {
    pub content: String,
    pub attachments: Vec<String>,
}

impl NewComment {
    pub fn text(content: &str) -> Self {
        Self {
            content: content.to_string(),
            attachments: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct CommentRow<'a> {
    pub issue_id: &'a str,
    pub user_id: &'a str,
    pub content: &'a str,
    pub attachments: &'a [String],
}
