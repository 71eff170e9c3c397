use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Free-text app feedback; `user_id` is absent for anonymous submissions
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Feedback {
    pub id: String,
    pub user_id: Option<String>,
    pub content: String,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewFeedback {
    pub content: String,
    pub anonymous: bool,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct FeedbackRow<'a> {
    pub user_id: Option<&'a str>,
    pub content: &'a str,
}
