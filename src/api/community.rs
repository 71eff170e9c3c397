use log::{debug, info};
use serde_json::json;

use super::{decode, decode_all, require_text, PROFILE_SUMMARY};
use crate::context::RequestContext;
use crate::error::{Error, Result};
use crate::models::{CommunityPost, NewPost, PostCategory, PostCounter, PostRow};
use crate::postgrest::{Query, Table};
use crate::CivicClient;

/// Community feed
pub struct Community<'a> {
    client: &'a CivicClient,
}

impl<'a> Community<'a> {
    pub(crate) fn new(client: &'a CivicClient) -> Self {
        Self { client }
    }

    pub async fn create_post(&self, ctx: &RequestContext, post: NewPost) -> Result<CommunityPost> {
        let content = require_text(&post.content, "content")?;
        let actor = self.client.resolve_actor(ctx).await?;
        let tags: Vec<String> = post
            .tags
            .iter()
            .map(|t| t.trim().trim_start_matches('#').to_string())
            .filter(|t| !t.is_empty())
            .collect();

        let row = PostRow {
            user_id: &actor.id,
            content,
            category: post.category,
            tags: &tags,
            likes: 0,
            comments: 0,
            shares: 0,
        };
        let stored = self
            .client
            .store
            .insert(ctx, Table::CommunityPosts, serde_json::to_value(&row)?)
            .await?;
        info!("Post created by {} in {}", actor.id, post.category.as_str());
        decode(stored)
    }

    /// Posts with their authors, newest first
    pub async fn list_posts(
        &self,
        ctx: &RequestContext,
        category: Option<PostCategory>,
    ) -> Result<Vec<CommunityPost>> {
        let mut query = Query::new()
            .select(&format!("*, author:profiles!user_id({})", PROFILE_SUMMARY))
            .newest_first();
        if let Some(category) = category {
            query = query.eq("category", category.as_str());
        }
        let rows = self
            .client
            .store
            .select(ctx, Table::CommunityPosts, &query)
            .await?;
        decode_all(rows)
    }

    pub async fn like_post(&self, ctx: &RequestContext, post_id: &str) -> Result<i64> {
        self.bump(ctx, post_id, PostCounter::Likes).await
    }

    pub async fn share_post(&self, ctx: &RequestContext, post_id: &str) -> Result<i64> {
        self.bump(ctx, post_id, PostCounter::Shares).await
    }

    /// Atomic increment in the store; returns the new value
    async fn bump(&self, ctx: &RequestContext, post_id: &str, counter: PostCounter) -> Result<i64> {
        ctx.require_session()?;
        let value = self
            .client
            .store
            .rpc(
                ctx,
                "increment_post_counter",
                json!({ "p_post_id": post_id, "p_column": counter.column() }),
            )
            .await?;
        debug!("Post {} {} now {}", post_id, counter.column(), value);
        value
            .as_i64()
            .ok_or_else(|| Error::api(500, format!("unexpected counter value {}", value)))
    }
}
