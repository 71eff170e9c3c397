use log::{debug, info, warn};
use serde::Serialize;
use serde_json::{json, Value};

use super::{decode, decode_all, first, require_text, PROFILE_SUMMARY};
use crate::config::{CounterSync, UploadPolicy};
use crate::context::RequestContext;
use crate::error::{Error, Result};
use crate::lifecycle::{check_transition, plan_vote, VoteAction};
use crate::models::{
    Comment, CommentRow, Issue, IssueFilter, IssuePatch, IssuePriority, IssueRow, IssueStats,
    IssueStatus, NewComment, NewIssue, NewVote, UserType, Vote, VoteType,
};
use crate::postgrest::{Filter, Query, SortOrder, Table};
use crate::report::IssueDraft;
use crate::storage::{FailedUpload, MediaFile};
use crate::CivicClient;

/// Issue columns plus the embedded reporter summary
fn issue_select() -> String {
    format!("*, reporter:profiles!user_id({})", PROFILE_SUMMARY)
}

fn comment_select() -> String {
    format!("*, author:profiles!user_id({})", PROFILE_SUMMARY)
}

/// A stored report and the images that did not make it
#[derive(Debug, Clone, PartialEq)]
pub struct IssueSubmission {
    pub issue: Issue,
    pub failed_uploads: Vec<FailedUpload>,
}

/// Result of a vote request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VoteOutcome {
    pub action: VoteAction,
    pub upvotes: i64,
    pub downvotes: i64,
}

impl VoteOutcome {
    /// The caller's vote after the request
    pub fn current_vote(&self) -> Option<VoteType> {
        self.action.resulting_vote()
    }
}

/// Issue reports, voting and comments
pub struct Issues<'a> {
    client: &'a CivicClient,
}

impl<'a> Issues<'a> {
    pub(crate) fn new(client: &'a CivicClient) -> Self {
        Self { client }
    }

    /// Validate a report form, upload its images, then store it.
    ///
    /// Validation runs before any upload. Under [`UploadPolicy::AllowPartial`]
    /// the report is stored with whichever images uploaded, unless every one
    /// failed; [`UploadPolicy::AllOrNothing`] aborts on the first failure.
    pub async fn submit(
        &self,
        ctx: &RequestContext,
        draft: IssueDraft,
        images: &[MediaFile],
    ) -> Result<IssueSubmission> {
        draft.validate()?;
        ctx.require_session()?;

        let batch = self.client.media.upload_many(ctx, images).await;
        if !batch.is_complete() {
            let abort = match self.client.options.upload_policy {
                UploadPolicy::AllOrNothing => true,
                UploadPolicy::AllowPartial => batch.is_total_failure(),
            };
            if abort {
                let names: Vec<&str> = batch.failed.iter().map(|f| f.name.as_str()).collect();
                return Err(Error::upload(format!(
                    "failed to upload {} of {} images: {}",
                    batch.failed.len(),
                    images.len(),
                    names.join(", ")
                )));
            }
            warn!(
                "Submitting report with {} of {} images",
                batch.uploaded.len(),
                images.len()
            );
        }

        let issue = self.create(ctx, draft.into_new_issue(batch.uploaded)?).await?;
        Ok(IssueSubmission {
            issue,
            failed_uploads: batch.failed,
        })
    }

    /// Store a report. The reporter is the caller, never a supplied id.
    pub async fn create(&self, ctx: &RequestContext, issue: NewIssue) -> Result<Issue> {
        require_text(&issue.title, "title")?;
        require_text(&issue.description, "description")?;
        let actor = self.client.resolve_actor(ctx).await?;

        let row = IssueRow {
            user_id: &actor.id,
            issue: &issue,
            status: IssueStatus::Pending,
            upvotes: 0,
            downvotes: 0,
            comments_count: 0,
        };
        let stored = self
            .client
            .store
            .insert(ctx, Table::Issues, serde_json::to_value(&row)?)
            .await?;
        let issue: Issue = decode(stored)?;
        info!("Issue {} reported by {}", issue.id, actor.id);
        Ok(issue)
    }

    /// Issues matching every predicate in `filter`, newest first
    pub async fn list(&self, ctx: &RequestContext, filter: &IssueFilter) -> Result<Vec<Issue>> {
        let mut query = Query::new().select(&issue_select()).newest_first();
        if let Some(status) = filter.status {
            query = query.eq("status", status.as_str());
        }
        if let Some(category) = filter.category {
            query = query.eq("category", category.as_str());
        }
        if let Some(priority) = filter.priority {
            query = query.eq("priority", priority.as_str());
        }
        if let Some(area) = &filter.area {
            query = query.eq("area", area);
        }
        if let Some(ward) = &filter.ward {
            query = query.eq("ward", ward);
        }
        if let Some(reporter) = &filter.reporter {
            query = query.eq("user_id", reporter);
        }
        if let Some(bounds) = &filter.bounds {
            query = query
                .gte("latitude", bounds.min_lat)
                .lte("latitude", bounds.max_lat)
                .gte("longitude", bounds.min_lng)
                .lte("longitude", bounds.max_lng);
        }
        if let Some(since) = filter.created_since {
            query = query.gte("created_at", since.to_rfc3339());
        }
        if let Some(limit) = filter.limit {
            query = query.limit(limit);
        }

        let rows = self.client.store.select(ctx, Table::Issues, &query).await?;
        debug!("Listed {} issues", rows.len());
        decode_all(rows)
    }

    /// The caller's own reports
    pub async fn mine(&self, ctx: &RequestContext) -> Result<Vec<Issue>> {
        let actor = self.client.resolve_actor(ctx).await?;
        self.list(ctx, &IssueFilter::new().reported_by(&actor.id)).await
    }

    pub async fn get(&self, ctx: &RequestContext, issue_id: &str) -> Result<Issue> {
        let query = Query::new().select(&issue_select()).eq("id", issue_id).limit(1);
        let rows = self.client.store.select(ctx, Table::Issues, &query).await?;
        first(rows, format!("issue {}", issue_id))
    }

    /// Edit descriptive fields; the reporter or an administrator only
    pub async fn update(&self, ctx: &RequestContext, issue_id: &str, patch: IssuePatch) -> Result<Issue> {
        let patch = serde_json::to_value(&patch)?;
        if patch.as_object().map_or(true, |p| p.is_empty()) {
            return Err(Error::validation("Nothing to update"));
        }
        let actor = self.client.resolve_actor(ctx).await?;
        let issue = self.get(ctx, issue_id).await?;
        if issue.user_id != actor.id && actor.verified_role() != UserType::Administrator {
            return Err(Error::forbidden("only the reporter or an administrator can edit an issue"));
        }

        let rows = self
            .client
            .store
            .update(ctx, Table::Issues, &[Filter::eq("id", issue_id)], patch)
            .await?;
        info!("Issue {} edited by {}", issue_id, actor.id);
        first(rows, format!("issue {}", issue_id))
    }

    /// Move an issue along its workflow; administrators only.
    ///
    /// The write is conditional on the status read beforehand, so a
    /// concurrent change surfaces as a conflict instead of being overwritten.
    pub async fn transition(&self, ctx: &RequestContext, issue_id: &str, next: IssueStatus) -> Result<Issue> {
        let actor = self
            .client
            .require_role(ctx, UserType::Administrator)
            .await?;
        let issue = self.get(ctx, issue_id).await?;
        check_transition(issue.status, next)?;

        let rows = self
            .client
            .store
            .update(
                ctx,
                Table::Issues,
                &[
                    Filter::eq("id", issue_id),
                    Filter::eq("status", issue.status.as_str()),
                ],
                json!({ "status": next }),
            )
            .await?;
        if rows.is_empty() {
            return Err(Error::api(
                409,
                format!("issue {} changed status concurrently", issue_id),
            ));
        }
        info!(
            "Issue {} moved from {} to {} by {}",
            issue_id, issue.status, next, actor.id
        );
        first(rows, format!("issue {}", issue_id))
    }

    /// Assign an issue to an official or contractor; administrators only
    pub async fn assign(&self, ctx: &RequestContext, issue_id: &str, assignee: &str) -> Result<Issue> {
        let assignee = require_text(assignee, "assignee")?;
        self.client
            .require_role(ctx, UserType::Administrator)
            .await?;
        let rows = self
            .client
            .store
            .update(
                ctx,
                Table::Issues,
                &[Filter::eq("id", issue_id)],
                json!({ "assigned_to": assignee }),
            )
            .await?;
        info!("Issue {} assigned to {}", issue_id, assignee);
        first(rows, format!("issue {}", issue_id))
    }

    /// Cast, toggle off or switch the caller's vote.
    ///
    /// Repeating the current vote removes it; the opposite vote replaces it.
    pub async fn vote(&self, ctx: &RequestContext, issue_id: &str, vote: VoteType) -> Result<VoteOutcome> {
        let actor = self.client.resolve_actor(ctx).await?;
        let existing = self.find_vote(ctx, issue_id, &actor.id).await?;
        let action = plan_vote(existing.as_ref().map(|v| v.vote_type), vote);
        let own_vote = [Filter::eq("issue_id", issue_id), Filter::eq("user_id", &actor.id)];

        match action {
            VoteAction::Insert(vote_type) => {
                self.get(ctx, issue_id).await?;
                let row = NewVote {
                    issue_id,
                    user_id: &actor.id,
                    vote_type,
                };
                self.client
                    .store
                    .insert(ctx, Table::IssueVotes, serde_json::to_value(&row)?)
                    .await?;
            }
            VoteAction::Delete => {
                self.client
                    .store
                    .delete(ctx, Table::IssueVotes, &own_vote)
                    .await?;
            }
            VoteAction::Update(vote_type) => {
                self.client
                    .store
                    .update(ctx, Table::IssueVotes, &own_vote, json!({ "vote_type": vote_type }))
                    .await?;
            }
        }
        debug!("Vote on {} by {}: {:?}", issue_id, actor.id, action);

        let (upvotes, downvotes) = self.sync_vote_counters(ctx, issue_id).await?;
        Ok(VoteOutcome {
            action,
            upvotes,
            downvotes,
        })
    }

    /// The caller's current vote on an issue, if any
    pub async fn my_vote(&self, ctx: &RequestContext, issue_id: &str) -> Result<Option<VoteType>> {
        let actor = self.client.resolve_actor(ctx).await?;
        Ok(self
            .find_vote(ctx, issue_id, &actor.id)
            .await?
            .map(|v| v.vote_type))
    }

    async fn find_vote(&self, ctx: &RequestContext, issue_id: &str, user_id: &str) -> Result<Option<Vote>> {
        let query = Query::new()
            .eq("issue_id", issue_id)
            .eq("user_id", user_id)
            .limit(1);
        let rows = self.client.store.select(ctx, Table::IssueVotes, &query).await?;
        rows.into_iter().next().map(decode).transpose()
    }

    async fn sync_vote_counters(&self, ctx: &RequestContext, issue_id: &str) -> Result<(i64, i64)> {
        match self.client.options.counter_sync {
            CounterSync::StoreManaged => {
                let issue = self.get(ctx, issue_id).await?;
                Ok((issue.upvotes, issue.downvotes))
            }
            CounterSync::Recount => {
                let upvotes = self.count_votes(ctx, issue_id, VoteType::Upvote).await?;
                let downvotes = self.count_votes(ctx, issue_id, VoteType::Downvote).await?;
                self.write_counters(
                    ctx,
                    issue_id,
                    json!({ "upvotes": upvotes, "downvotes": downvotes }),
                )
                .await?;
                Ok((upvotes, downvotes))
            }
        }
    }

    async fn count_votes(&self, ctx: &RequestContext, issue_id: &str, vote: VoteType) -> Result<i64> {
        let filters = [
            Filter::eq("issue_id", issue_id),
            Filter::eq("vote_type", vote.as_str()),
        ];
        let count = self.client.store.count(ctx, Table::IssueVotes, &filters).await?;
        Ok(count as i64)
    }

    /// Persist recounted counters; a write that reaches no row is an error.
    ///
    /// Row level security filters updates the caller may not make down to
    /// zero rows with a success status, so an empty result means nothing was saved.
    async fn write_counters(&self, ctx: &RequestContext, issue_id: &str, counters: Value) -> Result<()> {
        let rows = self
            .client
            .store
            .update(ctx, Table::Issues, &[Filter::eq("id", issue_id)], counters)
            .await?;
        if rows.is_empty() {
            warn!("Counter write on issue {} matched no rows", issue_id);
            return Err(Error::api(
                403,
                format!("counters on issue {} were not saved: the update matched no rows", issue_id),
            ));
        }
        Ok(())
    }

    /// Add a comment as the caller
    pub async fn comment(&self, ctx: &RequestContext, issue_id: &str, comment: NewComment) -> Result<Comment> {
        let content = require_text(&comment.content, "content")?;
        let actor = self.client.resolve_actor(ctx).await?;
        self.get(ctx, issue_id).await?;

        let row = CommentRow {
            issue_id,
            user_id: &actor.id,
            content,
            attachments: &comment.attachments,
        };
        let stored = self
            .client
            .store
            .insert(ctx, Table::IssueComments, serde_json::to_value(&row)?)
            .await?;

        if self.client.options.counter_sync == CounterSync::Recount {
            let count = self
                .client
                .store
                .count(ctx, Table::IssueComments, &[Filter::eq("issue_id", issue_id)])
                .await?;
            self.write_counters(ctx, issue_id, json!({ "comments_count": count }))
                .await?;
        }
        info!("Comment on {} by {}", issue_id, actor.id);
        decode(stored)
    }

    /// Comments on an issue with their authors, newest first
    pub async fn comments(&self, ctx: &RequestContext, issue_id: &str) -> Result<Vec<Comment>> {
        let query = Query::new()
            .select(&comment_select())
            .eq("issue_id", issue_id)
            .order("created_at", SortOrder::Descending);
        let rows = self
            .client
            .store
            .select(ctx, Table::IssueComments, &query)
            .await?;
        decode_all(rows)
    }

    /// Counts for the admin dashboard
    pub async fn stats(&self, ctx: &RequestContext) -> Result<IssueStats> {
        let store = &self.client.store;
        let by_status = |status: IssueStatus| [Filter::eq("status", status.as_str())];
        Ok(IssueStats {
            total: store.count(ctx, Table::Issues, &[]).await?,
            pending: store
                .count(ctx, Table::Issues, &by_status(IssueStatus::Pending))
                .await?,
            in_progress: store
                .count(ctx, Table::Issues, &by_status(IssueStatus::InProgress))
                .await?,
            resolved: store
                .count(ctx, Table::Issues, &by_status(IssueStatus::Resolved))
                .await?,
            high_priority: store
                .count(
                    ctx,
                    Table::Issues,
                    &[Filter::eq("priority", IssuePriority::High.as_str())],
                )
                .await?,
        })
    }
}
