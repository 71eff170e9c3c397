//! Issue status workflow and vote bookkeeping

use serde::Serialize;

use crate::error::{Error, Result};
use crate::models::{IssueStatus, Vote, VoteType};

impl IssueStatus {
    /// Forward-only: pending → in_progress → resolved, with pending → resolved allowed.
    ///
    /// Nothing leaves `resolved`, and a status never transitions to itself.
    pub fn can_transition_to(&self, next: IssueStatus) -> bool {
        matches!(
            (self, next),
            (IssueStatus::Pending, IssueStatus::InProgress)
                | (IssueStatus::Pending, IssueStatus::Resolved)
                | (IssueStatus::InProgress, IssueStatus::Resolved)
        )
    }

    /// Statuses reachable in one step
    pub fn next_statuses(&self) -> &'static [IssueStatus] {
        match self {
            IssueStatus::Pending => &[IssueStatus::InProgress, IssueStatus::Resolved],
            IssueStatus::InProgress => &[IssueStatus::Resolved],
            IssueStatus::Resolved => &[],
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.next_statuses().is_empty()
    }
}

/// Reject a status change outside the workflow
pub fn check_transition(from: IssueStatus, to: IssueStatus) -> Result<()> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(Error::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}

/// What a vote request does to the caller's vote row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteAction {
    /// First vote on the issue
    Insert(VoteType),
    /// Repeat of the current vote: toggled off
    Delete,
    /// Switched direction in place
    Update(VoteType),
}

impl VoteAction {
    /// The caller's vote after the action, if any
    pub fn resulting_vote(&self) -> Option<VoteType> {
        match self {
            VoteAction::Insert(vote) | VoteAction::Update(vote) => Some(*vote),
            VoteAction::Delete => None,
        }
    }
}

/// Decide the mutation for a vote request given the caller's existing vote
pub fn plan_vote(existing: Option<VoteType>, requested: VoteType) -> VoteAction {
    match existing {
        None => VoteAction::Insert(requested),
        Some(current) if current == requested => VoteAction::Delete,
        Some(_) => VoteAction::Update(requested),
    }
}

/// Up and down counts for one issue
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VoteTally {
    pub upvotes: i64,
    pub downvotes: i64,
}

impl VoteTally {
    /// Count vote rows by direction
    pub fn from_votes<'a>(votes: impl IntoIterator<Item = &'a Vote>) -> Self {
        votes.into_iter().fold(Self::default(), |mut tally, vote| {
            match vote.vote_type {
                VoteType::Upvote => tally.upvotes += 1,
                VoteType::Downvote => tally.downvotes += 1,
            }
            tally
        })
    }

    pub fn score(&self) -> i64 {
        self.upvotes - self.downvotes
    }
}
