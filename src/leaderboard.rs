//! Leaderboard ranking over pre-aggregated activity rows
//!
//! The store supplies one row per user for a [`Period`]; ranking, the podium
//! split and the summary figures are computed here.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::models::Period;

/// Points per reported issue
pub const POINTS_PER_REPORT: i64 = 10;
/// Points per reported issue that reached `resolved`
pub const POINTS_PER_RESOLUTION: i64 = 20;
/// Points per community post
pub const POINTS_PER_POST: i64 = 5;

const PODIUM_SIZE: usize = 3;

const AVATAR_ICONS: [&str; 8] = ["👩‍💼", "👨‍💻", "👩‍🎓", "👨‍🔧", "👩‍⚕️", "👨‍🎨", "👩‍🏫", "👨‍🚒"];

/// Score for one user's activity in a window
pub fn total_score(issues_reported: i64, issues_resolved: i64, posts_created: i64) -> i64 {
    issues_reported * POINTS_PER_REPORT
        + issues_resolved * POINTS_PER_RESOLUTION
        + posts_created * POINTS_PER_POST
}

/// Which metric the board is ranked by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LeaderboardCategory {
    #[default]
    All,
    Reporter,
    Contributor,
    Solver,
}

impl LeaderboardCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeaderboardCategory::All => "all",
            LeaderboardCategory::Reporter => "reporter",
            LeaderboardCategory::Contributor => "contributor",
            LeaderboardCategory::Solver => "solver",
        }
    }

    /// The row value this category ranks by
    pub fn metric(&self, row: &LeaderboardRow) -> i64 {
        match self {
            LeaderboardCategory::All => row.total_score,
            LeaderboardCategory::Reporter => row.issues_reported,
            LeaderboardCategory::Contributor => row.posts_created,
            LeaderboardCategory::Solver => row.issues_resolved,
        }
    }
}

impl FromStr for LeaderboardCategory {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(LeaderboardCategory::All),
            "reporter" => Ok(LeaderboardCategory::Reporter),
            "contributor" => Ok(LeaderboardCategory::Contributor),
            "solver" => Ok(LeaderboardCategory::Solver),
            other => Err(Error::validation(format!("unknown leaderboard category: {}", other))),
        }
    }
}

/// Per-user activity as returned by `get_leaderboard`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardRow {
    pub user_id: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub issues_reported: i64,
    #[serde(default)]
    pub issues_resolved: i64,
    #[serde(default)]
    pub posts_created: i64,
    #[serde(default)]
    pub total_score: i64,
}

/// Picture shown next to a name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Avatar {
    Url(String),
    Icon(&'static str),
}

/// Stable fallback icon for a user without an avatar URL
pub fn avatar_icon(user_id: &str) -> &'static str {
    AVATAR_ICONS[(fnv1a(user_id.as_bytes()) % AVATAR_ICONS.len() as u64) as usize]
}

fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    bytes.iter().fold(OFFSET_BASIS, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(PRIME)
    })
}

/// One ranked line of the board
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardEntry {
    /// 1-based position under the selected category
    pub rank: usize,
    pub user_id: String,
    pub name: String,
    pub avatar: Avatar,
    /// Value of the selected category's metric
    pub score: i64,
    pub issues_reported: i64,
    pub issues_resolved: i64,
    pub posts_created: i64,
    pub total_score: i64,
}

impl LeaderboardEntry {
    fn from_row(rank: usize, category: LeaderboardCategory, row: LeaderboardRow) -> Self {
        let avatar = match row.avatar_url.as_deref().filter(|url| !url.is_empty()) {
            Some(url) => Avatar::Url(url.to_string()),
            None => Avatar::Icon(avatar_icon(&row.user_id)),
        };
        let name = row
            .full_name
            .clone()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| "Anonymous".to_string());
        Self {
            rank,
            score: category.metric(&row),
            name,
            avatar,
            issues_reported: row.issues_reported,
            issues_resolved: row.issues_resolved,
            posts_created: row.posts_created,
            total_score: row.total_score,
            user_id: row.user_id,
        }
    }
}

/// Totals over every row of the fetched window
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LeaderboardSummary {
    pub total_users: usize,
    pub total_issues: i64,
    pub total_posts: i64,
    pub average_score: f64,
}

impl LeaderboardSummary {
    pub fn from_rows(rows: &[LeaderboardRow]) -> Self {
        if rows.is_empty() {
            return Self::default();
        }
        let total_score: i64 = rows.iter().map(|r| r.total_score).sum();
        Self {
            total_users: rows.len(),
            total_issues: rows.iter().map(|r| r.issues_reported).sum(),
            total_posts: rows.iter().map(|r| r.posts_created).sum(),
            average_score: total_score as f64 / rows.len() as f64,
        }
    }
}

/// Everything the leaderboard screen renders
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardView {
    pub period: Period,
    pub category: LeaderboardCategory,
    /// Ranks 1 to 3
    pub podium: Vec<LeaderboardEntry>,
    /// Ranks 4 and below
    pub others: Vec<LeaderboardEntry>,
    pub summary: LeaderboardSummary,
}

impl LeaderboardView {
    /// Rank `rows` by `category` and split off the podium.
    ///
    /// Ties fall back to total score, then user id, so the order is stable.
    pub fn build(rows: Vec<LeaderboardRow>, period: Period, category: LeaderboardCategory) -> Self {
        let summary = LeaderboardSummary::from_rows(&rows);

        let mut rows = rows;
        rows.sort_by(|a, b| {
            category
                .metric(b)
                .cmp(&category.metric(a))
                .then_with(|| b.total_score.cmp(&a.total_score))
                .then_with(|| a.user_id.cmp(&b.user_id))
        });

        let mut entries: Vec<LeaderboardEntry> = rows
            .into_iter()
            .enumerate()
            .map(|(i, row)| LeaderboardEntry::from_row(i + 1, category, row))
            .collect();
        let others = entries.split_off(entries.len().min(PODIUM_SIZE));

        Self {
            period,
            category,
            podium: entries,
            others,
            summary,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.podium.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str, reported: i64, resolved: i64, posts: i64) -> LeaderboardRow {
        LeaderboardRow {
            user_id: id.to_string(),
            full_name: Some(format!("User {}", id)),
            avatar_url: None,
            issues_reported: reported,
            issues_resolved: resolved,
            posts_created: posts,
            total_score: total_score(reported, resolved, posts),
        }
    }

    fn sample() -> Vec<LeaderboardRow> {
        vec![
            row("a", 10, 0, 0),
            row("b", 2, 2, 30),
            row("c", 1, 5, 0),
            row("d", 4, 1, 1),
            row("e", 0, 0, 1),
        ]
    }

    #[test]
    fn overall_ranking_splits_podium() {
        let view = LeaderboardView::build(sample(), Period::Month, LeaderboardCategory::All);
        let podium: Vec<&str> = view.podium.iter().map(|e| e.user_id.as_str()).collect();
        assert_eq!(podium, vec!["b", "c", "a"]);
        assert_eq!(view.others.len(), 2);
        assert_eq!(view.others[0].rank, 4);
        assert_eq!(view.others[0].user_id, "d");
    }

    #[test]
    fn category_reranks_by_its_metric() {
        let view = LeaderboardView::build(sample(), Period::Week, LeaderboardCategory::Reporter);
        assert_eq!(view.podium[0].user_id, "a");
        assert_eq!(view.podium[0].score, 10);

        let view = LeaderboardView::build(sample(), Period::Week, LeaderboardCategory::Solver);
        assert_eq!(view.podium[0].user_id, "c");
        assert_eq!(view.podium[0].rank, 1);
    }

    #[test]
    fn summary_sums_the_window() {
        let summary = LeaderboardSummary::from_rows(&sample());
        assert_eq!(summary.total_users, 5);
        assert_eq!(summary.total_issues, 17);
        assert_eq!(summary.total_posts, 32);
        let expected = sample().iter().map(|r| r.total_score).sum::<i64>() as f64 / 5.0;
        assert!((summary.average_score - expected).abs() < f64::EPSILON);
    }

    #[test]
    fn short_boards_have_no_remainder() {
        let view = LeaderboardView::build(vec![row("a", 1, 0, 0)], Period::Year, LeaderboardCategory::All);
        assert_eq!(view.podium.len(), 1);
        assert!(view.others.is_empty());
        assert_eq!(view.summary.total_users, 1);

        let empty = LeaderboardView::build(Vec::new(), Period::Year, LeaderboardCategory::All);
        assert!(empty.is_empty());
        assert_eq!(empty.summary.average_score, 0.0);
    }

    #[test]
    fn avatar_icon_is_stable_per_user() {
        assert_eq!(avatar_icon("user-1"), avatar_icon("user-1"));
        // same-length names no longer collapse onto one icon
        let icons: std::collections::HashSet<_> =
            ["aaaa", "bbbb", "cccc", "dddd", "eeee", "ffff"].iter().map(|id| avatar_icon(id)).collect();
        assert!(icons.len() > 1);
    }

    #[test]
    fn avatar_url_wins_over_icon() {
        let mut r = row("a", 1, 0, 0);
        r.avatar_url = Some("https://cdn/a.png".to_string());
        let view = LeaderboardView::build(vec![r], Period::Month, LeaderboardCategory::All);
        assert_eq!(view.podium[0].avatar, Avatar::Url("https://cdn/a.png".to_string()));
    }
}
