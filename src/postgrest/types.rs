//! Types for the record store

use std::fmt;

/// Tables owned by the remote data store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Table {
    Profiles,
    Issues,
    IssueVotes,
    IssueComments,
    CommunityPosts,
    Tenders,
    Bids,
    Feedback,
    Notifications,
    MunicipalOfficials,
}

impl Table {
    pub const ALL: [Table; 10] = [
        Table::Profiles,
        Table::Issues,
        Table::IssueVotes,
        Table::IssueComments,
        Table::CommunityPosts,
        Table::Tenders,
        Table::Bids,
        Table::Feedback,
        Table::Notifications,
        Table::MunicipalOfficials,
    ];

    /// Look a table up by its REST name
    pub fn from_name(name: &str) -> Option<Table> {
        Table::ALL.into_iter().find(|t| t.as_str() == name)
    }

    /// Convert the table to its REST path segment
    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Profiles => "profiles",
            Table::Issues => "issues",
            Table::IssueVotes => "issue_votes",
            Table::IssueComments => "issue_comments",
            Table::CommunityPosts => "community_posts",
            Table::Tenders => "tenders",
            Table::Bids => "bids",
            Table::Feedback => "feedback",
            Table::Notifications => "notifications",
            Table::MunicipalOfficials => "municipal_officials",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    /// Convert the order to its string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Ascending => "asc",
            SortOrder::Descending => "desc",
        }
    }
}
