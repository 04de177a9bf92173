//! GitHub API payload shapes
//!
//! REST payloads keep GitHub's snake_case field names; GraphQL payloads
//! are camelCase per the schema. Both sides are passed through to API
//! consumers unchanged.

use serde::{Deserialize, Serialize};

use crate::auth::UserProfile;

/// Authenticated user profile (`GET /user`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubUser {
    pub login: String,
    pub id: u64,
    pub avatar_url: String,
    pub html_url: String,
    pub name: Option<String>,
    pub company: Option<String>,
    pub blog: Option<String>,
    pub location: Option<String>,
    pub email: Option<String>,
    pub bio: Option<String>,
    pub public_repos: u64,
    pub public_gists: u64,
    pub followers: u64,
    pub following: u64,
    pub created_at: String,
    pub updated_at: String,
}

impl From<GitHubUser> for UserProfile {
    /// The identity snapshot carried in the session claims.
    fn from(user: GitHubUser) -> Self {
        UserProfile {
            login: user.login,
            id: user.id,
            name: user.name,
            email: user.email,
            avatar_url: user.avatar_url,
        }
    }
}

/// Repository summary (`GET /user/repos`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubRepo {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    pub private: bool,
    pub html_url: String,
    pub description: Option<String>,
    pub fork: bool,
    pub created_at: String,
    pub updated_at: String,
    pub pushed_at: Option<String>,
    pub homepage: Option<String>,
    pub size: u64,
    pub stargazers_count: u64,
    pub watchers_count: u64,
    pub language: Option<String>,
    pub forks_count: u64,
    pub open_issues_count: u64,
    pub default_branch: String,
}

/// User activity event (`GET /user/events`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub actor: EventActor,
    pub repo: EventRepo,
    pub created_at: String,
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventActor {
    pub id: u64,
    pub login: String,
    pub display_login: Option<String>,
    pub avatar_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRepo {
    pub id: u64,
    pub name: String,
    pub url: String,
}

// =============================================================================
// GraphQL commit shapes
// =============================================================================

/// Commit object as returned by the GraphQL API
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitHubCommit {
    pub oid: String,
    pub message: String,
    pub committed_date: String,
    pub author: Option<CommitAuthor>,
    pub additions: u64,
    pub deletions: u64,
    pub changed_files: u64,
}

/// Git author attached to a GraphQL commit; name and email come from
/// git metadata and can each be null.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitAuthor {
    pub name: Option<String>,
    pub email: Option<String>,
}

/// One page of a repository's default-branch commit history
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitPage {
    pub commits: Vec<GitHubCommit>,
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

/// Envelope for the commit-with-files query
#[derive(Debug, Deserialize)]
pub struct CommitQueryData {
    pub repository: Option<CommitRepository>,
}

#[derive(Debug, Deserialize)]
pub struct CommitRepository {
    pub object: Option<GitHubCommit>,
}

/// Envelope for the repository-commits query
#[derive(Debug, Deserialize)]
pub struct RepositoryCommitsData {
    pub repository: Option<RepositoryWithHistory>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryWithHistory {
    pub default_branch_ref: Option<DefaultBranchRef>,
}

#[derive(Debug, Deserialize)]
pub struct DefaultBranchRef {
    pub target: Option<HistoryTarget>,
}

/// The ref target is only a commit for branches; `history` is absent
/// otherwise.
#[derive(Debug, Deserialize)]
pub struct HistoryTarget {
    pub history: Option<CommitHistory>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitHistory {
    pub nodes: Vec<GitHubCommit>,
    pub page_info: PageInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

// =============================================================================
// REST commit detail shapes
// =============================================================================

/// Detailed commit with per-file diffs
/// (`GET /repos/{owner}/{repo}/commits/{sha}`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubCommitDetail {
    pub sha: String,
    pub commit: CommitInfo,
    pub stats: CommitStats,
    #[serde(default)]
    pub files: Vec<CommitFile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitInfo {
    pub message: String,
    pub author: Option<CommitIdentity>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitIdentity {
    pub name: Option<String>,
    pub email: Option<String>,
    pub date: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitStats {
    pub total: u64,
    pub additions: u64,
    pub deletions: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitFile {
    pub filename: String,
    pub status: String,
    pub additions: u64,
    pub deletions: u64,
    pub changes: u64,
    /// Unified diff; absent for binary or oversized files
    pub patch: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graphql_commit_history_envelope_parses() {
        let data: RepositoryCommitsData = serde_json::from_value(serde_json::json!({
            "repository": {
                "defaultBranchRef": {
                    "target": {
                        "history": {
                            "nodes": [{
                                "oid": "abc123",
                                "message": "Fix login redirect",
                                "committedDate": "2024-05-01T12:00:00Z",
                                "author": { "name": "Octo Cat", "email": "octo@example.com" },
                                "additions": 10,
                                "deletions": 2,
                                "changedFiles": 1
                            }],
                            "pageInfo": { "hasNextPage": true, "endCursor": "cursor-1" }
                        }
                    }
                }
            }
        }))
        .expect("envelope parses");

        let history = data
            .repository
            .unwrap()
            .default_branch_ref
            .unwrap()
            .target
            .unwrap()
            .history
            .unwrap();
        assert_eq!(history.nodes.len(), 1);
        assert_eq!(history.nodes[0].oid, "abc123");
        assert!(history.page_info.has_next_page);
        assert_eq!(history.page_info.end_cursor.as_deref(), Some("cursor-1"));
    }

    #[test]
    fn empty_repository_envelope_parses_to_none() {
        let data: RepositoryCommitsData =
            serde_json::from_value(serde_json::json!({ "repository": null }))
                .expect("null repository parses");
        assert!(data.repository.is_none());

        // A ref target that is not a commit carries no history.
        let data: RepositoryCommitsData = serde_json::from_value(serde_json::json!({
            "repository": { "defaultBranchRef": { "target": {} } }
        }))
        .expect("non-commit target parses");
        let target = data
            .repository
            .unwrap()
            .default_branch_ref
            .unwrap()
            .target
            .unwrap();
        assert!(target.history.is_none());
    }

    #[test]
    fn commit_detail_defaults_missing_files_to_empty() {
        let detail: GitHubCommitDetail = serde_json::from_value(serde_json::json!({
            "sha": "abc123",
            "commit": { "message": "msg", "author": null },
            "stats": { "total": 3, "additions": 2, "deletions": 1 }
        }))
        .expect("detail parses");
        assert!(detail.files.is_empty());
    }
}
