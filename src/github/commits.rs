//! Commit browsing service
//!
//! Fetches commit data over GraphQL (summaries, history pages) and REST
//! (full per-file diffs), and renders the plain-text commit report used
//! by the analyze endpoint.

use super::GitHubClient;
use super::graphql::{COMMIT_WITH_FILES_QUERY, REPOSITORY_COMMITS_QUERY};
use super::models::{
    CommitPage, CommitQueryData, GitHubCommit, GitHubCommitDetail, RepositoryCommitsData,
};
use crate::error::AppError;

/// Fetch a specific commit with its file-change summary.
///
/// # Errors
/// Not-found when the repository exists but the SHA resolves to nothing.
pub async fn get_commit_with_files(
    github: &GitHubClient,
    owner: &str,
    repo: &str,
    commit_sha: &str,
    access_token: &str,
) -> Result<GitHubCommit, AppError> {
    let data: CommitQueryData = github
        .graphql
        .execute(
            COMMIT_WITH_FILES_QUERY,
            serde_json::json!({ "owner": owner, "repo": repo, "commitSha": commit_sha }),
            access_token,
        )
        .await?;

    data.repository
        .and_then(|repository| repository.object)
        .ok_or_else(|| AppError::NotFound(format!("Commit not found: {commit_sha}")))
}

/// Fetch one page of recent commits from a repository's default branch.
///
/// Pass the previous page's `end_cursor` to continue.
pub async fn get_repository_commits(
    github: &GitHubClient,
    owner: &str,
    repo: &str,
    access_token: &str,
    cursor: Option<&str>,
) -> Result<CommitPage, AppError> {
    let data: RepositoryCommitsData = github
        .graphql
        .execute(
            REPOSITORY_COMMITS_QUERY,
            serde_json::json!({ "owner": owner, "repo": repo, "cursor": cursor }),
            access_token,
        )
        .await?;

    let history = data
        .repository
        .and_then(|repository| repository.default_branch_ref)
        .and_then(|branch| branch.target)
        .and_then(|target| target.history)
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "Repository not found or has no default branch: {owner}/{repo}"
            ))
        })?;

    Ok(CommitPage {
        commits: history.nodes,
        has_next_page: history.page_info.has_next_page,
        end_cursor: history.page_info.end_cursor,
    })
}

/// Fetch detailed commit information including file changes and diffs.
pub async fn get_commit_detail_with_diffs(
    github: &GitHubClient,
    owner: &str,
    repo: &str,
    commit_sha: &str,
    access_token: &str,
) -> Result<GitHubCommitDetail, AppError> {
    github
        .rest
        .get_commit_detail(owner, repo, commit_sha, access_token)
        .await
}

/// Render a detailed commit as a plain-text report: header, change
/// summary, and the per-file diffs where GitHub supplied them.
pub fn format_commit_detail(detail: &GitHubCommitDetail) -> String {
    let author = detail.commit.author.as_ref();
    let author_name = author
        .and_then(|a| a.name.as_deref())
        .unwrap_or("unknown");
    let author_email = author
        .and_then(|a| a.email.as_deref())
        .unwrap_or("unknown");
    let author_date = author.and_then(|a| a.date.as_deref()).unwrap_or("unknown");

    let mut formatted = format!("Commit: {}\n", detail.sha);
    formatted += &format!("Author: {author_name} <{author_email}>\n");
    formatted += &format!("Date: {author_date}\n");
    formatted += &format!("Message: {}\n\n", detail.commit.message);

    formatted += "Changes Summary:\n";
    formatted += &format!("- {} files changed\n", detail.files.len());
    formatted += &format!("- {} additions\n", detail.stats.additions);
    formatted += &format!("- {} deletions\n\n", detail.stats.deletions);

    formatted += "File Changes:\n";
    for file in &detail.files {
        formatted += &format!("\nFile: {}\n", file.filename);
        formatted += &format!("Status: {}\n", file.status);
        formatted += &format!("Changes: +{} -{}\n", file.additions, file.deletions);
        if let Some(patch) = &file.patch {
            formatted += &format!("Diff:\n{patch}\n");
        }
    }

    formatted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::models::{CommitFile, CommitIdentity, CommitInfo, CommitStats};

    fn sample_detail() -> GitHubCommitDetail {
        GitHubCommitDetail {
            sha: "abc123def456".to_string(),
            commit: CommitInfo {
                message: "Fix login redirect".to_string(),
                author: Some(CommitIdentity {
                    name: Some("Octo Cat".to_string()),
                    email: Some("octo@example.com".to_string()),
                    date: Some("2024-05-01T12:00:00Z".to_string()),
                }),
            },
            stats: CommitStats {
                total: 12,
                additions: 10,
                deletions: 2,
            },
            files: vec![
                CommitFile {
                    filename: "src/login.rs".to_string(),
                    status: "modified".to_string(),
                    additions: 10,
                    deletions: 2,
                    changes: 12,
                    patch: Some("@@ -1 +1 @@\n-old\n+new".to_string()),
                },
                CommitFile {
                    filename: "assets/logo.png".to_string(),
                    status: "added".to_string(),
                    additions: 0,
                    deletions: 0,
                    changes: 0,
                    patch: None,
                },
            ],
        }
    }

    #[test]
    fn report_includes_header_summary_and_diffs() {
        let report = format_commit_detail(&sample_detail());

        assert!(report.starts_with("Commit: abc123def456\n"));
        assert!(report.contains("Author: Octo Cat <octo@example.com>\n"));
        assert!(report.contains("- 2 files changed\n"));
        assert!(report.contains("- 10 additions\n"));
        assert!(report.contains("File: src/login.rs\n"));
        assert!(report.contains("Diff:\n@@ -1 +1 @@\n-old\n+new\n"));
        // Binary files have no diff section.
        assert!(report.contains("File: assets/logo.png\nStatus: added\nChanges: +0 -0\n"));
    }

    #[test]
    fn report_tolerates_missing_author() {
        let mut detail = sample_detail();
        detail.commit.author = None;

        let report = format_commit_detail(&detail);
        assert!(report.contains("Author: unknown <unknown>\n"));
    }
}
