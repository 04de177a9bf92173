//! GitHub GraphQL API client
//!
//! GraphQL reports failures two ways: a non-success status, or a 200
//! body carrying an `errors` array. Both are forwarded as errors.

use std::sync::Arc;

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::AppError;
use crate::metrics::{GITHUB_REQUEST_DURATION_SECONDS, GITHUB_REQUESTS_TOTAL};

/// Query to fetch a specific commit with its file-change summary
pub const COMMIT_WITH_FILES_QUERY: &str = r#"
  query GetCommitWithFiles($owner: String!, $repo: String!, $commitSha: String!) {
    repository(owner: $owner, name: $repo) {
      object(expression: $commitSha) {
        ... on Commit {
          oid
          message
          committedDate
          author {
            name
            email
          }
          additions
          deletions
          changedFiles
        }
      }
    }
  }
"#;

/// Query to fetch recent commits from a repository's default branch
pub const REPOSITORY_COMMITS_QUERY: &str = r#"
  query GetRepositoryCommits($owner: String!, $repo: String!, $cursor: String) {
    repository(owner: $owner, name: $repo) {
      defaultBranchRef {
        target {
          ... on Commit {
            history(first: 10, after: $cursor) {
              nodes {
                oid
                message
                committedDate
                author {
                  name
                  email
                }
                additions
                deletions
                changedFiles
              }
              pageInfo {
                hasNextPage
                endCursor
              }
            }
          }
        }
      }
    }
  }
"#;

#[derive(Debug, serde::Serialize)]
struct GraphQlRequest<'a> {
    query: &'a str,
    variables: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

/// Authenticated GraphQL client
#[derive(Clone)]
pub struct GraphQlClient {
    http: Arc<reqwest::Client>,
    url: String,
}

impl GraphQlClient {
    pub fn new(http: Arc<reqwest::Client>, url: String) -> Self {
        Self { http, url }
    }

    /// Execute a GraphQL query against the GitHub API.
    pub async fn execute<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: serde_json::Value,
        access_token: &str,
    ) -> Result<T, AppError> {
        let timer = GITHUB_REQUEST_DURATION_SECONDS
            .with_label_values(&["graphql"])
            .start_timer();
        let response = self
            .http
            .post(&self.url)
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Bearer {access_token}"),
            )
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&GraphQlRequest { query, variables })
            .send()
            .await;
        timer.observe_duration();

        let response = match response {
            Ok(response) => response,
            Err(error) => {
                GITHUB_REQUESTS_TOTAL
                    .with_label_values(&["graphql", "transport_error"])
                    .inc();
                return Err(error.into());
            }
        };

        let status = response.status();
        GITHUB_REQUESTS_TOTAL
            .with_label_values(&["graphql", status.as_str()])
            .inc();

        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| status.to_string());
            return Err(AppError::GitHub {
                status: status.as_u16(),
                message,
            });
        }

        let body: GraphQlResponse<T> = response.json().await?;

        // GraphQL can return errors even with a 200 status code.
        if let Some(errors) = body.errors {
            if !errors.is_empty() {
                let messages: Vec<String> = errors.into_iter().map(|e| e.message).collect();
                return Err(AppError::GraphQl(messages.join("; ")));
            }
        }

        body.data
            .ok_or_else(|| AppError::GraphQl("response carried no data".to_string()))
    }
}
