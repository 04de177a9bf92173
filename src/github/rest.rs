//! GitHub REST API client
//!
//! Thin authenticated wrapper over `api.github.com`: every call is a
//! GET with a bearer token and the v3 JSON media type, and upstream
//! failures are forwarded as status-bearing errors rather than
//! retried.

use std::sync::Arc;

use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::models::{GitHubCommitDetail, GitHubEvent, GitHubRepo, GitHubUser};
use crate::error::AppError;
use crate::metrics::{GITHUB_REQUEST_DURATION_SECONDS, GITHUB_REQUESTS_TOTAL};

/// Options for listing the authenticated user's repositories
#[derive(Debug, Clone, Deserialize)]
pub struct RepoListOptions {
    /// Sort key: "created", "updated", "pushed", or "full_name"
    #[serde(default = "default_sort")]
    pub sort: String,
    /// Sort direction: "asc" or "desc"
    #[serde(default = "default_direction")]
    pub direction: String,
    /// Repositories per page (max 100)
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    /// Page number for pagination
    #[serde(default = "default_page")]
    pub page: u32,
}

impl Default for RepoListOptions {
    fn default() -> Self {
        Self {
            sort: default_sort(),
            direction: default_direction(),
            per_page: default_per_page(),
            page: default_page(),
        }
    }
}

fn default_sort() -> String {
    "updated".to_string()
}

fn default_direction() -> String {
    "desc".to_string()
}

fn default_per_page() -> u32 {
    30
}

fn default_page() -> u32 {
    1
}

/// Options for listing the authenticated user's activity events
#[derive(Debug, Clone, Deserialize)]
pub struct EventListOptions {
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    #[serde(default = "default_page")]
    pub page: u32,
}

impl Default for EventListOptions {
    fn default() -> Self {
        Self {
            per_page: default_per_page(),
            page: default_page(),
        }
    }
}

/// Authenticated REST client
#[derive(Clone)]
pub struct RestClient {
    http: Arc<reqwest::Client>,
    base_url: String,
}

impl RestClient {
    pub fn new(http: Arc<reqwest::Client>, base_url: String) -> Self {
        Self { http, base_url }
    }

    /// Make an authenticated request to the GitHub REST API.
    ///
    /// # Errors
    /// - Upstream 401 means the access token was rejected
    /// - Upstream 403 with an exhausted rate-limit header is surfaced
    ///   as a rate-limit error
    /// - Any other non-success status forwards the status and body
    async fn request<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
        access_token: &str,
    ) -> Result<T, AppError> {
        let url = format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        );

        let mut request = self
            .http
            .get(&url)
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Bearer {access_token}"),
            )
            .header(reqwest::header::ACCEPT, "application/vnd.github.v3+json");
        if !query.is_empty() {
            request = request.query(query);
        }

        let timer = GITHUB_REQUEST_DURATION_SECONDS
            .with_label_values(&["rest"])
            .start_timer();
        let response = request.send().await;
        timer.observe_duration();

        let response = match response {
            Ok(response) => response,
            Err(error) => {
                GITHUB_REQUESTS_TOTAL
                    .with_label_values(&["rest", "transport_error"])
                    .inc();
                return Err(error.into());
            }
        };

        let status = response.status();
        GITHUB_REQUESTS_TOTAL
            .with_label_values(&["rest", status.as_str()])
            .inc();

        if !status.is_success() {
            if status == StatusCode::UNAUTHORIZED {
                return Err(AppError::TokenRejected);
            }
            if status == StatusCode::FORBIDDEN && rate_limit_exhausted(&response) {
                return Err(AppError::RateLimited);
            }

            let message = response
                .text()
                .await
                .unwrap_or_else(|_| status.to_string());
            return Err(AppError::GitHub {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json::<T>().await?)
    }

    /// Fetch the authenticated user's profile (`GET /user`).
    pub async fn get_user(&self, access_token: &str) -> Result<GitHubUser, AppError> {
        self.request("/user", &[], access_token).await
    }

    /// Fetch the authenticated user's repositories (`GET /user/repos`).
    pub async fn get_user_repositories(
        &self,
        access_token: &str,
        options: &RepoListOptions,
    ) -> Result<Vec<GitHubRepo>, AppError> {
        let query = [
            ("sort", options.sort.clone()),
            ("direction", options.direction.clone()),
            ("per_page", options.per_page.to_string()),
            ("page", options.page.to_string()),
        ];
        self.request("/user/repos", &query, access_token).await
    }

    /// Fetch the authenticated user's recent activity events
    /// (`GET /user/events`).
    pub async fn get_user_activity(
        &self,
        access_token: &str,
        options: &EventListOptions,
    ) -> Result<Vec<GitHubEvent>, AppError> {
        let query = [
            ("per_page", options.per_page.to_string()),
            ("page", options.page.to_string()),
        ];
        self.request("/user/events", &query, access_token).await
    }

    /// Fetch detailed information about a specific commit, including
    /// file changes and diffs.
    pub async fn get_commit_detail(
        &self,
        owner: &str,
        repo: &str,
        commit_sha: &str,
        access_token: &str,
    ) -> Result<GitHubCommitDetail, AppError> {
        let endpoint = format!("/repos/{owner}/{repo}/commits/{commit_sha}");
        self.request(&endpoint, &[], access_token).await
    }
}

fn rate_limit_exhausted(response: &reqwest::Response) -> bool {
    response
        .headers()
        .get("x-ratelimit-remaining")
        .and_then(|value| value.to_str().ok())
        == Some("0")
}
