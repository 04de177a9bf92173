//! GitHub API access
//!
//! Thin data-fetch layer over GitHub's REST and GraphQL APIs. No state
//! beyond the shared HTTP client; upstream failures are forwarded, not
//! recovered.

pub mod commits;
pub mod graphql;
pub mod models;
pub mod rest;

use std::sync::Arc;

pub use commits::{
    format_commit_detail, get_commit_detail_with_diffs, get_commit_with_files,
    get_repository_commits,
};
pub use rest::{EventListOptions, RepoListOptions};

use crate::config::GitHubConfig;

/// Facade over the REST and GraphQL clients
#[derive(Clone)]
pub struct GitHubClient {
    pub rest: rest::RestClient,
    pub graphql: graphql::GraphQlClient,
}

impl GitHubClient {
    pub fn new(http: Arc<reqwest::Client>, config: &GitHubConfig) -> Self {
        Self {
            rest: rest::RestClient::new(http.clone(), config.api_base_url.clone()),
            graphql: graphql::GraphQlClient::new(http, config.graphql_url.clone()),
        }
    }
}
