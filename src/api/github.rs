//! GitHub proxy endpoints
//!
//! Each handler reads the evaluated session, forwards its query
//! parameters to the matching GitHub fetch, and returns the upstream
//! payload unchanged. A session without a usable access token (missing,
//! or error-bearing after a failed refresh) gets the contracted 401.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;

use crate::AppState;
use crate::auth::CurrentSession;
use crate::error::AppError;
use crate::github::{self, EventListOptions, RepoListOptions};

/// Create GitHub proxy router (nested under `/api/github`)
pub fn github_router() -> Router<AppState> {
    Router::new()
        .route("/user", get(get_user))
        .route("/repos", get(list_repositories))
        .route("/activity", get(list_activity))
        .route("/commits", get(list_commits))
        .route("/commits/:sha", get(commit_detail))
        .route("/commits/:sha/analyze", get(analyze_commit))
}

fn access_token(session: &crate::auth::Session) -> Result<&str, AppError> {
    session.access_token().ok_or(AppError::NotAuthenticated)
}

/// GET /api/github/user
///
/// Fetches the authenticated user's GitHub profile.
async fn get_user(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> Result<Response, AppError> {
    let token = access_token(&session)?;
    let user = state.github.rest.get_user(token).await?;
    Ok(Json(user).into_response())
}

/// GET /api/github/repos
///
/// Fetches the authenticated user's repositories.
///
/// Query parameters (all optional): `sort`, `direction`, `per_page`,
/// `page`. Forwarded to GitHub; defaults updated/desc/30/1.
async fn list_repositories(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Query(options): Query<RepoListOptions>,
) -> Result<Response, AppError> {
    let token = access_token(&session)?;
    let repos = state
        .github
        .rest
        .get_user_repositories(token, &options)
        .await?;
    Ok(Json(repos).into_response())
}

/// GET /api/github/activity
///
/// Fetches the authenticated user's recent activity events.
async fn list_activity(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Query(options): Query<EventListOptions>,
) -> Result<Response, AppError> {
    let token = access_token(&session)?;
    let events = state
        .github
        .rest
        .get_user_activity(token, &options)
        .await?;
    Ok(Json(events).into_response())
}

/// Query parameters for the commit listing endpoint
#[derive(Debug, Deserialize)]
struct CommitListParams {
    owner: Option<String>,
    repo: Option<String>,
    /// Specific commit SHA to fetch instead of a history page
    sha: Option<String>,
    /// Pagination cursor for fetching more commits
    cursor: Option<String>,
    /// Fetch detailed commit information with diffs (REST instead of
    /// GraphQL); only meaningful together with `sha`
    #[serde(default)]
    detailed: bool,
}

fn require_owner_repo(
    owner: Option<String>,
    repo: Option<String>,
) -> Result<(String, String), AppError> {
    match (owner, repo) {
        (Some(owner), Some(repo)) => Ok((owner, repo)),
        _ => Err(AppError::Validation(
            "Missing required parameters: owner and repo".to_string(),
        )),
    }
}

/// GET /api/github/commits
///
/// Fetches commits from a GitHub repository.
///
/// Query parameters:
/// - `owner`, `repo`: required
/// - `sha`: optional specific commit to fetch
/// - `cursor`: optional pagination cursor
/// - `detailed`: set to `true` to fetch diffs for the given `sha`
async fn list_commits(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Query(params): Query<CommitListParams>,
) -> Result<Response, AppError> {
    let token = access_token(&session)?;
    let (owner, repo) = require_owner_repo(params.owner, params.repo)?;

    if let Some(sha) = params.sha {
        if params.detailed {
            let detail =
                github::get_commit_detail_with_diffs(&state.github, &owner, &repo, &sha, token)
                    .await?;
            return Ok(Json(detail).into_response());
        }
        let commit =
            github::get_commit_with_files(&state.github, &owner, &repo, &sha, token).await?;
        return Ok(Json(commit).into_response());
    }

    let page = github::get_repository_commits(
        &state.github,
        &owner,
        &repo,
        token,
        params.cursor.as_deref(),
    )
    .await?;
    Ok(Json(page).into_response())
}

/// Query parameters identifying a repository
#[derive(Debug, Deserialize)]
struct OwnerRepoParams {
    owner: Option<String>,
    repo: Option<String>,
}

/// GET /api/github/commits/:sha
///
/// Fetches detailed information about a specific commit, including
/// file changes and diffs.
async fn commit_detail(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(sha): Path<String>,
    Query(params): Query<OwnerRepoParams>,
) -> Result<Response, AppError> {
    let token = access_token(&session)?;
    let (owner, repo) = require_owner_repo(params.owner, params.repo)?;

    let detail =
        github::get_commit_detail_with_diffs(&state.github, &owner, &repo, &sha, token).await?;
    Ok(Json(detail).into_response())
}

/// GET /api/github/commits/:sha/analyze
///
/// Fetches detailed commit information and renders the plain-text
/// report alongside it.
async fn analyze_commit(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(sha): Path<String>,
    Query(params): Query<OwnerRepoParams>,
) -> Result<Response, AppError> {
    let token = access_token(&session)?;
    let (owner, repo) = require_owner_repo(params.owner, params.repo)?;

    let detail =
        github::get_commit_detail_with_diffs(&state.github, &owner, &repo, &sha, token).await?;
    let formatted_data = github::format_commit_detail(&detail);

    Ok(Json(serde_json::json!({
        "commit": detail,
        "formatted_data": formatted_data,
    }))
    .into_response())
}
