//! Read API handlers

use crate::models::{UserRecord, UserSummary};
use crate::server::auth::AuthenticatedUser;
use crate::server::{ApiError, AppState};
use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

/// Pagination parameters for `GET /users/`
#[derive(Debug, Deserialize)]
pub struct ListParams {
    /// Records to skip (default 0)
    pub skip: Option<u64>,
    /// Maximum records to return (unset means no bound)
    pub limit: Option<u64>,
}

/// Parameters for `GET /users/search`
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
}

/// Creates the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/", get(list_users))
        .route("/users/search", get(search_users))
        .route("/users/{login}", get(get_user))
        .with_state(state)
}

/// `GET /users/?skip=&limit=`: a slice of the dataset as summaries
async fn list_users(
    _user: AuthenticatedUser,
    State(state): State<AppState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<UserSummary>>, ApiError> {
    let Query(params) = params.map_err(|e| ApiError::InvalidQuery(e.body_text()))?;

    if params.limit == Some(0) {
        return Err(ApiError::InvalidQuery(
            "limit must be greater than or equal to 1".to_string(),
        ));
    }

    let skip = usize::try_from(params.skip.unwrap_or(0)).unwrap_or(usize::MAX);
    let limit = params
        .limit
        .map(|l| usize::try_from(l).unwrap_or(usize::MAX))
        .unwrap_or(usize::MAX);

    let page = state
        .users
        .iter()
        .skip(skip)
        .take(limit)
        .map(UserSummary::from)
        .collect();

    Ok(Json(page))
}

/// `GET /users/search?q=`: summaries whose login contains `q`, ignoring case
async fn search_users(
    _user: AuthenticatedUser,
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<Vec<UserSummary>>, ApiError> {
    let Query(params) = params.map_err(|e| ApiError::InvalidQuery(e.body_text()))?;

    let needle = match params.q {
        Some(q) if !q.is_empty() => q.to_lowercase(),
        _ => {
            return Err(ApiError::InvalidQuery(
                "q must contain at least 1 character".to_string(),
            ))
        }
    };

    let found = state
        .users
        .iter()
        .filter(|u| u.login.to_lowercase().contains(&needle))
        .map(UserSummary::from)
        .collect();

    Ok(Json(found))
}

/// `GET /users/{login}`: the full record for an exact login
async fn get_user(
    _user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(login): Path<String>,
) -> Result<Json<UserRecord>, ApiError> {
    state
        .users
        .iter()
        .find(|u| u.login == login)
        .cloned()
        .map(Json)
        .ok_or(ApiError::NotFound)
}
