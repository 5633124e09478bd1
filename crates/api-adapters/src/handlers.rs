//! # Handlers
//!
//! Translate HTTP requests into service calls. Query defaults (`sort=flat`,
//! no limit, ascending) are applied here and nowhere else.

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use domains::{
    CreateOutcome, Direction, NewForum, NewPost, NewThread, NewUser, NewVote, PageSize, PostId,
    PostUpdate, Related, SortMode, ThreadListQuery, ThreadRef, ThreadUpdate, UserListQuery,
    UserUpdate,
};
use serde::Deserialize;
use services::{PostListing, Registration};

use crate::error::{ApiError, ApiResult};
use crate::AppState;

const OPENMETRICS: &str = "application/openmetrics-text; version=1.0.0; charset=utf-8";

fn created_or_existing<T: serde::Serialize>(outcome: CreateOutcome<T>) -> Response {
    match outcome {
        CreateOutcome::Created(entity) => (StatusCode::CREATED, Json(entity)).into_response(),
        CreateOutcome::AlreadyExists(entity) => (StatusCode::CONFLICT, Json(entity)).into_response(),
    }
}

// ── Users ───────────────────────────────────────────────────────────────────

pub async fn create_user(
    State(state): State<AppState>,
    Path(nickname): Path<String>,
    Json(profile): Json<NewUser>,
) -> ApiResult<Response> {
    Ok(match state.services.users.register(&nickname, profile).await? {
        Registration::Created(user) => (StatusCode::CREATED, Json(user)).into_response(),
        Registration::Taken(users) => (StatusCode::CONFLICT, Json(users)).into_response(),
    })
}

pub async fn user_profile(State(state): State<AppState>, Path(nickname): Path<String>) -> ApiResult<Response> {
    let user = state.services.users.profile(&nickname).await?;
    Ok(Json(user).into_response())
}

pub async fn update_user(
    State(state): State<AppState>,
    Path(nickname): Path<String>,
    Json(update): Json<UserUpdate>,
) -> ApiResult<Response> {
    let user = state.services.users.update_profile(&nickname, update).await?;
    Ok(Json(user).into_response())
}

// ── Forums ──────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ForumUsersParams {
    pub limit: Option<i64>,
    pub since: Option<String>,
    pub desc: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ForumThreadsParams {
    pub limit: Option<i64>,
    pub since: Option<String>,
    pub desc: Option<bool>,
}

pub async fn create_forum(State(state): State<AppState>, Json(forum): Json<NewForum>) -> ApiResult<Response> {
    Ok(created_or_existing(state.services.forums.create(forum).await?))
}

pub async fn forum_details(State(state): State<AppState>, Path(slug): Path<String>) -> ApiResult<Response> {
    let forum = state.services.forums.details(&slug).await?;
    Ok(Json(forum).into_response())
}

pub async fn create_thread(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(thread): Json<NewThread>,
) -> ApiResult<Response> {
    Ok(created_or_existing(state.services.threads.create(&slug, thread).await?))
}

pub async fn forum_users(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(params): Query<ForumUsersParams>,
) -> ApiResult<Response> {
    let query = UserListQuery {
        size: PageSize::from_limit(params.limit.unwrap_or(0)),
        since: params.since.filter(|s| !s.is_empty()),
        direction: Direction::from_desc(params.desc.unwrap_or(false)),
    };
    let users = state.services.users.forum_users(&slug, &query).await?;
    Ok(Json(users).into_response())
}

pub async fn forum_threads(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(params): Query<ForumThreadsParams>,
) -> ApiResult<Response> {
    let since = match params.since.as_deref().filter(|s| !s.is_empty()) {
        Some(raw) => Some(
            DateTime::parse_from_rfc3339(raw)
                .map_err(|e| ApiError::BadParam { name: "since", reason: e.to_string() })?
                .with_timezone(&Utc),
        ),
        None => None,
    };
    let query = ThreadListQuery {
        size: PageSize::from_limit(params.limit.unwrap_or(0)),
        since,
        direction: Direction::from_desc(params.desc.unwrap_or(false)),
    };
    let threads = state.services.threads.forum_threads(&slug, &query).await?;
    Ok(Json(threads).into_response())
}

// ── Threads ─────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ThreadPostsParams {
    pub limit: Option<i64>,
    pub since: Option<PostId>,
    pub sort: Option<String>,
    pub desc: Option<bool>,
}

impl ThreadPostsParams {
    fn listing(self) -> ApiResult<PostListing> {
        let sort: SortMode = self.sort.as_deref().filter(|s| !s.is_empty()).unwrap_or("flat").parse()?;
        Ok(PostListing {
            limit: self.limit.unwrap_or(0),
            since: self.since.unwrap_or(0),
            sort,
            desc: self.desc.unwrap_or(false),
        })
    }
}

pub async fn thread_details(State(state): State<AppState>, Path(thread): Path<String>) -> ApiResult<Response> {
    let thread = state.services.threads.details(&ThreadRef::parse(&thread)).await?;
    Ok(Json(thread).into_response())
}

pub async fn update_thread(
    State(state): State<AppState>,
    Path(thread): Path<String>,
    Json(update): Json<ThreadUpdate>,
) -> ApiResult<Response> {
    let thread = state.services.threads.update(&ThreadRef::parse(&thread), update).await?;
    Ok(Json(thread).into_response())
}

pub async fn add_posts(
    State(state): State<AppState>,
    Path(thread): Path<String>,
    Json(batch): Json<Vec<NewPost>>,
) -> ApiResult<Response> {
    let posts = state.services.posts.add_posts(&ThreadRef::parse(&thread), batch).await?;
    Ok((StatusCode::CREATED, Json(posts)).into_response())
}

pub async fn thread_posts(
    State(state): State<AppState>,
    Path(thread): Path<String>,
    Query(params): Query<ThreadPostsParams>,
) -> ApiResult<Response> {
    let listing = params.listing()?;
    let posts = state.services.posts.thread_posts(&ThreadRef::parse(&thread), listing).await?;
    Ok(Json(posts).into_response())
}

pub async fn vote(
    State(state): State<AppState>,
    Path(thread): Path<String>,
    Json(vote): Json<NewVote>,
) -> ApiResult<Response> {
    let thread = state.services.threads.vote(&ThreadRef::parse(&thread), vote).await?;
    Ok(Json(thread).into_response())
}

// ── Posts ───────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct PostDetailsParams {
    pub related: Option<String>,
}

pub async fn post_details(
    State(state): State<AppState>,
    Path(id): Path<PostId>,
    Query(params): Query<PostDetailsParams>,
) -> ApiResult<Response> {
    let related = Related::parse_list(params.related.as_deref().unwrap_or_default());
    let details = state.services.posts.details(id, &related).await?;
    Ok(Json(details).into_response())
}

pub async fn edit_post(
    State(state): State<AppState>,
    Path(id): Path<PostId>,
    Json(update): Json<PostUpdate>,
) -> ApiResult<Response> {
    let post = state.services.posts.edit(id, update).await?;
    Ok(Json(post).into_response())
}

// ── Service ─────────────────────────────────────────────────────────────────

pub async fn status(State(state): State<AppState>) -> ApiResult<Response> {
    let status = state.services.status.status().await?;
    Ok(Json(status).into_response())
}

pub async fn clear(State(state): State<AppState>) -> ApiResult<Response> {
    state.services.status.clear().await?;
    Ok(StatusCode::OK.into_response())
}

pub async fn metrics(State(state): State<AppState>) -> ApiResult<Response> {
    let body = state.metrics.encode()?;
    Ok(([(header::CONTENT_TYPE, OPENMETRICS)], body).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_sort_defaults_to_flat() {
        let listing = ThreadPostsParams::default().listing().unwrap();
        assert_eq!(listing, PostListing::default());
    }

    #[test]
    fn sort_and_cursor_are_carried_through() {
        let params = ThreadPostsParams {
            limit: Some(3),
            since: Some(42),
            sort: Some("parent_tree".into()),
            desc: Some(true),
        };
        let listing = params.listing().unwrap();
        assert_eq!(listing.sort, SortMode::ParentTree);
        assert_eq!((listing.limit, listing.since, listing.desc), (3, 42, true));
    }

    #[test]
    fn unknown_sort_is_a_bad_request() {
        let params = ThreadPostsParams { sort: Some("random".into()), ..Default::default() };
        let err = params.listing().unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}
