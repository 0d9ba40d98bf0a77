//! Follow graph endpoints. Accept/reject are addressed by the requester's
//! user id: the authenticated user is always the recipient side of the
//! pending edge.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use serde::Deserialize;
use uuid::Uuid;

use hirewire_common::Error;
use hirewire_domains::social::{Follow, FollowCounts};
use hirewire_domains::users::{User, UserSummary};

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::AppState;

#[derive(Deserialize)]
pub struct ListQuery {
    limit: Option<i64>,
    offset: Option<i64>,
}

pub async fn list_users(
    State(state): State<Arc<AppState>>,
    AuthUser(_user): AuthUser,
    Query(params): Query<ListQuery>,
) -> ApiResult<impl IntoResponse> {
    let limit = params.limit.unwrap_or(50).min(200);
    let offset = params.offset.unwrap_or(0);

    let users = UserSummary::list(limit, offset, &state.pool).await?;
    let total = UserSummary::count(&state.pool).await?;
    Ok(super::listing(total, users))
}

pub async fn follow(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let target = User::find_by_id(id, &state.pool)
        .await?
        .filter(|u| u.is_active)
        .ok_or(Error::NotFound("user"))?;

    Follow::request(&user, &target, &state.pool).await?;
    Ok((StatusCode::CREATED, super::detail("Follow request sent.")))
}

pub async fn unfollow(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    Follow::unfollow(user.id, id, &state.pool).await?;
    Ok(super::detail("Unfollowed."))
}

pub async fn accept_follow(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    Follow::respond(user.id, id, true, &state.pool).await?;
    Ok(super::detail("Follow request accepted."))
}

pub async fn reject_follow(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    Follow::respond(user.id, id, false, &state.pool).await?;
    Ok(super::detail("Follow request rejected."))
}

pub async fn followers(
    State(state): State<Arc<AppState>>,
    AuthUser(_user): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let peers = Follow::followers(id, &state.pool).await?;
    let total = peers.len() as i64;
    Ok(super::listing(total, peers))
}

pub async fn following(
    State(state): State<Arc<AppState>>,
    AuthUser(_user): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let peers = Follow::following(id, &state.pool).await?;
    let total = peers.len() as i64;
    Ok(super::listing(total, peers))
}

pub async fn follow_counts(
    State(state): State<Arc<AppState>>,
    AuthUser(_user): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let counts = FollowCounts::load(id, &state.pool).await?;
    Ok(Json(counts))
}
