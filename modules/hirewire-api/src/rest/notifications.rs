//! Per-recipient notification feed.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Json};
use uuid::Uuid;

use hirewire_domains::notifications::Notification;

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::AppState;

pub async fn list(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> ApiResult<impl IntoResponse> {
    let notifications = Notification::list_for(user.id, &state.pool).await?;
    let total = notifications.len() as i64;
    Ok(super::listing(total, notifications))
}

pub async fn mark_read(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    Notification::mark_read(id, user.id, &state.pool).await?;
    Ok(super::detail("Notification marked as read."))
}

pub async fn mark_all_read(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> ApiResult<impl IntoResponse> {
    let updated = Notification::mark_all_read(user.id, &state.pool).await?;
    Ok(Json(serde_json::json!({
        "detail": "All notifications marked as read.",
        "updated": updated,
    })))
}

pub async fn unread_count(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> ApiResult<impl IntoResponse> {
    let count = Notification::unread_count(user.id, &state.pool).await?;
    Ok(Json(serde_json::json!({ "unread_count": count })))
}
