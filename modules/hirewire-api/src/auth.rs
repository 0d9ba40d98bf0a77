use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, StatusCode},
    response::{IntoResponse, Json, Response},
};

use hirewire_domains::users::User;

use crate::AppState;

/// Authenticated user. Extract this in handlers that require auth.
///
/// Expects `Authorization: Bearer <access token>`; loads the full user row
/// so handlers get role and staff flags without another query. Inactive
/// accounts are rejected even with a valid token.
pub struct AuthUser(pub User);

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or_else(|| unauthorized("missing bearer token"))?;

        let user_id = state
            .jwt
            .verify_access(token)
            .map_err(|_| unauthorized("invalid or expired token"))?;

        let user = User::find_by_id(user_id, &state.pool)
            .await
            .map_err(|e| crate::error::ApiError(e).into_response())?
            .filter(|u| u.is_active)
            .ok_or_else(|| unauthorized("account not found or inactive"))?;

        Ok(AuthUser(user))
    }
}

fn unauthorized(detail: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({ "detail": detail })),
    )
        .into_response()
}
