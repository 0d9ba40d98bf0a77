//! HTTP mapping for domain errors.
//!
//! One asymmetry is deliberate and load-bearing for clients: a duplicate
//! like is 409 with the current count echoed back, while a duplicate job
//! application is a plain 400.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use tracing::warn;

use hirewire_common::Error;

pub struct ApiError(pub Error);

pub type ApiResult<T> = Result<T, ApiError>;

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;
        let (status, body) = match &err {
            Error::Validation(_)
            | Error::SelfFollow
            | Error::SelfApplication
            | Error::AlreadyApplied
            | Error::ImageLimit(_) => (
                StatusCode::BAD_REQUEST,
                serde_json::json!({ "detail": err.to_string() }),
            ),
            Error::NotFound(_) => (
                StatusCode::NOT_FOUND,
                serde_json::json!({ "detail": err.to_string() }),
            ),
            Error::Permission(_) | Error::FollowRoleViolation(_) => (
                StatusCode::FORBIDDEN,
                serde_json::json!({ "detail": err.to_string() }),
            ),
            Error::InvalidCredentials | Error::EmailNotVerified | Error::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                serde_json::json!({ "detail": err.to_string() }),
            ),
            Error::AlreadyFollowing => (
                StatusCode::CONFLICT,
                serde_json::json!({ "detail": err.to_string() }),
            ),
            Error::AlreadyLiked { likes_count } => (
                StatusCode::CONFLICT,
                serde_json::json!({
                    "detail": err.to_string(),
                    "likes_count": likes_count,
                    "liked": true,
                }),
            ),
            // No like edge to remove reads as a missing resource, with the
            // current state echoed so clients can reconcile.
            Error::NotLiked { likes_count } => (
                StatusCode::NOT_FOUND,
                serde_json::json!({
                    "detail": err.to_string(),
                    "likes_count": likes_count,
                    "liked": false,
                }),
            ),
            Error::Database(e) => {
                warn!(error = %e, "database error while handling request");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    serde_json::json!({ "detail": "internal server error" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: Error) -> StatusCode {
        ApiError(err).into_response().status()
    }

    #[test]
    fn duplicate_like_is_conflict_but_duplicate_application_is_bad_request() {
        assert_eq!(
            status_of(Error::AlreadyLiked { likes_count: 3 }),
            StatusCode::CONFLICT
        );
        assert_eq!(status_of(Error::AlreadyApplied), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn unlike_without_like_is_not_found() {
        assert_eq!(
            status_of(Error::NotLiked { likes_count: 0 }),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn auth_errors_are_unauthorized() {
        assert_eq!(status_of(Error::InvalidCredentials), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(Error::EmailNotVerified), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(Error::InvalidToken), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn role_violations_are_forbidden() {
        assert_eq!(
            status_of(Error::FollowRoleViolation("nope".into())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(status_of(Error::Permission("job")), StatusCode::FORBIDDEN);
    }

    #[test]
    fn database_detail_is_hidden() {
        let response = ApiError(Error::Database(sqlx::Error::PoolClosed)).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
