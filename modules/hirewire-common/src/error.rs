use thiserror::Error;

/// Unified error taxonomy for domain operations. The API layer maps each
/// variant onto an HTTP status; nothing below this enum is retried.
#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("permission denied: {0}")]
    Permission(&'static str),

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("email is not verified")]
    EmailNotVerified,

    #[error("invalid or expired token")]
    InvalidToken,

    #[error("you cannot follow yourself")]
    SelfFollow,

    #[error("{0}")]
    FollowRoleViolation(String),

    #[error("already following this user")]
    AlreadyFollowing,

    #[error("post already liked")]
    AlreadyLiked { likes_count: i32 },

    #[error("post not liked")]
    NotLiked { likes_count: i32 },

    #[error("maximum {0} images allowed per post")]
    ImageLimit(usize),

    #[error("you cannot apply to your own job")]
    SelfApplication,

    #[error("already applied to this job")]
    AlreadyApplied,

    #[error("database error")]
    Database(#[from] sqlx::Error),
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
