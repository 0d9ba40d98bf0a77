pub mod otp;
pub mod profile;

use chrono::{DateTime, Utc};
use hirewire_common::error::Result;
use hirewire_common::{Error, Role};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    pub is_staff: bool,
    pub is_active: bool,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Parsed account role. The column carries a CHECK constraint over the
    /// same set, so the fallback is unreachable for persisted rows.
    pub fn role(&self) -> Role {
        Role::parse(&self.role).unwrap_or(Role::Employee)
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// Register a new account. Created inactive and unverified; activation
    /// happens through OTP verification.
    pub async fn create(
        email: &str,
        password_hash: &str,
        first_name: &str,
        last_name: &str,
        role: Role,
        pool: &PgPool,
    ) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO users (email, password_hash, first_name, last_name, role, is_active, email_verified)
            VALUES (LOWER($1), $2, $3, $4, $5, FALSE, FALSE)
            RETURNING *
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .bind(first_name)
        .bind(last_name)
        .bind(role.as_str())
        .fetch_one(pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                Error::validation("an account with this email already exists")
            }
            _ => e.into(),
        })
    }

    pub async fn find_by_id(id: Uuid, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn find_by_email(email: &str, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM users WHERE email = LOWER($1)")
            .bind(email)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    /// Activate the account after a successful OTP verification.
    pub async fn mark_verified(email: &str, pool: &PgPool) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            r#"
            UPDATE users
            SET is_active = TRUE, email_verified = TRUE, updated_at = NOW()
            WHERE email = LOWER($1)
            RETURNING *
            "#,
        )
        .bind(email)
        .fetch_optional(pool)
        .await?
        .ok_or(Error::NotFound("user"))
    }

    pub async fn set_password(id: Uuid, password_hash: &str, pool: &PgPool) -> Result<()> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound("user"));
        }
        Ok(())
    }
}

/// Directory entry for the user listing: identity plus the aggregate
/// counts the feed UI renders next to each account.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct UserSummary {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    pub followers_count: i64,
    pub following_count: i64,
    pub posts_count: i64,
}

impl UserSummary {
    pub async fn list(limit: i64, offset: i64, pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            r#"
            SELECT
                u.id, u.email, u.first_name, u.last_name, u.role,
                (SELECT COUNT(*) FROM follows f WHERE f.following_id = u.id) AS followers_count,
                (SELECT COUNT(*) FROM follows f WHERE f.follower_id = u.id) AS following_count,
                (SELECT COUNT(*) FROM posts p WHERE p.author_id = u.id AND p.is_active) AS posts_count
            FROM users u
            WHERE u.is_active
            ORDER BY u.created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn count(pool: &PgPool) -> Result<i64> {
        let row =
            sqlx::query_as::<_, (i64,)>("SELECT COUNT(*) FROM users WHERE is_active")
                .fetch_one(pool)
                .await?;
        Ok(row.0)
    }
}
