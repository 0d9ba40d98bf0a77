//! Directed follow graph with a pending/accepted/rejected lifecycle.
//!
//! Uniqueness is per ordered pair: any existing edge, whatever its status,
//! blocks a new request. A rejected requester can only try again after the
//! edge is removed via unfollow.

use chrono::{DateTime, Utc};
use hirewire_common::error::Result;
use hirewire_common::{Error, FollowStatus, NotificationType, Role};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::notifications;
use crate::users::User;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Follow {
    pub id: Uuid,
    pub follower_id: Uuid,
    pub following_id: Uuid,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Role-pairing rules: companies follow only companies, and employees never
/// follow other employees.
pub fn check_role_pairing(follower: Role, following: Role) -> Result<()> {
    if follower == Role::Company && following != Role::Company {
        return Err(Error::FollowRoleViolation(
            "companies can only follow other companies".into(),
        ));
    }
    if follower == Role::Employee && following == Role::Employee {
        return Err(Error::FollowRoleViolation(
            "employees cannot follow other employees".into(),
        ));
    }
    Ok(())
}

impl Follow {
    /// Create a follow request (status = pending) and notify the target in
    /// the same transaction.
    pub async fn request(follower: &User, following: &User, pool: &PgPool) -> Result<Self> {
        if follower.id == following.id {
            return Err(Error::SelfFollow);
        }
        check_role_pairing(follower.role(), following.role())?;

        let exists = sqlx::query_as::<_, (bool,)>(
            "SELECT EXISTS (SELECT 1 FROM follows WHERE follower_id = $1 AND following_id = $2)",
        )
        .bind(follower.id)
        .bind(following.id)
        .fetch_one(pool)
        .await?
        .0;
        if exists {
            return Err(Error::AlreadyFollowing);
        }

        let mut tx = pool.begin().await?;

        let edge = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO follows (follower_id, following_id, status)
            VALUES ($1, $2, 'pending')
            RETURNING *
            "#,
        )
        .bind(follower.id)
        .bind(following.id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match &e {
            // Lost the race against a concurrent identical request.
            sqlx::Error::Database(db) if db.is_unique_violation() => Error::AlreadyFollowing,
            _ => e.into(),
        })?;

        let message = format!("{} sent you a follow request", follower.full_name());
        notifications::notify(
            &mut *tx,
            following.id,
            Some(follower.id),
            NotificationType::Follow,
            &message,
            Some(follower.id),
        )
        .await?;

        tx.commit().await?;
        Ok(edge)
    }

    /// Remove the edge unconditionally, whatever its status.
    pub async fn unfollow(follower_id: Uuid, following_id: Uuid, pool: &PgPool) -> Result<()> {
        let result = sqlx::query(
            "DELETE FROM follows WHERE follower_id = $1 AND following_id = $2",
        )
        .bind(follower_id)
        .bind(following_id)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound("follow"));
        }
        Ok(())
    }

    /// Recipient-side transition of a pending request.
    pub async fn respond(
        recipient_id: Uuid,
        requester_id: Uuid,
        accept: bool,
        pool: &PgPool,
    ) -> Result<Self> {
        let status = if accept {
            FollowStatus::Accepted
        } else {
            FollowStatus::Rejected
        };

        sqlx::query_as::<_, Self>(
            r#"
            UPDATE follows
            SET status = $3, updated_at = NOW()
            WHERE follower_id = $1 AND following_id = $2 AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(requester_id)
        .bind(recipient_id)
        .bind(status.as_str())
        .fetch_optional(pool)
        .await?
        .ok_or(Error::NotFound("follow request"))
    }

    pub async fn followers(user_id: Uuid, pool: &PgPool) -> Result<Vec<FollowPeer>> {
        FollowPeer::list(user_id, "following_id", "follower_id", pool).await
    }

    pub async fn following(user_id: Uuid, pool: &PgPool) -> Result<Vec<FollowPeer>> {
        FollowPeer::list(user_id, "follower_id", "following_id", pool).await
    }

    /// Raw edge count: every edge regardless of status.
    pub async fn count_followers(user_id: Uuid, pool: &PgPool) -> Result<i64> {
        count_edges(user_id, "following_id", None, pool).await
    }

    pub async fn count_following(user_id: Uuid, pool: &PgPool) -> Result<i64> {
        count_edges(user_id, "follower_id", None, pool).await
    }

    /// Active relationship count: accepted edges only.
    pub async fn count_accepted_followers(user_id: Uuid, pool: &PgPool) -> Result<i64> {
        count_edges(user_id, "following_id", Some(FollowStatus::Accepted), pool).await
    }

    pub async fn count_accepted_following(user_id: Uuid, pool: &PgPool) -> Result<i64> {
        count_edges(user_id, "follower_id", Some(FollowStatus::Accepted), pool).await
    }
}

async fn count_edges(
    user_id: Uuid,
    fixed_column: &str,
    status: Option<FollowStatus>,
    pool: &PgPool,
) -> Result<i64> {
    // fixed_column comes from the two call sites above, never from input.
    let mut sql = format!("SELECT COUNT(*) FROM follows WHERE {fixed_column} = $1");
    if status.is_some() {
        sql.push_str(" AND status = $2");
    }

    let mut query = sqlx::query_as::<_, (i64,)>(&sql).bind(user_id);
    if let Some(status) = status {
        query = query.bind(status.as_str());
    }

    let row = query.fetch_one(pool).await?;
    Ok(row.0)
}

/// The user on the other side of a follow edge, with enough identity to
/// render a list entry.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct FollowPeer {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    pub status: String,
}

impl FollowPeer {
    async fn list(
        user_id: Uuid,
        fixed_column: &str,
        peer_column: &str,
        pool: &PgPool,
    ) -> Result<Vec<Self>> {
        let sql = format!(
            r#"
            SELECT u.id, u.first_name, u.last_name, u.role, f.status
            FROM follows f
            JOIN users u ON u.id = f.{peer_column}
            WHERE f.{fixed_column} = $1
            ORDER BY f.created_at DESC
            "#,
        );

        sqlx::query_as::<_, Self>(&sql)
            .bind(user_id)
            .fetch_all(pool)
            .await
            .map_err(Into::into)
    }
}

/// Both counting contracts in one payload: raw edge counts and
/// accepted-only counts.
#[derive(Debug, Clone, Serialize)]
pub struct FollowCounts {
    pub followers: i64,
    pub following: i64,
    pub accepted_followers: i64,
    pub accepted_following: i64,
}

impl FollowCounts {
    pub async fn load(user_id: Uuid, pool: &PgPool) -> Result<Self> {
        Ok(Self {
            followers: Follow::count_followers(user_id, pool).await?,
            following: Follow::count_following(user_id, pool).await?,
            accepted_followers: Follow::count_accepted_followers(user_id, pool).await?,
            accepted_following: Follow::count_accepted_following(user_id, pool).await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn company_follows_company_only() {
        assert!(check_role_pairing(Role::Company, Role::Company).is_ok());
        assert!(check_role_pairing(Role::Company, Role::Employee).is_err());
        assert!(check_role_pairing(Role::Company, Role::Employer).is_err());
    }

    #[test]
    fn employee_cannot_follow_employee() {
        assert!(check_role_pairing(Role::Employee, Role::Employee).is_err());
        assert!(check_role_pairing(Role::Employee, Role::Employer).is_ok());
        assert!(check_role_pairing(Role::Employee, Role::Company).is_ok());
    }

    #[test]
    fn employer_pairings_are_open() {
        assert!(check_role_pairing(Role::Employer, Role::Employee).is_ok());
        assert!(check_role_pairing(Role::Employer, Role::Employer).is_ok());
        assert!(check_role_pairing(Role::Employer, Role::Company).is_ok());
    }
}
