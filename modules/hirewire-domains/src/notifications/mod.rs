//! Append-only notification log plus the fan-out helpers.
//!
//! Fan-out is always an explicit call made by the mutating operation, on the
//! same connection (transaction) as the triggering write. There are no save
//! hooks: if the follow edge commits, its notification commits with it.

use chrono::{DateTime, Utc};
use hirewire_common::error::Result;
use hirewire_common::{Error, NotificationType};
use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub recipient_id: Uuid,
    pub sender_id: Option<Uuid>,
    pub notification_type: String,
    pub message: String,
    pub object_id: Option<Uuid>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub async fn list_for(recipient_id: Uuid, pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM notifications WHERE recipient_id = $1 ORDER BY created_at DESC",
        )
        .bind(recipient_id)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn unread_count(recipient_id: Uuid, pool: &PgPool) -> Result<i64> {
        let row = sqlx::query_as::<_, (i64,)>(
            "SELECT COUNT(*) FROM notifications WHERE recipient_id = $1 AND NOT is_read",
        )
        .bind(recipient_id)
        .fetch_one(pool)
        .await?;
        Ok(row.0)
    }

    /// Mark one notification read. Scoped to the recipient so nobody can
    /// flip someone else's flag.
    pub async fn mark_read(id: Uuid, recipient_id: Uuid, pool: &PgPool) -> Result<()> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE WHERE id = $1 AND recipient_id = $2",
        )
        .bind(id)
        .bind(recipient_id)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound("notification"));
        }
        Ok(())
    }

    pub async fn mark_all_read(recipient_id: Uuid, pool: &PgPool) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE WHERE recipient_id = $1 AND NOT is_read",
        )
        .bind(recipient_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}

/// Insert a single notification on the caller's transaction.
pub async fn notify(
    conn: &mut PgConnection,
    recipient_id: Uuid,
    sender_id: Option<Uuid>,
    kind: NotificationType,
    message: &str,
    object_id: Option<Uuid>,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO notifications (recipient_id, sender_id, notification_type, message, object_id)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(recipient_id)
    .bind(sender_id)
    .bind(kind.as_str())
    .bind(message)
    .bind(object_id)
    .execute(conn)
    .await?;
    Ok(())
}

/// O(N) broadcast for a freshly published job: one row per user other than
/// the publisher, in a single bulk insert.
pub async fn notify_job_posted(
    conn: &mut PgConnection,
    publisher_id: Uuid,
    publisher_name: &str,
    job_id: Uuid,
    job_title: &str,
) -> Result<u64> {
    let message = format!("{publisher_name} posted a {job_title} job");
    let result = sqlx::query(
        r#"
        INSERT INTO notifications (recipient_id, sender_id, notification_type, message, object_id)
        SELECT u.id, $1, 'job', $2, $3
        FROM users u
        WHERE u.id <> $1
        "#,
    )
    .bind(publisher_id)
    .bind(&message)
    .bind(job_id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}
