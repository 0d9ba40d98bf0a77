//! Likes, comments, and shares on posts.
//!
//! Every path that changes a denormalized counter returns the post-write
//! value straight from the database, so the caller echoes the count the
//! transaction actually produced rather than a stale read.

use chrono::{DateTime, Utc};
use hirewire_common::error::Result;
use hirewire_common::{Error, NotificationType};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use super::Post;
use crate::notifications;
use crate::users::User;

const MAX_COMMENT_CHARS: usize = 1000;

pub fn validate_comment(text: &str) -> Result<()> {
    if text.trim().is_empty() {
        return Err(Error::validation("comment text is required"));
    }
    if text.chars().count() > MAX_COMMENT_CHARS {
        return Err(Error::validation("comment cannot exceed 1000 characters"));
    }
    Ok(())
}

/// Like a post. Returns the fresh likes count. A duplicate like, including
/// one that loses a concurrent race, surfaces as `AlreadyLiked` carrying the
/// current count.
pub async fn like(post_id: Uuid, actor: &User, pool: &PgPool) -> Result<i32> {
    let mut tx = pool.begin().await?;

    let post = sqlx::query_as::<_, Post>("SELECT * FROM posts WHERE id = $1 AND is_active")
        .bind(post_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(Error::NotFound("post"))?;

    let inserted = sqlx::query(
        "INSERT INTO post_likes (post_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(post_id)
    .bind(actor.id)
    .execute(&mut *tx)
    .await?;

    if inserted.rows_affected() == 0 {
        return Err(Error::AlreadyLiked {
            likes_count: post.likes_count,
        });
    }

    let (likes_count,) = sqlx::query_as::<_, (i32,)>(
        "UPDATE posts SET likes_count = likes_count + 1 WHERE id = $1 RETURNING likes_count",
    )
    .bind(post_id)
    .fetch_one(&mut *tx)
    .await?;

    if post.author_id != actor.id {
        let message = format!("{} liked your post", actor.full_name());
        notifications::notify(
            &mut *tx,
            post.author_id,
            Some(actor.id),
            NotificationType::Like,
            &message,
            Some(post_id),
        )
        .await?;
    }

    tx.commit().await?;
    Ok(likes_count)
}

/// Remove a like. Mirrors `like`: missing like rows surface as `NotLiked`
/// with the current count.
pub async fn unlike(post_id: Uuid, actor_id: Uuid, pool: &PgPool) -> Result<i32> {
    let mut tx = pool.begin().await?;

    let post = sqlx::query_as::<_, Post>("SELECT * FROM posts WHERE id = $1 AND is_active")
        .bind(post_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(Error::NotFound("post"))?;

    let deleted = sqlx::query("DELETE FROM post_likes WHERE post_id = $1 AND user_id = $2")
        .bind(post_id)
        .bind(actor_id)
        .execute(&mut *tx)
        .await?;

    if deleted.rows_affected() == 0 {
        return Err(Error::NotLiked {
            likes_count: post.likes_count,
        });
    }

    let (likes_count,) = sqlx::query_as::<_, (i32,)>(
        "UPDATE posts SET likes_count = likes_count - 1 WHERE id = $1 RETURNING likes_count",
    )
    .bind(post_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(likes_count)
}

/// Post ids the viewer has liked out of the given batch; lets a feed render
/// the liked flag without a per-post query.
pub async fn liked_post_ids(
    viewer_id: Uuid,
    post_ids: &[Uuid],
    pool: &PgPool,
) -> Result<Vec<Uuid>> {
    let rows = sqlx::query_as::<_, (Uuid,)>(
        "SELECT post_id FROM post_likes WHERE user_id = $1 AND post_id = ANY($2)",
    )
    .bind(viewer_id)
    .bind(post_ids)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

pub async fn has_liked(viewer_id: Uuid, post_id: Uuid, pool: &PgPool) -> Result<bool> {
    let (liked,) = sqlx::query_as::<_, (bool,)>(
        "SELECT EXISTS (SELECT 1 FROM post_likes WHERE user_id = $1 AND post_id = $2)",
    )
    .bind(viewer_id)
    .bind(post_id)
    .fetch_one(pool)
    .await?;
    Ok(liked)
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub user_id: Uuid,
    pub text: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A comment joined with enough author identity to render.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CommentView {
    pub id: Uuid,
    pub post_id: Uuid,
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    pub async fn create(post: &Post, actor: &User, text: &str, pool: &PgPool) -> Result<Self> {
        validate_comment(text)?;

        let mut tx = pool.begin().await?;

        let comment = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO post_comments (post_id, user_id, text)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(post.id)
        .bind(actor.id)
        .bind(text)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE posts SET comments_count = comments_count + 1 WHERE id = $1")
            .bind(post.id)
            .execute(&mut *tx)
            .await?;

        if post.author_id != actor.id {
            let message = format!("{} commented on your post", actor.full_name());
            notifications::notify(
                &mut *tx,
                post.author_id,
                Some(actor.id),
                NotificationType::Comment,
                &message,
                Some(post.id),
            )
            .await?;
        }

        tx.commit().await?;
        Ok(comment)
    }

    pub async fn find_active(id: Uuid, pool: &PgPool) -> Result<Self> {
        sqlx::query_as::<_, Self>("SELECT * FROM post_comments WHERE id = $1 AND is_active")
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or(Error::NotFound("comment"))
    }

    pub async fn list_for_post(post_id: Uuid, pool: &PgPool) -> Result<Vec<CommentView>> {
        sqlx::query_as::<_, CommentView>(
            r#"
            SELECT c.id, c.post_id, c.user_id, u.first_name, u.last_name, c.text, c.created_at
            FROM post_comments c
            JOIN users u ON u.id = c.user_id
            WHERE c.post_id = $1 AND c.is_active
            ORDER BY c.created_at ASC
            "#,
        )
        .bind(post_id)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    /// Soft delete and decrement the parent's counter. The `is_active` guard
    /// keeps a double delete from decrementing twice.
    pub async fn soft_delete(id: Uuid, pool: &PgPool) -> Result<i32> {
        let mut tx = pool.begin().await?;

        let deleted = sqlx::query_as::<_, (Uuid,)>(
            r#"
            UPDATE post_comments SET is_active = FALSE, updated_at = NOW()
            WHERE id = $1 AND is_active
            RETURNING post_id
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(Error::NotFound("comment"))?;

        let (comments_count,) = sqlx::query_as::<_, (i32,)>(
            "UPDATE posts SET comments_count = comments_count - 1 WHERE id = $1 RETURNING comments_count",
        )
        .bind(deleted.0)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(comments_count)
    }
}

/// Share a post with a set of recipients. Recipient ids are deduplicated
/// and the sender is dropped from the list (sharing to yourself is a
/// no-op, not an error), already-shared pairs are skipped, and each
/// genuinely new share notifies its recipient. Returns how many new share
/// rows were written.
pub async fn share(
    post: &Post,
    sender: &User,
    recipient_ids: &[Uuid],
    pool: &PgPool,
) -> Result<u64> {
    let mut unique = Vec::with_capacity(recipient_ids.len());
    for id in recipient_ids {
        if *id != sender.id && !unique.contains(id) {
            unique.push(*id);
        }
    }
    if unique.is_empty() {
        return Err(Error::validation("at least one recipient is required"));
    }

    let (known,) = sqlx::query_as::<_, (i64,)>(
        "SELECT COUNT(*) FROM users WHERE id = ANY($1) AND is_active",
    )
    .bind(&unique)
    .fetch_one(pool)
    .await?;
    if known as usize != unique.len() {
        return Err(Error::NotFound("user"));
    }

    let mut tx = pool.begin().await?;
    let mut shared = 0u64;

    for recipient_id in &unique {
        let inserted = sqlx::query(
            r#"
            INSERT INTO post_shares (post_id, sender_id, recipient_id)
            VALUES ($1, $2, $3)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(post.id)
        .bind(sender.id)
        .bind(recipient_id)
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() == 0 {
            continue;
        }
        shared += 1;

        let message = format!("{} shared a post with you", sender.full_name());
        notifications::notify(
            &mut *tx,
            *recipient_id,
            Some(sender.id),
            NotificationType::Post,
            &message,
            Some(post.id),
        )
        .await?;
    }

    tx.commit().await?;
    Ok(shared)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comment_text_limits() {
        assert!(validate_comment("nice").is_ok());
        assert!(validate_comment("  ").is_err());
        assert!(validate_comment(&"x".repeat(MAX_COMMENT_CHARS)).is_ok());
        assert!(validate_comment(&"x".repeat(MAX_COMMENT_CHARS + 1)).is_err());
    }
}
