//! Posts with ordered image attachments and denormalized engagement
//! counters. `likes_count` / `comments_count` are caches over the true
//! like/comment rows; every mutation that touches them runs the row write
//! and the counter adjustment in one transaction.

pub mod engagement;

use chrono::{DateTime, Utc};
use hirewire_common::error::Result;
use hirewire_common::Error;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

pub const MAX_IMAGES_PER_POST: usize = 20;
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;
pub const MAX_DESCRIPTION_CHARS: usize = 2000;

/// Reject anything that is not an image or is over the size cap. Applied to
/// every upload in a batch before any row is written, so a bad image aborts
/// the whole request.
pub fn validate_image(content_type: &str, size: usize) -> Result<()> {
    if !content_type.starts_with("image/") {
        return Err(Error::validation("only image files are allowed"));
    }
    if size > MAX_IMAGE_BYTES {
        return Err(Error::validation("image size cannot exceed 5MB"));
    }
    Ok(())
}

pub fn validate_description(description: &str) -> Result<()> {
    if description.trim().is_empty() {
        return Err(Error::validation("description is required"));
    }
    if description.chars().count() > MAX_DESCRIPTION_CHARS {
        return Err(Error::validation("description cannot exceed 2000 characters"));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Post {
    pub id: Uuid,
    pub author_id: Uuid,
    pub description: String,
    pub is_active: bool,
    pub likes_count: i32,
    pub comments_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PostImage {
    pub id: Uuid,
    pub post_id: Uuid,
    pub url: String,
    pub ord: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct PostQuery {
    pub search: Option<String>,
    pub author_id: Option<Uuid>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl Post {
    /// Create a post with its image batch, all-or-nothing. Images get
    /// contiguous 1-based order in the given sequence.
    pub async fn create(
        author_id: Uuid,
        description: &str,
        image_urls: &[String],
        pool: &PgPool,
    ) -> Result<Self> {
        validate_description(description)?;
        if image_urls.len() > MAX_IMAGES_PER_POST {
            return Err(Error::ImageLimit(MAX_IMAGES_PER_POST));
        }

        let mut tx = pool.begin().await?;

        let post = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO posts (author_id, description)
            VALUES ($1, $2)
            RETURNING *
            "#,
        )
        .bind(author_id)
        .bind(description)
        .fetch_one(&mut *tx)
        .await?;

        for (i, url) in image_urls.iter().enumerate() {
            sqlx::query("INSERT INTO post_images (post_id, url, ord) VALUES ($1, $2, $3)")
                .bind(post.id)
                .bind(url)
                .bind((i + 1) as i32)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(post)
    }

    pub async fn find_active(id: Uuid, pool: &PgPool) -> Result<Self> {
        sqlx::query_as::<_, Self>("SELECT * FROM posts WHERE id = $1 AND is_active")
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or(Error::NotFound("post"))
    }

    /// Lookup ignoring the active flag; used for ownership checks on
    /// content hanging off a soft-deleted post.
    pub async fn find_any(id: Uuid, pool: &PgPool) -> Result<Self> {
        sqlx::query_as::<_, Self>("SELECT * FROM posts WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or(Error::NotFound("post"))
    }

    pub async fn list(query: &PostQuery, pool: &PgPool) -> Result<Vec<Self>> {
        let mut qb = sqlx::QueryBuilder::new("SELECT * FROM posts WHERE is_active ");
        push_post_filters(&mut qb, query);
        qb.push("ORDER BY created_at DESC ");

        let limit = query.limit.unwrap_or(50).min(200);
        let offset = query.offset.unwrap_or(0);
        qb.push("LIMIT ");
        qb.push_bind(limit);
        qb.push(" OFFSET ");
        qb.push_bind(offset);

        qb.build_query_as::<Self>()
            .fetch_all(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn count(query: &PostQuery, pool: &PgPool) -> Result<i64> {
        let mut qb = sqlx::QueryBuilder::new("SELECT COUNT(*) FROM posts WHERE is_active ");
        push_post_filters(&mut qb, query);

        let row = qb.build_query_as::<(i64,)>().fetch_one(pool).await?;
        Ok(row.0)
    }

    pub async fn update_description(id: Uuid, description: &str, pool: &PgPool) -> Result<Self> {
        validate_description(description)?;
        sqlx::query_as::<_, Self>(
            r#"
            UPDATE posts SET description = $2, updated_at = NOW()
            WHERE id = $1 AND is_active
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(description)
        .fetch_optional(pool)
        .await?
        .ok_or(Error::NotFound("post"))
    }

    /// Soft delete. The row and its likes/comments stay for history.
    pub async fn soft_delete(id: Uuid, pool: &PgPool) -> Result<()> {
        let result = sqlx::query(
            "UPDATE posts SET is_active = FALSE, updated_at = NOW() WHERE id = $1 AND is_active",
        )
        .bind(id)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound("post"));
        }
        Ok(())
    }
}

fn push_post_filters(qb: &mut sqlx::QueryBuilder<'_, sqlx::Postgres>, query: &PostQuery) {
    if let Some(search) = &query.search {
        qb.push("AND description ILIKE ");
        qb.push_bind(format!("%{search}%"));
        qb.push(" ");
    }
    if let Some(author_id) = query.author_id {
        qb.push("AND author_id = ");
        qb.push_bind(author_id);
        qb.push(" ");
    }
}

impl PostImage {
    pub async fn for_post(post_id: Uuid, pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM post_images WHERE post_id = $1 ORDER BY ord ASC",
        )
        .bind(post_id)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn for_posts(post_ids: &[Uuid], pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM post_images WHERE post_id = ANY($1) ORDER BY post_id, ord ASC",
        )
        .bind(post_ids)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    /// Append images after the current highest order. The post row is locked
    /// so two concurrent batches cannot both squeeze under the limit.
    pub async fn add(post_id: Uuid, urls: &[String], pool: &PgPool) -> Result<Vec<Self>> {
        let mut tx = pool.begin().await?;

        sqlx::query("SELECT id FROM posts WHERE id = $1 AND is_active FOR UPDATE")
            .bind(post_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(Error::NotFound("post"))?;

        let (existing, max_ord) = sqlx::query_as::<_, (i64, Option<i32>)>(
            "SELECT COUNT(*), MAX(ord) FROM post_images WHERE post_id = $1",
        )
        .bind(post_id)
        .fetch_one(&mut *tx)
        .await?;

        if existing as usize + urls.len() > MAX_IMAGES_PER_POST {
            return Err(Error::ImageLimit(MAX_IMAGES_PER_POST));
        }

        let base = max_ord.unwrap_or(0);
        let mut added = Vec::with_capacity(urls.len());
        for (i, url) in urls.iter().enumerate() {
            let image = sqlx::query_as::<_, Self>(
                "INSERT INTO post_images (post_id, url, ord) VALUES ($1, $2, $3) RETURNING *",
            )
            .bind(post_id)
            .bind(url)
            .bind(base + (i as i32) + 1)
            .fetch_one(&mut *tx)
            .await?;
            added.push(image);
        }

        tx.commit().await?;
        Ok(added)
    }

    /// Delete one image and close the gap: everything ordered after it
    /// shifts down by one so the sequence stays contiguous from 1. The
    /// unique (post_id, ord) constraint is deferrable for exactly this shift.
    pub async fn delete(post_id: Uuid, image_id: Uuid, pool: &PgPool) -> Result<()> {
        let mut tx = pool.begin().await?;

        let deleted = sqlx::query_as::<_, (i32,)>(
            "DELETE FROM post_images WHERE id = $1 AND post_id = $2 RETURNING ord",
        )
        .bind(image_id)
        .bind(post_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(Error::NotFound("image"))?;

        sqlx::query("UPDATE post_images SET ord = ord - 1 WHERE post_id = $1 AND ord > $2")
            .bind(post_id)
            .bind(deleted.0)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Replace the whole image set (post update with a new batch).
    pub async fn replace(post_id: Uuid, urls: &[String], pool: &PgPool) -> Result<()> {
        if urls.len() > MAX_IMAGES_PER_POST {
            return Err(Error::ImageLimit(MAX_IMAGES_PER_POST));
        }

        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM post_images WHERE post_id = $1")
            .bind(post_id)
            .execute(&mut *tx)
            .await?;

        for (i, url) in urls.iter().enumerate() {
            sqlx::query("INSERT INTO post_images (post_id, url, ord) VALUES ($1, $2, $3)")
                .bind(post_id)
                .bind(url)
                .bind((i + 1) as i32)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ordinary_image() {
        assert!(validate_image("image/png", 1024).is_ok());
        assert!(validate_image("image/jpeg", MAX_IMAGE_BYTES).is_ok());
    }

    #[test]
    fn rejects_non_image_mime() {
        assert!(validate_image("application/pdf", 1024).is_err());
        assert!(validate_image("text/html", 10).is_err());
    }

    #[test]
    fn rejects_oversized_image() {
        assert!(validate_image("image/png", MAX_IMAGE_BYTES + 1).is_err());
    }

    #[test]
    fn description_limits() {
        assert!(validate_description("hello").is_ok());
        assert!(validate_description("   ").is_err());
        assert!(validate_description(&"x".repeat(MAX_DESCRIPTION_CHARS)).is_ok());
        assert!(validate_description(&"x".repeat(MAX_DESCRIPTION_CHARS + 1)).is_err());
    }
}
