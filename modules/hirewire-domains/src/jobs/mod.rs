//! Job postings and the filtered listing queries over them.
//!
//! `applications_count` is a denormalized cache over application rows,
//! maintained by the apply path in the same transaction as the insert.

pub mod application;

use chrono::{DateTime, NaiveDate, Utc};
use hirewire_common::error::Result;
use hirewire_common::{Error, JobType, WorkMode};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::notifications;
use crate::users::User;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Job {
    pub id: Uuid,
    pub publisher_id: Uuid,
    pub title: String,
    pub description: String,
    pub requirements: Option<String>,
    pub location: Option<String>,
    pub salary: Option<String>,
    pub job_type: String,
    pub experience: Option<String>,
    pub work_mode: String,
    pub is_active: bool,
    pub applications_count: i32,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct NewJob {
    pub title: String,
    pub description: String,
    pub requirements: Option<String>,
    pub location: Option<String>,
    pub salary: Option<String>,
    pub job_type: Option<JobType>,
    pub experience: Option<String>,
    pub work_mode: Option<WorkMode>,
}

#[derive(Debug, Clone, Default)]
pub struct JobQuery {
    pub search: Option<String>,
    pub title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub job_types: Vec<JobType>,
    pub posted_after: Option<NaiveDate>,
    pub posted_before: Option<NaiveDate>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl Job {
    /// Publish a job and broadcast the notification to every other user in
    /// the same transaction.
    pub async fn create(publisher: &User, new: &NewJob, pool: &PgPool) -> Result<Self> {
        if new.title.trim().is_empty() {
            return Err(Error::validation("title is required"));
        }
        if new.description.trim().is_empty() {
            return Err(Error::validation("description is required"));
        }

        let mut tx = pool.begin().await?;

        let job = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO jobs
                (publisher_id, title, description, requirements, location,
                 salary, job_type, experience, work_mode)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(publisher.id)
        .bind(&new.title)
        .bind(&new.description)
        .bind(new.requirements.as_deref())
        .bind(new.location.as_deref())
        .bind(new.salary.as_deref())
        .bind(new.job_type.unwrap_or(JobType::Fulltime).as_str())
        .bind(new.experience.as_deref())
        .bind(new.work_mode.unwrap_or(WorkMode::Onsite).as_str())
        .fetch_one(&mut *tx)
        .await?;

        notifications::notify_job_posted(
            &mut *tx,
            publisher.id,
            &publisher.full_name(),
            job.id,
            &job.title,
        )
        .await?;

        tx.commit().await?;
        Ok(job)
    }

    pub async fn find_active(id: Uuid, pool: &PgPool) -> Result<Self> {
        sqlx::query_as::<_, Self>("SELECT * FROM jobs WHERE id = $1 AND is_active")
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or(Error::NotFound("job"))
    }

    /// Lookup ignoring the active flag; applications against a soft-deleted
    /// job still need their publisher for permission checks.
    pub async fn find_any(id: Uuid, pool: &PgPool) -> Result<Self> {
        sqlx::query_as::<_, Self>("SELECT * FROM jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or(Error::NotFound("job"))
    }

    pub async fn list(query: &JobQuery, pool: &PgPool) -> Result<Vec<Self>> {
        let mut qb = sqlx::QueryBuilder::new(
            "SELECT j.* FROM jobs j JOIN users u ON u.id = j.publisher_id WHERE j.is_active ",
        );
        push_job_filters(&mut qb, query);
        qb.push("ORDER BY j.created_at DESC ");

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

    pub async fn count(query: &JobQuery, pool: &PgPool) -> Result<i64> {
        let mut qb = sqlx::QueryBuilder::new(
            "SELECT COUNT(*) FROM jobs j JOIN users u ON u.id = j.publisher_id WHERE j.is_active ",
        );
        push_job_filters(&mut qb, query);

        let row = qb.build_query_as::<(i64,)>().fetch_one(pool).await?;
        Ok(row.0)
    }

    pub async fn my_jobs(publisher_id: Uuid, pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM jobs WHERE publisher_id = $1 AND is_active ORDER BY created_at DESC",
        )
        .bind(publisher_id)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    /// Partial update; absent fields keep their stored value.
    #[allow(clippy::too_many_arguments)]
    pub async fn update(
        id: Uuid,
        title: Option<&str>,
        description: Option<&str>,
        requirements: Option<&str>,
        location: Option<&str>,
        salary: Option<&str>,
        job_type: Option<JobType>,
        experience: Option<&str>,
        work_mode: Option<WorkMode>,
        pool: &PgPool,
    ) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            r#"
            UPDATE jobs SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                requirements = COALESCE($4, requirements),
                location = COALESCE($5, location),
                salary = COALESCE($6, salary),
                job_type = COALESCE($7, job_type),
                experience = COALESCE($8, experience),
                work_mode = COALESCE($9, work_mode),
                updated_at = NOW()
            WHERE id = $1 AND is_active
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(title)
        .bind(description)
        .bind(requirements)
        .bind(location)
        .bind(salary)
        .bind(job_type.map(|t| t.as_str()))
        .bind(experience)
        .bind(work_mode.map(|m| m.as_str()))
        .fetch_optional(pool)
        .await?
        .ok_or(Error::NotFound("job"))
    }

    /// Soft delete: flags the row and stamps `deleted_at`; applications stay.
    pub async fn soft_delete(id: Uuid, pool: &PgPool) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE jobs SET is_active = FALSE, deleted_at = NOW(), updated_at = NOW()
            WHERE id = $1 AND is_active
            "#,
        )
        .bind(id)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound("job"));
        }
        Ok(())
    }
}

fn push_job_filters(qb: &mut sqlx::QueryBuilder<'_, sqlx::Postgres>, query: &JobQuery) {
    if let Some(search) = &query.search {
        let pattern = format!("%{search}%");
        qb.push("AND (j.title ILIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" OR j.description ILIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" OR j.requirements ILIKE ");
        qb.push_bind(pattern);
        qb.push(") ");
    }
    if let Some(title) = &query.title {
        qb.push("AND j.title ILIKE ");
        qb.push_bind(format!("%{title}%"));
        qb.push(" ");
    }
    if let Some(company) = &query.company {
        let pattern = format!("%{company}%");
        qb.push("AND (u.first_name ILIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" OR u.last_name ILIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" OR u.email ILIKE ");
        qb.push_bind(pattern);
        qb.push(") ");
    }
    if let Some(location) = &query.location {
        qb.push("AND j.location ILIKE ");
        qb.push_bind(format!("%{location}%"));
        qb.push(" ");
    }
    if !query.job_types.is_empty() {
        let types: Vec<String> = query
            .job_types
            .iter()
            .map(|t| t.as_str().to_string())
            .collect();
        qb.push("AND j.job_type = ANY(");
        qb.push_bind(types);
        qb.push(") ");
    }
    if let Some(after) = query.posted_after {
        qb.push("AND j.created_at::date >= ");
        qb.push_bind(after);
        qb.push(" ");
    }
    if let Some(before) = query.posted_before {
        qb.push("AND j.created_at::date <= ");
        qb.push_bind(before);
        qb.push(" ");
    }
}

/// Per-publisher hiring overview: job count, application volume, and the
/// status breakdown across all of the publisher's active jobs.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct JobStats {
    pub total_jobs: i64,
    pub total_applications: i64,
    pub submitted: i64,
    pub reviewing: i64,
    pub shortlisted: i64,
    pub rejected: i64,
    pub hired: i64,
}

impl JobStats {
    pub async fn compute(publisher_id: Uuid, pool: &PgPool) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            r#"
            SELECT
                COUNT(DISTINCT j.id) AS total_jobs,
                COUNT(a.id) AS total_applications,
                COUNT(a.id) FILTER (WHERE a.status = 'submitted') AS submitted,
                COUNT(a.id) FILTER (WHERE a.status = 'reviewing') AS reviewing,
                COUNT(a.id) FILTER (WHERE a.status = 'shortlisted') AS shortlisted,
                COUNT(a.id) FILTER (WHERE a.status = 'rejected') AS rejected,
                COUNT(a.id) FILTER (WHERE a.status = 'hired') AS hired
            FROM jobs j
            LEFT JOIN applications a ON a.job_id = j.id
            WHERE j.publisher_id = $1 AND j.is_active
            "#,
        )
        .bind(publisher_id)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }
}
