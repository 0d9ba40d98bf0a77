//! Applications against job postings.
//!
//! One application per (job, applicant) pair, enforced by a unique
//! constraint; the apply path treats a violation as `AlreadyApplied` rather
//! than a database error. `Job.applications_count` is bumped in the same
//! transaction as the insert.

use chrono::{DateTime, NaiveDate, Utc};
use hirewire_common::error::Result;
use hirewire_common::{ApplicationStatus, Error};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use super::Job;

const MAX_COVER_CHARS: usize = 5000;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Application {
    pub id: Uuid,
    pub job_id: Uuid,
    pub applicant_id: Uuid,
    pub resume_url: String,
    pub cover_text: String,
    pub status: String,
    pub review_notes: Option<String>,
    pub applied_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct ApplicationQuery {
    pub statuses: Vec<ApplicationStatus>,
    pub applicant_id: Option<Uuid>,
    pub applied_after: Option<NaiveDate>,
}

impl Application {
    /// Submit an application. Rejects self-application and duplicates, and
    /// bumps the job's counter atomically with the insert.
    pub async fn apply(
        job: &Job,
        applicant_id: Uuid,
        resume_url: &str,
        cover_text: &str,
        pool: &PgPool,
    ) -> Result<Self> {
        if job.publisher_id == applicant_id {
            return Err(Error::SelfApplication);
        }
        if cover_text.trim().is_empty() {
            return Err(Error::validation("cover text is required"));
        }
        if cover_text.chars().count() > MAX_COVER_CHARS {
            return Err(Error::validation("cover text cannot exceed 5000 characters"));
        }

        let mut tx = pool.begin().await?;

        let application = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO applications (job_id, applicant_id, resume_url, cover_text)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(job.id)
        .bind(applicant_id)
        .bind(resume_url)
        .bind(cover_text)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => Error::AlreadyApplied,
            _ => e.into(),
        })?;

        sqlx::query(
            "UPDATE jobs SET applications_count = applications_count + 1 WHERE id = $1",
        )
        .bind(job.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(application)
    }

    pub async fn find_by_id(id: Uuid, pool: &PgPool) -> Result<Self> {
        sqlx::query_as::<_, Self>("SELECT * FROM applications WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or(Error::NotFound("application"))
    }

    pub async fn exists(job_id: Uuid, applicant_id: Uuid, pool: &PgPool) -> Result<bool> {
        let (exists,) = sqlx::query_as::<_, (bool,)>(
            "SELECT EXISTS (SELECT 1 FROM applications WHERE job_id = $1 AND applicant_id = $2)",
        )
        .bind(job_id)
        .bind(applicant_id)
        .fetch_one(pool)
        .await?;
        Ok(exists)
    }

    pub async fn list_for_job(
        job_id: Uuid,
        query: &ApplicationQuery,
        pool: &PgPool,
    ) -> Result<Vec<Self>> {
        let mut qb = sqlx::QueryBuilder::new("SELECT * FROM applications WHERE job_id = ");
        qb.push_bind(job_id);
        qb.push(" ");
        push_application_filters(&mut qb, query);
        qb.push("ORDER BY applied_at DESC");

        qb.build_query_as::<Self>()
            .fetch_all(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn list_for_applicant(
        applicant_id: Uuid,
        statuses: &[ApplicationStatus],
        pool: &PgPool,
    ) -> Result<Vec<Self>> {
        let mut qb = sqlx::QueryBuilder::new("SELECT * FROM applications WHERE applicant_id = ");
        qb.push_bind(applicant_id);
        qb.push(" ");
        if !statuses.is_empty() {
            let values: Vec<String> = statuses.iter().map(|s| s.as_str().to_string()).collect();
            qb.push("AND status = ANY(");
            qb.push_bind(values);
            qb.push(") ");
        }
        qb.push("ORDER BY applied_at DESC");

        qb.build_query_as::<Self>()
            .fetch_all(pool)
            .await
            .map_err(Into::into)
    }

    /// Status moves freely between the five values; there is no enforced
    /// ordering, only membership.
    pub async fn update_status(
        id: Uuid,
        status: ApplicationStatus,
        review_notes: Option<&str>,
        pool: &PgPool,
    ) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            r#"
            UPDATE applications SET
                status = $2,
                review_notes = COALESCE($3, review_notes),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status.as_str())
        .bind(review_notes)
        .fetch_optional(pool)
        .await?
        .ok_or(Error::NotFound("application"))
    }
}

fn push_application_filters(
    qb: &mut sqlx::QueryBuilder<'_, sqlx::Postgres>,
    query: &ApplicationQuery,
) {
    if !query.statuses.is_empty() {
        let values: Vec<String> = query
            .statuses
            .iter()
            .map(|s| s.as_str().to_string())
            .collect();
        qb.push("AND status = ANY(");
        qb.push_bind(values);
        qb.push(") ");
    }
    if let Some(applicant_id) = query.applicant_id {
        qb.push("AND applicant_id = ");
        qb.push_bind(applicant_id);
        qb.push(" ");
    }
    if let Some(after) = query.applied_after {
        qb.push("AND applied_at::date >= ");
        qb.push_bind(after);
        qb.push(" ");
    }
}
