//! Job board endpoints: listings with filters, the application flow, and
//! the publisher-side review surface.

use std::sync::Arc;

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use hirewire_common::{ApplicationStatus, Error, JobType, WorkMode};
use hirewire_domains::jobs::application::{Application, ApplicationQuery};
use hirewire_domains::jobs::{Job, JobQuery, JobStats, NewJob};
use hirewire_domains::{allows, Action, Actor};

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::AppState;

#[derive(Deserialize)]
pub struct JobListParams {
    search: Option<String>,
    title: Option<String>,
    company: Option<String>,
    location: Option<String>,
    job_type: Option<String>,
    posted_after: Option<String>,
    posted_before: Option<String>,
    limit: Option<i64>,
    offset: Option<i64>,
}

fn parse_job_types(raw: &str) -> Result<Vec<JobType>, Error> {
    raw.split(',')
        .map(str::trim)
        .map(|s| {
            JobType::parse(s)
                .ok_or_else(|| Error::validation("invalid job_type; use fulltime, parttime, or intern"))
        })
        .collect()
}

/// Dates arrive as `YYYY-MM-DD`; anything else is ignored rather than
/// rejected, matching the lenient listing contract.
fn parse_date(raw: Option<&str>) -> Option<NaiveDate> {
    raw.and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
}

pub async fn list_jobs(
    State(state): State<Arc<AppState>>,
    AuthUser(_user): AuthUser,
    Query(params): Query<JobListParams>,
) -> ApiResult<impl IntoResponse> {
    let job_types = match &params.job_type {
        Some(raw) => parse_job_types(raw)?,
        None => Vec::new(),
    };

    let query = JobQuery {
        search: params.search,
        title: params.title,
        company: params.company,
        location: params.location,
        job_types,
        posted_after: parse_date(params.posted_after.as_deref()),
        posted_before: parse_date(params.posted_before.as_deref()),
        limit: params.limit,
        offset: params.offset,
    };

    let jobs = Job::list(&query, &state.pool).await?;
    let total = Job::count(&query, &state.pool).await?;
    Ok(super::listing(total, jobs))
}

#[derive(Deserialize)]
pub struct CreateJobRequest {
    title: String,
    description: String,
    requirements: Option<String>,
    location: Option<String>,
    salary: Option<String>,
    job_type: Option<String>,
    experience: Option<String>,
    work_mode: Option<String>,
}

pub async fn create_job(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(body): Json<CreateJobRequest>,
) -> ApiResult<impl IntoResponse> {
    if !allows(Actor::from(&user), Action::PublishJob) {
        return Err(Error::Permission("only employers and companies can publish jobs").into());
    }

    let job_type = body
        .job_type
        .as_deref()
        .map(|s| {
            JobType::parse(s)
                .ok_or_else(|| Error::validation("invalid job_type; use fulltime, parttime, or intern"))
        })
        .transpose()?;
    let work_mode = body
        .work_mode
        .as_deref()
        .map(|s| {
            WorkMode::parse(s)
                .ok_or_else(|| Error::validation("invalid work_mode; use remote, hybrid, or onsite"))
        })
        .transpose()?;

    let new = NewJob {
        title: body.title,
        description: body.description,
        requirements: body.requirements,
        location: body.location,
        salary: body.salary,
        job_type,
        experience: body.experience,
        work_mode,
    };

    let job = Job::create(&user, &new, &state.pool).await?;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "detail": "Job created successfully.",
            "job": job,
        })),
    ))
}

pub async fn job_stats(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> ApiResult<impl IntoResponse> {
    if !allows(Actor::from(&user), Action::PublishJob) {
        return Err(Error::Permission("stats are for publishers").into());
    }
    let stats = JobStats::compute(user.id, &state.pool).await?;
    Ok(Json(stats))
}

pub async fn get_job(
    State(state): State<Arc<AppState>>,
    AuthUser(_user): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let job = Job::find_active(id, &state.pool).await?;
    Ok(Json(job))
}

#[derive(Deserialize)]
pub struct UpdateJobRequest {
    title: Option<String>,
    description: Option<String>,
    requirements: Option<String>,
    location: Option<String>,
    salary: Option<String>,
    job_type: Option<String>,
    experience: Option<String>,
    work_mode: Option<String>,
}

pub async fn update_job(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateJobRequest>,
) -> ApiResult<impl IntoResponse> {
    let job = Job::find_active(id, &state.pool).await?;
    if !allows(
        Actor::from(&user),
        Action::ModifyJob {
            publisher_id: job.publisher_id,
        },
    ) {
        return Err(Error::Permission("only the publisher can modify this job").into());
    }

    let job_type = body
        .job_type
        .as_deref()
        .map(|s| {
            JobType::parse(s)
                .ok_or_else(|| Error::validation("invalid job_type; use fulltime, parttime, or intern"))
        })
        .transpose()?;
    let work_mode = body
        .work_mode
        .as_deref()
        .map(|s| {
            WorkMode::parse(s)
                .ok_or_else(|| Error::validation("invalid work_mode; use remote, hybrid, or onsite"))
        })
        .transpose()?;

    let job = Job::update(
        id,
        body.title.as_deref(),
        body.description.as_deref(),
        body.requirements.as_deref(),
        body.location.as_deref(),
        body.salary.as_deref(),
        job_type,
        body.experience.as_deref(),
        work_mode,
        &state.pool,
    )
    .await?;

    Ok(Json(serde_json::json!({
        "detail": "Job updated successfully.",
        "job": job,
    })))
}

pub async fn delete_job(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let job = Job::find_active(id, &state.pool).await?;
    if !allows(
        Actor::from(&user),
        Action::ModifyJob {
            publisher_id: job.publisher_id,
        },
    ) {
        return Err(Error::Permission("only the publisher can delete this job").into());
    }

    Job::soft_delete(id, &state.pool).await?;
    Ok(super::detail("Job deleted successfully."))
}

pub async fn my_jobs(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> ApiResult<impl IntoResponse> {
    if !allows(Actor::from(&user), Action::PublishJob) {
        return Err(Error::Permission("only publishers have jobs").into());
    }
    let jobs = Job::my_jobs(user.id, &state.pool).await?;
    let total = jobs.len() as i64;
    Ok(super::listing(total, jobs))
}

/// Apply to a job: multipart form with a `resume` file and a `cover_text`
/// field. The resume is stored as an opaque blob.
pub async fn apply(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    if !allows(Actor::from(&user), Action::ApplyToJob) {
        return Err(Error::Permission("only employees can apply to jobs").into());
    }

    let job = Job::find_active(id, &state.pool).await?;

    let form = super::read_multipart(multipart).await?;
    let resume = form
        .files
        .iter()
        .find(|f| f.field == "resume")
        .ok_or_else(|| Error::validation("resume file is required"))?;
    let cover_text = form
        .fields
        .get("cover_text")
        .ok_or_else(|| Error::validation("cover text is required"))?;

    let resume_url = state
        .media
        .store("resumes", &resume.content_type, &resume.bytes)
        .await?;

    Application::apply(&job, user.id, &resume_url, cover_text, &state.pool).await?;
    Ok((
        StatusCode::CREATED,
        super::detail("Application submitted successfully."),
    ))
}

#[derive(Deserialize)]
pub struct JobApplicationsParams {
    status: Option<String>,
    applicant: Option<Uuid>,
    applied_after: Option<String>,
}

fn parse_statuses(raw: &str) -> Result<Vec<ApplicationStatus>, Error> {
    raw.split(',')
        .map(str::trim)
        .map(|s| ApplicationStatus::parse(s).ok_or_else(|| Error::validation("invalid status")))
        .collect()
}

pub async fn job_applications(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
    Query(params): Query<JobApplicationsParams>,
) -> ApiResult<impl IntoResponse> {
    let job = Job::find_any(id, &state.pool).await?;
    if !allows(
        Actor::from(&user),
        Action::ModifyJob {
            publisher_id: job.publisher_id,
        },
    ) {
        return Err(Error::Permission("only the publisher can view applications").into());
    }

    let query = ApplicationQuery {
        statuses: match &params.status {
            Some(raw) => parse_statuses(raw)?,
            None => Vec::new(),
        },
        applicant_id: params.applicant,
        applied_after: parse_date(params.applied_after.as_deref()),
    };

    let applications = Application::list_for_job(id, &query, &state.pool).await?;
    let total = applications.len() as i64;
    Ok(super::listing(total, applications))
}

#[derive(Deserialize)]
pub struct MyApplicationsParams {
    status: Option<String>,
}

pub async fn my_applications(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Query(params): Query<MyApplicationsParams>,
) -> ApiResult<impl IntoResponse> {
    let statuses = match &params.status {
        Some(raw) => parse_statuses(raw)?,
        None => Vec::new(),
    };

    let applications = Application::list_for_applicant(user.id, &statuses, &state.pool).await?;
    let total = applications.len() as i64;
    Ok(super::listing(total, applications))
}

pub async fn get_application(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let application = Application::find_by_id(id, &state.pool).await?;
    let job = Job::find_any(application.job_id, &state.pool).await?;
    if !allows(
        Actor::from(&user),
        Action::ViewApplication {
            applicant_id: application.applicant_id,
            publisher_id: job.publisher_id,
        },
    ) {
        return Err(Error::Permission("not allowed to view this application").into());
    }
    Ok(Json(application))
}

#[derive(Deserialize)]
pub struct UpdateApplicationRequest {
    status: String,
    review_notes: Option<String>,
}

pub async fn update_application(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateApplicationRequest>,
) -> ApiResult<impl IntoResponse> {
    let application = Application::find_by_id(id, &state.pool).await?;
    let job = Job::find_any(application.job_id, &state.pool).await?;
    if !allows(
        Actor::from(&user),
        Action::ReviewApplication {
            publisher_id: job.publisher_id,
        },
    ) {
        return Err(Error::Permission("only the publisher can update application status").into());
    }

    let status = ApplicationStatus::parse(&body.status).ok_or_else(|| {
        Error::validation("invalid status; use submitted, reviewing, shortlisted, rejected, or hired")
    })?;

    let application =
        Application::update_status(id, status, body.review_notes.as_deref(), &state.pool).await?;
    Ok(Json(serde_json::json!({
        "detail": "Application updated.",
        "application": application,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_type_lists_parse_or_reject() {
        assert_eq!(
            parse_job_types("fulltime, intern").unwrap(),
            vec![JobType::Fulltime, JobType::Intern]
        );
        assert!(parse_job_types("fulltime,contract").is_err());
    }

    #[test]
    fn bad_dates_are_ignored() {
        assert!(parse_date(Some("2026-01-15")).is_some());
        assert!(parse_date(Some("not-a-date")).is_none());
        assert!(parse_date(None).is_none());
    }

    #[test]
    fn status_lists_parse_or_reject() {
        assert_eq!(
            parse_statuses("submitted,hired").unwrap(),
            vec![ApplicationStatus::Submitted, ApplicationStatus::Hired]
        );
        assert!(parse_statuses("archived").is_err());
    }
}
