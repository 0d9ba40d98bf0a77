//! Profile endpoints. The profile shape is role-dependent: every account
//! has a user profile; the company profile exists only for company-role
//! accounts.

use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::response::{IntoResponse, Json};
use serde::Deserialize;

use hirewire_common::{Error, Role};
use hirewire_domains::posts::validate_image;
use hirewire_domains::users::profile::{CompanyProfile, UserProfile};

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::AppState;

pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> ApiResult<impl IntoResponse> {
    let profile = UserProfile::get_or_create(user.id, &state.pool).await?;
    Ok(Json(serde_json::json!({
        "user": user,
        "profile": profile,
    })))
}

#[derive(Deserialize)]
pub struct UpdateProfileRequest {
    phone: Option<String>,
    location: Option<String>,
    bio: Option<String>,
    skills: Option<serde_json::Value>,
    experience_years: Option<i32>,
}

pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(body): Json<UpdateProfileRequest>,
) -> ApiResult<impl IntoResponse> {
    UserProfile::get_or_create(user.id, &state.pool).await?;
    let profile = UserProfile::update(
        user.id,
        body.phone.as_deref(),
        body.location.as_deref(),
        body.bio.as_deref(),
        body.skills.as_ref(),
        body.experience_years,
        &state.pool,
    )
    .await?;

    Ok(Json(serde_json::json!({
        "detail": "Profile updated.",
        "profile": profile,
    })))
}

/// For company accounts the image slot is the company logo; for everyone
/// else it is the personal profile image.
pub async fn upload_profile_image(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let form = super::read_multipart(multipart).await?;
    let file = form
        .files
        .into_iter()
        .find(|f| f.field == "image")
        .ok_or_else(|| Error::validation("image file is required"))?;
    validate_image(&file.content_type, file.bytes.len())?;

    let url = state
        .media
        .store("profiles", &file.content_type, &file.bytes)
        .await?;

    if user.role() == Role::Company {
        CompanyProfile::get_or_create(user.id, &state.pool).await?;
        CompanyProfile::set_logo(user.id, Some(&url), &state.pool).await?;
    } else {
        UserProfile::get_or_create(user.id, &state.pool).await?;
        UserProfile::set_image(user.id, Some(&url), &state.pool).await?;
    }

    Ok(Json(serde_json::json!({
        "detail": "Profile image updated.",
        "image_url": url,
    })))
}

pub async fn delete_profile_image(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> ApiResult<impl IntoResponse> {
    if user.role() == Role::Company {
        CompanyProfile::get_or_create(user.id, &state.pool).await?;
        CompanyProfile::set_logo(user.id, None, &state.pool).await?;
    } else {
        UserProfile::get_or_create(user.id, &state.pool).await?;
        UserProfile::set_image(user.id, None, &state.pool).await?;
    }
    Ok(super::detail("Profile image removed."))
}

fn require_company(role: Role) -> Result<(), Error> {
    if role != Role::Company {
        return Err(Error::Permission("company profile is for company accounts"));
    }
    Ok(())
}

pub async fn get_company_profile(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> ApiResult<impl IntoResponse> {
    require_company(user.role())?;
    let profile = CompanyProfile::get_or_create(user.id, &state.pool).await?;
    Ok(Json(profile))
}

#[derive(Deserialize)]
pub struct UpdateCompanyProfileRequest {
    company_name: Option<String>,
    company_email: Option<String>,
    company_phone: Option<String>,
    company_website: Option<String>,
    company_address: Option<String>,
    company_description: Option<String>,
}

pub async fn update_company_profile(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(body): Json<UpdateCompanyProfileRequest>,
) -> ApiResult<impl IntoResponse> {
    require_company(user.role())?;
    CompanyProfile::get_or_create(user.id, &state.pool).await?;
    let profile = CompanyProfile::update(
        user.id,
        body.company_name.as_deref(),
        body.company_email.as_deref(),
        body.company_phone.as_deref(),
        body.company_website.as_deref(),
        body.company_address.as_deref(),
        body.company_description.as_deref(),
        &state.pool,
    )
    .await?;

    Ok(Json(serde_json::json!({
        "detail": "Company profile updated.",
        "profile": profile,
    })))
}
