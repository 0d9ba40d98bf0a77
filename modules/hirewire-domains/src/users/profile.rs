use chrono::{DateTime, Utc};
use hirewire_common::error::Result;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Shared profile for employee and employer accounts. Created lazily the
/// first time the owner touches it.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserProfile {
    pub user_id: Uuid,
    pub profile_image_url: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub bio: Option<String>,
    pub skills: serde_json::Value,
    pub experience_years: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    pub async fn get_or_create(user_id: Uuid, pool: &PgPool) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO user_profiles (user_id)
            VALUES ($1)
            ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
            RETURNING *
            "#,
        )
        .bind(user_id)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    /// Partial update; absent fields keep their stored value.
    pub async fn update(
        user_id: Uuid,
        phone: Option<&str>,
        location: Option<&str>,
        bio: Option<&str>,
        skills: Option<&serde_json::Value>,
        experience_years: Option<i32>,
        pool: &PgPool,
    ) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            r#"
            UPDATE user_profiles SET
                phone = COALESCE($2, phone),
                location = COALESCE($3, location),
                bio = COALESCE($4, bio),
                skills = COALESCE($5, skills),
                experience_years = COALESCE($6, experience_years),
                updated_at = NOW()
            WHERE user_id = $1
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(phone)
        .bind(location)
        .bind(bio)
        .bind(skills)
        .bind(experience_years)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn set_image(user_id: Uuid, url: Option<&str>, pool: &PgPool) -> Result<()> {
        sqlx::query(
            "UPDATE user_profiles SET profile_image_url = $2, updated_at = NOW() WHERE user_id = $1",
        )
        .bind(user_id)
        .bind(url)
        .execute(pool)
        .await?;
        Ok(())
    }

}

/// Company-specific profile, 1:1 with a company-role user.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CompanyProfile {
    pub user_id: Uuid,
    pub company_logo_url: Option<String>,
    pub company_name: Option<String>,
    pub company_email: Option<String>,
    pub company_phone: Option<String>,
    pub company_website: Option<String>,
    pub company_address: Option<String>,
    pub company_description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CompanyProfile {
    pub async fn get_or_create(user_id: Uuid, pool: &PgPool) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO company_profiles (user_id)
            VALUES ($1)
            ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
            RETURNING *
            "#,
        )
        .bind(user_id)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn update(
        user_id: Uuid,
        company_name: Option<&str>,
        company_email: Option<&str>,
        company_phone: Option<&str>,
        company_website: Option<&str>,
        company_address: Option<&str>,
        company_description: Option<&str>,
        pool: &PgPool,
    ) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            r#"
            UPDATE company_profiles SET
                company_name = COALESCE($2, company_name),
                company_email = COALESCE($3, company_email),
                company_phone = COALESCE($4, company_phone),
                company_website = COALESCE($5, company_website),
                company_address = COALESCE($6, company_address),
                company_description = COALESCE($7, company_description),
                updated_at = NOW()
            WHERE user_id = $1
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(company_name)
        .bind(company_email)
        .bind(company_phone)
        .bind(company_website)
        .bind(company_address)
        .bind(company_description)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn set_logo(user_id: Uuid, url: Option<&str>, pool: &PgPool) -> Result<()> {
        sqlx::query(
            "UPDATE company_profiles SET company_logo_url = $2, updated_at = NOW() WHERE user_id = $1",
        )
        .bind(user_id)
        .bind(url)
        .execute(pool)
        .await?;
        Ok(())
    }
}
