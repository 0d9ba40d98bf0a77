//! One-time codes for registration and password recovery.
//!
//! An OTP is a 6-digit code bound to an email address, valid for 5 minutes
//! and single-use. Password reset tokens are opaque UUID strings valid for
//! 15 minutes, issued only after a successful OTP verification.

use chrono::{DateTime, Duration, Utc};
use hirewire_common::error::Result;
use hirewire_common::Error;
use rand::Rng;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

pub const OTP_TTL_SECS: i64 = 5 * 60;
pub const RESET_TOKEN_TTL_SECS: i64 = 15 * 60;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct EmailOtp {
    pub id: Uuid,
    pub email: String,
    pub code: String,
    pub is_used: bool,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl EmailOtp {
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        !self.is_used && now < self.expires_at
    }

    /// Issue a fresh code for the address. Earlier codes stay in place; each
    /// is independently single-use.
    pub async fn issue(email: &str, pool: &PgPool) -> Result<Self> {
        let code = generate_code();
        let expires_at = Utc::now() + Duration::seconds(OTP_TTL_SECS);

        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO email_otps (email, code, expires_at)
            VALUES (LOWER($1), $2, $3)
            RETURNING *
            "#,
        )
        .bind(email)
        .bind(&code)
        .bind(expires_at)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    /// Check the code for the address and burn it. The newest unused match
    /// wins; expired or already-used codes are a validation error.
    pub async fn verify_and_consume(email: &str, code: &str, pool: &PgPool) -> Result<()> {
        let otp = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM email_otps
            WHERE email = LOWER($1) AND code = $2 AND NOT is_used
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(email)
        .bind(code)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::validation("invalid OTP"))?;

        if !otp.is_valid(Utc::now()) {
            return Err(Error::validation("OTP expired or invalid"));
        }

        sqlx::query("UPDATE email_otps SET is_used = TRUE WHERE id = $1")
            .bind(otp.id)
            .execute(pool)
            .await?;

        Ok(())
    }
}

fn generate_code() -> String {
    rand::thread_rng().gen_range(100_000..=999_999).to_string()
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PasswordResetToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token: String,
    pub used: bool,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl PasswordResetToken {
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        !self.used && now < self.expires_at
    }

    pub async fn issue(user_id: Uuid, pool: &PgPool) -> Result<Self> {
        let token = Uuid::new_v4().to_string();
        let expires_at = Utc::now() + Duration::seconds(RESET_TOKEN_TTL_SECS);

        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO password_reset_tokens (user_id, token, expires_at)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(&token)
        .bind(expires_at)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    /// Burn the token and return the owning user id.
    pub async fn consume(token: &str, pool: &PgPool) -> Result<Uuid> {
        let row = sqlx::query_as::<_, Self>(
            "SELECT * FROM password_reset_tokens WHERE token = $1",
        )
        .bind(token)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::validation("invalid reset token"))?;

        if !row.is_valid(Utc::now()) {
            return Err(Error::validation("reset token expired or invalid"));
        }

        sqlx::query("UPDATE password_reset_tokens SET used = TRUE WHERE id = $1")
            .bind(row.id)
            .execute(pool)
            .await?;

        Ok(row.user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn otp(used: bool, expires_in_secs: i64) -> EmailOtp {
        let now = Utc::now();
        EmailOtp {
            id: Uuid::new_v4(),
            email: "user@example.com".into(),
            code: "123456".into(),
            is_used: used,
            expires_at: now + Duration::seconds(expires_in_secs),
            created_at: now,
        }
    }

    #[test]
    fn fresh_otp_is_valid() {
        assert!(otp(false, OTP_TTL_SECS).is_valid(Utc::now()));
    }

    #[test]
    fn used_otp_is_invalid() {
        assert!(!otp(true, OTP_TTL_SECS).is_valid(Utc::now()));
    }

    #[test]
    fn expired_otp_is_invalid() {
        assert!(!otp(false, -1).is_valid(Utc::now()));
    }

    #[test]
    fn generated_codes_are_six_digits() {
        for _ in 0..100 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn reset_token_validity_window() {
        let now = Utc::now();
        let token = PasswordResetToken {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            token: Uuid::new_v4().to_string(),
            used: false,
            expires_at: now + Duration::seconds(RESET_TOKEN_TTL_SECS),
            created_at: now,
        };
        assert!(token.is_valid(now));
        assert!(!token.is_valid(now + Duration::seconds(RESET_TOKEN_TTL_SECS + 1)));
    }
}
