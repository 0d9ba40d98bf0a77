use std::env;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Postgres
    pub database_url: String,

    // Web server
    pub host: String,
    pub port: u16,

    // Auth
    pub jwt_secret: String,
    pub jwt_issuer: String,

    // Media blob storage
    pub media_root: String,
    pub media_base_url: String,

    // Outbound mail (sender identity only; delivery is a seam)
    pub mail_from: String,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            database_url: required_env("DATABASE_URL"),
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .expect("PORT must be a number"),
            jwt_secret: required_env("JWT_SECRET"),
            jwt_issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| "hirewire".to_string()),
            media_root: env::var("MEDIA_ROOT").unwrap_or_else(|_| "media".to_string()),
            media_base_url: env::var("MEDIA_BASE_URL").unwrap_or_else(|_| "/media".to_string()),
            mail_from: env::var("MAIL_FROM").unwrap_or_else(|_| "noreply@hirewire.local".to_string()),
        }
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}
