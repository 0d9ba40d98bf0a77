pub mod access;
pub mod jobs;
pub mod notifications;
pub mod posts;
pub mod social;
pub mod users;

pub use access::{allows, Action, Actor};

/// Run the embedded SQL migrations.
pub async fn migrate(pool: &sqlx::PgPool) -> hirewire_common::error::Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| hirewire_common::Error::Database(e.into()))
}
