use std::sync::Arc;

use anyhow::Result;
use axum::{
    routing::{get, patch, post},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tower_http::services::ServeDir;
use tracing::info;
use tracing_subscriber::EnvFilter;

use hirewire_common::Config;

mod auth;
mod error;
mod jwt;
mod mailer;
mod media;
mod password;
mod rest;

use jwt::JwtService;
use mailer::{LogMailer, Mailer};
use media::MediaStore;

pub struct AppState {
    pub pool: PgPool,
    pub jwt: JwtService,
    pub media: MediaStore,
    pub mailer: Box<dyn Mailer>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("hirewire=info".parse()?))
        .init();

    let config = Config::from_env();

    let pool = PgPoolOptions::new()
        .max_connections(16)
        .connect(&config.database_url)
        .await?;

    hirewire_domains::migrate(&pool).await?;

    let media = MediaStore::new(&config.media_root, &config.media_base_url);
    let media_root = config.media_root.clone();

    let state = Arc::new(AppState {
        pool,
        jwt: JwtService::new(&config.jwt_secret, config.jwt_issuer.clone()),
        media,
        mailer: Box::new(LogMailer {
            from: config.mail_from.clone(),
        }),
    });

    let app = Router::new()
        // Health check
        .route("/", get(|| async { "ok" }))
        // Auth
        .route("/api/auth/register", post(rest::auth::register))
        .route("/api/auth/register/verify", post(rest::auth::verify_otp))
        .route("/api/auth/resend-otp", post(rest::auth::resend_otp))
        .route("/api/auth/login", post(rest::auth::login))
        .route("/api/auth/token/refresh", post(rest::auth::refresh_token))
        .route(
            "/api/auth/forgot-password/request",
            post(rest::auth::forgot_password_request),
        )
        .route(
            "/api/auth/forgot-password/verify",
            post(rest::auth::forgot_password_verify),
        )
        .route(
            "/api/auth/forgot-password/reset",
            post(rest::auth::forgot_password_reset),
        )
        .route("/api/auth/change-password", post(rest::auth::change_password))
        .route("/api/auth/me", get(rest::auth::me))
        // Profiles
        .route(
            "/api/profile",
            get(rest::profiles::get_profile).patch(rest::profiles::update_profile),
        )
        .route(
            "/api/profile/image",
            post(rest::profiles::upload_profile_image)
                .delete(rest::profiles::delete_profile_image),
        )
        .route(
            "/api/company-profile",
            get(rest::profiles::get_company_profile).patch(rest::profiles::update_company_profile),
        )
        // Social graph
        .route("/api/users", get(rest::social::list_users))
        .route("/api/users/{id}/follow", post(rest::social::follow))
        .route("/api/users/{id}/unfollow", post(rest::social::unfollow))
        .route("/api/users/{id}/follow/accept", post(rest::social::accept_follow))
        .route("/api/users/{id}/follow/reject", post(rest::social::reject_follow))
        .route("/api/users/{id}/followers", get(rest::social::followers))
        .route("/api/users/{id}/following", get(rest::social::following))
        .route("/api/users/{id}/follow-counts", get(rest::social::follow_counts))
        // Posts
        .route(
            "/api/posts",
            get(rest::posts::list_posts).post(rest::posts::create_post),
        )
        .route(
            "/api/posts/{id}",
            get(rest::posts::get_post)
                .patch(rest::posts::update_post)
                .delete(rest::posts::delete_post),
        )
        .route("/api/posts/{id}/images", post(rest::posts::add_images))
        .route(
            "/api/posts/{id}/images/{img_id}",
            axum::routing::delete(rest::posts::delete_image),
        )
        .route("/api/posts/{id}/like", post(rest::posts::like))
        .route("/api/posts/{id}/unlike", post(rest::posts::unlike))
        .route(
            "/api/posts/{id}/comments",
            get(rest::posts::list_comments).post(rest::posts::create_comment),
        )
        .route(
            "/api/comments/{id}",
            axum::routing::delete(rest::posts::delete_comment),
        )
        .route("/api/posts/{id}/share", post(rest::posts::share))
        // Jobs
        .route(
            "/api/jobs",
            get(rest::jobs::list_jobs).post(rest::jobs::create_job),
        )
        .route("/api/jobs/stats", get(rest::jobs::job_stats))
        .route(
            "/api/jobs/{id}",
            get(rest::jobs::get_job)
                .patch(rest::jobs::update_job)
                .delete(rest::jobs::delete_job),
        )
        .route("/api/my-jobs", get(rest::jobs::my_jobs))
        .route("/api/jobs/{id}/apply", post(rest::jobs::apply))
        .route("/api/jobs/{id}/applications", get(rest::jobs::job_applications))
        .route("/api/applications/my", get(rest::jobs::my_applications))
        .route(
            "/api/applications/{id}",
            get(rest::jobs::get_application).patch(rest::jobs::update_application),
        )
        // Notifications
        .route("/api/notifications", get(rest::notifications::list))
        .route(
            "/api/notifications/{id}/read",
            patch(rest::notifications::mark_read),
        )
        .route(
            "/api/notifications/mark-all-read",
            post(rest::notifications::mark_all_read),
        )
        .route(
            "/api/notifications/unread-count",
            get(rest::notifications::unread_count),
        )
        // Uploaded blobs
        .nest_service("/media", ServeDir::new(media_root))
        .with_state(state)
        // CORS
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        // Logging layer: method + path + status + latency only
        .layer(
            tower_http::trace::TraceLayer::new_for_http().make_span_with(
                |request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                },
            ),
        );

    let addr = format!("{}:{}", config.host, config.port);
    info!("HireWire API starting on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
