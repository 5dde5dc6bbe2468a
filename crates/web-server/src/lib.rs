use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use configuration::{AuthSettings, Settings};
use database::DbRepository;
use std::sync::Arc;
use tower_http::{
    cors::{AllowHeaders, AllowOrigin, Any, CorsLayer, ExposeHeaders},
    trace::TraceLayer,
};

pub mod error;
pub mod handlers;

/// The shared application state that all handlers can access.
#[derive(Clone)]
pub struct AppState {
    pub db_repo: DbRepository,
    pub auth: AuthSettings,
}

/// Builds the application router with all routes and middleware attached.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::any())
        .allow_methods(Any)
        .allow_headers(AllowHeaders::any())
        .expose_headers(ExposeHeaders::any());

    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .route("/api/login", post(handlers::login))
        .route("/api/users", get(handlers::list_users).post(handlers::signup))
        .route("/api/users/:user_id", get(handlers::get_user_profile))
        .route("/api/users/:user_id/following", get(handlers::get_following))
        .route("/api/users/:user_id/followers", get(handlers::get_followers))
        .route(
            "/api/users/:user_id/following/:other_id",
            post(handlers::follow_user).delete(handlers::unfollow_user),
        )
        .route("/api/users/:user_id/messages", post(handlers::create_message))
        .route("/api/users/:user_id/timeline", get(handlers::get_timeline))
        .route(
            "/api/users/:user_id/likes/:message_id",
            post(handlers::like_message).delete(handlers::unlike_message),
        )
        .with_state(state)
        .layer(cors)
        // This middleware will automatically log information about every incoming request.
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(1024 * 64))
}

/// Connects to the database, applies migrations and serves the API until the
/// process is stopped.
pub async fn run_server(settings: Settings) -> anyhow::Result<()> {
    // Tracing is initialized by the caller; installing a second subscriber here would fail.
    let addr = settings.server.socket_addr()?;

    let db_pool = database::connect(&settings.database).await?;
    database::run_migrations(&db_pool).await?;
    let db_repo = DbRepository::new(db_pool);

    let app = router(Arc::new(AppState { db_repo, auth: settings.auth }));

    tracing::info!("Web server listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
