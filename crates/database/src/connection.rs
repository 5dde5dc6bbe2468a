use crate::error::DbError;
use configuration::DatabaseSettings;
use sqlx::migrate::Migrator;
use sqlx::{PgPool, postgres::PgPoolOptions};

/// Migrations embedded at compile time from `crates/database/migrations`.
static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Establishes a connection pool to the PostgreSQL database.
///
/// The URL, pool size and acquire timeout all come from the `[database]`
/// section of the configuration (where `DATABASE_URL` has already been applied
/// as an override). The pool can be shared across the entire application.
pub async fn connect(settings: &DatabaseSettings) -> Result<PgPool, DbError> {
    if settings.url.trim().is_empty() {
        return Err(DbError::ConnectionConfigError("database.url must be set.".to_string()));
    }

    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .acquire_timeout(settings.acquire_timeout())
        .connect(&settings.url)
        .await?;

    tracing::debug!(max_connections = settings.max_connections, "Database pool ready.");
    Ok(pool)
}

/// Applies all pending migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<(), DbError> {
    MIGRATOR.run(pool).await?;
    tracing::info!("Database migrations applied.");
    Ok(())
}

/// Drops every table this crate owns and recreates the schema from scratch.
///
/// The migration history is dropped too, so the migrations run again in full.
/// Test harnesses call this before each case.
pub async fn reset_schema(pool: &PgPool) -> Result<(), DbError> {
    sqlx::query("DROP TABLE IF EXISTS likes, messages, follows, users, _sqlx_migrations CASCADE")
        .execute(pool)
        .await?;
    tracing::info!("Database schema dropped.");
    run_migrations(pool).await
}
