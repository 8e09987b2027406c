use crate::config::DatabaseConfig;
use sqlx::{postgres::PgPoolOptions, Connection, PgPool};
use tracing::info;

/// Opens the pool without connecting; the first real connection attempt
/// happens on first use or on [`ping`]. An error here means the connection
/// string itself could not be parsed.
pub fn postgres(config: &DatabaseConfig, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    info!(
        host = %config.host,
        port = %config.port,
        database = %config.database,
        max_connections,
        "Opening database pool"
    );
    Ok(PgPoolOptions::new()
        .max_connections(max_connections)
        .min_connections(0)
        .max_lifetime(None)
        .idle_timeout(None)
        .connect_lazy(&config.dsn())?)
}

pub async fn ping(pool: &PgPool) -> Result<(), sqlx::Error> {
    let mut conn = pool.acquire().await?;
    conn.ping().await
}
