use crate::{
    app::{logger, App},
    config::{DatabaseConfig, ServerConfig},
    db,
    handlers::routes,
    store::{PgMetricStore, SharedStore},
};
use sqlx::PgPool;
use std::{process::ExitCode, sync::Arc};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Runs the service until an interrupt arrives.
pub async fn run() -> ExitCode {
    dotenvy::dotenv().ok();
    logger();

    let database = DatabaseConfig::from_env();
    let server = ServerConfig::from_env();
    info!(?database, ?server, "Configuration loaded");

    let pool = match db::postgres(&database, server.max_connections) {
        Ok(pool) => pool,
        Err(e) => {
            error!("Unable to use data source name: {e}");
            return ExitCode::FAILURE;
        }
    };

    let shutdown = interrupt_token();

    tokio::select! {
        pinged = db::ping(&pool) => {
            if let Err(e) = pinged {
                error!("Database ping failed: {e}");
                pool.close().await;
                return ExitCode::FAILURE;
            }
        }
        _ = shutdown.cancelled() => {
            info!("Interrupted before the database answered");
            pool.close().await;
            return ExitCode::SUCCESS;
        }
    }

    match serve(pool, &server, shutdown).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Error starting server: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Serves the counter over `pool` until `shutdown` is cancelled and closes
/// the pool once the server has stopped, whether it failed or not.
pub async fn serve(pool: PgPool, server: &ServerConfig, shutdown: CancellationToken) -> anyhow::Result<()> {
    let store: SharedStore = Arc::new(PgMetricStore::new(pool.clone()));
    let served = App::new()
        .router(routes())
        .inject(store)
        .inject(server.count_mode)
        .start(server, shutdown)
        .await;
    pool.close().await;
    served
}

/// Token cancelled by a background task on Ctrl-C or SIGTERM.
pub fn interrupt_token() -> CancellationToken {
    let token = CancellationToken::new();
    let cancel = token.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        cancel.cancel();
    });
    token
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Signal received, starting graceful shutdown");
}
