use crate::{
    config::CountMode,
    errors::{AppError, AppResult},
    metrics::visits_recorded,
    store::SharedStore,
};
use axum::{http::StatusCode, routing::get, Extension, Router};
use tracing::info;

/// Routes served by the counter. Expects a [`SharedStore`] and a
/// [`CountMode`] to be injected.
pub fn routes() -> Router {
    Router::new()
        .route("/", get(visit))
        .route("/hello", get(hello))
}

pub async fn visit(
    Extension(store): Extension<SharedStore>,
    Extension(mode): Extension<CountMode>,
) -> AppResult<String> {
    info!("got / request");
    store
        .record_visit()
        .await
        .map_err(|e| AppError::store(e, "Error counting"))?;
    visits_recorded().increment(1);

    let count = match mode {
        CountMode::LatestId => store.latest_count().await,
        CountMode::RowCount => store.total_visits().await,
    }
    .map_err(|e| AppError::store(e, "Error fetching data"))?;
    Ok(format!("{count} Website Visit!\n"))
}

pub async fn hello() -> &'static str {
    info!("got /hello request");
    "Hello, HTTP!\n"
}

pub async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "404 page not found\n")
}
