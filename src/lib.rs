pub mod app;
pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod lifecycle;
pub mod metrics;
pub mod store;

pub mod prelude {
    pub use crate::app::App;
    pub use crate::config::{CountMode, DatabaseConfig, ServerConfig};
    pub use crate::errors::{AppError, AppResult};
    pub use crate::handlers::routes;
    pub use crate::metrics::visits_recorded;
    pub use crate::store::{
        FailurePoint, MemoryMetricStore, MetricStore, PgMetricStore, SharedStore, StoreError,
    };
    pub use axum::routing::get;
    pub use axum::{Extension, Router};
    pub use tracing::{debug, error, info, trace, warn};
}
