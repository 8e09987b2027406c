//! Visit rows and the operations the handlers run against them.
//!
//! The store is injected into the router as a [`SharedStore`], so the
//! handlers never reach for a global pool and tests can swap in
//! [`MemoryMetricStore`].

mod memory;
mod postgres;

pub use memory::{FailurePoint, MemoryMetricStore};
pub use postgres::{PgMetricStore, METRIC_TABLE};

use axum::async_trait;
use serde::Serialize;
use std::{fmt::Display, sync::Arc, time::SystemTime};
use thiserror::Error;

pub type SharedStore = Arc<dyn MetricStore>;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable")]
    Unavailable(#[source] anyhow::Error),
    #[error("write failed")]
    WriteFailed(#[source] anyhow::Error),
    #[error("read failed")]
    ReadFailed(#[source] anyhow::Error),
    #[error("no data found")]
    NoData,
}

/// One visit row.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricRecord {
    pub id: i64,
    pub created_at: SystemTime,
    pub data: serde_json::Value,
    pub meta: serde_json::Value,
}

/// Body written to both `data` and `meta` of every visit row. Carries no
/// detail today.
#[derive(Debug, Default, Clone, Serialize)]
pub struct VisitPayload {}

#[async_trait]
pub trait MetricStore: Send + Sync {
    /// Inserts one visit row inside a transaction. Nothing persists when
    /// this returns an error.
    async fn record_visit(&self) -> StoreResult<()>;

    /// Id of the most recently created visit row.
    async fn latest_count(&self) -> StoreResult<i64>;

    /// Number of visit rows.
    async fn total_visits(&self) -> StoreResult<i64>;
}

pub(crate) fn payload() -> StoreResult<serde_json::Value> {
    serde_json::to_value(VisitPayload::default())
        .map_err(|e| StoreError::WriteFailed(anyhow::Error::new(e).context("failed encoding payload")))
}

/// Error for an insert that failed, given how the rollback that followed it
/// went. A failed rollback keeps both messages.
pub(crate) fn insert_failed<E: Display>(insert: anyhow::Error, rollback: Result<(), E>) -> StoreError {
    let insert = insert.context("failed to execute insert data statement");
    StoreError::WriteFailed(match rollback {
        Ok(()) => insert.context("error inserting visit"),
        Err(rollback) => {
            tracing::warn!("Rollback failed after insert error: {rollback}");
            insert.context(format!("{rollback} error rolling back transaction"))
        }
    })
}
