use super::{insert_failed, payload, MetricStore, StoreError, StoreResult};
use axum::async_trait;
use sqlx::PgPool;
use tracing::debug;

/// Quoted as a single identifier, the dot is part of the table name.
pub const METRIC_TABLE: &str = "request.metric";

#[derive(Clone)]
pub struct PgMetricStore {
    pool: PgPool,
}

impl PgMetricStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Creates the visits table when it is missing. Production databases are
    /// provisioned outside this service, this is for tests and local runs.
    pub async fn setup(&self) -> anyhow::Result<()> {
        let create = format!(
            r#"
create table if not exists "{METRIC_TABLE}" (
    id bigserial primary key,
    createdAt timestamptz not null default now(),
    data jsonb,
    meta jsonb
)
"#
        );
        sqlx::query(&create).execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl MetricStore for PgMetricStore {
    async fn record_visit(&self) -> StoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            StoreError::Unavailable(anyhow::Error::new(e).context("failed starting transaction"))
        })?;

        let data = payload()?;
        let insert = format!(r#"insert into "{METRIC_TABLE}" (data, meta) values ($1, $2)"#);
        let inserted = sqlx::query(&insert)
            .bind(&data)
            .bind(&data)
            .execute(&mut *tx)
            .await;

        if let Err(e) = inserted {
            let rollback = tx.rollback().await;
            return Err(insert_failed(anyhow::Error::new(e), rollback));
        }

        tx.commit().await.map_err(|e| {
            StoreError::WriteFailed(anyhow::Error::new(e).context("failed committing transaction"))
        })?;
        debug!("Visit recorded");
        Ok(())
    }

    async fn latest_count(&self) -> StoreResult<i64> {
        let fetch =
            format!(r#"select id::int8 from "{METRIC_TABLE}" order by createdAt desc, id desc limit 1"#);
        sqlx::query_scalar::<_, i64>(&fetch)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                StoreError::ReadFailed(anyhow::Error::new(e).context("failed to execute fetch statement"))
            })?
            .ok_or(StoreError::NoData)
    }

    async fn total_visits(&self) -> StoreResult<i64> {
        let count = format!(r#"select count(*) from "{METRIC_TABLE}""#);
        sqlx::query_scalar::<_, i64>(&count)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                StoreError::ReadFailed(anyhow::Error::new(e).context("failed to execute count statement"))
            })
    }
}
