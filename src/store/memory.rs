use super::{insert_failed, payload, MetricRecord, MetricStore, StoreError, StoreResult};
use anyhow::anyhow;
use axum::async_trait;
use std::{
    collections::HashSet,
    sync::{Mutex, MutexGuard, PoisonError},
    time::SystemTime,
};

/// Step of a visit write (or read) that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailurePoint {
    Begin,
    Insert,
    Rollback,
    Commit,
    Read,
}

/// Keeps visit rows in memory. A write is staged and only appended when its
/// simulated transaction commits.
#[derive(Debug)]
pub struct MemoryMetricStore {
    inner: Mutex<Inner>,
}

#[derive(Debug)]
struct Inner {
    rows: Vec<MetricRecord>,
    next_id: i64,
    failures: HashSet<FailurePoint>,
}

impl Default for MemoryMetricStore {
    fn default() -> Self {
        Self::starting_at(1)
    }
}

impl MemoryMetricStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Behaves like a table whose id sequence already advanced to `next_id`.
    pub fn starting_at(next_id: i64) -> Self {
        Self {
            inner: Mutex::new(Inner {
                rows: Vec::new(),
                next_id,
                failures: HashSet::new(),
            }),
        }
    }

    /// Makes every following operation that reaches `point` fail until
    /// [`MemoryMetricStore::heal`] is called.
    pub fn fail_at(&self, point: FailurePoint) {
        self.lock().failures.insert(point);
    }

    pub fn heal(&self) {
        self.lock().failures.clear();
    }

    pub fn rows(&self) -> Vec<MetricRecord> {
        self.lock().rows.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Inner {
    fn fails(&self, point: FailurePoint) -> bool {
        self.failures.contains(&point)
    }

    fn read(&self) -> StoreResult<()> {
        if self.fails(FailurePoint::Read) {
            return Err(StoreError::ReadFailed(
                anyhow!("connection reset").context("failed to execute fetch statement"),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl MetricStore for MemoryMetricStore {
    async fn record_visit(&self) -> StoreResult<()> {
        let mut inner = self.lock();
        if inner.fails(FailurePoint::Begin) {
            return Err(StoreError::Unavailable(
                anyhow!("connection refused").context("failed starting transaction"),
            ));
        }

        let data = payload()?;
        if inner.fails(FailurePoint::Insert) {
            let rollback = if inner.fails(FailurePoint::Rollback) {
                Err("connection lost")
            } else {
                Ok(())
            };
            return Err(insert_failed(anyhow!("insert rejected"), rollback));
        }
        if inner.fails(FailurePoint::Commit) {
            return Err(StoreError::WriteFailed(
                anyhow!("commit rejected").context("failed committing transaction"),
            ));
        }

        let id = inner.next_id;
        inner.next_id += 1;
        inner.rows.push(MetricRecord {
            id,
            created_at: SystemTime::now(),
            data: data.clone(),
            meta: data,
        });
        Ok(())
    }

    async fn latest_count(&self) -> StoreResult<i64> {
        let inner = self.lock();
        inner.read()?;
        inner.rows.last().map(|r| r.id).ok_or(StoreError::NoData)
    }

    async fn total_visits(&self) -> StoreResult<i64> {
        let inner = self.lock();
        inner.read()?;
        Ok(inner.rows.len() as i64)
    }
}
