//! Test doubles shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use change_notify::error::{PublishError, StoreError};
use change_notify::publish::{Notification, Publisher};
use change_notify::record::Row;
use change_notify::store::{Filter, MemoryStore, Store, StoreResult};
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

/// Records every notification it accepts.
#[derive(Clone, Default)]
pub struct RecordingPublisher {
    sent: Arc<Mutex<Vec<Notification>>>,
    delay: Option<Duration>,
    reject: bool,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait this long before accepting each notification.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Refuse every notification.
    pub fn rejecting() -> Self {
        Self {
            reject: true,
            ..Self::default()
        }
    }

    pub async fn sent(&self) -> Vec<Notification> {
        self.sent.lock().await.clone()
    }

    pub async fn count(&self) -> usize {
        self.sent.lock().await.len()
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn publish(&self, notification: &Notification) -> Result<(), PublishError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.reject {
            return Err(PublishError::Rejected("queue is closed".to_string()));
        }
        self.sent.lock().await.push(notification.clone());
        Ok(())
    }

    fn name(&self) -> String {
        "recording".to_string()
    }
}

/// Which store call a [`ScriptedStore`] should interfere with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    FirstRead,
    Write,
    SecondRead,
}

#[derive(Debug, Clone, Copy)]
pub enum Fault {
    Fail,
    Delay(Duration),
}

/// Wraps a [`MemoryStore`], counting calls and optionally failing or
/// stalling one of them.
pub struct ScriptedStore {
    inner: MemoryStore,
    reads: AtomicUsize,
    writes: AtomicUsize,
    fault: Option<(Step, Fault)>,
    /// Rows the engine claims to have written, regardless of the real count
    reported_rows: Option<u64>,
}

impl ScriptedStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            reads: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
            fault: None,
            reported_rows: None,
        }
    }

    pub fn with_fault(mut self, step: Step, fault: Fault) -> Self {
        self.fault = Some((step, fault));
        self
    }

    pub fn reporting_rows(mut self, rows: u64) -> Self {
        self.reported_rows = Some(rows);
        self
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    async fn interfere(&self, step: Step) -> StoreResult<()> {
        match self.fault {
            Some((at, Fault::Fail)) if at == step => Err(StoreError::backend(
                std::io::Error::new(std::io::ErrorKind::ConnectionReset, "connection reset"),
            )),
            Some((at, Fault::Delay(delay))) if at == step => {
                tokio::time::sleep(delay).await;
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl Store for ScriptedStore {
    type Row = Row;
    type Filter = Filter;
    type Patch = Value;

    async fn find_one(&self, filter: &Filter) -> StoreResult<Row> {
        let step = match self.reads.fetch_add(1, Ordering::SeqCst) {
            0 => Step::FirstRead,
            _ => Step::SecondRead,
        };
        self.interfere(step).await?;
        self.inner.find_one(filter).await
    }

    async fn update(&self, filter: &Filter, patch: &Value) -> StoreResult<u64> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.interfere(Step::Write).await?;
        let rows = self.inner.update(filter, patch).await?;
        Ok(self.reported_rows.unwrap_or(rows))
    }

    async fn upsert(&self, row: &Row) -> StoreResult<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.interfere(Step::Write).await?;
        self.inner.upsert(row).await
    }

    fn identity_filter(&self, row: &Row) -> Option<Filter> {
        self.inner.identity_filter(row)
    }

    fn name(&self) -> String {
        format!("scripted({})", self.inner.name())
    }
}

pub fn order(id: i64, status: &str) -> Row {
    Row::new()
        .with("id", id)
        .with("status", status)
        .with("total", 100)
}

pub fn orders(count: i64) -> MemoryStore {
    MemoryStore::with_rows("id", (1..=count).map(|id| order(id, "pending")))
        .expect("seed rows have unique keys")
}
