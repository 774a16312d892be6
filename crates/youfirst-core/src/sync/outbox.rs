//! Persistent outbound queue of mirror rows.
//!
//! Rows are keyed by table and conflict key, so re-enqueueing the same row
//! replaces the pending copy (newest `updated_at` wins). A flush upserts
//! everything pending per table; rows of a table whose upsert failed stay
//! queued for the next flush.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::error::StorageError;
use crate::storage::KeyValueStore;
use crate::sync::supabase::RemoteBackend;
use crate::sync::types::{FlushReport, MirrorRow, RemoteTable, SyncError, SyncStatus};

const OUTBOX_KEY: &str = "sync:outbox";
const LAST_FLUSH_KEY: &str = "sync:last_flush";

/// Pending row with retry bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PendingRow {
    row: MirrorRow,
    enqueued_at: DateTime<Utc>,
    #[serde(default)]
    attempts: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct LastFlush {
    at: Option<DateTime<Utc>>,
    error: Option<String>,
}

pub struct Outbox<'a> {
    store: &'a dyn KeyValueStore,
    clock: &'a dyn Clock,
}

impl<'a> Outbox<'a> {
    pub fn new(store: &'a dyn KeyValueStore, clock: &'a dyn Clock) -> Self {
        Self { store, clock }
    }

    fn read(&self) -> Result<BTreeMap<String, PendingRow>, StorageError> {
        match self.store.get(OUTBOX_KEY)? {
            Some(raw) => serde_json::from_str(&raw).map_err(|source| StorageError::Malformed {
                key: OUTBOX_KEY.to_string(),
                source,
            }),
            None => Ok(BTreeMap::new()),
        }
    }

    fn write(&self, pending: &BTreeMap<String, PendingRow>) -> Result<(), StorageError> {
        if pending.is_empty() {
            return self.store.remove(OUTBOX_KEY);
        }
        let raw = serde_json::to_string(pending).map_err(|source| StorageError::Malformed {
            key: OUTBOX_KEY.to_string(),
            source,
        })?;
        self.store.set(OUTBOX_KEY, &raw)
    }

    /// Queue rows for upload. An older copy of a queued row never replaces
    /// a newer one.
    pub fn enqueue(&self, rows: Vec<MirrorRow>) -> Result<(), SyncError> {
        if rows.is_empty() {
            return Ok(());
        }
        let mut pending = self.read()?;
        let now = self.clock.now();
        for row in rows {
            let key = row.outbox_key();
            match pending.get(&key) {
                Some(existing) if existing.row.updated_at > row.updated_at => {
                    debug!(key = %key, "dropping stale mirror row");
                }
                _ => {
                    pending.insert(
                        key,
                        PendingRow {
                            row,
                            enqueued_at: now,
                            attempts: 0,
                        },
                    );
                }
            }
        }
        self.write(&pending)?;
        Ok(())
    }

    /// Rows waiting for upload, ordered by table and key.
    pub fn pending(&self) -> Vec<MirrorRow> {
        match self.read() {
            Ok(pending) => pending.into_values().map(|p| p.row).collect(),
            Err(e) => {
                warn!(error = %e, "failed to read sync outbox");
                Vec::new()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.read().map(|p| p.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Push everything pending. One upsert per table; a failing table is
    /// retried on the next flush while the others are dropped from the queue.
    pub fn flush(&self, remote: &dyn RemoteBackend) -> Result<FlushReport, SyncError> {
        let mut pending = self.read()?;
        if pending.is_empty() {
            return Ok(FlushReport::default());
        }

        let mut report = FlushReport::default();
        let mut last_error = None;
        for table in RemoteTable::ALL {
            let keys: Vec<String> = pending
                .iter()
                .filter(|(_, p)| p.row.table == table)
                .map(|(k, _)| k.clone())
                .collect();
            if keys.is_empty() {
                continue;
            }
            let rows: Vec<_> = keys.iter().map(|k| pending[k].row.data.clone()).collect();

            match remote.upsert(table, &rows) {
                Ok(()) => {
                    for key in &keys {
                        pending.remove(key);
                    }
                    report.pushed += keys.len();
                }
                Err(e) => {
                    warn!(table = %table, rows = keys.len(), error = %e, "mirror upsert failed");
                    for key in &keys {
                        if let Some(p) = pending.get_mut(key) {
                            p.attempts += 1;
                        }
                    }
                    report.failed += keys.len();
                    last_error = Some(e.to_string());
                }
            }
        }
        report.remaining = pending.len();
        self.write(&pending)?;
        self.record_flush(last_error);

        info!(
            pushed = report.pushed,
            failed = report.failed,
            remaining = report.remaining,
            "flushed sync outbox"
        );
        Ok(report)
    }

    /// Best-effort flush: errors are logged and otherwise ignored.
    pub fn flush_quietly(&self, remote: &dyn RemoteBackend) {
        if let Err(e) = self.flush(remote) {
            warn!(error = %e, "sync outbox flush failed");
        }
    }

    fn record_flush(&self, error: Option<String>) {
        let last = LastFlush {
            at: Some(self.clock.now()),
            error,
        };
        let result = serde_json::to_string(&last)
            .map_err(|source| StorageError::Malformed {
                key: LAST_FLUSH_KEY.to_string(),
                source,
            })
            .and_then(|raw| self.store.set(LAST_FLUSH_KEY, &raw));
        if let Err(e) = result {
            warn!(error = %e, "failed to record flush status");
        }
    }

    pub fn status(&self, configured: bool) -> SyncStatus {
        let last: LastFlush = self
            .store
            .get(LAST_FLUSH_KEY)
            .ok()
            .flatten()
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default();
        SyncStatus {
            configured,
            pending_count: self.len(),
            last_flush_at: last.at,
            last_error: last.error,
        }
    }
}
