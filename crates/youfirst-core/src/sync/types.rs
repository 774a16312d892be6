//! Core types for the remote challenge mirror.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;

/// Remote table mirrored from local challenge data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteTable {
    Challenges,
    ChallengeParticipants,
    ChallengeCheckins,
}

impl RemoteTable {
    pub const ALL: [RemoteTable; 3] = [
        RemoteTable::Challenges,
        RemoteTable::ChallengeParticipants,
        RemoteTable::ChallengeCheckins,
    ];

    /// Table name in the REST path.
    pub fn name(&self) -> &'static str {
        match self {
            RemoteTable::Challenges => "challenges",
            RemoteTable::ChallengeParticipants => "challenge_participants",
            RemoteTable::ChallengeCheckins => "challenge_checkins",
        }
    }

    /// Columns forming the upsert conflict target.
    pub fn conflict_columns(&self) -> &'static str {
        match self {
            RemoteTable::Challenges => "id",
            RemoteTable::ChallengeParticipants => "challenge_id,user_id",
            RemoteTable::ChallengeCheckins => "id",
        }
    }
}

impl std::fmt::Display for RemoteTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One row waiting to be upserted remotely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MirrorRow {
    pub table: RemoteTable,
    /// Conflict key values joined with `/`; identifies the row in the outbox.
    pub key: String,
    /// snake_case row body as sent to the backend.
    pub data: serde_json::Value,
    /// Last-write-wins ordering between rows with the same key.
    pub updated_at: DateTime<Utc>,
}

impl MirrorRow {
    pub fn outbox_key(&self) -> String {
        format!("{}:{}", self.table.name(), self.key)
    }
}

/// Current mirror status.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncStatus {
    pub configured: bool,
    /// Rows waiting in the outbox.
    pub pending_count: usize,
    pub last_flush_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

/// Outcome of one outbox flush.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlushReport {
    pub pushed: usize,
    pub failed: usize,
    pub remaining: usize,
}

/// Sync error types.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Remote API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid remote URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Remote backend not configured")]
    NotConfigured,

    #[error("Outbox storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
