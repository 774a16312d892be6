use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::{TimerPhase, TimerType};

/// Every timer state change produces an Event.
/// Front ends render them; the CLI prints them as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    TimerStarted {
        timer_type: TimerType,
        scope_key: Option<String>,
        at: DateTime<Utc>,
    },
    TimerPaused {
        timer_type: TimerType,
        scope_key: Option<String>,
        elapsed_secs: u64,
        at: DateTime<Utc>,
    },
    TimerResumed {
        timer_type: TimerType,
        scope_key: Option<String>,
        elapsed_secs: u64,
        at: DateTime<Utc>,
    },
    /// Timer stopped; `duration_secs` includes manually added time.
    TimerStopped {
        timer_type: TimerType,
        scope_key: Option<String>,
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    ManualTimeAdded {
        timer_type: TimerType,
        scope_key: Option<String>,
        added_secs: u64,
        elapsed_secs: u64,
        at: DateTime<Utc>,
    },
    /// Full state snapshot.
    StateSnapshot {
        timer_type: TimerType,
        scope_key: Option<String>,
        phase: TimerPhase,
        elapsed_secs: u64,
        display: String,
        at: DateTime<Utc>,
    },
}
