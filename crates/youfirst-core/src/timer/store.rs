//! Timer persistence on top of the key-value store.
//!
//! Every operation is best-effort: failed reads look like "no timer", failed
//! writes are logged and show up as stale state on the next read.

use tracing::{debug, warn};

use super::state::{timer_key, TimerState, TimerType};
use crate::clock::Clock;
use crate::error::StorageError;
use crate::storage::KeyValueStore;

const KEY_PREFIX: &str = "timer:";

pub struct TimerStore<'a> {
    store: &'a dyn KeyValueStore,
    clock: &'a dyn Clock,
}

impl<'a> TimerStore<'a> {
    pub fn new(store: &'a dyn KeyValueStore, clock: &'a dyn Clock) -> Self {
        Self { store, clock }
    }

    pub fn clock(&self) -> &'a dyn Clock {
        self.clock
    }

    /// Current state, or `None` if no timer of this type/scope is active.
    pub fn load(&self, timer_type: TimerType, scope: Option<&str>) -> Option<TimerState> {
        let key = timer_key(timer_type, scope);
        match self.read(&key) {
            Ok(state) => state,
            Err(e) => {
                warn!(key = %key, error = %e, "failed to read timer state");
                None
            }
        }
    }

    /// Fresh running state, replacing whatever was stored for this key.
    pub fn start(&self, timer_type: TimerType, scope: Option<&str>) -> TimerState {
        let state = TimerState::started(timer_type, scope, self.clock.now_ms());
        self.write(&state);
        debug!(key = %state.key(), "timer started");
        state
    }

    pub fn pause(&self, timer_type: TimerType, scope: Option<&str>) -> Option<TimerState> {
        let current = self.load(timer_type, scope)?;
        if current.is_paused {
            return Some(current);
        }
        let state = current.paused_at(self.clock.now_ms());
        self.write(&state);
        debug!(key = %state.key(), accumulated = state.accumulated_seconds, "timer paused");
        Some(state)
    }

    pub fn resume(&self, timer_type: TimerType, scope: Option<&str>) -> Option<TimerState> {
        let current = self.load(timer_type, scope)?;
        if !current.is_paused {
            return Some(current);
        }
        let state = current.resumed_at(self.clock.now_ms());
        self.write(&state);
        debug!(key = %state.key(), "timer resumed");
        Some(state)
    }

    /// Add seconds on top of measured time. `None` if no timer is active.
    pub fn add_manual_time(
        &self,
        timer_type: TimerType,
        scope: Option<&str>,
        seconds: u64,
    ) -> Option<TimerState> {
        let mut state = self.load(timer_type, scope)?;
        state.manual_seconds = state.manual_seconds.saturating_add(seconds);
        self.write(&state);
        Some(state)
    }

    /// Remove persisted state. Idempotent.
    pub fn clear(&self, timer_type: TimerType, scope: Option<&str>) {
        let key = timer_key(timer_type, scope);
        if let Err(e) = self.store.remove(&key) {
            warn!(key = %key, error = %e, "failed to clear timer state");
        }
    }

    /// Every persisted timer, scoped ones included.
    pub fn active(&self) -> Vec<TimerState> {
        let keys = match self.store.keys_with_prefix(KEY_PREFIX) {
            Ok(keys) => keys,
            Err(e) => {
                warn!(error = %e, "failed to list timers");
                return Vec::new();
            }
        };
        keys.iter()
            .filter_map(|key| match self.read(key) {
                Ok(state) => state,
                Err(e) => {
                    warn!(key = %key, error = %e, "skipping unreadable timer");
                    None
                }
            })
            .collect()
    }

    fn read(&self, key: &str) -> Result<Option<TimerState>, StorageError> {
        let Some(raw) = self.store.get(key)? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| StorageError::Malformed {
                key: key.to_string(),
                source,
            })
    }

    fn write(&self, state: &TimerState) {
        let key = state.key();
        let result = serde_json::to_string(state)
            .map_err(|source| StorageError::Malformed {
                key: key.clone(),
                source,
            })
            .and_then(|raw| self.store.set(&key, &raw));
        if let Err(e) = result {
            warn!(key = %key, error = %e, "failed to persist timer state");
        }
    }
}
