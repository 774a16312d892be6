//! Timer controller.
//!
//! A small state machine over one persisted timer. It keeps no running
//! counter: every query re-derives the duration from persisted state and the
//! clock, so a missed tick or a long stint in the background never causes
//! drift.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running -> Paused -> Running -> ... -> Idle
//!          (stop returns to Idle from any state)
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut timer = TimerController::new(TimerStore::new(&kv, &clock), TimerType::Workout, None);
//! timer.start();
//! // Every TICK_INTERVAL:
//! let secs = timer.tick();
//! // On return to foreground:
//! timer.on_app_state_change(AppState::Active);
//! let total = timer.stop();
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::state::{format_duration, total_seconds, TimerState, TimerType};
use super::store::TimerStore;
use crate::events::Event;

/// How often a front end should call [`TimerController::tick`].
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerPhase {
    Idle,
    Running,
    Paused,
}

/// Host application lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppState {
    Active,
    Inactive,
    Background,
}

pub struct TimerController<'a> {
    timers: TimerStore<'a>,
    timer_type: TimerType,
    scope: Option<String>,
    phase: TimerPhase,
    duration_secs: u64,
    app_state: AppState,
}

impl<'a> TimerController<'a> {
    /// Create a controller and adopt any persisted state for this timer.
    pub fn new(timers: TimerStore<'a>, timer_type: TimerType, scope: Option<&str>) -> Self {
        let mut controller = Self {
            timers,
            timer_type,
            scope: scope.filter(|s| !s.is_empty()).map(str::to_string),
            phase: TimerPhase::Idle,
            duration_secs: 0,
            app_state: AppState::Active,
        };
        controller.restore();
        controller
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn phase(&self) -> TimerPhase {
        self.phase
    }

    pub fn timer_type(&self) -> TimerType {
        self.timer_type
    }

    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    /// Duration as of the last start/pause/resume/tick/restore.
    pub fn duration_secs(&self) -> u64 {
        self.duration_secs
    }

    pub fn snapshot(&self) -> Event {
        Event::StateSnapshot {
            timer_type: self.timer_type,
            scope_key: self.scope.clone(),
            phase: self.phase,
            elapsed_secs: self.duration_secs,
            display: format_duration(self.duration_secs),
            at: self.timers.clock().now(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start fresh from any phase. Discards previously added manual time.
    pub fn start(&mut self) -> Event {
        self.timers.start(self.timer_type, self.scope());
        self.phase = TimerPhase::Running;
        self.duration_secs = 0;
        Event::TimerStarted {
            timer_type: self.timer_type,
            scope_key: self.scope.clone(),
            at: self.timers.clock().now(),
        }
    }

    pub fn pause(&mut self) -> Option<Event> {
        if self.phase != TimerPhase::Running {
            return None;
        }
        let state = self.timers.pause(self.timer_type, self.scope());
        self.apply(state.as_ref())?;
        Some(Event::TimerPaused {
            timer_type: self.timer_type,
            scope_key: self.scope.clone(),
            elapsed_secs: self.duration_secs,
            at: self.timers.clock().now(),
        })
    }

    pub fn resume(&mut self) -> Option<Event> {
        if self.phase != TimerPhase::Paused {
            return None;
        }
        let state = self.timers.resume(self.timer_type, self.scope());
        self.apply(state.as_ref())?;
        Some(Event::TimerResumed {
            timer_type: self.timer_type,
            scope_key: self.scope.clone(),
            elapsed_secs: self.duration_secs,
            at: self.timers.clock().now(),
        })
    }

    /// Stop from any phase and return the final duration in seconds,
    /// manual additions included. Persisted state is cleared.
    pub fn stop(&mut self) -> u64 {
        let now_ms = self.timers.clock().now_ms();
        let total = match self.timers.load(self.timer_type, self.scope()) {
            Some(state) => total_seconds(&state, now_ms),
            // Write never landed; the last derived value is the best we have.
            None if self.phase != TimerPhase::Idle => self.duration_secs,
            None => 0,
        };
        self.timers.clear(self.timer_type, self.scope());
        debug!(timer = %self.timer_type, total, "timer stopped");
        self.phase = TimerPhase::Idle;
        self.duration_secs = 0;
        total
    }

    /// Add seconds spent before the timer was started. No-op when idle.
    pub fn add_manual_time(&mut self, seconds: u64) -> Option<Event> {
        if self.phase == TimerPhase::Idle {
            return None;
        }
        let state = self
            .timers
            .add_manual_time(self.timer_type, self.scope(), seconds);
        self.apply(state.as_ref())?;
        Some(Event::ManualTimeAdded {
            timer_type: self.timer_type,
            scope_key: self.scope.clone(),
            added_secs: seconds,
            elapsed_secs: self.duration_secs,
            at: self.timers.clock().now(),
        })
    }

    /// Re-derive the duration from persisted state. Call every [`TICK_INTERVAL`].
    pub fn tick(&mut self) -> u64 {
        if self.phase != TimerPhase::Idle {
            self.restore();
        }
        self.duration_secs
    }

    /// Track host lifecycle. Coming back to `Active` re-reads persisted state
    /// immediately and returns the fresh duration.
    pub fn on_app_state_change(&mut self, next: AppState) -> Option<u64> {
        let previous = std::mem::replace(&mut self.app_state, next);
        if previous != AppState::Active && next == AppState::Active {
            return Some(self.restore());
        }
        None
    }

    /// Adopt whatever is persisted for this timer (or Idle if nothing is).
    pub fn restore(&mut self) -> u64 {
        let state = self.timers.load(self.timer_type, self.scope());
        if self.apply(state.as_ref()).is_none() {
            self.phase = TimerPhase::Idle;
            self.duration_secs = 0;
        }
        self.duration_secs
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// Sync phase and duration from `state`. `None` means the timer vanished
    /// underneath us, in which case the controller falls back to Idle.
    fn apply(&mut self, state: Option<&TimerState>) -> Option<()> {
        let Some(state) = state else {
            self.phase = TimerPhase::Idle;
            self.duration_secs = 0;
            return None;
        };
        self.phase = if state.is_paused {
            TimerPhase::Paused
        } else {
            TimerPhase::Running
        };
        self.duration_secs = total_seconds(state, self.timers.clock().now_ms());
        Some(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::storage::{KeyValueStore, MemoryStore};

    fn controller<'a>(kv: &'a MemoryStore, clock: &'a ManualClock) -> TimerController<'a> {
        TimerController::new(TimerStore::new(kv, clock), TimerType::Workout, None)
    }

    #[test]
    fn start_pause_resume_stop_scenario() {
        let kv = MemoryStore::new();
        let clock = ManualClock::at_ms(0);
        let mut timer = controller(&kv, &clock);
        assert_eq!(timer.phase(), TimerPhase::Idle);

        timer.start();
        clock.advance_secs(65);
        let paused = timer.pause().unwrap();
        assert!(matches!(paused, Event::TimerPaused { elapsed_secs: 65, .. }));
        assert_eq!(timer.phase(), TimerPhase::Paused);

        assert!(timer.resume().is_some());
        clock.advance_secs(10);
        assert_eq!(timer.stop(), 75);
        assert_eq!(timer.phase(), TimerPhase::Idle);
        assert!(kv.is_empty());
    }

    #[test]
    fn transitions_out_of_order_are_noops() {
        let kv = MemoryStore::new();
        let clock = ManualClock::at_ms(0);
        let mut timer = controller(&kv, &clock);

        assert!(timer.pause().is_none());
        assert!(timer.resume().is_none());
        assert!(timer.add_manual_time(30).is_none());
        assert_eq!(timer.stop(), 0);

        timer.start();
        assert!(timer.resume().is_none());
        timer.pause();
        assert!(timer.pause().is_none());
    }

    #[test]
    fn tick_recomputes_from_wall_clock() {
        let kv = MemoryStore::new();
        let clock = ManualClock::at_ms(0);
        let mut timer = controller(&kv, &clock);

        timer.start();
        clock.advance_secs(1);
        assert_eq!(timer.tick(), 1);
        // A long gap between ticks (app suspended) does not drift.
        clock.advance_secs(3_600);
        assert_eq!(timer.tick(), 3_601);
    }

    #[test]
    fn foreground_resync_is_immediate() {
        let kv = MemoryStore::new();
        let clock = ManualClock::at_ms(0);
        let mut timer = controller(&kv, &clock);

        timer.start();
        assert_eq!(timer.on_app_state_change(AppState::Background), None);
        clock.advance_secs(600);
        assert_eq!(timer.duration_secs(), 0);
        assert_eq!(timer.on_app_state_change(AppState::Active), Some(600));
        assert_eq!(timer.on_app_state_change(AppState::Active), None);

        timer.on_app_state_change(AppState::Inactive);
        clock.advance_secs(5);
        assert_eq!(timer.on_app_state_change(AppState::Active), Some(605));
    }

    #[test]
    fn manual_time_counts_toward_stop_and_survives_restart() {
        let kv = MemoryStore::new();
        let clock = ManualClock::at_ms(0);
        {
            let mut timer = controller(&kv, &clock);
            timer.start();
            clock.advance_secs(20);
            timer.add_manual_time(300);
            assert_eq!(timer.duration_secs(), 320);
        }
        // Process killed and relaunched.
        clock.advance_secs(10);
        let mut timer = controller(&kv, &clock);
        assert_eq!(timer.phase(), TimerPhase::Running);
        assert_eq!(timer.duration_secs(), 330);
        assert_eq!(timer.stop(), 330);
    }

    #[test]
    fn restart_resets_manual_offset() {
        let kv = MemoryStore::new();
        let clock = ManualClock::at_ms(0);
        let mut timer = controller(&kv, &clock);

        timer.start();
        timer.add_manual_time(100);
        timer.start();
        clock.advance_secs(3);
        assert_eq!(timer.stop(), 3);
    }

    #[test]
    fn externally_cleared_timer_falls_back_to_idle() {
        let kv = MemoryStore::new();
        let clock = ManualClock::at_ms(0);
        let mut timer = controller(&kv, &clock);

        timer.start();
        kv.remove("timer:workout").unwrap();
        assert!(timer.pause().is_none());
        assert_eq!(timer.phase(), TimerPhase::Idle);
    }

    #[test]
    fn snapshot_reports_phase_and_display() {
        let kv = MemoryStore::new();
        let clock = ManualClock::at_ms(0);
        let mut timer = controller(&kv, &clock);
        timer.start();
        clock.advance_secs(75);
        timer.tick();

        match timer.snapshot() {
            Event::StateSnapshot {
                phase,
                elapsed_secs,
                display,
                ..
            } => {
                assert_eq!(phase, TimerPhase::Running);
                assert_eq!(elapsed_secs, 75);
                assert_eq!(display, "1:15");
            }
            other => panic!("Expected StateSnapshot, got {other:?}"),
        }
    }
}
