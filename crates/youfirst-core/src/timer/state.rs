//! Persisted timer state and the pure elapsed-time calculation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// What a timer is measuring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerType {
    Workout,
    Reading,
    Meditation,
}

impl TimerType {
    pub const ALL: [TimerType; 3] = [TimerType::Workout, TimerType::Reading, TimerType::Meditation];

    pub fn as_str(&self) -> &'static str {
        match self {
            TimerType::Workout => "workout",
            TimerType::Reading => "reading",
            TimerType::Meditation => "meditation",
        }
    }
}

impl fmt::Display for TimerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimerType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "workout" => Ok(TimerType::Workout),
            "reading" => Ok(TimerType::Reading),
            "meditation" => Ok(TimerType::Meditation),
            other => Err(format!("unknown timer type: {other}")),
        }
    }
}

/// Storage key for a timer: `timer:<type>` or `timer:<type>:<scope>`.
pub fn timer_key(timer_type: TimerType, scope: Option<&str>) -> String {
    match scope {
        Some(scope) if !scope.is_empty() => format!("timer:{timer_type}:{scope}"),
        _ => format!("timer:{timer_type}"),
    }
}

/// Timer state as persisted in the key-value store.
///
/// Only wall-clock timestamps are stored, never tick counts, so elapsed time
/// can always be recomputed after the process was suspended or killed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    #[serde(rename = "type")]
    pub timer_type: TimerType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope_key: Option<String>,
    /// Epoch milliseconds of the last start or resume.
    pub start_time: i64,
    /// Seconds banked from running segments before the last pause.
    pub accumulated_seconds: u64,
    pub is_paused: bool,
    /// Seconds added by hand on top of measured time.
    #[serde(default)]
    pub manual_seconds: u64,
}

impl TimerState {
    pub fn started(timer_type: TimerType, scope_key: Option<&str>, now_ms: i64) -> Self {
        Self {
            timer_type,
            scope_key: scope_key.filter(|s| !s.is_empty()).map(str::to_string),
            start_time: now_ms,
            accumulated_seconds: 0,
            is_paused: false,
            manual_seconds: 0,
        }
    }

    pub fn key(&self) -> String {
        timer_key(self.timer_type, self.scope_key.as_deref())
    }

    /// Fold the running segment into `accumulated_seconds` and pause.
    /// Already paused state is left untouched.
    pub fn paused_at(mut self, now_ms: i64) -> Self {
        if !self.is_paused {
            self.accumulated_seconds = calculate_elapsed_seconds(&self, now_ms);
            self.is_paused = true;
        }
        self
    }

    /// Restart the running segment at `now_ms`.
    /// Running state is left untouched so no time is dropped.
    pub fn resumed_at(mut self, now_ms: i64) -> Self {
        if self.is_paused {
            self.start_time = now_ms;
            self.is_paused = false;
        }
        self
    }
}

/// Measured seconds: banked seconds plus the current running segment.
///
/// A start time in the future (clock skew) contributes zero.
pub fn calculate_elapsed_seconds(state: &TimerState, now_ms: i64) -> u64 {
    let running = if state.is_paused {
        0
    } else {
        let delta_ms = now_ms.saturating_sub(state.start_time).max(0);
        (delta_ms / 1000) as u64
    };
    state.accumulated_seconds.saturating_add(running)
}

/// Measured seconds plus manually added seconds.
pub fn total_seconds(state: &TimerState, now_ms: i64) -> u64 {
    calculate_elapsed_seconds(state, now_ms).saturating_add(state.manual_seconds)
}

/// `H:MM:SS` or `M:SS`.
pub fn format_duration(seconds: u64) -> String {
    let (h, m, s) = (seconds / 3600, (seconds % 3600) / 60, seconds % 60);
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m}:{s:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running(start_time: i64) -> TimerState {
        TimerState::started(TimerType::Workout, None, start_time)
    }

    #[test]
    fn elapsed_counts_whole_seconds() {
        let state = running(10_000);
        assert_eq!(calculate_elapsed_seconds(&state, 10_000), 0);
        assert_eq!(calculate_elapsed_seconds(&state, 10_999), 0);
        assert_eq!(calculate_elapsed_seconds(&state, 75_000), 65);
    }

    #[test]
    fn future_start_time_clamps_to_zero() {
        let mut state = running(100_000);
        state.accumulated_seconds = 30;
        assert_eq!(calculate_elapsed_seconds(&state, 40_000), 30);
    }

    #[test]
    fn paused_ignores_wall_clock() {
        let state = running(0).paused_at(65_000);
        assert!(state.is_paused);
        assert_eq!(state.accumulated_seconds, 65);
        assert_eq!(calculate_elapsed_seconds(&state, 999_999_000), 65);
    }

    #[test]
    fn pause_twice_keeps_first_fold() {
        let once = running(0).paused_at(65_000);
        let twice = once.clone().paused_at(120_000);
        assert_eq!(once, twice);
    }

    #[test]
    fn resume_on_running_state_keeps_segment() {
        let state = running(0);
        assert_eq!(state.clone().resumed_at(50_000), state);
    }

    #[test]
    fn total_includes_manual_seconds() {
        let mut state = running(0);
        state.manual_seconds = 120;
        assert_eq!(total_seconds(&state, 10_000), 130);
    }

    #[test]
    fn keys_include_scope() {
        assert_eq!(timer_key(TimerType::Workout, None), "timer:workout");
        assert_eq!(timer_key(TimerType::Workout, Some("")), "timer:workout");
        assert_eq!(
            timer_key(TimerType::Reading, Some("book-1")),
            "timer:reading:book-1"
        );
    }

    #[test]
    fn json_shape_is_camel_case() {
        let state = TimerState::started(TimerType::Reading, Some("book-1"), 5);
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["type"], "reading");
        assert_eq!(json["scopeKey"], "book-1");
        assert_eq!(json["startTime"], 5);
        assert_eq!(json["isPaused"], false);
    }

    #[test]
    fn legacy_state_without_manual_seconds_parses() {
        let raw = r#"{"type":"workout","startTime":1,"accumulatedSeconds":4,"isPaused":true}"#;
        let state: TimerState = serde_json::from_str(raw).unwrap();
        assert_eq!(state.manual_seconds, 0);
        assert_eq!(state.scope_key, None);
    }

    #[test]
    fn formats_durations() {
        assert_eq!(format_duration(75), "1:15");
        assert_eq!(format_duration(3_725), "1:02:05");
    }
}
