//! # You. First Core Library
//!
//! Core logic for the You. First habit and fitness tracker. Everything is
//! local-first: each feature owns one JSON collection in a shared key-value
//! store, and the `youfirst` CLI is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Timers**: persisted wall-clock timers (workout, reading, meditation)
//!   whose elapsed time is always derived from stored state and the clock
//! - **Storage**: SQLite-backed key-value store, whole-collection JSON
//!   persistence with per-record upgrades, and TOML configuration
//! - **Features**: goals, discipline rules, community challenges, workout
//!   builder, and mind (books and reading sessions)
//! - **Sync**: best-effort outbox mirroring challenges to Supabase
//!
//! ## Key Components
//!
//! - [`TimerController`]: Idle/Running/Paused state machine over a persisted timer
//! - [`SqliteStore`]: Key-value persistence
//! - [`Collection`]: Typed whole-collection access shared by feature modules
//! - [`Config`]: Application configuration management
//! - [`RemoteBackend`]: Seam for the challenge mirror

pub mod challenges;
pub mod clock;
pub mod discipline;
pub mod error;
pub mod events;
pub mod goals;
pub mod mind;
pub mod storage;
pub mod summary;
pub mod sync;
pub mod timer;
pub mod workouts;

pub use challenges::{
    Challenge, ChallengePatch, ChallengeProgress, ChallengeStatus, ChallengeStore, CheckIn,
    LeaderboardEntry, NewChallenge, Participant,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use discipline::{current_streak, longest_streak, DisciplineStore, Rule, RulePatch};
pub use error::{ConfigError, CoreError, StorageError, SyncError};
pub use events::Event;
pub use goals::{Goal, GoalPatch, GoalStore};
pub use mind::{Book, BookPatch, BookStatus, MindStore, ReadingSession, ReadingStats};
pub use storage::{data_dir, Collection, Config, KeyValueStore, MemoryStore, Record, SqliteStore};
pub use summary::Summary;
pub use sync::{Outbox, RemoteBackend, SupabaseClient};
pub use timer::{
    calculate_elapsed_seconds, AppState, TimerController, TimerPhase, TimerState, TimerStore,
    TimerType,
};
pub use workouts::{CustomWorkout, ScheduledWorkout, WorkoutExercise, WorkoutPatch, WorkoutStore};
