//! Workout builder: user-defined workouts and their schedule.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::storage::{Collection, KeyValueStore, Record};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutExercise {
    pub name: String,
    pub sets: u32,
    pub reps: u32,
    #[serde(default)]
    pub rest_seconds: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomWorkout {
    pub id: String,
    pub name: String,
    pub exercises: Vec<WorkoutExercise>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for CustomWorkout {
    const KEY: &'static str = "custom_workouts";
    const ID_PREFIX: &'static str = "workout";

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledWorkout {
    pub id: String,
    pub workout_id: String,
    pub scheduled_for: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Measured by the workout timer when completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ScheduledWorkout {
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }
}

impl Record for ScheduledWorkout {
    const KEY: &'static str = "scheduled_workouts";
    const ID_PREFIX: &'static str = "scheduled";

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkoutPatch {
    pub name: Option<String>,
    pub exercises: Option<Vec<WorkoutExercise>>,
}

pub struct WorkoutStore<'a> {
    workouts: Collection<'a, CustomWorkout>,
    scheduled: Collection<'a, ScheduledWorkout>,
}

impl<'a> WorkoutStore<'a> {
    pub fn new(store: &'a dyn KeyValueStore, clock: &'a dyn Clock) -> Self {
        Self {
            workouts: Collection::new(store, clock),
            scheduled: Collection::new(store, clock),
        }
    }

    fn now(&self) -> DateTime<Utc> {
        self.workouts.clock().now()
    }

    // ── Custom workouts ──────────────────────────────────────────────

    pub fn load_workouts(&self) -> Vec<CustomWorkout> {
        self.workouts.load()
    }

    pub fn get_workout(&self, id: &str) -> Option<CustomWorkout> {
        self.workouts.get(id)
    }

    pub fn add_workout(&self, name: &str, exercises: Vec<WorkoutExercise>) -> CustomWorkout {
        let now = self.now();
        self.workouts.insert_with(|id| CustomWorkout {
            id,
            name: name.trim().to_string(),
            exercises,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn update_workout(&self, id: &str, patch: WorkoutPatch) -> Option<CustomWorkout> {
        let now = self.now();
        self.workouts.update(id, |workout| {
            if let Some(name) = patch.name {
                workout.name = name;
            }
            if let Some(exercises) = patch.exercises {
                workout.exercises = exercises;
            }
            workout.updated_at = now;
        })
    }

    /// Delete a workout together with its pending (not completed) schedule
    /// entries. Completed entries are kept as history.
    pub fn delete_workout(&self, id: &str) -> bool {
        if !self.workouts.remove(id) {
            return false;
        }
        self.scheduled.mutate(|items| {
            items.retain(|s| s.workout_id != id || s.is_completed());
        });
        true
    }

    // ── Schedule ─────────────────────────────────────────────────────

    pub fn load_scheduled(&self) -> Vec<ScheduledWorkout> {
        self.scheduled.load()
    }

    /// Schedule a workout. `None` if the workout does not exist.
    pub fn schedule(&self, workout_id: &str, date: NaiveDate) -> Option<ScheduledWorkout> {
        self.workouts.get(workout_id)?;
        let now = self.now();
        Some(self.scheduled.insert_with(|id| ScheduledWorkout {
            id,
            workout_id: workout_id.to_string(),
            scheduled_for: date,
            completed_at: None,
            duration_seconds: None,
            created_at: now,
            updated_at: now,
        }))
    }

    pub fn reschedule(&self, id: &str, date: NaiveDate) -> Option<ScheduledWorkout> {
        let now = self.now();
        self.scheduled.update(id, |entry| {
            entry.scheduled_for = date;
            entry.updated_at = now;
        })
    }

    /// Record completion with the duration measured by the workout timer.
    pub fn complete(&self, id: &str, duration_seconds: u64) -> Option<ScheduledWorkout> {
        let now = self.now();
        self.scheduled.update(id, |entry| {
            entry.completed_at = Some(now);
            entry.duration_seconds = Some(duration_seconds);
            entry.updated_at = now;
        })
    }

    pub fn delete_scheduled(&self, id: &str) -> bool {
        self.scheduled.remove(id)
    }

    /// Pending entries on or after `today`, soonest first.
    pub fn upcoming(&self, today: NaiveDate) -> Vec<ScheduledWorkout> {
        let mut upcoming: Vec<_> = self
            .scheduled
            .load()
            .into_iter()
            .filter(|s| !s.is_completed() && s.scheduled_for >= today)
            .collect();
        upcoming.sort_by(|a, b| {
            a.scheduled_for
                .cmp(&b.scheduled_for)
                .then_with(|| a.created_at.cmp(&b.created_at))
        });
        upcoming
    }
}
