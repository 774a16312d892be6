//! "You" home screen: one snapshot across every feature.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::challenges::ChallengeStore;
use crate::clock::Clock;
use crate::discipline::{current_streak, DisciplineStore};
use crate::goals::GoalStore;
use crate::mind::MindStore;
use crate::storage::KeyValueStore;
use crate::workouts::WorkoutStore;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub date: NaiveDate,
    pub active_goals: usize,
    pub completed_goals: usize,
    pub rules: usize,
    pub best_rule_streak: u32,
    pub upcoming_workouts: usize,
    pub reading_minutes_today: u64,
    pub joined_challenges: usize,
}

impl Summary {
    /// Aggregate counts from every module for `user_id`.
    pub fn collect(store: &dyn KeyValueStore, clock: &dyn Clock, user_id: &str) -> Self {
        let today = clock.today();

        let goals = GoalStore::new(store, clock).load_goals();
        let completed_goals = goals.iter().filter(|g| g.is_completed).count();

        let rules = DisciplineStore::new(store, clock).load_rules();
        let best_rule_streak = rules
            .iter()
            .map(|rule| current_streak(rule, today))
            .max()
            .unwrap_or(0);

        Self {
            date: today,
            active_goals: goals.len() - completed_goals,
            completed_goals,
            rules: rules.len(),
            best_rule_streak,
            upcoming_workouts: WorkoutStore::new(store, clock).upcoming(today).len(),
            reading_minutes_today: MindStore::new(store, clock).reading_stats(today).today_seconds / 60,
            joined_challenges: ChallengeStore::new(store, clock).joined(user_id).len(),
        }
    }
}
