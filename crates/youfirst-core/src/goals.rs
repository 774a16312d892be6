//! Goals: what the user is working toward and why.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::clock::Clock;
use crate::storage::{Collection, KeyValueStore, Record};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub id: String,
    pub title: String,
    /// What "done" looks like.
    pub outcome: String,
    pub reasons: Vec<String>,
    pub is_completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Record for Goal {
    const KEY: &'static str = "goals";
    const ID_PREFIX: &'static str = "goal";

    fn id(&self) -> &str {
        &self.id
    }

    fn upgrade(raw: &mut Map<String, Value>) {
        raw.entry("outcome").or_insert_with(|| Value::String(String::new()));
        raw.entry("reasons").or_insert_with(|| Value::Array(Vec::new()));
        raw.entry("isCompleted").or_insert(Value::Bool(false));
        if !raw.contains_key("updatedAt") {
            if let Some(created) = raw.get("createdAt").cloned() {
                raw.insert("updatedAt".into(), created);
            }
        }
    }
}

/// Fields that can be changed after creation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalPatch {
    pub title: Option<String>,
    pub outcome: Option<String>,
    pub reasons: Option<Vec<String>>,
}

pub struct GoalStore<'a> {
    goals: Collection<'a, Goal>,
}

impl<'a> GoalStore<'a> {
    pub fn new(store: &'a dyn KeyValueStore, clock: &'a dyn Clock) -> Self {
        Self {
            goals: Collection::new(store, clock),
        }
    }

    pub fn load_goals(&self) -> Vec<Goal> {
        self.goals.load()
    }

    pub fn get(&self, id: &str) -> Option<Goal> {
        self.goals.get(id)
    }

    pub fn add_goal(&self, title: &str, outcome: &str, reasons: &[&str]) -> Goal {
        let now = self.goals.clock().now();
        self.goals.insert_with(|id| Goal {
            id,
            title: title.trim().to_string(),
            outcome: outcome.trim().to_string(),
            reasons: reasons
                .iter()
                .map(|r| r.trim())
                .filter(|r| !r.is_empty())
                .map(str::to_string)
                .collect(),
            is_completed: false,
            created_at: now,
            updated_at: now,
            completed_at: None,
        })
    }

    /// Merge `patch` into the goal. Unknown id returns `None`.
    pub fn update_goal(&self, id: &str, patch: GoalPatch) -> Option<Goal> {
        let now = self.goals.clock().now();
        self.goals.update(id, |goal| {
            if let Some(title) = patch.title {
                goal.title = title;
            }
            if let Some(outcome) = patch.outcome {
                goal.outcome = outcome;
            }
            if let Some(reasons) = patch.reasons {
                goal.reasons = reasons;
            }
            goal.updated_at = now;
        })
    }

    pub fn complete_goal(&self, id: &str) -> Option<Goal> {
        let now = self.goals.clock().now();
        self.goals.update(id, |goal| {
            if !goal.is_completed {
                goal.is_completed = true;
                goal.completed_at = Some(now);
                goal.updated_at = now;
            }
        })
    }

    pub fn reopen_goal(&self, id: &str) -> Option<Goal> {
        let now = self.goals.clock().now();
        self.goals.update(id, |goal| {
            goal.is_completed = false;
            goal.completed_at = None;
            goal.updated_at = now;
        })
    }

    pub fn delete_goal(&self, id: &str) -> bool {
        self.goals.remove(id)
    }
}
