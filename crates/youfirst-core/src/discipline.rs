//! Discipline rules and their daily streaks.
//!
//! A rule is something the user commits to every day ("no phone before 9").
//! Each kept day is recorded as a check-in date; streaks are derived from
//! those dates rather than stored.

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::clock::Clock;
use crate::storage::{Collection, KeyValueStore, Record};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub id: String,
    pub title: String,
    pub description: String,
    /// Sorted, unique.
    pub check_ins: Vec<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for Rule {
    const KEY: &'static str = "discipline_rules";
    const ID_PREFIX: &'static str = "rule";

    fn id(&self) -> &str {
        &self.id
    }

    fn upgrade(raw: &mut Map<String, Value>) {
        raw.entry("description").or_insert_with(|| Value::String(String::new()));
        raw.entry("checkIns").or_insert_with(|| Value::Array(Vec::new()));
        if !raw.contains_key("updatedAt") {
            if let Some(created) = raw.get("createdAt").cloned() {
                raw.insert("updatedAt".into(), created);
            }
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RulePatch {
    pub title: Option<String>,
    pub description: Option<String>,
}

/// Consecutive checked-in days ending today, or ending yesterday when today
/// has not been checked in yet (the streak is still alive until midnight).
pub fn current_streak(rule: &Rule, today: NaiveDate) -> u32 {
    streak_ending(&rule.check_ins, today)
}

/// [`current_streak`] over any sorted list of days.
pub fn streak_ending(days: &[NaiveDate], today: NaiveDate) -> u32 {
    let mut day = if days.binary_search(&today).is_ok() {
        today
    } else {
        match today.checked_sub_days(Days::new(1)) {
            Some(yesterday) => yesterday,
            None => return 0,
        }
    };
    let mut streak = 0;
    while days.binary_search(&day).is_ok() {
        streak += 1;
        match day.checked_sub_days(Days::new(1)) {
            Some(prev) => day = prev,
            None => break,
        }
    }
    streak
}

/// Longest run of consecutive checked-in days ever.
pub fn longest_streak(rule: &Rule) -> u32 {
    let mut best = 0;
    let mut run = 0;
    let mut prev: Option<NaiveDate> = None;
    for &day in &rule.check_ins {
        run = match prev {
            Some(p) if p.checked_add_days(Days::new(1)) == Some(day) => run + 1,
            _ => 1,
        };
        best = best.max(run);
        prev = Some(day);
    }
    best
}

pub struct DisciplineStore<'a> {
    rules: Collection<'a, Rule>,
}

impl<'a> DisciplineStore<'a> {
    pub fn new(store: &'a dyn KeyValueStore, clock: &'a dyn Clock) -> Self {
        Self {
            rules: Collection::new(store, clock),
        }
    }

    pub fn load_rules(&self) -> Vec<Rule> {
        self.rules.load()
    }

    pub fn get(&self, id: &str) -> Option<Rule> {
        self.rules.get(id)
    }

    pub fn add_rule(&self, title: &str, description: &str) -> Rule {
        let now = self.rules.clock().now();
        self.rules.insert_with(|id| Rule {
            id,
            title: title.trim().to_string(),
            description: description.trim().to_string(),
            check_ins: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn update_rule(&self, id: &str, patch: RulePatch) -> Option<Rule> {
        let now = self.rules.clock().now();
        self.rules.update(id, |rule| {
            if let Some(title) = patch.title {
                rule.title = title;
            }
            if let Some(description) = patch.description {
                rule.description = description;
            }
            rule.updated_at = now;
        })
    }

    pub fn delete_rule(&self, id: &str) -> bool {
        self.rules.remove(id)
    }

    /// Mark `date` as kept. Checking in twice for the same date is a no-op.
    pub fn check_in(&self, id: &str, date: NaiveDate) -> Option<Rule> {
        let now = self.rules.clock().now();
        self.rules.update(id, |rule| {
            if let Err(pos) = rule.check_ins.binary_search(&date) {
                rule.check_ins.insert(pos, date);
                rule.updated_at = now;
            }
        })
    }

    pub fn undo_check_in(&self, id: &str, date: NaiveDate) -> Option<Rule> {
        let now = self.rules.clock().now();
        self.rules.update(id, |rule| {
            if let Ok(pos) = rule.check_ins.binary_search(&date) {
                rule.check_ins.remove(pos);
                rule.updated_at = now;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::storage::MemoryStore;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn rule_with(days: &[&str]) -> Rule {
        let mut check_ins: Vec<NaiveDate> = days.iter().map(|s| d(s)).collect();
        check_ins.sort();
        Rule {
            id: "rule-1".into(),
            title: "No sugar".into(),
            description: String::new(),
            check_ins,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn current_streak_counts_back_from_today() {
        let rule = rule_with(&["2026-01-01", "2026-01-03", "2026-01-04", "2026-01-05"]);
        assert_eq!(current_streak(&rule, d("2026-01-05")), 3);
    }

    #[test]
    fn current_streak_survives_until_today_is_missed() {
        let rule = rule_with(&["2026-01-03", "2026-01-04"]);
        assert_eq!(current_streak(&rule, d("2026-01-05")), 2);
        assert_eq!(current_streak(&rule, d("2026-01-06")), 0);
    }

    #[test]
    fn longest_streak_finds_best_run() {
        let rule = rule_with(&[
            "2025-12-30",
            "2025-12-31",
            "2026-01-01",
            "2026-01-03",
            "2026-01-04",
        ]);
        assert_eq!(longest_streak(&rule), 3);
        assert_eq!(longest_streak(&rule_with(&[])), 0);
    }

    #[test]
    fn check_in_is_idempotent_and_sorted() {
        let kv = MemoryStore::new();
        let clock = ManualClock::at_ms(0);
        let rules = DisciplineStore::new(&kv, &clock);
        let rule = rules.add_rule("Cold shower", "Every morning");

        rules.check_in(&rule.id, d("2026-01-02"));
        rules.check_in(&rule.id, d("2026-01-01"));
        let rule = rules.check_in(&rule.id, d("2026-01-02")).unwrap();
        assert_eq!(rule.check_ins, vec![d("2026-01-01"), d("2026-01-02")]);

        let rule = rules.undo_check_in(&rule.id, d("2026-01-01")).unwrap();
        assert_eq!(rule.check_ins, vec![d("2026-01-02")]);
    }

    #[test]
    fn unknown_rule_operations_are_noops() {
        let kv = MemoryStore::new();
        let clock = ManualClock::at_ms(0);
        let rules = DisciplineStore::new(&kv, &clock);

        assert!(rules.check_in("rule-9", d("2026-01-01")).is_none());
        assert!(rules.update_rule("rule-9", RulePatch::default()).is_none());
        assert!(!rules.delete_rule("rule-9"));
        assert!(kv.is_empty());
    }

    #[test]
    fn legacy_rule_gains_empty_check_ins() {
        let kv = MemoryStore::new();
        kv.set(
            "discipline_rules",
            r#"[{"id":"rule-1","title":"Meditate","createdAt":"2024-05-01T07:00:00Z"}]"#,
        )
        .unwrap();
        let clock = ManualClock::at_ms(0);
        let rules = DisciplineStore::new(&kv, &clock).load_rules();
        assert_eq!(rules.len(), 1);
        assert!(rules[0].check_ins.is_empty());
    }
}
