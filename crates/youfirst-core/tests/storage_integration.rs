//! Integration tests for feature collections on a real SQLite file.

use tempfile::TempDir;
use youfirst_core::{
    ChallengeStore, Config, DisciplineStore, GoalPatch, GoalStore, KeyValueStore, ManualClock,
    MindStore, NewChallenge, SqliteStore, Summary, WorkoutStore,
};

fn clock() -> ManualClock {
    ManualClock::new("2026-06-01T07:30:00Z".parse().unwrap())
}

#[test]
fn test_collections_persist_across_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("youfirst.db");
    let clock = clock();

    let goal_id = {
        let store = SqliteStore::open_at(&path).unwrap();
        let goals = GoalStore::new(&store, &clock);
        goals.add_goal("Run a marathon", "Finish under 4 hours", &["health", "pride"]).id
    };

    let store = SqliteStore::open_at(&path).unwrap();
    let goals = GoalStore::new(&store, &clock).load_goals();
    assert_eq!(goals.len(), 1);
    assert_eq!(goals[0].id, goal_id);
    assert!(goal_id.starts_with("goal-"));
    assert!(!goals[0].is_completed);
}

#[test]
fn test_update_unknown_goal_leaves_file_untouched() {
    let dir = TempDir::new().unwrap();
    let store = SqliteStore::open_at(&dir.path().join("youfirst.db")).unwrap();
    let clock = clock();
    let goals = GoalStore::new(&store, &clock);
    goals.add_goal("Meditate daily", "", &[]);
    let before = store.get("goals").unwrap();

    let patch = GoalPatch {
        title: Some("Changed".into()),
        ..GoalPatch::default()
    };
    assert!(goals.update_goal("goal-1", patch).is_none());
    assert_eq!(store.get("goals").unwrap(), before);
}

#[test]
fn test_corrupt_collection_reads_empty_and_is_not_overwritten() {
    let dir = TempDir::new().unwrap();
    let store = SqliteStore::open_at(&dir.path().join("youfirst.db")).unwrap();
    store.set("discipline_rules", "{not json").unwrap();
    let clock = clock();
    let rules = DisciplineStore::new(&store, &clock);

    assert!(rules.load_rules().is_empty());
    assert!(!rules.delete_rule("rule-1"));
    assert_eq!(
        store.get("discipline_rules").unwrap().as_deref(),
        Some("{not json")
    );
}

#[test]
fn test_features_share_one_store_without_collisions() {
    let dir = TempDir::new().unwrap();
    let store = SqliteStore::open_at(&dir.path().join("youfirst.db")).unwrap();
    let clock = clock();
    let today = "2026-06-01".parse().unwrap();

    GoalStore::new(&store, &clock).add_goal("Bench 100kg", "", &[]);
    let rules = DisciplineStore::new(&store, &clock);
    let rule = rules.add_rule("Journal", "Before bed");
    rules.check_in(&rule.id, today);
    let workouts = WorkoutStore::new(&store, &clock);
    let push = workouts.add_workout("Push", Vec::new());
    workouts.schedule(&push.id, today);
    let mind = MindStore::new(&store, &clock);
    let book = mind.add_book("Atomic Habits", "James Clear", Some(320));
    mind.record_session(Some(&book.id), 45 * 60, Some(40), "");
    let challenge = ChallengeStore::new(&store, &clock).create_challenge(NewChallenge {
        title: "Read daily".into(),
        description: String::new(),
        category: "mind".into(),
        duration_days: 21,
        start_date: today,
        created_by: "user-me".into(),
        creator_name: "Me".into(),
        is_public: true,
    });

    let summary = Summary::collect(&store, &clock, "user-me");
    assert_eq!(summary.active_goals, 1);
    assert_eq!(summary.best_rule_streak, 1);
    assert_eq!(summary.upcoming_workouts, 1);
    assert_eq!(summary.reading_minutes_today, 45);
    assert_eq!(summary.joined_challenges, 1);

    let keys = store.keys_with_prefix("").unwrap();
    for key in [
        "books",
        "challenges",
        "custom_workouts",
        "discipline_rules",
        "goals",
        "reading_sessions",
        "scheduled_workouts",
        "sync:outbox",
    ] {
        assert!(keys.iter().any(|k| k == key), "missing {key}");
    }
    assert_eq!(
        ChallengeStore::new(&store, &clock).get(&challenge.id).unwrap().title,
        "Read daily"
    );
}

#[test]
fn test_config_roundtrip_in_data_dir() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");

    let mut config = Config::load_from(&path).unwrap();
    assert!(path.exists());
    assert!(!config.remote_configured());

    config.set("remote.supabase_url", "https://demo.supabase.co").unwrap();
    config.set("remote.anon_key", "anon").unwrap();
    config.set("profile.display_name", "Sam").unwrap();
    config.save_to(&path).unwrap();

    let reloaded = Config::load_from(&path).unwrap();
    assert!(reloaded.remote_configured());
    assert_eq!(reloaded.get("profile.display_name").as_deref(), Some("Sam"));
}
