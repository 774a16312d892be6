//! Community challenges: shared multi-day commitments with daily check-ins.
//!
//! The local collection is authoritative. Every mutation also enqueues the
//! affected rows into the sync outbox and, when a remote backend is attached,
//! flushes it. Remote failures are logged and never change the local result.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::discipline::streak_ending;
use crate::storage::{next_id_from, Collection, KeyValueStore, Record};
use crate::sync::{MirrorRow, Outbox, RemoteBackend, RemoteTable, SyncError};

const CHECK_IN_PREFIX: &str = "checkin";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub user_id: String,
    pub display_name: String,
    pub joined_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckIn {
    pub id: String,
    pub user_id: String,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Challenge {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub duration_days: u32,
    pub start_date: NaiveDate,
    pub created_by: String,
    pub is_public: bool,
    pub participants: Vec<Participant>,
    pub check_ins: Vec<CheckIn>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Challenge {
    /// First day after the challenge.
    pub fn end_date(&self) -> NaiveDate {
        self.start_date
            .checked_add_days(Days::new(u64::from(self.duration_days)))
            .unwrap_or(NaiveDate::MAX)
    }

    pub fn contains_date(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date < self.end_date()
    }

    pub fn participant(&self, user_id: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.user_id == user_id)
    }

    pub fn is_participant(&self, user_id: &str) -> bool {
        self.participant(user_id).is_some()
    }

    /// Sorted check-in days of one user.
    pub fn check_in_days(&self, user_id: &str) -> Vec<NaiveDate> {
        let days: BTreeSet<NaiveDate> = self
            .check_ins
            .iter()
            .filter(|c| c.user_id == user_id)
            .map(|c| c.date)
            .collect();
        days.into_iter().collect()
    }
}

impl Record for Challenge {
    const KEY: &'static str = "challenges";
    const ID_PREFIX: &'static str = "challenge";

    fn id(&self) -> &str {
        &self.id
    }

    fn upgrade(raw: &mut Map<String, Value>) {
        raw.entry("description").or_insert_with(|| Value::String(String::new()));
        raw.entry("category").or_insert_with(|| Value::String("general".into()));
        raw.entry("isPublic").or_insert(Value::Bool(true));
        raw.entry("participants").or_insert_with(|| Value::Array(Vec::new()));
        raw.entry("checkIns").or_insert_with(|| Value::Array(Vec::new()));
        if !raw.contains_key("updatedAt") {
            if let Some(created) = raw.get("createdAt").cloned() {
                raw.insert("updatedAt".into(), created);
            }
        }
    }
}

/// Input for [`ChallengeStore::create_challenge`]. The creator joins
/// automatically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewChallenge {
    pub title: String,
    pub description: String,
    pub category: String,
    pub duration_days: u32,
    pub start_date: NaiveDate,
    pub created_by: String,
    pub creator_name: String,
    pub is_public: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChallengePatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub duration_days: Option<u32>,
    pub start_date: Option<NaiveDate>,
    pub is_public: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeStatus {
    Upcoming,
    Active,
    Completed,
}

/// Where one participant stands in a challenge on a given day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeProgress {
    pub status: ChallengeStatus,
    /// 1-based day of the challenge; 0 before it starts.
    pub day: u32,
    pub duration_days: u32,
    pub days_remaining: u32,
    pub check_ins: u32,
    pub checked_in_today: bool,
    pub completion_percent: u32,
    pub current_streak: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub user_id: String,
    pub display_name: String,
    pub check_ins: u32,
    pub current_streak: u32,
    pub joined_at: DateTime<Utc>,
}

/// Progress of `user_id` in `challenge` as of `today`.
pub fn progress(challenge: &Challenge, user_id: &str, today: NaiveDate) -> ChallengeProgress {
    let duration = challenge.duration_days;
    let (status, day) = if today < challenge.start_date {
        (ChallengeStatus::Upcoming, 0)
    } else if today >= challenge.end_date() {
        (ChallengeStatus::Completed, duration)
    } else {
        let elapsed = (today - challenge.start_date).num_days() as u32;
        (ChallengeStatus::Active, elapsed + 1)
    };

    let days: Vec<NaiveDate> = challenge
        .check_in_days(user_id)
        .into_iter()
        .filter(|d| challenge.contains_date(*d))
        .collect();
    let check_ins = days.len() as u32;

    ChallengeProgress {
        status,
        day,
        duration_days: duration,
        days_remaining: duration.saturating_sub(day),
        check_ins,
        checked_in_today: days.binary_search(&today).is_ok(),
        completion_percent: if duration == 0 {
            0
        } else {
            (check_ins * 100 / duration).min(100)
        },
        current_streak: streak_ending(&days, today),
    }
}

// ── Remote rows ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChallengeRow {
    id: String,
    title: String,
    description: String,
    category: String,
    duration_days: u32,
    start_date: NaiveDate,
    created_by: String,
    is_public: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(default)]
    deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ParticipantRow {
    challenge_id: String,
    user_id: String,
    display_name: String,
    joined_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(default)]
    left_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CheckInRow {
    id: String,
    challenge_id: String,
    user_id: String,
    date: NaiveDate,
    created_at: DateTime<Utc>,
}

fn mirror_row<T: Serialize>(
    table: RemoteTable,
    key: String,
    row: &T,
    updated_at: DateTime<Utc>,
) -> Result<MirrorRow, SyncError> {
    Ok(MirrorRow {
        table,
        key,
        data: serde_json::to_value(row)?,
        updated_at,
    })
}

fn challenge_row(
    c: &Challenge,
    deleted_at: Option<DateTime<Utc>>,
) -> Result<MirrorRow, SyncError> {
    let row = ChallengeRow {
        id: c.id.clone(),
        title: c.title.clone(),
        description: c.description.clone(),
        category: c.category.clone(),
        duration_days: c.duration_days,
        start_date: c.start_date,
        created_by: c.created_by.clone(),
        is_public: c.is_public,
        created_at: c.created_at,
        updated_at: deleted_at.unwrap_or(c.updated_at),
        deleted_at,
    };
    mirror_row(RemoteTable::Challenges, c.id.clone(), &row, row.updated_at)
}

fn participant_row(
    challenge_id: &str,
    p: &Participant,
    left_at: Option<DateTime<Utc>>,
) -> Result<MirrorRow, SyncError> {
    let row = ParticipantRow {
        challenge_id: challenge_id.to_string(),
        user_id: p.user_id.clone(),
        display_name: p.display_name.clone(),
        joined_at: p.joined_at,
        updated_at: left_at.unwrap_or(p.updated_at),
        left_at,
    };
    mirror_row(
        RemoteTable::ChallengeParticipants,
        format!("{}/{}", challenge_id, p.user_id),
        &row,
        row.updated_at,
    )
}

fn check_in_row(challenge_id: &str, c: &CheckIn) -> Result<MirrorRow, SyncError> {
    let row = CheckInRow {
        id: c.id.clone(),
        challenge_id: challenge_id.to_string(),
        user_id: c.user_id.clone(),
        date: c.date,
        created_at: c.created_at,
    };
    mirror_row(RemoteTable::ChallengeCheckins, c.id.clone(), &row, c.created_at)
}

/// Every row describing `challenge` as it currently stands.
fn full_snapshot(challenge: &Challenge) -> Result<Vec<MirrorRow>, SyncError> {
    let mut rows = vec![challenge_row(challenge, None)?];
    for p in &challenge.participants {
        rows.push(participant_row(&challenge.id, p, None)?);
    }
    for c in &challenge.check_ins {
        rows.push(check_in_row(&challenge.id, c)?);
    }
    Ok(rows)
}

fn parse_rows<T: serde::de::DeserializeOwned>(table: RemoteTable, rows: Vec<Value>) -> Vec<T> {
    rows.into_iter()
        .filter_map(|row| match serde_json::from_value(row) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                debug!(table = %table, error = %e, "skipping malformed remote row");
                None
            }
        })
        .collect()
}

// ── Store ────────────────────────────────────────────────────────────

pub struct ChallengeStore<'a> {
    challenges: Collection<'a, Challenge>,
    outbox: Outbox<'a>,
    remote: Option<&'a dyn RemoteBackend>,
}

impl<'a> ChallengeStore<'a> {
    /// Local-only store. Mutations still queue mirror rows for a later push.
    pub fn new(store: &'a dyn KeyValueStore, clock: &'a dyn Clock) -> Self {
        Self {
            challenges: Collection::new(store, clock),
            outbox: Outbox::new(store, clock),
            remote: None,
        }
    }

    pub fn with_remote(mut self, remote: Option<&'a dyn RemoteBackend>) -> Self {
        self.remote = remote;
        self
    }

    pub fn outbox(&self) -> &Outbox<'a> {
        &self.outbox
    }

    fn now(&self) -> DateTime<Utc> {
        self.challenges.clock().now()
    }

    /// Queue `rows` and flush when a remote is attached. Never fails.
    fn mirror(&self, rows: Result<Vec<MirrorRow>, SyncError>) {
        let queued = rows.and_then(|rows| self.outbox.enqueue(rows));
        if let Err(e) = queued {
            warn!(error = %e, "failed to queue challenge mirror rows");
        }
        if let Some(remote) = self.remote {
            self.outbox.flush_quietly(remote);
        }
    }

    pub fn load_challenges(&self) -> Vec<Challenge> {
        self.challenges.load()
    }

    pub fn get(&self, id: &str) -> Option<Challenge> {
        self.challenges.get(id)
    }

    /// Challenges `user_id` currently participates in.
    pub fn joined(&self, user_id: &str) -> Vec<Challenge> {
        self.challenges
            .load()
            .into_iter()
            .filter(|c| c.is_participant(user_id))
            .collect()
    }

    pub fn create_challenge(&self, new: NewChallenge) -> Challenge {
        let now = self.now();
        let challenge = self.challenges.insert_with(|id| Challenge {
            id,
            title: new.title.trim().to_string(),
            description: new.description.trim().to_string(),
            category: new.category.trim().to_string(),
            duration_days: new.duration_days.max(1),
            start_date: new.start_date,
            created_by: new.created_by.clone(),
            is_public: new.is_public,
            participants: vec![Participant {
                user_id: new.created_by.clone(),
                display_name: new.creator_name.clone(),
                joined_at: now,
                updated_at: now,
            }],
            check_ins: Vec::new(),
            created_at: now,
            updated_at: now,
        });
        self.mirror(full_snapshot(&challenge));
        challenge
    }

    pub fn update_challenge(&self, id: &str, patch: ChallengePatch) -> Option<Challenge> {
        let now = self.now();
        let updated = self.challenges.update(id, |c| {
            if let Some(title) = patch.title {
                c.title = title;
            }
            if let Some(description) = patch.description {
                c.description = description;
            }
            if let Some(category) = patch.category {
                c.category = category;
            }
            if let Some(days) = patch.duration_days {
                c.duration_days = days.max(1);
            }
            if let Some(start) = patch.start_date {
                c.start_date = start;
            }
            if let Some(is_public) = patch.is_public {
                c.is_public = is_public;
            }
            c.updated_at = now;
        })?;
        self.mirror(challenge_row(&updated, None).map(|row| vec![row]));
        Some(updated)
    }

    /// Delete locally; the remote row is marked deleted rather than removed.
    pub fn delete_challenge(&self, id: &str) -> bool {
        let Some(challenge) = self.challenges.get(id) else {
            return false;
        };
        if !self.challenges.remove(id) {
            return false;
        }
        self.mirror(challenge_row(&challenge, Some(self.now())).map(|row| vec![row]));
        true
    }

    /// Join a challenge. Joining twice keeps the original join time.
    pub fn join(&self, id: &str, user_id: &str, display_name: &str) -> Option<Challenge> {
        let now = self.now();
        let mut joined = None;
        let challenge = self.challenges.update(id, |c| {
            if c.is_participant(user_id) {
                return;
            }
            let participant = Participant {
                user_id: user_id.to_string(),
                display_name: display_name.trim().to_string(),
                joined_at: now,
                updated_at: now,
            };
            c.participants.push(participant.clone());
            c.updated_at = now;
            joined = Some(participant);
        })?;
        if let Some(p) = joined {
            self.mirror(participant_row(&challenge.id, &p, None).map(|row| vec![row]));
        }
        Some(challenge)
    }

    /// Leave a challenge. The user's past check-ins are kept.
    pub fn leave(&self, id: &str, user_id: &str) -> Option<Challenge> {
        let now = self.now();
        let mut left = None;
        let challenge = self.challenges.update(id, |c| {
            if let Some(pos) = c.participants.iter().position(|p| p.user_id == user_id) {
                left = Some(c.participants.remove(pos));
                c.updated_at = now;
            }
        })?;
        if let Some(p) = left {
            self.mirror(participant_row(&challenge.id, &p, Some(now)).map(|row| vec![row]));
        }
        Some(challenge)
    }

    /// Record a check-in for `date`, at most one per user per date.
    ///
    /// `None` if the challenge is unknown, the user has not joined, or the
    /// date falls outside the challenge. A repeated check-in returns the
    /// existing one.
    pub fn check_in(&self, id: &str, user_id: &str, date: NaiveDate) -> Option<CheckIn> {
        let challenge = self.challenges.get(id)?;
        if !challenge.is_participant(user_id) || !challenge.contains_date(date) {
            debug!(challenge = id, user_id, %date, "check-in rejected");
            return None;
        }
        if let Some(existing) = challenge
            .check_ins
            .iter()
            .find(|c| c.user_id == user_id && c.date == date)
        {
            return Some(existing.clone());
        }

        let now = self.now();
        let check_in = CheckIn {
            id: next_id_from(CHECK_IN_PREFIX, now.timestamp_millis(), |candidate| {
                challenge.check_ins.iter().any(|c| c.id == candidate)
            }),
            user_id: user_id.to_string(),
            date,
            created_at: now,
        };
        let stored = check_in.clone();
        self.challenges.update(id, |c| {
            c.check_ins.push(stored);
            c.updated_at = now;
        })?;
        self.mirror(check_in_row(id, &check_in).map(|row| vec![row]));
        Some(check_in)
    }

    pub fn progress(&self, challenge: &Challenge, user_id: &str, today: NaiveDate) -> ChallengeProgress {
        progress(challenge, user_id, today)
    }

    /// Participants ranked by check-ins, then current streak, then join time.
    ///
    /// With a remote attached, remote participants and check-ins are merged
    /// in; a failed remote read falls back to local data.
    pub fn leaderboard(&self, id: &str) -> Vec<LeaderboardEntry> {
        let Some(challenge) = self.challenges.get(id) else {
            return Vec::new();
        };
        let today = self.challenges.clock().today();

        let mut participants: BTreeMap<String, Participant> = challenge
            .participants
            .iter()
            .map(|p| (p.user_id.clone(), p.clone()))
            .collect();
        let mut days: BTreeMap<String, BTreeSet<NaiveDate>> = BTreeMap::new();
        for c in &challenge.check_ins {
            days.entry(c.user_id.clone()).or_default().insert(c.date);
        }

        if let Some(remote) = self.remote {
            let queued = self.queued_participants(&challenge.id);
            let merged = merge_remote(remote, &challenge.id, &queued, &mut participants, &mut days);
            if let Err(e) = merged {
                warn!(challenge = %challenge.id, error = %e, "using local leaderboard");
            }
        }

        let mut entries: Vec<LeaderboardEntry> = participants
            .into_values()
            .map(|p| {
                let user_days: Vec<NaiveDate> = days
                    .get(&p.user_id)
                    .map(|d| d.iter().copied().filter(|d| challenge.contains_date(*d)).collect())
                    .unwrap_or_default();
                LeaderboardEntry {
                    rank: 0,
                    check_ins: user_days.len() as u32,
                    current_streak: streak_ending(&user_days, today),
                    user_id: p.user_id,
                    display_name: p.display_name,
                    joined_at: p.joined_at,
                }
            })
            .collect();
        entries.sort_by(|a, b| {
            b.check_ins
                .cmp(&a.check_ins)
                .then_with(|| b.current_streak.cmp(&a.current_streak))
                .then_with(|| a.joined_at.cmp(&b.joined_at))
                .then_with(|| a.user_id.cmp(&b.user_id))
        });
        for (i, entry) in entries.iter_mut().enumerate() {
            entry.rank = i + 1;
        }
        entries
    }

    /// Latest queued participant change per user of `challenge_id`. These
    /// have not reached the remote yet, so local state wins over its rows.
    fn queued_participants(&self, challenge_id: &str) -> BTreeMap<String, DateTime<Utc>> {
        self.outbox
            .pending()
            .into_iter()
            .filter(|row| row.table == RemoteTable::ChallengeParticipants)
            .filter_map(|row| serde_json::from_value::<ParticipantRow>(row.data).ok())
            .filter(|row| row.challenge_id == challenge_id)
            .map(|row| (row.user_id, row.updated_at))
            .collect()
    }

    /// Queue every local challenge for upload and flush.
    pub fn push_all(&self, remote: &dyn RemoteBackend) -> Result<crate::sync::FlushReport, SyncError> {
        let mut rows = Vec::new();
        for challenge in self.challenges.try_load()? {
            rows.extend(full_snapshot(&challenge)?);
        }
        self.outbox.enqueue(rows)?;
        self.outbox.flush(remote)
    }
}

/// Merge remote participant and check-in rows. Newer `updated_at` wins per
/// participant; a remote row with `left_at` removes the participant. Users
/// with a queued change at least as new as the remote row keep local state.
fn merge_remote(
    remote: &dyn RemoteBackend,
    challenge_id: &str,
    queued: &BTreeMap<String, DateTime<Utc>>,
    participants: &mut BTreeMap<String, Participant>,
    days: &mut BTreeMap<String, BTreeSet<NaiveDate>>,
) -> Result<(), SyncError> {
    let table = RemoteTable::ChallengeParticipants;
    let remote_participants: Vec<ParticipantRow> =
        parse_rows(table, remote.select_eq(table, "challenge_id", challenge_id)?);
    let table = RemoteTable::ChallengeCheckins;
    let remote_check_ins: Vec<CheckInRow> =
        parse_rows(table, remote.select_eq(table, "challenge_id", challenge_id)?);

    for row in remote_participants {
        if queued.get(&row.user_id).is_some_and(|at| *at >= row.updated_at) {
            continue;
        }
        let newer = participants
            .get(&row.user_id)
            .map_or(true, |local| row.updated_at > local.updated_at);
        if !newer {
            continue;
        }
        if row.left_at.is_some() {
            participants.remove(&row.user_id);
        } else {
            participants.insert(
                row.user_id.clone(),
                Participant {
                    user_id: row.user_id,
                    display_name: row.display_name,
                    joined_at: row.joined_at,
                    updated_at: row.updated_at,
                },
            );
        }
    }
    for row in remote_check_ins {
        days.entry(row.user_id).or_default().insert(row.date);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::storage::testing::FailingStore;
    use crate::storage::MemoryStore;
    use crate::sync::outbox::testing::FakeRemote;
    use serde_json::json;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn clock() -> ManualClock {
        ManualClock::new("2026-03-01T08:00:00Z".parse().unwrap())
    }

    fn thirty_days(created_by: &str) -> NewChallenge {
        NewChallenge {
            title: "30 days of push-ups".into(),
            description: "50 a day".into(),
            category: "fitness".into(),
            duration_days: 30,
            start_date: d("2026-03-01"),
            created_by: created_by.into(),
            creator_name: "Alice".into(),
            is_public: true,
        }
    }

    #[test]
    fn create_joins_creator_and_queues_rows() {
        let kv = MemoryStore::new();
        let clock = clock();
        let store = ChallengeStore::new(&kv, &clock);

        let challenge = store.create_challenge(thirty_days("user-a"));
        assert!(challenge.id.starts_with("challenge-"));
        assert!(challenge.is_participant("user-a"));
        assert_eq!(store.load_challenges().len(), 1);

        let pending = store.outbox().pending();
        assert_eq!(pending.len(), 2);
        assert!(pending.iter().any(|r| r.table == RemoteTable::Challenges));
    }

    #[test]
    fn check_in_once_per_user_per_date() {
        let kv = MemoryStore::new();
        let clock = clock();
        let store = ChallengeStore::new(&kv, &clock);
        let challenge = store.create_challenge(thirty_days("user-a"));

        let first = store.check_in(&challenge.id, "user-a", d("2026-03-01")).unwrap();
        let again = store.check_in(&challenge.id, "user-a", d("2026-03-01")).unwrap();
        assert_eq!(first, again);
        assert!(first.id.starts_with("checkin-"));
        assert_eq!(store.get(&challenge.id).unwrap().check_ins.len(), 1);
    }

    #[test]
    fn check_in_rejects_outsiders_and_out_of_range_dates() {
        let kv = MemoryStore::new();
        let clock = clock();
        let store = ChallengeStore::new(&kv, &clock);
        let challenge = store.create_challenge(thirty_days("user-a"));

        assert!(store.check_in(&challenge.id, "user-b", d("2026-03-02")).is_none());
        assert!(store.check_in(&challenge.id, "user-a", d("2026-02-28")).is_none());
        assert!(store.check_in(&challenge.id, "user-a", d("2026-03-31")).is_none());
        assert!(store.check_in("challenge-404", "user-a", d("2026-03-02")).is_none());
    }

    #[test]
    fn join_is_idempotent_and_leave_keeps_history() {
        let kv = MemoryStore::new();
        let clock = clock();
        let store = ChallengeStore::new(&kv, &clock);
        let challenge = store.create_challenge(thirty_days("user-a"));

        let joined = store.join(&challenge.id, "user-b", "Bob").unwrap();
        clock.advance_secs(60);
        let again = store.join(&challenge.id, "user-b", "Bobby").unwrap();
        assert_eq!(joined.participant("user-b"), again.participant("user-b"));

        store.check_in(&challenge.id, "user-b", d("2026-03-01"));
        let after = store.leave(&challenge.id, "user-b").unwrap();
        assert!(!after.is_participant("user-b"));
        assert_eq!(after.check_ins.len(), 1);
        assert_eq!(store.joined("user-b").len(), 0);
        assert_eq!(store.joined("user-a").len(), 1);
    }

    #[test]
    fn update_and_delete_unknown_are_noops() {
        let kv = MemoryStore::new();
        let clock = clock();
        let store = ChallengeStore::new(&kv, &clock);
        assert!(store.update_challenge("challenge-1", ChallengePatch::default()).is_none());
        assert!(!store.delete_challenge("challenge-1"));
        assert!(store.join("challenge-1", "user-a", "A").is_none());
        assert!(kv.is_empty());
    }

    #[test]
    fn progress_tracks_days_and_completion() {
        let kv = MemoryStore::new();
        let clock = clock();
        let store = ChallengeStore::new(&kv, &clock);
        let mut new = thirty_days("user-a");
        new.duration_days = 10;
        let challenge = store.create_challenge(new);
        for day in ["2026-03-01", "2026-03-02", "2026-03-03"] {
            store.check_in(&challenge.id, "user-a", d(day));
        }
        let challenge = store.get(&challenge.id).unwrap();

        let p = store.progress(&challenge, "user-a", d("2026-03-03"));
        assert_eq!(p.status, ChallengeStatus::Active);
        assert_eq!(p.day, 3);
        assert_eq!(p.days_remaining, 7);
        assert_eq!(p.check_ins, 3);
        assert_eq!(p.completion_percent, 30);
        assert_eq!(p.current_streak, 3);
        assert!(p.checked_in_today);

        let before = progress(&challenge, "user-a", d("2026-02-20"));
        assert_eq!(before.status, ChallengeStatus::Upcoming);
        assert_eq!(before.day, 0);

        let after = progress(&challenge, "user-a", d("2026-03-11"));
        assert_eq!(after.status, ChallengeStatus::Completed);
        assert_eq!(after.days_remaining, 0);
        assert_eq!(after.current_streak, 0);
    }

    #[test]
    fn leaderboard_ranks_by_check_ins_then_streak_then_join_time() {
        let kv = MemoryStore::new();
        let clock = clock();
        let store = ChallengeStore::new(&kv, &clock);
        let challenge = store.create_challenge(thirty_days("user-a"));
        clock.advance_secs(10);
        store.join(&challenge.id, "user-b", "Bob");
        clock.advance_secs(10);
        store.join(&challenge.id, "user-c", "Cleo");

        // a: 2 check-ins, broken streak. b: 2 check-ins, live streak. c: 1.
        for (user, day) in [
            ("user-a", "2026-03-01"),
            ("user-a", "2026-03-03"),
            ("user-b", "2026-03-04"),
            ("user-b", "2026-03-05"),
            ("user-c", "2026-03-05"),
        ] {
            store.check_in(&challenge.id, user, d(day));
        }
        clock.set("2026-03-05T20:00:00Z".parse().unwrap());

        let board = store.leaderboard(&challenge.id);
        let order: Vec<_> = board.iter().map(|e| e.user_id.as_str()).collect();
        assert_eq!(order, vec!["user-b", "user-a", "user-c"]);
        assert_eq!(board[0].rank, 1);
        assert_eq!(board[0].current_streak, 2);
        assert_eq!(board[2].check_ins, 1);
    }

    #[test]
    fn leaderboard_merges_remote_rows() {
        let kv = MemoryStore::new();
        let clock = clock();
        let remote = FakeRemote::default();
        let store = ChallengeStore::new(&kv, &clock).with_remote(Some(&remote));
        let challenge = store.create_challenge(thirty_days("user-a"));
        store.check_in(&challenge.id, "user-a", d("2026-03-01"));

        remote.seed(
            RemoteTable::ChallengeParticipants,
            json!({
                "challenge_id": challenge.id,
                "user_id": "user-z",
                "display_name": "Zoe",
                "joined_at": "2026-03-01T09:00:00Z",
                "updated_at": "2026-03-01T09:00:00Z",
                "left_at": null
            }),
        );
        for (id, day) in [("checkin-1", "2026-03-01"), ("checkin-2", "2026-02-28")] {
            remote.seed(
                RemoteTable::ChallengeCheckins,
                json!({
                    "id": id,
                    "challenge_id": challenge.id,
                    "user_id": "user-z",
                    "date": day,
                    "created_at": "2026-03-01T09:00:00Z"
                }),
            );
        }
        remote.seed(RemoteTable::ChallengeCheckins, json!({"challenge_id": challenge.id}));

        let board = store.leaderboard(&challenge.id);
        assert_eq!(board.len(), 2);
        let zoe = board.iter().find(|e| e.user_id == "user-z").unwrap();
        assert_eq!(zoe.display_name, "Zoe");
        assert_eq!(zoe.check_ins, 1);
    }

    #[test]
    fn unsent_leave_hides_stale_remote_participant() {
        let kv = MemoryStore::new();
        let clock = clock();
        let remote = FakeRemote::default();
        let store = ChallengeStore::new(&kv, &clock).with_remote(Some(&remote));
        let challenge = store.create_challenge(thirty_days("user-a"));
        store.join(&challenge.id, "user-b", "Bob");
        remote.seed(
            RemoteTable::ChallengeParticipants,
            json!({
                "challenge_id": challenge.id,
                "user_id": "user-b",
                "display_name": "Bob",
                "joined_at": "2026-03-01T08:00:00Z",
                "updated_at": "2026-03-01T08:00:00Z",
                "left_at": null
            }),
        );

        remote.fail(RemoteTable::ChallengeParticipants);
        clock.advance_secs(60);
        store.leave(&challenge.id, "user-b");
        remote.heal();
        assert_eq!(store.outbox().len(), 1);

        let board = store.leaderboard(&challenge.id);
        let users: Vec<_> = board.iter().map(|e| e.user_id.as_str()).collect();
        assert_eq!(users, vec!["user-a"]);
    }

    #[test]
    fn remote_failure_keeps_local_result_and_queue() {
        let kv = MemoryStore::new();
        let clock = clock();
        let remote = FakeRemote::default();
        remote.fail(RemoteTable::ChallengeCheckins);
        remote.fail(RemoteTable::ChallengeParticipants);
        let store = ChallengeStore::new(&kv, &clock).with_remote(Some(&remote));

        let challenge = store.create_challenge(thirty_days("user-a"));
        assert!(store.check_in(&challenge.id, "user-a", d("2026-03-01")).is_some());
        assert_eq!(store.get(&challenge.id).unwrap().check_ins.len(), 1);
        assert_eq!(store.outbox().len(), 2);
        assert_eq!(store.leaderboard(&challenge.id).len(), 1);

        remote.heal();
        let report = store.outbox().flush(&remote).unwrap();
        assert_eq!(report.pushed, 2);
        assert_eq!(remote.upserted(RemoteTable::Challenges).len(), 1);
    }

    #[test]
    fn delete_marks_remote_row_deleted() {
        let kv = MemoryStore::new();
        let clock = clock();
        let remote = FakeRemote::default();
        let store = ChallengeStore::new(&kv, &clock).with_remote(Some(&remote));
        let challenge = store.create_challenge(thirty_days("user-a"));

        assert!(store.delete_challenge(&challenge.id));
        assert!(store.load_challenges().is_empty());
        let rows = remote.upserted(RemoteTable::Challenges);
        assert!(rows.last().unwrap()["deleted_at"].is_string());
    }

    #[test]
    fn unreadable_store_never_writes() {
        let kv = FailingStore::reads();
        let clock = clock();
        let store = ChallengeStore::new(&kv, &clock);
        assert!(store.load_challenges().is_empty());
        assert!(store.check_in("challenge-1", "user-a", d("2026-03-01")).is_none());
        assert!(!store.delete_challenge("challenge-1"));
    }

    #[test]
    fn push_all_sends_full_snapshot() {
        let kv = MemoryStore::new();
        let clock = clock();
        let store = ChallengeStore::new(&kv, &clock);
        let challenge = store.create_challenge(thirty_days("user-a"));
        store.check_in(&challenge.id, "user-a", d("2026-03-01"));

        let remote = FakeRemote::default();
        let report = store.push_all(&remote).unwrap();
        assert_eq!(report.pushed, 3);
        assert_eq!(remote.upserted(RemoteTable::ChallengeParticipants).len(), 1);
        assert!(store.outbox().is_empty());
    }
}
