//! Whole-collection JSON persistence shared by every feature module.
//!
//! A collection is a JSON array stored under one fixed key. Every mutation
//! reads the full array, changes it in memory and writes the full array
//! back; there are no field-level writes.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::KeyValueStore;
use crate::clock::Clock;
use crate::error::StorageError;

/// A record persisted inside a collection.
pub trait Record: Serialize + DeserializeOwned + Clone {
    /// Storage key of the collection holding this record type.
    const KEY: &'static str;
    /// Prefix of generated ids (`<prefix>-<millis>`).
    const ID_PREFIX: &'static str;

    fn id(&self) -> &str;

    /// Default fields that older versions of the app did not write.
    ///
    /// Runs on every raw record before typed deserialization.
    fn upgrade(_raw: &mut Map<String, Value>) {}
}

/// Typed view over one collection key.
pub struct Collection<'a, T> {
    store: &'a dyn KeyValueStore,
    clock: &'a dyn Clock,
    _marker: std::marker::PhantomData<T>,
}

impl<'a, T: Record> Collection<'a, T> {
    pub fn new(store: &'a dyn KeyValueStore, clock: &'a dyn Clock) -> Self {
        Self {
            store,
            clock,
            _marker: std::marker::PhantomData,
        }
    }

    pub fn clock(&self) -> &'a dyn Clock {
        self.clock
    }

    /// Load the collection. Missing key or unreadable data yields an empty
    /// collection; failures are logged, never returned.
    pub fn load(&self) -> Vec<T> {
        match self.try_load() {
            Ok(items) => items,
            Err(e) => {
                warn!(key = T::KEY, error = %e, "failed to load collection");
                Vec::new()
            }
        }
    }

    /// Load the collection, surfacing read and parse failures.
    pub fn try_load(&self) -> Result<Vec<T>, StorageError> {
        match self.store.get(T::KEY)? {
            Some(raw) => parse_collection(T::KEY, &raw),
            None => Ok(Vec::new()),
        }
    }

    /// Persist the full collection. Failures are logged.
    pub fn save(&self, items: &[T]) {
        if let Err(e) = self.try_save(items) {
            warn!(key = T::KEY, error = %e, "failed to save collection");
        }
    }

    pub fn try_save(&self, items: &[T]) -> Result<(), StorageError> {
        let raw = serde_json::to_string(items).map_err(|source| StorageError::Malformed {
            key: T::KEY.to_string(),
            source,
        })?;
        self.store.set(T::KEY, &raw)
    }

    pub fn get(&self, id: &str) -> Option<T> {
        self.load().into_iter().find(|item| item.id() == id)
    }

    /// Generate `<prefix>-<millis>`, stepping forward while it collides.
    pub fn next_id(&self, existing: &[T]) -> String {
        next_id_from(T::ID_PREFIX, self.clock.now_ms(), |candidate| {
            existing.iter().any(|item| item.id() == candidate)
        })
    }

    /// Load, let `f` mutate the collection, and save it back.
    ///
    /// Returns `None` without writing if the collection could not be read,
    /// so a transient read failure never clobbers stored data.
    pub fn mutate<R>(&self, f: impl FnOnce(&mut Vec<T>) -> R) -> Option<R> {
        let mut items = match self.try_load() {
            Ok(items) => items,
            Err(e) => {
                warn!(key = T::KEY, error = %e, "skipping write to unreadable collection");
                return None;
            }
        };
        let result = f(&mut items);
        self.save(&items);
        Some(result)
    }

    /// Append a record built from a freshly generated id.
    ///
    /// The record is returned even when it could not be persisted.
    pub fn insert_with(&self, build: impl FnOnce(String) -> T) -> T {
        match self.try_load() {
            Ok(mut items) => {
                let item = build(self.next_id(&items));
                items.push(item.clone());
                self.save(&items);
                debug!(key = T::KEY, id = item.id(), "record added");
                item
            }
            Err(e) => {
                warn!(key = T::KEY, error = %e, "record not persisted: collection unreadable");
                build(self.next_id(&[]))
            }
        }
    }

    /// Find by id, apply `f`, save. Unknown id returns `None` and writes nothing.
    pub fn update(&self, id: &str, f: impl FnOnce(&mut T)) -> Option<T> {
        let mut items = self.try_load().ok()?;
        let item = items.iter_mut().find(|item| item.id() == id)?;
        f(item);
        let updated = item.clone();
        self.save(&items);
        Some(updated)
    }

    /// Remove by id. Returns whether a record was removed.
    pub fn remove(&self, id: &str) -> bool {
        let mut items = match self.try_load() {
            Ok(items) => items,
            Err(e) => {
                warn!(key = T::KEY, error = %e, "skipping delete on unreadable collection");
                return false;
            }
        };
        let before = items.len();
        items.retain(|item| item.id() != id);
        if items.len() == before {
            return false;
        }
        self.save(&items);
        true
    }
}

pub(crate) fn next_id_from(prefix: &str, now_ms: i64, taken: impl Fn(&str) -> bool) -> String {
    let mut ms = now_ms;
    loop {
        let candidate = format!("{prefix}-{ms}");
        if !taken(&candidate) {
            return candidate;
        }
        ms += 1;
    }
}

fn parse_collection<T: Record>(key: &str, raw: &str) -> Result<Vec<T>, StorageError> {
    let malformed = |source| StorageError::Malformed {
        key: key.to_string(),
        source,
    };
    let values: Vec<Value> = serde_json::from_str(raw).map_err(malformed)?;
    values
        .into_iter()
        .map(|mut value| {
            if let Value::Object(map) = &mut value {
                T::upgrade(map);
            }
            serde_json::from_value(value).map_err(malformed)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::storage::testing::FailingStore;
    use crate::storage::MemoryStore;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        id: String,
        text: String,
        #[serde(default)]
        pinned: bool,
    }

    impl Record for Note {
        const KEY: &'static str = "notes";
        const ID_PREFIX: &'static str = "note";

        fn id(&self) -> &str {
            &self.id
        }

        fn upgrade(raw: &mut Map<String, Value>) {
            raw.entry("text").or_insert_with(|| Value::String(String::new()));
        }
    }

    fn note(id: String, text: &str) -> Note {
        Note {
            id,
            text: text.to_string(),
            pinned: false,
        }
    }

    #[test]
    fn empty_store_loads_empty_collection() {
        let store = MemoryStore::new();
        let clock = ManualClock::at_ms(1_000);
        let notes: Collection<Note> = Collection::new(&store, &clock);
        assert!(notes.load().is_empty());
    }

    #[test]
    fn corrupt_json_loads_empty_and_is_not_overwritten() {
        let store = MemoryStore::new();
        store.set("notes", "{not json").unwrap();
        let clock = ManualClock::at_ms(1_000);
        let notes: Collection<Note> = Collection::new(&store, &clock);

        assert!(notes.load().is_empty());
        assert!(notes.update("note-1", |n| n.pinned = true).is_none());
        assert!(!notes.remove("note-1"));
        assert_eq!(store.get("notes").unwrap().as_deref(), Some("{not json"));
    }

    #[test]
    fn ids_step_forward_on_collision() {
        let store = MemoryStore::new();
        let clock = ManualClock::at_ms(42);
        let notes: Collection<Note> = Collection::new(&store, &clock);

        let a = notes.insert_with(|id| note(id, "a"));
        let b = notes.insert_with(|id| note(id, "b"));
        assert_eq!(a.id, "note-42");
        assert_eq!(b.id, "note-43");
        assert_eq!(notes.load().len(), 2);
    }

    #[test]
    fn upgrade_runs_before_deserialization() {
        let store = MemoryStore::new();
        store.set("notes", r#"[{"id":"note-1"}]"#).unwrap();
        let clock = ManualClock::at_ms(0);
        let notes: Collection<Note> = Collection::new(&store, &clock);

        let loaded = notes.load();
        assert_eq!(loaded, vec![note("note-1".into(), "")]);
    }

    #[test]
    fn update_and_remove_unknown_ids_are_noops() {
        let store = MemoryStore::new();
        let clock = ManualClock::at_ms(7);
        let notes: Collection<Note> = Collection::new(&store, &clock);
        notes.insert_with(|id| note(id, "keep"));
        let before = store.get("notes").unwrap();

        assert!(notes.update("note-999", |n| n.text.clear()).is_none());
        assert!(!notes.remove("note-999"));
        assert_eq!(store.get("notes").unwrap(), before);

        let updated = notes.update("note-7", |n| n.pinned = true).unwrap();
        assert!(updated.pinned);
        assert!(notes.remove("note-7"));
        assert!(notes.load().is_empty());
    }

    #[test]
    fn write_failure_still_returns_record() {
        let store = FailingStore::writes();
        let clock = ManualClock::at_ms(5);
        let notes: Collection<Note> = Collection::new(&store, &clock);

        let added = notes.insert_with(|id| note(id, "lost"));
        assert_eq!(added.id, "note-5");
        assert!(notes.load().is_empty());
    }
}
