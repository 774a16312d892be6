// Local user id used to attribute challenge participation and check-ins.
// Format: "user-<uuid>", stored under `device:user_id`.

use tracing::warn;
use uuid::Uuid;

use crate::error::StorageError;
use crate::storage::{KeyValueStore, ProfileConfig};

const USER_ID_KEY: &str = "device:user_id";
const USER_ID_PREFIX: &str = "user-";

/// Get or create the stored local user id.
///
/// A stored value without the expected prefix is replaced.
pub fn get_or_create_user_id(store: &dyn KeyValueStore) -> Result<String, StorageError> {
    if let Some(existing) = store.get(USER_ID_KEY)? {
        let existing = existing.trim();
        if existing.starts_with(USER_ID_PREFIX) && existing.len() > USER_ID_PREFIX.len() {
            return Ok(existing.to_string());
        }
        warn!(value = existing, "replacing malformed local user id");
    }

    let user_id = format!("{}{}", USER_ID_PREFIX, Uuid::new_v4());
    store.set(USER_ID_KEY, &user_id)?;
    Ok(user_id)
}

/// The user id this installation acts as.
///
/// `profile.user_id` wins when set. Otherwise the stored id is used, falling
/// back to an unsaved fresh id when storage is unavailable.
pub fn local_user_id(store: &dyn KeyValueStore, profile: &ProfileConfig) -> String {
    let configured = profile.user_id.trim();
    if !configured.is_empty() {
        return configured.to_string();
    }
    get_or_create_user_id(store).unwrap_or_else(|e| {
        warn!(error = %e, "local user id not persisted");
        format!("{}{}", USER_ID_PREFIX, Uuid::new_v4())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::testing::FailingStore;
    use crate::storage::MemoryStore;

    #[test]
    fn user_id_format() {
        let kv = MemoryStore::new();
        let user_id = get_or_create_user_id(&kv).unwrap();

        assert!(user_id.starts_with(USER_ID_PREFIX));
        assert_eq!(user_id.len(), USER_ID_PREFIX.len() + 36);
    }

    #[test]
    fn user_id_persistence() {
        let kv = MemoryStore::new();
        let first = get_or_create_user_id(&kv).unwrap();
        let second = get_or_create_user_id(&kv).unwrap();
        assert_eq!(first, second);
        assert_eq!(kv.get(USER_ID_KEY).unwrap().as_deref(), Some(first.as_str()));
    }

    #[test]
    fn malformed_user_id_is_replaced() {
        let kv = MemoryStore::new();
        kv.set(USER_ID_KEY, "invalid-id-123").unwrap();

        let user_id = get_or_create_user_id(&kv).unwrap();
        assert!(user_id.starts_with(USER_ID_PREFIX));
        assert_ne!(user_id, "invalid-id-123");
    }

    #[test]
    fn profile_user_id_wins() {
        let kv = MemoryStore::new();
        let profile = ProfileConfig {
            user_id: "alice".into(),
            display_name: "Alice".into(),
        };
        assert_eq!(local_user_id(&kv, &profile), "alice");
        assert!(kv.is_empty());
    }

    #[test]
    fn unwritable_store_still_yields_an_id() {
        let kv = FailingStore::writes();
        let id = local_user_id(&kv, &ProfileConfig::default());
        assert!(id.starts_with(USER_ID_PREFIX));
    }

    #[test]
    fn user_ids_are_unique_per_store() {
        let a = get_or_create_user_id(&MemoryStore::new()).unwrap();
        let b = get_or_create_user_id(&MemoryStore::new()).unwrap();
        assert_ne!(a, b);
    }
}
