//! Best-effort mirror of community challenges to a Supabase backend.
//!
//! Local storage stays authoritative. Challenge mutations enqueue snake_case
//! mirror rows into a persistent outbox, which is flushed to PostgREST when
//! a remote is configured.

pub mod device_id;
pub mod outbox;
pub mod supabase;
pub mod types;

pub use device_id::{get_or_create_user_id, local_user_id};
pub use outbox::Outbox;
pub use supabase::{RemoteBackend, SupabaseClient};
pub use types::{FlushReport, MirrorRow, RemoteTable, SyncError, SyncStatus};

use tracing::warn;

use crate::storage::Config;

/// Build the remote client when the configuration allows it.
///
/// A configured but unusable remote (bad URL) is logged and treated as absent.
pub fn remote_from_config(config: &Config) -> Option<SupabaseClient> {
    let remote = config.remote()?;
    match SupabaseClient::new(remote) {
        Ok(client) => Some(client),
        Err(e) => {
            warn!(error = %e, "remote backend unavailable");
            None
        }
    }
}
