//! Supabase (PostgREST) client for the challenge mirror.

use serde_json::Value;
use tokio::runtime::Runtime;
use tracing::{debug, info};
use url::Url;

use crate::storage::RemoteConfig;
use crate::sync::types::{RemoteTable, SyncError};

/// Remote operations the challenge mirror needs.
///
/// Blocking by contract: callers are plain synchronous code.
pub trait RemoteBackend {
    /// Insert or merge `rows` into `table` on its conflict columns.
    fn upsert(&self, table: RemoteTable, rows: &[Value]) -> Result<(), SyncError>;

    /// All rows of `table` whose `column` equals `value`.
    fn select_eq(&self, table: RemoteTable, column: &str, value: &str)
        -> Result<Vec<Value>, SyncError>;
}

impl<B: RemoteBackend + ?Sized> RemoteBackend for &B {
    fn upsert(&self, table: RemoteTable, rows: &[Value]) -> Result<(), SyncError> {
        (**self).upsert(table, rows)
    }

    fn select_eq(
        &self,
        table: RemoteTable,
        column: &str,
        value: &str,
    ) -> Result<Vec<Value>, SyncError> {
        (**self).select_eq(table, column, value)
    }
}

/// PostgREST client. Owns a current-thread runtime to drive `reqwest`.
pub struct SupabaseClient {
    base: Url,
    anon_key: String,
    bearer: String,
    http: reqwest::Client,
    runtime: Runtime,
}

impl SupabaseClient {
    /// Build a client from remote settings.
    ///
    /// # Errors
    /// `NotConfigured` when URL or anon key is missing, `Url` when the URL
    /// does not parse.
    pub fn new(config: &RemoteConfig) -> Result<Self, SyncError> {
        if !config.is_configured() {
            return Err(SyncError::NotConfigured);
        }
        let mut base = Url::parse(config.supabase_url.trim())?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let anon_key = config.anon_key.trim().to_string();
        let bearer = match config.access_token.trim() {
            "" => anon_key.clone(),
            token => token.to_string(),
        };
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        Ok(Self {
            base,
            anon_key,
            bearer,
            http: reqwest::Client::new(),
            runtime,
        })
    }

    fn table_url(&self, table: RemoteTable) -> Result<Url, SyncError> {
        Ok(self.base.join(&format!("rest/v1/{}", table.name()))?)
    }

    fn request(&self, method: reqwest::Method, url: Url) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.bearer)
    }
}

async fn check(response: reqwest::Response) -> Result<reqwest::Response, SyncError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(SyncError::Api {
        status: status.as_u16(),
        message,
    })
}

impl RemoteBackend for SupabaseClient {
    fn upsert(&self, table: RemoteTable, rows: &[Value]) -> Result<(), SyncError> {
        if rows.is_empty() {
            return Ok(());
        }
        let mut url = self.table_url(table)?;
        url.query_pairs_mut()
            .append_pair("on_conflict", table.conflict_columns());

        let request = self
            .request(reqwest::Method::POST, url)
            .header("Prefer", "resolution=merge-duplicates")
            .json(rows);
        self.runtime.block_on(async {
            check(request.send().await?).await?;
            Ok::<_, SyncError>(())
        })?;

        info!(table = %table, rows = rows.len(), "upserted rows to remote");
        Ok(())
    }

    fn select_eq(
        &self,
        table: RemoteTable,
        column: &str,
        value: &str,
    ) -> Result<Vec<Value>, SyncError> {
        let mut url = self.table_url(table)?;
        url.query_pairs_mut()
            .append_pair("select", "*")
            .append_pair(column, &format!("eq.{value}"));

        let request = self.request(reqwest::Method::GET, url);
        let rows: Vec<Value> = self.runtime.block_on(async {
            let response = check(request.send().await?).await?;
            Ok::<_, SyncError>(response.json().await?)
        })?;

        debug!(table = %table, rows = rows.len(), "selected rows from remote");
        Ok(rows)
    }
}
