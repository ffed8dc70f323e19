//! Remote-tier store client.
//!
//! The remote tier is an HTTP record service reached through a thin
//! `reqwest` wrapper. It does no retrying of its own (the dispatch envelope
//! owns retries) and deliberately exposes no key enumeration.

use async_trait::async_trait;
use dashmap::DashMap;
use reqwest::{RequestBuilder, StatusCode};

use crate::config::RemoteConfig;

/// Remote-tier store contract consumed by the tiering policy.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Persist the record bytes for `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote service rejects or cannot complete
    /// the write.
    async fn put(&self, key: &str, bytes: Vec<u8>) -> anyhow::Result<()>;

    /// Retrieve the record bytes for `key`, or `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote service cannot be reached or answers
    /// with a non-404 failure.
    async fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>>;

    /// Remove `key`. Removing an absent key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote service cannot complete the delete.
    async fn delete(&self, key: &str) -> anyhow::Result<()>;
}

// ---------------------------------------------------------------------------
// HttpRemoteStore
// ---------------------------------------------------------------------------

/// [`RemoteStore`] over an HTTP record service.
///
/// Records live under `{base_url}/records?key=<key>`; the key travels as a
/// query parameter so arbitrary key bytes never need path escaping.
pub struct HttpRemoteStore {
    client: reqwest::Client,
    records_url: String,
    auth_token: Option<String>,
}

impl HttpRemoteStore {
    /// Builds a client for the configured endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be constructed.
    pub fn new(config: &RemoteConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            client,
            records_url: format!("{}/records", config.base_url.trim_end_matches('/')),
            auth_token: config.auth_token.clone(),
        })
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> anyhow::Result<()> {
        let response = self
            .authed(self.client.put(&self.records_url))
            .query(&[("key", key)])
            .body(bytes)
            .send()
            .await?;
        response.error_for_status()?;
        Ok(())
    }

    async fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        let response = self
            .authed(self.client.get(&self.records_url))
            .query(&[("key", key)])
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = response.error_for_status()?;
        Ok(Some(response.bytes().await?.to_vec()))
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        let response = self
            .authed(self.client.delete(&self.records_url))
            .query(&[("key", key)])
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        response.error_for_status()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MemoryRemoteStore
// ---------------------------------------------------------------------------

/// In-memory [`RemoteStore`] for tests and single-process setups.
///
/// All operations succeed immediately; data lives only as long as the
/// process. This is the default stand-in when exercising tiering behavior
/// without a real record service.
pub struct MemoryRemoteStore {
    entries: DashMap<String, Vec<u8>>,
}

impl MemoryRemoteStore {
    /// Creates a new, empty `MemoryRemoteStore`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Number of records currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when no records are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for MemoryRemoteStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> anyhow::Result<()> {
        self.entries.insert(key.to_string(), bytes);
        Ok(())
    }

    async fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
