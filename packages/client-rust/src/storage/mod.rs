//! Tiered storage capability.
//!
//! Decides, per save, whether a record lands in the fast local tier or the
//! remote tier based on serialized size against a configurable threshold.
//! The local tier is always available; the remote tier is optional, and a
//! record that should go remote is written locally (with a warning) rather
//! than refused when no remote is configured.

pub mod local;
pub mod remote;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use capstan_core::codes;

use crate::capability::{domains, Capability, CapabilityContext, CapabilityError};
use crate::config::DEFAULT_TIER_THRESHOLD_BYTES;

pub use local::{LocalStore, MemoryStore, RedbStore};
pub use remote::{HttpRemoteStore, MemoryRemoteStore, RemoteStore};

/// Storage-specific error codes layered on top of the core taxonomy.
pub mod storage_codes {
    /// Key is empty or longer than 255 characters.
    pub const INVALID_KEY: &str = "INVALID_KEY";
    /// Payload does not match the operation's parameter shape.
    pub const INVALID_PARAMS: &str = "INVALID_PARAMS";
    /// Local tier rejected a write or delete.
    pub const LOCAL_STORE_FAILED: &str = "LOCAL_STORE_FAILED";
    /// Remote tier rejected a request.
    pub const REMOTE_STORE_FAILED: &str = "REMOTE_STORE_FAILED";
}

// ---------------------------------------------------------------------------
// Wire shapes
// ---------------------------------------------------------------------------

/// Which tier a record was written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Local,
    Remote,
}

/// Result of a `storage.save` operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveReceipt {
    pub key: String,
    pub tier: Tier,
    pub size_bytes: u64,
    /// Present when the record exceeded the threshold but no remote tier is
    /// configured and it was kept local.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SaveParams {
    key: String,
    value: Value,
}

#[derive(Debug, Deserialize)]
struct KeyParams {
    key: String,
}

#[derive(Debug, Default, Deserialize)]
struct ListParams {
    #[serde(default)]
    prefix: Option<String>,
}

// ---------------------------------------------------------------------------
// StorageCapability
// ---------------------------------------------------------------------------

const OPERATIONS: &[&str] = &["save", "get", "delete", "list"];

/// The `storage` capability: size-tiered persistence over a local store and
/// an optional remote store.
///
/// Tier choice is recomputed on every save and old copies are not migrated,
/// so `get` probes local first and falls through to remote.
pub struct StorageCapability {
    local: Arc<dyn LocalStore>,
    remote: Option<Arc<dyn RemoteStore>>,
    threshold_bytes: AtomicU64,
}

impl StorageCapability {
    /// Wires the capability to its tier stores. The threshold is read from
    /// the client configuration during `init`.
    #[must_use]
    pub fn new(local: Arc<dyn LocalStore>, remote: Option<Arc<dyn RemoteStore>>) -> Self {
        Self {
            local,
            remote,
            threshold_bytes: AtomicU64::new(DEFAULT_TIER_THRESHOLD_BYTES),
        }
    }

    async fn save(&self, payload: Value) -> Result<Value, CapabilityError> {
        let params: SaveParams = decode(payload)?;
        validate_key(&params.key)?;

        let bytes = serde_json::to_vec(&params.value)
            .map_err(|err| CapabilityError::new(format!("value is not serializable: {err}")))?;
        let size_bytes = bytes.len() as u64;
        let threshold = self.threshold_bytes.load(Ordering::Relaxed);

        let receipt = if size_bytes < threshold {
            self.local.put(&params.key, &bytes).map_err(|err| {
                CapabilityError::with_code(
                    storage_codes::LOCAL_STORE_FAILED,
                    format!("local write failed: {err:#}"),
                )
            })?;
            SaveReceipt {
                key: params.key,
                tier: Tier::Local,
                size_bytes,
                warning: None,
            }
        } else if let Some(remote) = &self.remote {
            remote.put(&params.key, bytes).await.map_err(|err| {
                CapabilityError::with_code(
                    storage_codes::REMOTE_STORE_FAILED,
                    format!("remote write failed: {err:#}"),
                )
            })?;
            SaveReceipt {
                key: params.key,
                tier: Tier::Remote,
                size_bytes,
                warning: None,
            }
        } else {
            // Never refuse to persist just because the preferred tier is
            // missing: keep the record local and tell the caller.
            warn!(
                key = %params.key,
                size_bytes,
                threshold,
                "record exceeds tier threshold with no remote configured, keeping local"
            );
            self.local.put(&params.key, &bytes).map_err(|err| {
                CapabilityError::with_code(
                    storage_codes::LOCAL_STORE_FAILED,
                    format!("local write failed: {err:#}"),
                )
            })?;
            SaveReceipt {
                key: params.key,
                tier: Tier::Local,
                size_bytes,
                warning: Some(format!(
                    "record of {size_bytes} bytes exceeds the {threshold}-byte threshold \
                     but no remote tier is configured; wrote local tier"
                )),
            }
        };

        to_result_value(&receipt)
    }

    async fn get(&self, payload: Value) -> Result<Value, CapabilityError> {
        let params: KeyParams = decode(payload)?;

        // Local probe errors are soft misses: the remote tier may still have
        // the record, and availability beats surfacing a partial failure.
        match self.local.get(&params.key) {
            Ok(Some(bytes)) => return decode_record(&bytes),
            Ok(None) => {}
            Err(err) => {
                warn!(key = %params.key, error = ?err, "local probe failed, treating as miss");
            }
        }

        if let Some(remote) = &self.remote {
            let found = remote.get(&params.key).await.map_err(|err| {
                CapabilityError::with_code(
                    storage_codes::REMOTE_STORE_FAILED,
                    format!("remote read failed: {err:#}"),
                )
            })?;
            if let Some(bytes) = found {
                return decode_record(&bytes);
            }
        }

        Err(CapabilityError::with_code(
            codes::KEY_NOT_FOUND,
            format!("key {:?} not found in any tier", params.key),
        ))
    }

    async fn delete(&self, payload: Value) -> Result<Value, CapabilityError> {
        let params: KeyParams = decode(payload)?;

        // Unconditional on both tiers, no existence pre-check.
        self.local.remove(&params.key).map_err(|err| {
            CapabilityError::with_code(
                storage_codes::LOCAL_STORE_FAILED,
                format!("local delete failed: {err:#}"),
            )
        })?;
        if let Some(remote) = &self.remote {
            remote.delete(&params.key).await.map_err(|err| {
                CapabilityError::with_code(
                    storage_codes::REMOTE_STORE_FAILED,
                    format!("remote delete failed: {err:#}"),
                )
            })?;
        }

        Ok(serde_json::json!({ "deleted": true, "key": params.key }))
    }

    async fn list(&self, payload: Value) -> Result<Value, CapabilityError> {
        let params: ListParams = if payload.is_null() {
            ListParams::default()
        } else {
            decode(payload)?
        };

        // Local tier only: remote key enumeration is deliberately
        // unsupported.
        let mut keys = self.local.keys().map_err(|err| {
            CapabilityError::with_code(
                storage_codes::LOCAL_STORE_FAILED,
                format!("local listing failed: {err:#}"),
            )
        })?;
        if let Some(prefix) = &params.prefix {
            keys.retain(|key| key.starts_with(prefix.as_str()));
        }
        keys.sort();

        Ok(serde_json::json!({ "keys": keys }))
    }
}

#[async_trait]
impl Capability for StorageCapability {
    fn domain(&self) -> &'static str {
        domains::STORAGE
    }

    fn operations(&self) -> &'static [&'static str] {
        OPERATIONS
    }

    async fn init(&self, ctx: &CapabilityContext) -> anyhow::Result<()> {
        self.threshold_bytes
            .store(ctx.config.storage.threshold_bytes, Ordering::Relaxed);
        Ok(())
    }

    async fn invoke(&self, operation: &str, payload: Value) -> Result<Value, CapabilityError> {
        match operation {
            "save" => self.save(payload).await,
            "get" => self.get(payload).await,
            "delete" => self.delete(payload).await,
            "list" => self.list(payload).await,
            // The dispatcher checks `operations()` first; direct callers get
            // the same failure mode.
            other => Err(CapabilityError::with_code(
                codes::OPERATION_NOT_FOUND,
                format!("storage has no operation {other:?}"),
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn decode<T: DeserializeOwned>(payload: Value) -> Result<T, CapabilityError> {
    serde_json::from_value(payload).map_err(|err| {
        CapabilityError::with_code(
            storage_codes::INVALID_PARAMS,
            format!("invalid parameters: {err}"),
        )
    })
}

fn decode_record(bytes: &[u8]) -> Result<Value, CapabilityError> {
    serde_json::from_slice(bytes)
        .map_err(|err| CapabilityError::new(format!("stored record is not valid JSON: {err}")))
}

fn to_result_value<T: Serialize>(value: &T) -> Result<Value, CapabilityError> {
    serde_json::to_value(value)
        .map_err(|err| CapabilityError::new(format!("result serialization failed: {err}")))
}

fn validate_key(key: &str) -> Result<(), CapabilityError> {
    let length = key.chars().count();
    if length == 0 || length > 255 {
        return Err(CapabilityError::with_code(
            storage_codes::INVALID_KEY,
            format!("key must be 1-255 characters, got {length}"),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
