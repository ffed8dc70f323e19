//! Client-level configuration for the dispatch and storage subsystems.

use std::time::Duration;

/// Serialized-size boundary (bytes) that sends a record to the remote tier.
pub const DEFAULT_TIER_THRESHOLD_BYTES: u64 = 5_242_880; // 5 MiB

/// Base delay for exponential retry backoff.
pub const DEFAULT_RETRY_BASE_DELAY_MILLIS: u64 = 100;

/// Top-level client configuration.
///
/// Capability-specific sections are passed through untouched via
/// [`CapabilityContext`](crate::capability::CapabilityContext); the dispatch
/// core itself only consumes `dispatch`.
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    /// Dispatch pipeline settings.
    pub dispatch: DispatchConfig,
    /// Storage tiering settings.
    pub storage: StorageConfig,
}

/// Settings consumed by the dispatcher and the retry/timeout executor.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Per-attempt timeout applied when the caller supplies no options.
    pub default_timeout_millis: u64,
    /// Retry bound applied when the caller supplies no options.
    /// 0 means exactly one attempt.
    pub default_max_retries: u32,
    /// Base delay for exponential backoff between failed attempts.
    pub retry_base_delay_millis: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            default_timeout_millis: capstan_core::DEFAULT_TIMEOUT_MILLIS,
            default_max_retries: capstan_core::DEFAULT_MAX_RETRIES,
            retry_base_delay_millis: DEFAULT_RETRY_BASE_DELAY_MILLIS,
        }
    }
}

/// Settings for the storage tiering policy.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Records whose serialized size is below this land in the local tier.
    pub threshold_bytes: u64,
    /// Remote tier endpoint. `None` disables the remote tier entirely; large
    /// records then stay local with a warning.
    pub remote: Option<RemoteConfig>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            threshold_bytes: DEFAULT_TIER_THRESHOLD_BYTES,
            remote: None,
        }
    }
}

/// Remote store endpoint configuration.
///
/// No `Default` impl because the base URL has no sensible default.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// Base URL of the remote record service.
    pub base_url: String,
    /// Optional bearer token sent with every request.
    pub auth_token: Option<String>,
    /// Maximum time to wait for a single remote request.
    pub request_timeout: Duration,
}

impl RemoteConfig {
    /// Config pointing at `base_url` with no auth and a 30s request timeout.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            auth_token: None,
            request_timeout: Duration::from_secs(30),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
