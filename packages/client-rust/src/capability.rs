//! The capability contract: named units of functionality exposing
//! asynchronous operations to the dispatcher.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::ClientConfig;

// ---------------------------------------------------------------------------
// Domain names
// ---------------------------------------------------------------------------

/// Well-known capability domain names.
pub mod domains {
    pub const STORAGE: &str = "storage";
    pub const COMPUTE: &str = "compute";
    pub const REALTIME: &str = "realtime";
}

// ---------------------------------------------------------------------------
// CapabilityContext
// ---------------------------------------------------------------------------

/// Context provided to capabilities during initialization.
///
/// Carries the full client configuration; each capability reads its own
/// section and ignores the rest.
#[derive(Debug, Clone)]
pub struct CapabilityContext {
    pub config: Arc<ClientConfig>,
}

// ---------------------------------------------------------------------------
// Capability trait
// ---------------------------------------------------------------------------

/// A named unit of functionality exposing zero or more async operations.
///
/// Capabilities are registered with a [`CapabilityRegistry`](crate::registry::CapabilityRegistry)
/// under their `domain()` name and initialized in registration order before
/// any dispatch begins. The dispatcher resolves operations against
/// `operations()` by explicit lookup; an unlisted operation is rejected as
/// `OPERATION_NOT_FOUND` without ever invoking the capability.
#[async_trait]
pub trait Capability: Send + Sync {
    /// Registry key for this capability (e.g. `"storage"`).
    fn domain(&self) -> &'static str;

    /// The operations this capability answers to.
    fn operations(&self) -> &'static [&'static str];

    /// Initialize the capability with the given context. Called exactly once,
    /// before the registry is usable for dispatch.
    async fn init(&self, ctx: &CapabilityContext) -> anyhow::Result<()>;

    /// Execute one operation against the given payload.
    async fn invoke(&self, operation: &str, payload: Value) -> Result<Value, CapabilityError>;
}

// ---------------------------------------------------------------------------
// CapabilityError
// ---------------------------------------------------------------------------

/// Failure raised by a capability operation.
///
/// Carries an optional machine-readable code; when absent, the dispatcher
/// substitutes `EXECUTION_FAILED` at the envelope boundary.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct CapabilityError {
    code: Option<String>,
    message: String,
}

impl CapabilityError {
    /// An error without a machine code.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    /// An error carrying a machine code, e.g. `KEY_NOT_FOUND`.
    #[must_use]
    pub fn with_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: message.into(),
        }
    }

    /// The machine code, if the operation attached one.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    /// Human-readable description of the failure.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<anyhow::Error> for CapabilityError {
    fn from(err: anyhow::Error) -> Self {
        Self::new(format!("{err:#}"))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
