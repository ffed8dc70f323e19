//! Response envelope: the uniform success/error shape returned by every
//! dispatch call.
//!
//! Serializes to camelCase JSON for wire compatibility with the TypeScript
//! client. Exactly one of `data` / `error` is present, enforced by the enum
//! shape rather than by convention.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Error codes
// ---------------------------------------------------------------------------

/// Well-known error codes attached to error envelopes.
///
/// Capabilities may attach their own domain-specific codes; anything not in
/// the structural set below is treated as retryable.
pub mod codes {
    /// Action string is malformed (missing `.` or empty segment).
    pub const INVALID_ACTION: &str = "INVALID_ACTION";
    /// No capability registered for the action's domain.
    pub const CAPABILITY_NOT_FOUND: &str = "CAPABILITY_NOT_FOUND";
    /// The capability exists but does not expose the named operation.
    pub const OPERATION_NOT_FOUND: &str = "OPERATION_NOT_FOUND";
    /// An attempt exceeded its per-attempt timeout.
    pub const TIMEOUT: &str = "TIMEOUT";
    /// Key absent from both storage tiers.
    pub const KEY_NOT_FOUND: &str = "KEY_NOT_FOUND";
    /// Fallback when a capability fails without attaching a code.
    pub const EXECUTION_FAILED: &str = "EXECUTION_FAILED";
}

/// Returns `true` if reissuing the same action is expected to help.
///
/// Structural caller errors are never retryable; every other code defaults
/// to retryable.
#[must_use]
pub fn is_retryable(code: &str) -> bool {
    !matches!(
        code,
        codes::INVALID_ACTION | codes::CAPABILITY_NOT_FOUND | codes::OPERATION_NOT_FOUND
    )
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// The error payload carried inside an error envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    /// Machine-readable error code, e.g. `TIMEOUT`.
    pub code: String,
    /// Human-readable description of the failure.
    pub message: String,
    /// Whether reissuing the same action is expected to help.
    pub retryable: bool,
}

impl ErrorBody {
    /// Builds an error body, deriving `retryable` from the code.
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        let code = code.into();
        let retryable = is_retryable(&code);
        Self {
            code,
            message: message.into(),
            retryable,
        }
    }
}

/// The uniform response envelope returned by every dispatch call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Response {
    /// Successful dispatch.
    #[serde(rename_all = "camelCase")]
    Ok {
        /// Unique id of the dispatch call.
        id: String,
        /// The operation's result.
        data: Value,
        /// Wall-clock duration of the final successful attempt.
        duration_millis: u64,
    },
    /// Failed dispatch.
    #[serde(rename_all = "camelCase")]
    Error {
        /// Unique id of the dispatch call.
        id: String,
        /// What went wrong.
        error: ErrorBody,
    },
}

impl Response {
    /// Builds a success envelope.
    #[must_use]
    pub fn ok(id: impl Into<String>, data: Value, duration_millis: u64) -> Self {
        Self::Ok {
            id: id.into(),
            data,
            duration_millis,
        }
    }

    /// Builds an error envelope, deriving retryability from the code.
    #[must_use]
    pub fn error(
        id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Error {
            id: id.into(),
            error: ErrorBody::new(code, message),
        }
    }

    /// The dispatch call id this envelope answers.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Ok { id, .. } | Self::Error { id, .. } => id,
        }
    }

    /// `true` for success envelopes.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
