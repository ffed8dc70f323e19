//! Per-call dispatch message: id, parsed action, payload, resolved options.
//!
//! A [`Message`] is constructed fresh for every dispatch call, is immutable
//! after construction, and is discarded once the call returns.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::action::Action;

/// Default per-attempt timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MILLIS: u64 = 5_000;

/// Default number of retries after the first failed attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 0;

// ---------------------------------------------------------------------------
// CallOptions
// ---------------------------------------------------------------------------

/// Call-level options resolved by merging caller-supplied values over the
/// defaults.
///
/// The container-level `#[serde(default)]` gives field-wise merging on the
/// wire: `{"timeoutMillis": 100}` deserializes with `max_retries = 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CallOptions {
    /// Per-attempt timeout in milliseconds.
    pub timeout_millis: u64,
    /// Additional attempts after the first failure. 0 means exactly one
    /// attempt, no retry.
    pub max_retries: u32,
}

impl Default for CallOptions {
    fn default() -> Self {
        Self {
            timeout_millis: DEFAULT_TIMEOUT_MILLIS,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// A single dispatch call.
#[derive(Debug, Clone)]
pub struct Message {
    id: String,
    action: Action,
    payload: Value,
    options: CallOptions,
}

impl Message {
    /// Assembles a message from already-validated parts.
    #[must_use]
    pub fn new(id: String, action: Action, payload: Value, options: CallOptions) -> Self {
        Self {
            id,
            action,
            payload,
            options,
        }
    }

    /// Unique id of this call, echoed back in the response envelope.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The parsed `domain.operation` target.
    #[must_use]
    pub fn action(&self) -> &Action {
        &self.action
    }

    /// The caller-supplied payload.
    #[must_use]
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// The resolved call options.
    #[must_use]
    pub fn options(&self) -> CallOptions {
        self.options
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
