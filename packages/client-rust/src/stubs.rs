//! Placeholder capabilities for domains whose backends are not wired up in
//! this version.
//!
//! Registering the domain with a stub keeps the envelope contract uniform:
//! callers get a well-formed `NOT_IMPLEMENTED` error instead of
//! `CAPABILITY_NOT_FOUND`, which would wrongly suggest a typo in the action.

use async_trait::async_trait;
use serde_json::Value;

use crate::capability::{domains, Capability, CapabilityContext, CapabilityError};

/// Code attached by every stub operation.
pub const NOT_IMPLEMENTED: &str = "NOT_IMPLEMENTED";

/// Generate a placeholder capability with the given domain and operations.
macro_rules! placeholder_capability {
    (
        $(#[$meta:meta])*
        $name:ident, $domain:expr, $ops:expr
    ) => {
        $(#[$meta])*
        pub struct $name;

        #[async_trait]
        impl Capability for $name {
            fn domain(&self) -> &'static str {
                $domain
            }

            fn operations(&self) -> &'static [&'static str] {
                $ops
            }

            async fn init(&self, _ctx: &CapabilityContext) -> anyhow::Result<()> {
                Ok(())
            }

            async fn invoke(
                &self,
                operation: &str,
                _payload: Value,
            ) -> Result<Value, CapabilityError> {
                Err(CapabilityError::with_code(
                    NOT_IMPLEMENTED,
                    format!("{}.{operation} is not available in this build", $domain),
                ))
            }
        }
    };
}

placeholder_capability!(
    /// CPU-bound computation. The worker-pool scheduler behind `compute.run`
    /// ships separately; this stub only reserves the domain.
    ComputeCapability,
    domains::COMPUTE,
    &["run"]
);

placeholder_capability!(
    /// Realtime pub/sub and presence. The transport behind these operations
    /// ships separately; this stub only reserves the domain.
    RealtimeCapability,
    domains::REALTIME,
    &["publish", "subscribe", "unsubscribe", "presence"]
);

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
