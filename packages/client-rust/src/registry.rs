//! Registry mapping capability domain names to capability instances.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;

use capstan_core::is_valid_domain_name;

use crate::capability::{Capability, CapabilityContext};

/// Registry for capabilities, keyed by domain name.
///
/// Registration happens during client initialization and the registry is
/// treated as read-only afterwards; there is no unregister in this version.
/// Registering a domain twice overwrites the previous entry (last write
/// wins). Registration order determines initialization order.
pub struct CapabilityRegistry {
    by_domain: DashMap<String, Arc<dyn Capability>>,
    /// Registration order for deterministic init sequencing.
    init_order: RwLock<Vec<String>>,
}

impl CapabilityRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            by_domain: DashMap::new(),
            init_order: RwLock::new(Vec::new()),
        }
    }

    /// Register a capability under its domain name.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidDomainName`] when the capability's
    /// domain does not match identifier syntax.
    pub fn register<C: Capability + 'static>(&self, capability: C) -> Result<(), RegistryError> {
        let domain = capability.domain();
        if !is_valid_domain_name(domain) {
            return Err(RegistryError::InvalidDomainName {
                name: domain.to_string(),
            });
        }
        if self
            .by_domain
            .insert(domain.to_string(), Arc::new(capability))
            .is_none()
        {
            self.init_order.write().push(domain.to_string());
        }
        Ok(())
    }

    /// Retrieve the capability registered for `domain`.
    #[must_use]
    pub fn lookup(&self, domain: &str) -> Option<Arc<dyn Capability>> {
        self.by_domain.get(domain).map(|entry| entry.value().clone())
    }

    /// Initialize all registered capabilities in registration order.
    ///
    /// # Errors
    ///
    /// Returns the first capability `init()` failure.
    pub async fn init_all(&self, ctx: &CapabilityContext) -> anyhow::Result<()> {
        let order = self.init_order.read().clone();
        for domain in &order {
            if let Some(capability) = self.lookup(domain) {
                tracing::debug!(domain = %domain, "initializing capability");
                capability.init(ctx).await?;
            }
        }
        Ok(())
    }

    /// Number of registered capabilities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_domain.len()
    }

    /// `true` when nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_domain.is_empty()
    }
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors from registering a capability.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("invalid capability domain name: {name:?}")]
    InvalidDomainName { name: String },
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
