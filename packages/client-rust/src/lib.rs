//! Capstan Client — capability registry, dispatch pipeline, and tiered storage.

pub mod capability;
pub mod config;
pub mod dispatcher;
pub mod executor;
pub mod registry;
pub mod storage;
pub mod stubs;

pub use capability::{domains, Capability, CapabilityContext, CapabilityError};
pub use config::{ClientConfig, DispatchConfig, RemoteConfig, StorageConfig};
pub use dispatcher::Dispatcher;
pub use registry::{CapabilityRegistry, RegistryError};
pub use storage::{
    HttpRemoteStore, LocalStore, MemoryRemoteStore, MemoryStore, RedbStore, RemoteStore,
    StorageCapability,
};
pub use stubs::{ComputeCapability, RealtimeCapability};

// Re-exported so callers need only one crate for the common path.
pub use capstan_core::{codes, CallOptions, Response};
