//! Infrastructure layer - External adapters and startup wiring
//!
//! This layer contains:
//! - Config: Layered application configuration
//! - Settings: Plain/secure settings resolution
//! - Queues: Redis and MongoDB queue backends
//! - Storage: Blob and queue storage clients
//! - Registry: Process-wide service registry
//! - Startup: Resolution of configuration into the registry

pub mod config;
pub mod queues;
pub mod registry;
pub mod settings;
pub mod startup;
pub mod storage;
