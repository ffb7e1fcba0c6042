//! FibonatixQueue - Message queue gateway backed by Redis or MongoDB
//!
//! At startup the gateway:
//! - Resolves backing-store settings, plain or with a protected credential
//! - Creates the queue backend named by configuration
//! - Builds blob and queue storage clients
//! - Publishes one instance of each through the service registry

pub mod application;
pub mod domain;
pub mod infrastructure;
