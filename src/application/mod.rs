//! Application layer - Ports the request-handling layer consumes

pub mod ports;
