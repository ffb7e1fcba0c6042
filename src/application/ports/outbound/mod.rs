//! Outbound ports - Interfaces that the application requires from external systems

mod queue_port;

pub use queue_port::{QueueError, QueuePort};
