//! Domain layer - Core types with no I/O
//!
//! This layer contains:
//! - Value Objects: settings shapes, backend selector, queue messages

pub mod value_objects;
