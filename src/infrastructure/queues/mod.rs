//! Queue implementations - Infrastructure adapters for the queue port

mod factory;
mod mongo_queue;
mod redis_queue;

pub use factory::{QueueBackend, QueueFactory};
pub use mongo_queue::MongoQueue;
pub use redis_queue::RedisQueue;
