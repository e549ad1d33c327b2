//! Redis-backed job queue shared between webhook and queue-monitor processes.
//!
//! Messages live in a hash per message; a ready list holds visible ids in
//! arrival order and a sorted set holds received ids scored by the instant
//! they become visible again. Every state change runs as one Lua script.
mod keys;
pub use keys::QueueKeys;

mod scripts;

mod queue;
pub use queue::{DEFAULT_QUEUE_NAME, RedisQueue, RedisQueueConfig};
