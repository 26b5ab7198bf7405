//! Cache module for Redis-based storage
//!
//! Provides the Redis client used by the shared revocation store,
//! with connection retry and the handful of commands the store needs.

pub mod redis_client;


pub use redis_client::RedisClient;

pub use jobswipe_shared::config::cache::CacheConfig;
