//! Shared revocation store backed by Redis

pub mod redis_store;


pub use redis_store::RedisRevocationStore;
