//! Redis client implementation
//!
//! A multiplexed Redis connection with connect and command retry, exposing
//! the commands the revocation store is built from: insert-if-absent with
//! expiry, expiry extension, counters and pattern counts.

use redis::{aio::MultiplexedConnection, Client, Cmd, FromRedisValue, RedisError, RedisResult};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::cache::CacheConfig;
use crate::InfrastructureError;

/// Upper bound for the exponential backoff between attempts
const MAX_BACKOFF_MS: u64 = 5000;

/// Keys requested per SCAN round trip
const SCAN_BATCH: usize = 500;

type RedisFuture<T> = Pin<Box<dyn Future<Output = RedisResult<T>> + Send>>;

/// Redis client with connection retry logic
///
/// Cloning is cheap: clones share the multiplexed connection.
#[derive(Clone)]
pub struct RedisClient {
    connection: MultiplexedConnection,
    config: CacheConfig,
    max_retries: u32,
    retry_delay_ms: u64,
}

impl RedisClient {
    /// Connect using the retry settings from `config`
    ///
    /// # Example
    /// ```no_run
    /// use jobswipe_infra::cache::{CacheConfig, RedisClient};
    ///
    /// async fn create_client() -> Result<RedisClient, Box<dyn std::error::Error>> {
    ///     let config = CacheConfig::new("redis://localhost:6379").with_prefix("jobswipe");
    ///     let client = RedisClient::new(config).await?;
    ///     Ok(client)
    /// }
    /// ```
    pub async fn new(config: CacheConfig) -> Result<Self, InfrastructureError> {
        let max_retries = config.max_retries;
        let retry_delay_ms = config.retry_delay_ms;
        Self::new_with_retry_config(config, max_retries, retry_delay_ms).await
    }

    /// Connect with explicit retry settings
    ///
    /// # Arguments
    /// * `config` - Cache configuration settings
    /// * `max_retries` - Attempts allowed for connecting and for each command (at least one)
    /// * `retry_delay_ms` - Delay before the second attempt, doubled after each failure
    pub async fn new_with_retry_config(
        config: CacheConfig,
        max_retries: u32,
        retry_delay_ms: u64,
    ) -> Result<Self, InfrastructureError> {
        let max_retries = max_retries.max(1);
        info!(url = %mask_url(&config.url), max_retries, "Creating Redis client");

        let client = Client::open(config.url.as_str()).map_err(|e| {
            error!(error = %e, "Failed to parse Redis URL");
            InfrastructureError::Config(format!("Invalid Redis URL: {}", e))
        })?;

        let mut delay = retry_delay_ms;
        let mut attempt = 1;
        let connection = loop {
            match client.get_multiplexed_async_connection().await {
                Ok(connection) => break connection,
                Err(e) if attempt < max_retries => {
                    warn!(attempt, max_retries, delay_ms = delay, error = %e, "Redis connect failed, retrying");
                    sleep(Duration::from_millis(delay)).await;
                    delay = next_delay(delay);
                    attempt += 1;
                }
                Err(e) => {
                    error!(attempts = attempt, error = %e, "Giving up connecting to Redis");
                    return Err(InfrastructureError::Cache(e));
                }
            }
        };

        info!("Connected to Redis");
        Ok(Self {
            connection,
            config,
            max_retries,
            retry_delay_ms,
        })
    }

    /// Configuration used to create this client
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Apply the configured key prefix
    pub fn key(&self, key: &str) -> String {
        self.config.make_key(key)
    }

    /// SET NX EX: write `value` only if `key` does not exist
    ///
    /// # Returns
    /// * `Ok(true)` - The key was written by this call
    /// * `Ok(false)` - The key already existed and was left untouched
    pub async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        expiry_seconds: u64,
    ) -> Result<bool, InfrastructureError> {
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value).arg("NX").arg("EX").arg(expiry_seconds);

        let reply: Option<String> = self.query(cmd, "SET NX", key).await?;
        Ok(reply.is_some())
    }

    /// EXPIRE GT: move the expiry to `expiry_seconds` from now, but only
    /// later than it already is (Redis 7+)
    ///
    /// # Returns
    /// * `Result<bool, InfrastructureError>` - True if the expiry changed
    pub async fn extend_expiry(
        &self,
        key: &str,
        expiry_seconds: u64,
    ) -> Result<bool, InfrastructureError> {
        let mut cmd = redis::cmd("EXPIRE");
        cmd.arg(key).arg(expiry_seconds).arg("GT");
        self.query(cmd, "EXPIRE GT", key).await
    }

    pub async fn exists(&self, key: &str) -> Result<bool, InfrastructureError> {
        self.query(redis::Cmd::exists(key), "EXISTS", key).await
    }

    /// INCR a counter; with `expiry_seconds` its TTL is reset in the same
    /// transaction
    ///
    /// # Returns
    /// * `Result<i64, InfrastructureError>` - New counter value
    pub async fn increment(
        &self,
        key: &str,
        expiry_seconds: Option<u64>,
    ) -> Result<i64, InfrastructureError> {
        let mut pipe = redis::pipe();
        pipe.atomic().incr(key, 1);
        if let Some(ttl) = expiry_seconds {
            pipe.expire(key, ttl as i64).ignore();
        }

        let result = self
            .execute_with_retry(|mut conn| {
                let pipe = pipe.clone();
                Box::pin(async move { pipe.query_async::<_, (i64,)>(&mut conn).await })
            })
            .await;

        match result {
            Ok((count,)) => {
                debug!(key, count, "Counter incremented");
                Ok(count)
            }
            Err(e) => {
                error!(key, error = %e, "Redis INCR failed");
                Err(InfrastructureError::Cache(e))
            }
        }
    }

    /// Read a counter, zero if the key does not exist
    pub async fn get_counter(&self, key: &str) -> Result<i64, InfrastructureError> {
        let value: Option<i64> = self.query(redis::Cmd::get(key), "GET", key).await?;
        Ok(value.unwrap_or(0))
    }

    /// Remaining time to live in seconds
    ///
    /// `None` if the key does not exist or never expires.
    pub async fn ttl(&self, key: &str) -> Result<Option<i64>, InfrastructureError> {
        let ttl: i64 = self.query(redis::Cmd::ttl(key), "TTL", key).await?;
        Ok((ttl >= 0).then_some(ttl))
    }

    /// Returns whether a key was removed
    pub async fn delete(&self, key: &str) -> Result<bool, InfrastructureError> {
        let removed: u32 = self.query(redis::Cmd::del(key), "DEL", key).await?;
        Ok(removed > 0)
    }

    /// Count keys matching a glob pattern
    ///
    /// Walks the keyspace with SCAN rather than KEYS so the server is never
    /// blocked. Keys written or expiring during the walk may or may not be
    /// counted.
    pub async fn count_keys(&self, pattern: &str) -> Result<usize, InfrastructureError> {
        let mut cursor: u64 = 0;
        let mut total = 0usize;

        loop {
            let mut cmd = redis::cmd("SCAN");
            cmd.arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH);

            let (next, keys): (u64, Vec<String>) = self.query(cmd, "SCAN", pattern).await?;
            total += keys.len();
            if next == 0 {
                break;
            }
            cursor = next;
        }

        debug!(pattern, total, "Counted keys");
        Ok(total)
    }

    /// PING the server
    pub async fn health_check(&self) -> Result<bool, InfrastructureError> {
        let reply: String = self.query(redis::cmd("PING"), "PING", "").await?;
        if reply != "PONG" {
            warn!(reply = %reply, "Unexpected PING reply");
        }
        Ok(reply == "PONG")
    }

    /// Run one command with retry, logging and error conversion
    async fn query<T>(&self, cmd: Cmd, op: &'static str, key: &str) -> Result<T, InfrastructureError>
    where
        T: FromRedisValue + Send + 'static,
    {
        let result = self
            .execute_with_retry(|mut conn| {
                let cmd = cmd.clone();
                Box::pin(async move { cmd.query_async::<_, T>(&mut conn).await })
            })
            .await;

        match result {
            Ok(value) => {
                debug!(op, key, "Redis command succeeded");
                Ok(value)
            }
            Err(e) => {
                error!(op, key, error = %e, "Redis command failed");
                Err(InfrastructureError::Cache(e))
            }
        }
    }

    /// Retry transient failures with exponential backoff
    async fn execute_with_retry<F, T>(&self, operation: F) -> RedisResult<T>
    where
        F: Fn(MultiplexedConnection) -> RedisFuture<T>,
    {
        let mut delay = self.retry_delay_ms;
        let mut attempt = 1;

        loop {
            match operation(self.connection.clone()).await {
                Err(e) if attempt < self.max_retries && is_retriable_error(&e) => {
                    warn!(
                        attempt,
                        max_retries = self.max_retries,
                        delay_ms = delay,
                        error = %e,
                        "Redis command failed, retrying"
                    );
                    sleep(Duration::from_millis(delay)).await;
                    delay = next_delay(delay);
                    attempt += 1;
                }
                outcome => return outcome,
            }
        }
    }
}

fn next_delay(delay: u64) -> u64 {
    delay.saturating_mul(2).min(MAX_BACKOFF_MS)
}

/// Whether an error is transient and the command worth retrying
pub(crate) fn is_retriable_error(error: &RedisError) -> bool {
    matches!(
        error.kind(),
        redis::ErrorKind::IoError
            | redis::ErrorKind::ClientError
            | redis::ErrorKind::BusyLoadingError
            | redis::ErrorKind::TryAgain
    )
}

/// Hide credentials in a Redis URL before logging it
pub(crate) fn mask_url(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(proto_end), Some(at_pos)) if at_pos > proto_end => {
            format!("{}****{}", &url[..proto_end + 3], &url[at_pos..])
        }
        _ => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_is_capped() {
        assert_eq!(next_delay(100), 200);
        assert_eq!(next_delay(4000), MAX_BACKOFF_MS);
        assert_eq!(next_delay(u64::MAX), MAX_BACKOFF_MS);
    }
}
