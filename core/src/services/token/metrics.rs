//! Token service counters and health evaluation
//!
//! Counters are independent and only grow, so all atomics use
//! `Ordering::Relaxed`; a snapshot may be off by an in-flight increment.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;

/// Error rate above which the service reports `degraded`
pub const DEGRADED_ERROR_RATE: f64 = 0.10;

/// Key count below which the service reports `degraded`
pub const MIN_HEALTHY_KEYS: usize = 2;

/// Process-wide token counters
#[derive(Debug, Default)]
pub struct TokenMetrics {
    tokens_issued: AtomicU64,
    tokens_verified: AtomicU64,
    tokens_revoked: AtomicU64,
    key_rotations: AtomicU64,
    errors: AtomicU64,
    /// Unix millis of the last rotation, 0 when none happened
    last_key_rotation_ms: AtomicI64,
}

impl TokenMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_issued(&self) {
        self.tokens_issued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_verified(&self) {
        self.tokens_verified.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_revoked(&self) {
        self.tokens_revoked.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rotation(&self, at: DateTime<Utc>) {
        self.key_rotations.fetch_add(1, Ordering::Relaxed);
        self.last_key_rotation_ms
            .store(at.timestamp_millis(), Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let last_ms = self.last_key_rotation_ms.load(Ordering::Relaxed);
        MetricsSnapshot {
            tokens_issued: self.tokens_issued.load(Ordering::Relaxed),
            tokens_verified: self.tokens_verified.load(Ordering::Relaxed),
            tokens_revoked: self.tokens_revoked.load(Ordering::Relaxed),
            key_rotations: self.key_rotations.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            last_key_rotation: if last_ms == 0 {
                None
            } else {
                Utc.timestamp_millis_opt(last_ms).single()
            },
        }
    }
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub tokens_issued: u64,
    pub tokens_verified: u64,
    pub tokens_revoked: u64,
    pub key_rotations: u64,
    pub errors: u64,
    pub last_key_rotation: Option<DateTime<Utc>>,
}

impl MetricsSnapshot {
    /// `errors / (issued + verified + errors)`, 0 with no operations
    pub fn error_rate(&self) -> f64 {
        let total = self.tokens_issued + self.tokens_verified + self.errors;
        if total == 0 {
            0.0
        } else {
            self.errors as f64 / total as f64
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthDetails {
    pub current_key_id: Option<String>,
    pub active_keys: usize,
    pub revoked_tokens: Option<usize>,
    pub error_rate: f64,
    pub metrics: MetricsSnapshot,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthStatus {
    pub status: HealthState,
    pub details: HealthDetails,
}

impl HealthStatus {
    pub fn evaluate(
        metrics: MetricsSnapshot,
        current_key_id: Option<String>,
        active_keys: usize,
        revoked_tokens: Option<usize>,
    ) -> Self {
        let error_rate = metrics.error_rate();
        let status = if current_key_id.is_none() || active_keys == 0 {
            HealthState::Unhealthy
        } else if error_rate > DEGRADED_ERROR_RATE || active_keys < MIN_HEALTHY_KEYS {
            HealthState::Degraded
        } else {
            HealthState::Healthy
        };

        Self {
            status,
            details: HealthDetails {
                current_key_id,
                active_keys,
                revoked_tokens,
                error_rate,
                metrics,
            },
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == HealthState::Healthy
    }
}
