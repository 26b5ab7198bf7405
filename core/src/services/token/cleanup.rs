//! Background maintenance: periodic key rotation and revocation cleanup
//!
//! Both loops hold only a weak reference to the service and stop on their
//! own once the service is dropped. A failed tick is logged and counted by
//! the service; the loop keeps running.

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::errors::DomainResult;
use crate::repositories::RevocationStore;

use super::config::TokenServiceConfig;
use super::service::TokenService;

/// Result of a revocation cleanup pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupResult {
    /// Number of expired revocation entries removed
    pub expired_entries_removed: usize,
    /// Number of revocation entries still held
    pub remaining_entries: usize,
    /// Whether the remaining set is above the configured soft limit
    pub over_soft_limit: bool,
}

/// Handle to the background maintenance tasks
///
/// Dropping the handle detaches the tasks; they still end when the
/// service is dropped.
#[derive(Debug)]
pub struct MaintenanceHandle {
    rotation: JoinHandle<()>,
    cleanup: JoinHandle<()>,
}

impl MaintenanceHandle {
    /// Stop both loops
    pub fn shutdown(self) {
        self.rotation.abort();
        self.cleanup.abort();
        info!("Token maintenance stopped");
    }

    pub fn is_running(&self) -> bool {
        !self.rotation.is_finished() || !self.cleanup.is_finished()
    }
}

impl<S: RevocationStore + 'static> TokenService<S> {
    /// Creates the service and starts key rotation and revocation cleanup
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(
        config: TokenServiceConfig,
        store: S,
    ) -> DomainResult<(Arc<Self>, MaintenanceHandle)> {
        let service = Arc::new(Self::new(config, store)?);
        let handle = spawn_maintenance(&service);
        Ok((service, handle))
    }
}

/// Spawn the rotation and cleanup loops for an existing service
pub fn spawn_maintenance<S: RevocationStore + 'static>(
    service: &Arc<TokenService<S>>,
) -> MaintenanceHandle {
    let rotation_every = service.config().key_rotation_interval;
    let cleanup_every = service.config().cleanup_interval;

    info!(
        rotation_interval_secs = rotation_every.as_secs(),
        cleanup_interval_secs = cleanup_every.as_secs(),
        "Token maintenance started"
    );

    MaintenanceHandle {
        rotation: spawn_rotation_loop(Arc::downgrade(service), rotation_every),
        cleanup: spawn_cleanup_loop(Arc::downgrade(service), cleanup_every),
    }
}

/// Shortest loop period; tokio intervals reject a zero period
const MIN_PERIOD: Duration = Duration::from_secs(1);

fn ticker(period: Duration) -> tokio::time::Interval {
    let period = period.max(MIN_PERIOD);
    // first tick one period from now; the initial key already exists
    let mut timer = interval_at(Instant::now() + period, period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    timer
}

fn spawn_rotation_loop<S: RevocationStore + 'static>(
    service: Weak<TokenService<S>>,
    period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = ticker(period);
        loop {
            timer.tick().await;

            let Some(service) = service.upgrade() else {
                debug!("Token service dropped, stopping key rotation loop");
                break;
            };

            if let Err(e) = service.rotate_keys() {
                warn!(error = %e, "Scheduled key rotation failed, retrying next tick");
            }
        }
    })
}

fn spawn_cleanup_loop<S: RevocationStore + 'static>(
    service: Weak<TokenService<S>>,
    period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = ticker(period);
        loop {
            timer.tick().await;

            let Some(service) = service.upgrade() else {
                debug!("Token service dropped, stopping revocation cleanup loop");
                break;
            };

            if let Err(e) = service.cleanup_revoked_tokens().await {
                warn!(error = %e, "Scheduled revocation cleanup failed, retrying next tick");
            }
        }
    })
}
