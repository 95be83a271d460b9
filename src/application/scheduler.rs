//! SweepScheduler - In-process interval runner for the expiry sweeper.
//!
//! Optional: deployments with an external cron keep calling the HTTP trigger
//! instead. Passes are stateless, so running both is safe.
//!
//! ## Configuration
//!
//! | Setting | Default | Description |
//! |---------|---------|-------------|
//! | `interval` | 24h | Time between sweep passes |
//!
//! ## Graceful Shutdown
//!
//! The loop exits when the shutdown channel flips to `true` (or its sender is
//! dropped). A pass in progress is finished first.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};
use tracing::{error, info};

use super::handlers::membership::{SweepExpiredMembershipsHandler, SweepReport};

/// Default time between passes.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Runs sweep passes on a fixed interval.
pub struct SweepScheduler {
    sweeper: Arc<SweepExpiredMembershipsHandler>,
    interval: Duration,
}

impl SweepScheduler {
    pub fn new(sweeper: Arc<SweepExpiredMembershipsHandler>) -> Self {
        Self {
            sweeper,
            interval: DEFAULT_SWEEP_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Run passes until shutdown is signalled. The first pass starts
    /// immediately.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval_secs = self.interval.as_secs(), "Sweep scheduler started");

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Sweep scheduler stopped");
                        return;
                    }
                }

                _ = interval.tick() => {
                    self.run_once().await;
                }
            }
        }
    }

    /// Run exactly one pass, logging instead of propagating a fetch failure.
    pub async fn run_once(&self) -> Option<SweepReport> {
        match self.sweeper.handle().await {
            Ok(report) => Some(report),
            Err(e) => {
                error!(error = %e, "Scheduled membership sweep failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::clock::FixedClock;
    use crate::adapters::memory::InMemoryProfileRepository;
    use crate::domain::foundation::{Timestamp, UserId};
    use crate::domain::membership::{MembershipType, Profile};
    use crate::ports::ProfileRepository;

    fn ts(s: &str) -> Timestamp {
        Timestamp::parse_rfc3339(s).unwrap()
    }

    async fn repo_with_stale_profile() -> InMemoryProfileRepository {
        let repo = InMemoryProfileRepository::new();
        let mut profile = Profile::new_free(UserId::new("alice").unwrap(), ts("2023-12-01T00:00:00Z"));
        profile.membership_type = MembershipType::Premium;
        profile.membership_expires_at = Some(ts("2024-01-01T00:00:00Z"));
        repo.seed(profile).await;
        repo
    }

    fn scheduler(repo: &InMemoryProfileRepository) -> SweepScheduler {
        let sweeper = SweepExpiredMembershipsHandler::new(
            Arc::new(repo.clone()),
            Arc::new(FixedClock::new(ts("2024-02-01T00:00:00Z"))),
        );
        SweepScheduler::new(Arc::new(sweeper)).with_interval(Duration::from_millis(10))
    }

    #[tokio::test]
    async fn run_once_returns_report() {
        let repo = repo_with_stale_profile().await;

        let report = scheduler(&repo).run_once().await.unwrap();

        assert_eq!(report.expired_count, 1);
    }

    #[tokio::test]
    async fn run_sweeps_then_stops_on_shutdown_signal() {
        let repo = repo_with_stale_profile().await;
        let scheduler = scheduler(&repo);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(async move { scheduler.run(shutdown_rx).await });
        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();

        let profile = repo
            .find_by_user_id(&UserId::new("alice").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(profile.membership_type, MembershipType::Free);
    }

    #[tokio::test]
    async fn run_stops_when_sender_is_dropped() {
        let repo = InMemoryProfileRepository::new();
        let scheduler = scheduler(&repo);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(async move { scheduler.run(shutdown_rx).await });
        drop(shutdown_tx);

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
