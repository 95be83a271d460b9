//! SweepExpiredMembershipsHandler - Downgrades stale premium profiles.
//!
//! A sweep pass walks every premium profile whose expiry is strictly before
//! `now` and returns it to the free tier. The pass is stateless: a second
//! pass at the same instant finds nothing, because the first one cleared the
//! expiry it selects on.
//!
//! # Concurrency
//!
//! Each downgrade is a compare-and-swap on the version read with the
//! candidate. Losing that race means a purchase or another sweep touched the
//! profile; it is re-read and only downgraded if it is still stale.
//!
//! # Partial failure
//!
//! A failed downgrade is recorded in the report and the pass continues. Only
//! a failure to fetch candidates aborts the pass.

use std::sync::Arc;

use futures::stream::{self, Stream, StreamExt, TryStreamExt};
use serde::Serialize;
use tracing::{info, warn};

use crate::domain::foundation::{DomainError, ErrorCode, Timestamp, UserId};
use crate::domain::membership::{EntitlementError, Profile, StoreStep};
use crate::ports::{Clock, ProfileRepository};

/// Candidates fetched per store round trip.
pub const DEFAULT_SWEEP_PAGE_SIZE: u32 = 100;

/// Lazily pages through premium profiles whose expiry is before `now`.
///
/// The sequence is finite and restartable: each page is fetched only when
/// the previous one has been consumed, keyed on the last user id seen.
pub fn expired_premium_profiles(
    profiles: Arc<dyn ProfileRepository>,
    now: Timestamp,
    page_size: u32,
) -> impl Stream<Item = Result<Profile, DomainError>> + Send {
    let page_size = page_size.max(1);

    // `None` once the last page has been read.
    let start: Option<Option<UserId>> = Some(None);

    stream::try_unfold(start, move |cursor| {
        let profiles = profiles.clone();
        async move {
            let Some(after) = cursor else {
                return Ok(None);
            };
            let page = profiles
                .find_expired_premium(&now, after.as_ref(), page_size)
                .await?;
            let next = if page.len() < page_size as usize {
                None
            } else {
                page.last().map(|profile| Some(profile.user_id.clone()))
            };
            Ok::<_, DomainError>(Some((page, next)))
        }
    })
    .map_ok(|page| stream::iter(page.into_iter().map(Ok)))
    .try_flatten()
}

/// One profile the pass could not downgrade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepFailure {
    pub user_id: UserId,
    pub error: String,
}

/// Outcome of a sweep pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Profiles downgraded by this pass.
    pub expired_count: usize,

    pub downgraded_user_ids: Vec<UserId>,

    /// Profiles that stayed stale because their downgrade failed.
    pub failed_count: usize,

    pub failures: Vec<SweepFailure>,

    /// Candidates that were no longer stale when the downgrade ran.
    pub skipped_count: usize,
}

impl SweepReport {
    /// True when every candidate was either downgraded or skipped.
    pub fn is_complete(&self) -> bool {
        self.failed_count == 0
    }
}

enum DowngradeOutcome {
    Downgraded,
    Skipped,
}

/// Handler for sweep passes (the expiry sweeper).
pub struct SweepExpiredMembershipsHandler {
    profiles: Arc<dyn ProfileRepository>,
    clock: Arc<dyn Clock>,
    page_size: u32,
}

impl SweepExpiredMembershipsHandler {
    pub fn new(profiles: Arc<dyn ProfileRepository>, clock: Arc<dyn Clock>) -> Self {
        Self {
            profiles,
            clock,
            page_size: DEFAULT_SWEEP_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Runs one pass at the clock's current instant.
    pub async fn handle(&self) -> Result<SweepReport, EntitlementError> {
        self.sweep(self.clock.now()).await
    }

    /// Runs one pass, downgrading profiles whose expiry is before `now`.
    pub async fn sweep(&self, now: Timestamp) -> Result<SweepReport, EntitlementError> {
        let mut report = SweepReport::default();
        let mut candidates = Box::pin(expired_premium_profiles(
            self.profiles.clone(),
            now,
            self.page_size,
        ));

        while let Some(candidate) = candidates.next().await {
            let profile = candidate.map_err(|e| {
                warn!(error = %e, "Failed to fetch expired memberships");
                EntitlementError::store(StoreStep::FetchExpired, None, e)
            })?;
            let user_id = profile.user_id.clone();

            match self.downgrade(profile, &now).await {
                Ok(DowngradeOutcome::Downgraded) => {
                    report.expired_count += 1;
                    report.downgraded_user_ids.push(user_id);
                }
                Ok(DowngradeOutcome::Skipped) => {
                    report.skipped_count += 1;
                }
                Err(e) => {
                    warn!(
                        user_id = %user_id,
                        step = %StoreStep::Downgrade,
                        error = %e,
                        "Failed to downgrade expired membership"
                    );
                    report.failed_count += 1;
                    report.failures.push(SweepFailure {
                        user_id,
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            now = %now,
            expired = report.expired_count,
            failed = report.failed_count,
            skipped = report.skipped_count,
            "Membership sweep finished"
        );
        Ok(report)
    }

    async fn downgrade(
        &self,
        profile: Profile,
        now: &Timestamp,
    ) -> Result<DowngradeOutcome, DomainError> {
        let user_id = profile.user_id.clone();

        match self
            .profiles
            .update(&user_id, profile.version, Profile::downgrade())
            .await
        {
            Ok(_) => Ok(DowngradeOutcome::Downgraded),
            Err(e) if e.code == ErrorCode::ProfileNotFound => Ok(DowngradeOutcome::Skipped),
            Err(e) if e.is_conflict() => {
                let current = match self.profiles.find_by_user_id(&user_id).await? {
                    Some(current) if current.is_sweepable(now) => current,
                    _ => return Ok(DowngradeOutcome::Skipped),
                };
                self.profiles
                    .update(&user_id, current.version, Profile::downgrade())
                    .await?;
                Ok(DowngradeOutcome::Downgraded)
            }
            Err(e) => Err(e),
        }
    }
}
