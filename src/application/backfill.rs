//! BackfillJob - periodic sweep for slots that elapsed without action.
//!
//! Two independent, individually idempotent steps:
//! 1. Expand every active group's schedule over a trailing window and
//!    bulk-insert the occurrences that never got a row as `Missed`,
//!    relying on insert-ignore semantics so concurrent check-ins always
//!    win the race.
//! 2. Force stale `Scheduled` rows (start older than the grace cutoff)
//!    to `Missed`.
//!
//! A single group's expansion failure is logged and skipped; the sweep
//! carries on. Re-running over an overlapping window changes nothing.
//!
//! ## Configuration
//!
//! | Setting | Default | Description |
//! |---------|---------|-------------|
//! | `poll_interval` | 300s | How often to sweep |
//! | `lookback_hours` | 48 | How far back step 1 expands |
//! | `min_age_minutes` | 60 | Slots younger than this are left alone |
//! | `grace_minutes` | 60 | Step 2 cutoff for stale `Scheduled` rows |
//!
//! ## Graceful Shutdown
//!
//! The loop listens on a watch channel and exits between sweeps; a sweep
//! interrupted by a crash simply redoes (idempotent) work on the next
//! tick.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time;

use crate::domain::foundation::{DomainError, ErrorCode, EventEnvelope, EventId, SessionId, Timestamp};
use crate::domain::scheduling::{
    recurrence, GroupWithClass, Session, SessionStatus, SessionUpdated, SessionsBulkCreated,
    SlotKey, TimeWindow,
};
use crate::ports::{EventPublisher, GroupCatalog, SessionsStore};

/// Configuration for the BackfillJob.
#[derive(Debug, Clone)]
pub struct BackfillJobConfig {
    /// How often to run a sweep.
    pub poll_interval: Duration,

    /// Step 1 trailing window length.
    pub lookback_hours: i64,

    /// Step 1 leaves the most recent slots alone so that a check-in
    /// arriving slightly late still wins.
    pub min_age_minutes: i64,

    /// Step 2: `Scheduled` rows older than this are forced to `Missed`.
    pub grace_minutes: i64,
}

impl Default for BackfillJobConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(300),
            lookback_hours: 48,
            min_age_minutes: 60,
            grace_minutes: 60,
        }
    }
}

/// What one sweep did, for logging and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Rows inserted as `Missed` by step 1.
    pub missed_inserted: u64,
    /// Stale `Scheduled` rows forced to `Missed` by step 2.
    pub stale_marked: u64,
    /// Groups whose expansion failed and was skipped.
    pub groups_failed: u64,
}

/// Periodic job materializing elapsed untouched slots as `Missed`.
pub struct BackfillJob {
    store: Arc<dyn SessionsStore>,
    catalog: Arc<dyn GroupCatalog>,
    event_publisher: Arc<dyn EventPublisher>,
    config: BackfillJobConfig,
}

impl BackfillJob {
    /// Creates a job with default configuration.
    pub fn new(
        store: Arc<dyn SessionsStore>,
        catalog: Arc<dyn GroupCatalog>,
        event_publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self::with_config(store, catalog, event_publisher, BackfillJobConfig::default())
    }

    /// Creates a job with custom configuration.
    pub fn with_config(
        store: Arc<dyn SessionsStore>,
        catalog: Arc<dyn GroupCatalog>,
        event_publisher: Arc<dyn EventPublisher>,
        config: BackfillJobConfig,
    ) -> Self {
        Self {
            store,
            catalog,
            event_publisher,
            config,
        }
    }

    /// Run the sweep loop until the shutdown signal flips.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = time::interval(self.config.poll_interval);

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        tracing::info!("backfill job shutting down");
                        return;
                    }
                }

                _ = interval.tick() => {
                    match self.sweep_once(Timestamp::now()).await {
                        Ok(report) => {
                            if report != SweepReport::default() {
                                tracing::info!(
                                    missed_inserted = report.missed_inserted,
                                    stale_marked = report.stale_marked,
                                    groups_failed = report.groups_failed,
                                    "backfill sweep completed"
                                );
                            }
                        }
                        // A failed sweep is not fatal; the next tick
                        // simply runs it again.
                        Err(e) => {
                            tracing::error!(error = %e, "backfill sweep failed");
                        }
                    }
                }
            }
        }
    }

    /// Run both steps once against the given notion of "now".
    ///
    /// # Errors
    ///
    /// Propagates catalog/store failures that abort the whole sweep;
    /// per-group failures are counted in the report instead.
    pub async fn sweep_once(
        &self,
        now: Timestamp,
    ) -> Result<SweepReport, DomainError> {
        let mut report = SweepReport::default();

        // Step 1: materialize elapsed untouched slots as Missed.
        let window_start = now.minus_hours(self.config.lookback_hours);
        let window_end = now.minus_minutes(self.config.min_age_minutes);
        if let Ok(window) = TimeWindow::new(window_start, window_end) {
            let groups = self.catalog.active_groups().await?;
            for group in groups {
                match self.backfill_group(&group, window).await {
                    Ok(inserted) => report.missed_inserted += inserted,
                    Err(e) => {
                        report.groups_failed += 1;
                        tracing::warn!(
                            group_id = %group.group_id,
                            error = %e,
                            "skipping group in backfill sweep"
                        );
                    }
                }
            }
        }

        // Step 2: stale Scheduled rows move to Missed.
        report.stale_marked = self
            .mark_stale_missed(now.minus_minutes(self.config.grace_minutes))
            .await?;

        Ok(report)
    }

    async fn backfill_group(
        &self,
        group: &GroupWithClass,
        window: TimeWindow,
    ) -> Result<u64, DomainError> {
        let occurrences = recurrence::expand_group(group, &window);
        if occurrences.is_empty() {
            return Ok(0);
        }

        let existing = self
            .store
            .find_in_window(&[group.group_id], window)
            .await?;
        let occupied: std::collections::HashSet<SlotKey> =
            existing.iter().map(|s| s.slot_key()).collect();

        let mut missed: Vec<Session> = Vec::new();
        for occurrence in occurrences.iter().filter(|v| !occupied.contains(&v.slot_key())) {
            let session = Session::materialize(SessionId::new(), occurrence, SessionStatus::Missed)
                .map_err(|e| DomainError::new(ErrorCode::InternalError, e.to_string()))?;
            missed.push(session);
        }
        if missed.is_empty() {
            return Ok(0);
        }

        let inserted = self.store.bulk_insert_missed(&missed).await?;
        if inserted > 0 {
            let event = SessionsBulkCreated {
                event_id: EventId::new(),
                group_id: group.group_id,
                inserted,
                status: SessionStatus::Missed,
                occurred_at: Timestamp::now(),
            };
            if let Err(e) = self
                .event_publisher
                .publish(EventEnvelope::from_event(&event))
                .await
            {
                tracing::warn!(group_id = %group.group_id, error = %e, "failed to publish session.bulk_created");
            }
        }
        Ok(inserted)
    }

    async fn mark_stale_missed(
        &self,
        cutoff: Timestamp,
    ) -> Result<u64, DomainError> {
        let stale = self.store.find_stale_scheduled(cutoff).await?;
        let mut marked = 0;
        for mut session in stale {
            // Only Scheduled rows are returned, so the transition cannot
            // fail; a row raced into another state between the read and
            // here is skipped.
            let Ok(Some(from)) = session.mark_missed() else {
                continue;
            };
            self.store.update(&session).await?;
            marked += 1;

            let event = SessionUpdated {
                event_id: EventId::new(),
                session_id: session.id(),
                group_id: session.group_id(),
                from_status: from,
                to_status: session.status(),
                occurred_at: Timestamp::now(),
            };
            if let Err(e) = self
                .event_publisher
                .publish(EventEnvelope::from_event(&event))
                .await
            {
                tracing::warn!(session_id = %session.id(), error = %e, "failed to publish session.updated");
            }
        }
        Ok(marked)
    }
}
