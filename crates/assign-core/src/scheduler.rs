//! Pass-based scheduler (component C9).
//!
//! A single process drives ticks; each tick dispatches ready pool entries
//! through a bounded worker pool (a `tokio::sync::Semaphore`-gated task set,
//! mirroring the bounded-concurrency session-pool pattern used elsewhere in
//! this codebase) so at most a handful of bookings are committed at once.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{info, warn};

use crate::coordinator::{AssignOutcome, RunCoordinator};
use crate::error::Result;
use crate::lock::NamedLock;
use crate::model::{AutoAssignStatus, Booking, BookingStatus};
use crate::policy::PolicyStore;
use crate::pool::Pool;
use crate::storage::Store;

#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    pub max_concurrent: usize,
    pub horizon_days: i64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 4,
            horizon_days: 90,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassKind {
    Tick,
    Manual,
}

#[derive(Debug, Default)]
pub struct PassReport {
    pub dispatched: usize,
    pub assigned: usize,
    pub escalated: usize,
    pub skipped: usize,
    pub failed: usize,
}

pub struct Scheduler<S: Store, P: PolicyStore, L: NamedLock> {
    store: Arc<S>,
    coordinator: Arc<RunCoordinator<S, P, L>>,
    config: SchedulerConfig,
}

impl<S: Store + 'static, P: PolicyStore + 'static, L: NamedLock + 'static> Scheduler<S, P, L> {
    pub fn new(store: Arc<S>, coordinator: Arc<RunCoordinator<S, P, L>>, config: SchedulerConfig) -> Self {
        Self {
            store,
            coordinator,
            config,
        }
    }

    /// Run one bounded pass: find ready bookings, claim them, dispatch.
    pub async fn run_pass(&self, kind: PassKind) -> Result<PassReport> {
        let now = Utc::now();
        let horizon = now + Duration::days(self.config.horizon_days);

        let mut candidates = self.store.list_bookings().await?;
        candidates.retain(|b| Self::is_pass_candidate(b, now, horizon));

        info!(pass = ?kind, candidate_count = candidates.len(), "scheduler pass starting");

        let semaphore = Arc::new(tokio::sync::Semaphore::new(self.config.max_concurrent));
        let mut handles = Vec::new();

        for booking in candidates {
            let claimed = self
                .store
                .with_booking_transaction(booking.booking_id, |mut b| async move {
                    let won = Pool::mark_processing(&mut b);
                    Ok((b, won))
                })
                .await?;

            if !claimed {
                continue;
            }

            let permit = semaphore.clone().acquire_owned().await.expect("semaphore not closed");
            let coordinator = self.coordinator.clone();
            let store = self.store.clone();
            let booking_id = booking.booking_id;

            handles.push(tokio::spawn(async move {
                let _permit = permit;
                let result = coordinator.assign(booking_id).await;
                Self::finalize(&store, booking_id, result).await
            }));
        }

        let mut report = PassReport::default();
        for handle in handles {
            report.dispatched += 1;
            match handle.await {
                Ok(Ok(AssignOutcome::Assigned { .. })) => report.assigned += 1,
                Ok(Ok(AssignOutcome::Escalated { .. })) => report.escalated += 1,
                Ok(Ok(AssignOutcome::Skipped { .. })) => report.skipped += 1,
                Ok(Err(_)) | Err(_) => report.failed += 1,
            }
        }

        info!(pass = ?kind, ?report, "scheduler pass complete");
        Ok(report)
    }

    fn is_pass_candidate(booking: &Booking, now: chrono::DateTime<Utc>, horizon: chrono::DateTime<Utc>) -> bool {
        booking.booking_status == BookingStatus::Waiting
            && booking.interpreter_emp_code.is_none()
            && booking.auto_assign_at <= now
            && booking.time_start <= horizon
            && Pool::is_ready(booking, now)
    }

    async fn finalize(
        store: &Arc<S>,
        booking_id: i64,
        result: Result<AssignOutcome>,
    ) -> Result<AssignOutcome> {
        match &result {
            Ok(AssignOutcome::Assigned { .. }) => {
                // commit_assignment already cleared pool fields via Pool::remove.
            }
            Ok(AssignOutcome::Escalated { .. }) => {
                store
                    .with_booking_transaction(booking_id, |mut b| async move {
                        Pool::fail_attempt(&mut b);
                        b.auto_assign_status = AutoAssignStatus::Pending;
                        Ok((b, ()))
                    })
                    .await?;
            }
            Ok(AssignOutcome::Skipped { .. }) => {
                store
                    .with_booking_transaction(booking_id, |mut b| async move {
                        Pool::remove(&mut b);
                        Ok((b, ()))
                    })
                    .await?;
            }
            Err(e) if e.is_transient() => {
                warn!(booking_id, error = %e, "transient failure, re-queued for next pass");
                store
                    .with_booking_transaction(booking_id, |mut b| async move {
                        Pool::fail_attempt(&mut b);
                        Ok((b, ()))
                    })
                    .await?;
            }
            Err(e) => {
                warn!(booking_id, error = %e, "hard failure");
                store
                    .with_booking_transaction(booking_id, |mut b| async move {
                        b.auto_assign_status = AutoAssignStatus::Failed;
                        Ok((b, ()))
                    })
                    .await?;
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lock::NamedLockRegistry;
    use crate::model::{Interpreter, MeetingType};
    use crate::policy::InMemoryPolicyStore;
    use crate::storage::InMemoryStore;
    use chrono::Duration as ChronoDuration;

    fn booking(id: i64, now: chrono::DateTime<Utc>) -> Booking {
        let thresholds = crate::policy::MeetingTypePriority::default();
        let mut b = Booking {
            booking_id: id,
            created_at: now,
            owner_emp_code: "owner".into(),
            owner_group: None,
            meeting_type: MeetingType::General,
            dr_type: None,
            time_start: now + ChronoDuration::hours(2),
            time_end: now + ChronoDuration::hours(3),
            meeting_room: None,
            language_code: None,
            selected_interpreter_emp_code: None,
            chairman_email: None,
            booking_status: BookingStatus::Waiting,
            interpreter_emp_code: None,
            auto_assign_at: now - ChronoDuration::minutes(1),
            auto_assign_status: AutoAssignStatus::Pending,
            auto_assign_locked_at: None,
            auto_assign_locked_by: None,
            pool_status: None,
            pool_entry_time: None,
            pool_deadline_time: None,
            pool_processing_attempts: 0,
            forward_environment_ids: Vec::new(),
        };
        Pool::enqueue(&mut b, now - ChronoDuration::hours(1), &thresholds);
        b.pool_deadline_time = Some(now - ChronoDuration::minutes(1));
        b
    }

    #[tokio::test]
    async fn ready_booking_gets_dispatched_and_assigned() {
        let store = Arc::new(InMemoryStore::new());
        let policy_store = Arc::new(InMemoryPolicyStore::new(crate::policy::GlobalPolicy::default()));
        let lock = Arc::new(NamedLockRegistry::default());

        store
            .seed_interpreter(Interpreter {
                emp_code: "E1".into(),
                is_active: true,
                languages: vec![],
                environment_id: None,
            })
            .await;

        let now = Utc::now();
        store.put_booking(booking(1, now)).await.unwrap();

        let coordinator = Arc::new(RunCoordinator::new(store.clone(), policy_store, lock));
        let scheduler = Scheduler::new(store.clone(), coordinator, SchedulerConfig::default());

        let report = scheduler.run_pass(PassKind::Manual).await.unwrap();
        assert_eq!(report.dispatched, 1);
        assert_eq!(report.assigned, 1);

        let updated = store.get_booking(1).await.unwrap();
        assert_eq!(updated.booking_status, BookingStatus::Approve);
        assert_eq!(updated.interpreter_emp_code, Some("E1".to_string()));
    }

    #[tokio::test]
    async fn not_yet_due_booking_is_skipped_by_the_pass() {
        let store = Arc::new(InMemoryStore::new());
        let policy_store = Arc::new(InMemoryPolicyStore::new(crate::policy::GlobalPolicy::default()));
        let lock = Arc::new(NamedLockRegistry::default());
        let now = Utc::now();

        let mut future_booking = booking(2, now);
        future_booking.auto_assign_at = now + ChronoDuration::days(5);
        future_booking.pool_deadline_time = Some(now + ChronoDuration::days(5));
        store.put_booking(future_booking).await.unwrap();

        let coordinator = Arc::new(RunCoordinator::new(store.clone(), policy_store, lock));
        let scheduler = Scheduler::new(store.clone(), coordinator, SchedulerConfig::default());

        let report = scheduler.run_pass(PassKind::Tick).await.unwrap();
        assert_eq!(report.dispatched, 0);
    }
}
