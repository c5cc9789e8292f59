//! Transport-agnostic external interface (§6): the operation surface a
//! caller (CLI, HTTP handler, queue consumer) drives. This module owns no
//! I/O beyond the `Store`/`PolicyStore`/`NamedLock` ports already defined
//! elsewhere in the crate — it is the seam a thin CLI or server binds to.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::instrument;

use crate::coordinator::{AssignOutcome, RunCoordinator};
use crate::error::{CoreError, Result};
use crate::lock::NamedLock;
use crate::model::{
    center_code_from_dept_path, AssignmentLog, AutoAssignStatus, Booking, BookingStatus, DrType, MeetingType, PoolStatus,
};
use crate::policy::PolicyStore;
use crate::pool::Pool;
use crate::scheduler::{PassKind, PassReport, Scheduler, SchedulerConfig};
use crate::storage::Store;

const INTERPRETER_LOCK_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);

/// Caller-supplied fields for `createBooking`. `booking_id` is assigned by
/// whatever owns identity allocation upstream of this port (the storage
/// engine's primary key in a real deployment).
pub struct CreateBookingRequest {
    pub booking_id: i64,
    pub owner_emp_code: String,
    pub owner_group: Option<String>,
    pub meeting_type: MeetingType,
    pub dr_type: Option<DrType>,
    pub time_start: DateTime<Utc>,
    pub time_end: DateTime<Utc>,
    pub meeting_room: Option<String>,
    pub language_code: Option<String>,
    pub selected_interpreter_emp_code: Option<String>,
    pub chairman_email: Option<String>,
}

pub struct EtaReport {
    pub urgent_from: DateTime<Utc>,
    pub scheduler_from: DateTime<Utc>,
    pub first_auto_assign_at: DateTime<Utc>,
    pub eta_seconds: i64,
}

/// The service a transport layer binds to. Holds the three port
/// implementations and the coordinator/scheduler built over them.
pub struct AssignmentService<S: Store, P: PolicyStore, L: NamedLock> {
    store: Arc<S>,
    policy_store: Arc<P>,
    lock: Arc<L>,
    coordinator: Arc<RunCoordinator<S, P, L>>,
    scheduler: Scheduler<S, P, L>,
}

impl<S: Store + 'static, P: PolicyStore + 'static, L: NamedLock + 'static> AssignmentService<S, P, L> {
    pub fn new(store: Arc<S>, policy_store: Arc<P>, lock: Arc<L>, scheduler_config: SchedulerConfig) -> Self {
        let coordinator = Arc::new(RunCoordinator::new(store.clone(), policy_store.clone(), lock.clone()));
        let scheduler = Scheduler::new(store.clone(), coordinator.clone(), scheduler_config);
        Self {
            store,
            policy_store,
            lock,
            coordinator,
            scheduler,
        }
    }

    #[instrument(skip(self, req), fields(booking_id = req.booking_id))]
    pub async fn create_booking(&self, req: CreateBookingRequest) -> Result<Booking> {
        if req.time_end <= req.time_start {
            return Err(CoreError::BadRequest("timeEnd must be after timeStart".into()));
        }

        let environment_id = match &req.owner_group {
            Some(group) => self.store.environment_for_center(center_code_from_dept_path(group)).await?,
            None => None,
        };
        let policy = self.policy_store.effective_policy(environment_id.as_deref()).await?;
        let thresholds = self
            .policy_store
            .resolve_thresholds(environment_id.as_deref(), req.meeting_type)
            .await?;

        let now = Utc::now();
        let auto_assign_at = Pool::deadline_for(req.time_start, &thresholds);

        let mut booking = Booking {
            booking_id: req.booking_id,
            created_at: now,
            owner_emp_code: req.owner_emp_code,
            owner_group: req.owner_group,
            meeting_type: req.meeting_type,
            dr_type: req.dr_type,
            time_start: req.time_start,
            time_end: req.time_end,
            meeting_room: req.meeting_room,
            language_code: req.language_code,
            selected_interpreter_emp_code: req.selected_interpreter_emp_code,
            chairman_email: req.chairman_email,
            booking_status: BookingStatus::Waiting,
            interpreter_emp_code: None,
            auto_assign_at,
            auto_assign_status: if policy.auto_assign_enabled {
                AutoAssignStatus::Pending
            } else {
                AutoAssignStatus::Skipped
            },
            auto_assign_locked_at: None,
            auto_assign_locked_by: None,
            pool_status: None,
            pool_entry_time: None,
            pool_deadline_time: None,
            pool_processing_attempts: 0,
            forward_environment_ids: Vec::new(),
        };

        if policy.auto_assign_enabled {
            Pool::enqueue(&mut booking, now, &thresholds);
        }

        self.store.put_booking(booking.clone()).await?;
        Ok(booking)
    }

    /// Idempotent, re-entrant under the per-booking named lock (enforced
    /// inside `RunCoordinator::assign`).
    pub async fn assign(&self, booking_id: i64) -> Result<AssignOutcome> {
        self.coordinator.assign(booking_id).await
    }

    #[instrument(skip(self, note), fields(booking_id))]
    pub async fn admin_approve(&self, booking_id: i64, interpreter_emp_code: &str, note: Option<&str>) -> Result<Booking> {
        let _ = note;
        let lock_name = format!("interpreter:{interpreter_emp_code}");
        let _guard = self.lock.acquire(&lock_name, INTERPRETER_LOCK_TIMEOUT).await?;

        self.store
            .with_booking_transaction(booking_id, |mut booking| {
                let emp_code = interpreter_emp_code.to_string();
                let bookings_fut = self.store.list_bookings();
                async move {
                    let all_bookings = bookings_fut.await?;
                    let conflict = crate::conflict::ConflictChecker::new(&all_bookings).has_interpreter_conflict(
                        &emp_code,
                        booking.time_start,
                        booking.time_end,
                        Some(booking.booking_id),
                    );
                    if let Some(conflicting_booking_id) = conflict {
                        return Err(CoreError::InterpreterConflict {
                            emp_code,
                            conflicting_booking_id,
                        });
                    }
                    if !booking.booking_status.can_transition_to(BookingStatus::Approve) {
                        return Err(CoreError::Conflict(format!(
                            "cannot approve booking in status {:?}",
                            booking.booking_status
                        )));
                    }
                    booking.interpreter_emp_code = Some(emp_code);
                    booking.booking_status = BookingStatus::Approve;
                    booking.auto_assign_status = AutoAssignStatus::Done;
                    Pool::remove(&mut booking);
                    Ok((booking.clone(), booking))
                }
            })
            .await
    }

    #[instrument(skip(self, note), fields(booking_id))]
    pub async fn admin_forward(&self, booking_id: i64, environment_ids: Vec<String>, note: &str) -> Result<Booking> {
        let _ = note;
        self.store
            .with_booking_transaction(booking_id, |mut booking| async move {
                if booking.booking_status != BookingStatus::Waiting {
                    return Err(CoreError::Conflict(
                        "adminForward requires the booking to be in waiting status".into(),
                    ));
                }
                booking.forward_environment_ids.extend(environment_ids);
                Ok((booking.clone(), booking))
            })
            .await
    }

    #[instrument(skip(self), fields(booking_id))]
    pub async fn cancel_booking(&self, booking_id: i64) -> Result<Booking> {
        self.store
            .with_booking_transaction(booking_id, |mut booking| async move {
                if booking.is_terminal() {
                    return Err(CoreError::Conflict("booking is already in a terminal state".into()));
                }
                booking.booking_status = BookingStatus::Cancel;
                Pool::remove(&mut booking);
                Ok((booking.clone(), booking))
            })
            .await
    }

    #[instrument(skip(self), fields(booking_id))]
    pub async fn patch_booking_status(&self, booking_id: i64, status: BookingStatus) -> Result<Booking> {
        self.store
            .with_booking_transaction(booking_id, |mut booking| async move {
                if !booking.booking_status.can_transition_to(status) {
                    return Err(CoreError::Conflict(format!(
                        "{:?} -> {:?} is not a permitted transition",
                        booking.booking_status, status
                    )));
                }
                booking.booking_status = status;
                if matches!(status, BookingStatus::Cancel | BookingStatus::Complet) {
                    Pool::remove(&mut booking);
                }
                Ok((booking.clone(), booking))
            })
            .await
    }

    pub async fn compute_eta(&self, booking_id: i64) -> Result<EtaReport> {
        let booking = self.store.get_booking(booking_id).await?;
        let environment_id = match booking.center_code() {
            Some(center) => self.store.environment_for_center(center).await?,
            None => None,
        };
        let thresholds = self
            .policy_store
            .resolve_thresholds(environment_id.as_deref(), booking.meeting_type)
            .await?;

        let urgent_from = booking.time_start - chrono::Duration::seconds((thresholds.urgent_threshold_days * 86_400.0) as i64);
        let scheduler_from = booking.auto_assign_at;
        let first_auto_assign_at = urgent_from.max(scheduler_from);
        let eta_seconds = (first_auto_assign_at - Utc::now()).num_seconds();

        Ok(EtaReport {
            urgent_from,
            scheduler_from,
            first_auto_assign_at,
            eta_seconds,
        })
    }

    pub async fn run_scheduler_pass(&self, kind: PassKind) -> Result<PassReport> {
        self.scheduler.run_pass(kind).await
    }

    pub async fn assignment_logs_for(&self, emp_code: &str) -> Result<Vec<AssignmentLog>> {
        self.store.assignment_logs_for(emp_code).await
    }

    pub async fn get_booking(&self, booking_id: i64) -> Result<Booking> {
        self.store.get_booking(booking_id).await
    }

    pub async fn list_bookings(&self) -> Result<Vec<Booking>> {
        self.store.list_bookings().await
    }
}

#[allow(dead_code)]
fn pool_status_label(status: Option<PoolStatus>) -> &'static str {
    match status {
        Some(PoolStatus::Waiting) => "waiting",
        Some(PoolStatus::Ready) => "ready",
        Some(PoolStatus::Processing) => "processing",
        Some(PoolStatus::Failed) => "failed",
        None => "none",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lock::NamedLockRegistry;
    use crate::model::Interpreter;
    use crate::policy::{GlobalPolicy, InMemoryPolicyStore};
    use crate::storage::InMemoryStore;
    use chrono::Duration;

    fn service() -> AssignmentService<InMemoryStore, InMemoryPolicyStore, NamedLockRegistry> {
        let store = Arc::new(InMemoryStore::new());
        let policy_store = Arc::new(InMemoryPolicyStore::new(GlobalPolicy::default()));
        let lock = Arc::new(NamedLockRegistry::default());
        AssignmentService::new(store, policy_store, lock, SchedulerConfig::default())
    }

    #[tokio::test]
    async fn create_booking_computes_auto_assign_at_before_time_start() {
        let svc = service();
        let now = Utc::now();
        let req = CreateBookingRequest {
            booking_id: 1,
            owner_emp_code: "owner".into(),
            owner_group: None,
            meeting_type: MeetingType::General,
            dr_type: None,
            time_start: now + Duration::days(10),
            time_end: now + Duration::days(10) + Duration::hours(1),
            meeting_room: None,
            language_code: None,
            selected_interpreter_emp_code: None,
            chairman_email: None,
        };
        let booking = svc.create_booking(req).await.unwrap();
        assert!(booking.auto_assign_at < booking.time_start);
        assert_eq!(booking.auto_assign_status, AutoAssignStatus::Pending);
    }

    fn booking_request(booking_id: i64, time_start: DateTime<Utc>, time_end: DateTime<Utc>) -> CreateBookingRequest {
        CreateBookingRequest {
            booking_id,
            owner_emp_code: "owner".into(),
            owner_group: None,
            meeting_type: MeetingType::General,
            dr_type: None,
            time_start,
            time_end,
            meeting_room: None,
            language_code: None,
            selected_interpreter_emp_code: None,
            chairman_email: None,
        }
    }

    #[tokio::test]
    async fn admin_approve_rejects_conflicting_interpreter() {
        let svc = service();
        let now = Utc::now();

        svc.create_booking(booking_request(1, now, now + Duration::hours(1)))
            .await
            .unwrap();
        svc.create_booking(booking_request(2, now + Duration::minutes(30), now + Duration::hours(2)))
            .await
            .unwrap();

        svc.admin_approve(1, "E1", None).await.unwrap();
        let result = svc.admin_approve(2, "E1", None).await;
        assert!(matches!(result, Err(CoreError::InterpreterConflict { .. })));
    }

    #[tokio::test]
    async fn cancel_clears_pool_fields() {
        let svc = service();
        let now = Utc::now();
        let req = CreateBookingRequest {
            booking_id: 1,
            owner_emp_code: "owner".into(),
            owner_group: None,
            meeting_type: MeetingType::General,
            dr_type: None,
            time_start: now + Duration::days(1),
            time_end: now + Duration::days(1) + Duration::hours(1),
            meeting_room: None,
            language_code: None,
            selected_interpreter_emp_code: None,
            chairman_email: None,
        };
        svc.create_booking(req).await.unwrap();
        let cancelled = svc.cancel_booking(1).await.unwrap();
        assert_eq!(cancelled.booking_status, BookingStatus::Cancel);
        assert_eq!(cancelled.pool_status, None);
    }

    #[tokio::test]
    async fn compute_eta_is_max_of_urgent_and_scheduler_floor() {
        let svc = service();
        let now = Utc::now();
        let req = CreateBookingRequest {
            booking_id: 1,
            owner_emp_code: "owner".into(),
            owner_group: None,
            meeting_type: MeetingType::General,
            dr_type: None,
            time_start: now + Duration::days(30),
            time_end: now + Duration::days(30) + Duration::hours(1),
            meeting_room: None,
            language_code: None,
            selected_interpreter_emp_code: None,
            chairman_email: None,
        };
        svc.create_booking(req).await.unwrap();
        let eta = svc.compute_eta(1).await.unwrap();
        assert_eq!(eta.first_auto_assign_at, eta.urgent_from.max(eta.scheduler_from));
    }

    #[tokio::test]
    async fn scheduler_pass_assigns_ready_entries() {
        let store = Arc::new(InMemoryStore::new());
        store
            .seed_interpreter(Interpreter {
                emp_code: "E1".into(),
                is_active: true,
                languages: vec![],
                environment_id: None,
            })
            .await;
        let policy_store = Arc::new(InMemoryPolicyStore::new(GlobalPolicy::default()));
        let lock = Arc::new(NamedLockRegistry::default());
        let svc = AssignmentService::new(store.clone(), policy_store, lock, SchedulerConfig::default());

        let now = Utc::now();
        let booking = svc
            .create_booking(booking_request(1, now + Duration::hours(1), now + Duration::hours(2)))
            .await
            .unwrap();
        store
            .put_booking(Booking {
                auto_assign_at: now - Duration::minutes(1),
                pool_deadline_time: Some(now - Duration::minutes(1)),
                ..booking
            })
            .await
            .unwrap();

        let report = svc.run_scheduler_pass(PassKind::Manual).await.unwrap();
        assert_eq!(report.assigned, 1);
    }
}
