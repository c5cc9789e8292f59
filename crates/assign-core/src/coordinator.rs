//! End-to-end `assign(bookingId)` orchestration (component C10).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

use crate::dr_policy::DrDecision;
use crate::error::{CoreError, Result};
use crate::lock::NamedLock;
use crate::model::{AssignmentLog, AssignmentOutcome, Booking, BookingStatus, Interpreter};
use crate::policy::PolicyStore;
use crate::selector::{Selection, Selector};
use crate::storage::Store;

const BOOKING_LOCK_TIMEOUT: StdDuration = StdDuration::from_secs(5);
const INTERPRETER_LOCK_TIMEOUT: StdDuration = StdDuration::from_secs(5);

/// Outcome of one `assign` attempt, surfaced to the scheduler pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssignOutcome {
    Assigned { emp_code: String },
    Escalated { reason: String },
    Skipped { reason: String },
}

pub struct RunCoordinator<S: Store, P: PolicyStore, L: NamedLock> {
    store: Arc<S>,
    policy_store: Arc<P>,
    lock: Arc<L>,
}

impl<S: Store, P: PolicyStore, L: NamedLock> RunCoordinator<S, P, L> {
    pub fn new(store: Arc<S>, policy_store: Arc<P>, lock: Arc<L>) -> Self {
        Self {
            store,
            policy_store,
            lock,
        }
    }

    #[instrument(skip(self), fields(booking_id))]
    pub async fn assign(&self, booking_id: i64) -> Result<AssignOutcome> {
        let _booking_guard = self
            .lock
            .acquire(&format!("interpreter-assign:{booking_id}"), BOOKING_LOCK_TIMEOUT)
            .await?;

        let booking = self.store.get_booking(booking_id).await?;
        let now = Utc::now();

        if booking.booking_status != BookingStatus::Waiting
            || booking.interpreter_emp_code.is_some()
            || booking.auto_assign_at > now
        {
            debug!(booking_id, "skipping: no longer eligible for auto-assign");
            return Ok(AssignOutcome::Skipped {
                reason: "not eligible".into(),
            });
        }

        let environment_id = self.resolve_environment(&booking).await?;
        let policy = self.policy_store.effective_policy(environment_id.as_deref()).await?;
        let thresholds = self
            .policy_store
            .resolve_thresholds(environment_id.as_deref(), booking.meeting_type)
            .await?;

        let interpreters = self.store.list_interpreters(environment_id.as_deref()).await?;
        let all_bookings = self.store.list_bookings().await?;
        let last_dr_interpreter = self.last_dr_interpreter(&all_bookings, &interpreters);
        let last_assignment_days = self.days_since_last_assignment_map(&interpreters, now).await?;

        let selection = Selector::select(
            &booking,
            &interpreters,
            &all_bookings,
            &policy,
            thresholds,
            now,
            |emp_code| last_assignment_days.get(emp_code).copied(),
            last_dr_interpreter.as_deref(),
        );

        match selection {
            Selection::Decided(outcome) => self.commit_assignment(booking_id, outcome, now).await,
            Selection::Escalated(reason) => {
                let reason_text = format!("{reason:?}");
                info!(booking_id, reason = %reason_text, "assignment escalated");
                self.log_escalation(booking_id, &reason_text).await?;
                Ok(AssignOutcome::Escalated { reason: reason_text })
            }
        }
    }

    /// Commits the winning candidate inside the per-booking transaction so
    /// an in-flight cancel/status-patch (§4.10 steps 2-3, 5c) can never be
    /// silently overwritten by a stale read taken before the transaction.
    async fn commit_assignment(
        &self,
        booking_id: i64,
        outcome: crate::selector::SelectionOutcome,
        now: chrono::DateTime<Utc>,
    ) -> Result<AssignOutcome> {
        self.store
            .with_booking_transaction(booking_id, |booking| async move {
                if booking.booking_status != BookingStatus::Waiting
                    || booking.interpreter_emp_code.is_some()
                    || booking.auto_assign_at > now
                {
                    debug!(booking_id, "booking no longer eligible inside transaction, aborting commit");
                    self.store
                        .append_assignment_log(AssignmentLog {
                            booking_id,
                            decided_at: now,
                            outcome: AssignmentOutcome::Skipped,
                            interpreter_emp_code: None,
                            reason: "SKIPPED_CANCELLED".into(),
                            breakdown: None,
                            dr_decision: None,
                        })
                        .await?;
                    let skipped = AssignOutcome::Skipped {
                        reason: "SKIPPED_CANCELLED".into(),
                    };
                    return Ok((booking, skipped));
                }

                let mut remaining = outcome.all_breakdowns.clone();
                loop {
                    let Some(top) = remaining.first().cloned() else {
                        self.store
                            .append_assignment_log(AssignmentLog {
                                booking_id,
                                decided_at: now,
                                outcome: AssignmentOutcome::Escalated,
                                interpreter_emp_code: None,
                                reason: "ALL_CONFLICT_ON_COMMIT".into(),
                                breakdown: None,
                                dr_decision: None,
                            })
                            .await?;
                        let escalated = AssignOutcome::Escalated {
                            reason: "ALL_CONFLICT_ON_COMMIT".into(),
                        };
                        return Ok((booking, escalated));
                    };

                    let interpreter_lock_name = format!("interpreter:{}", top.emp_code);
                    let _interpreter_guard = self
                        .lock
                        .acquire(&interpreter_lock_name, INTERPRETER_LOCK_TIMEOUT)
                        .await?;

                    let all_bookings = self.store.list_bookings().await?;
                    let conflict = crate::conflict::ConflictChecker::new(&all_bookings).has_interpreter_conflict(
                        &top.emp_code,
                        booking.time_start,
                        booking.time_end,
                        Some(booking.booking_id),
                    );

                    if conflict.is_some() {
                        warn!(
                            booking_id,
                            emp_code = %top.emp_code,
                            "conflict detected at commit time, retrying with next-best candidate"
                        );
                        remaining.retain(|b| b.emp_code != top.emp_code);
                        continue;
                    }

                    let mut updated = booking.clone();
                    updated.interpreter_emp_code = Some(top.emp_code.clone());
                    updated.booking_status = BookingStatus::Approve;
                    updated.auto_assign_status = crate::model::AutoAssignStatus::Done;
                    crate::pool::Pool::remove(&mut updated);

                    let dr_decision = find_dr_decision(&top, &outcome);
                    self.store
                        .append_assignment_log(AssignmentLog {
                            booking_id,
                            decided_at: now,
                            outcome: AssignmentOutcome::Assigned,
                            interpreter_emp_code: Some(top.emp_code.clone()),
                            reason: if outcome.guardrail_relaxed {
                                "assigned (fairness guardrail relaxed)".into()
                            } else {
                                "assigned".into()
                            },
                            breakdown: Some(top.clone()),
                            dr_decision,
                        })
                        .await?;

                    info!(booking_id, emp_code = %top.emp_code, "assignment committed");
                    let assigned = AssignOutcome::Assigned { emp_code: top.emp_code };
                    return Ok((updated, assigned));
                }
            })
            .await
    }

    async fn log_escalation(&self, booking_id: i64, reason: &str) -> Result<()> {
        self.store
            .append_assignment_log(AssignmentLog {
                booking_id,
                decided_at: Utc::now(),
                outcome: AssignmentOutcome::Escalated,
                interpreter_emp_code: None,
                reason: reason.to_string(),
                breakdown: None,
                dr_decision: None,
            })
            .await
    }

    async fn resolve_environment(&self, booking: &Booking) -> Result<Option<String>> {
        if let Some(forwarded) = booking.forward_environment_ids.last() {
            return Ok(Some(forwarded.clone()));
        }
        if let Some(center) = booking.center_code() {
            return self.store.environment_for_center(center).await;
        }
        Ok(None)
    }

    /// Per-environment scoping (§9): restrict to bookings whose assigned
    /// interpreter is still in the resolved environment's candidate list.
    /// Falls back to a global scan when the environment is unresolved.
    fn last_dr_interpreter(&self, bookings: &[Booking], interpreters: &[crate::model::Interpreter]) -> Option<String> {
        let scope: std::collections::HashSet<&str> =
            interpreters.iter().map(|i| i.emp_code.as_str()).collect();
        bookings
            .iter()
            .filter(|b| b.is_dr() && b.booking_status == BookingStatus::Approve)
            .filter(|b| {
                b.interpreter_emp_code
                    .as_deref()
                    .map(|e| scope.contains(e))
                    .unwrap_or(false)
            })
            .max_by_key(|b| b.auto_assign_at)
            .and_then(|b| b.interpreter_emp_code.clone())
    }

    /// LRS input: days since each interpreter's last *assigned* decision,
    /// taken from `AssignmentLog.decided_at` rather than the booking's own
    /// `auto_assign_at` (a scheduling-window instant, not a service time).
    async fn days_since_last_assignment_map(
        &self,
        interpreters: &[Interpreter],
        now: DateTime<Utc>,
    ) -> Result<HashMap<String, f64>> {
        let mut map = HashMap::new();
        for interpreter in interpreters {
            let logs = self.store.assignment_logs_for(&interpreter.emp_code).await?;
            if let Some(last) = logs
                .iter()
                .filter(|log| log.outcome == AssignmentOutcome::Assigned)
                .map(|log| log.decided_at)
                .max()
            {
                map.insert(interpreter.emp_code.clone(), (now - last).num_minutes() as f64 / (60.0 * 24.0));
            }
        }
        Ok(map)
    }
}

fn find_dr_decision(
    top: &crate::scoring::ScoreBreakdown,
    outcome: &crate::selector::SelectionOutcome,
) -> Option<DrDecision> {
    let _ = outcome;
    top.terms
        .iter()
        .find(|t| t.name == "dr_penalty")
        .map(|_| DrDecision {
            is_blocked: false,
            penalty_applied: true,
            penalty_amount: top
                .terms
                .iter()
                .find(|t| t.name == "dr_penalty")
                .map(|t| t.contribution)
                .unwrap_or(0.0),
            override_applied: false,
            reason: "dr penalty applied during scoring".into(),
        })
}