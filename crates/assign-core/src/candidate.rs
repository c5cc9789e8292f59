//! Candidate eligibility filtering (component C6).

use chrono::{DateTime, Utc};

use crate::conflict::ConflictChecker;
use crate::dr_policy::{DrContext, DrDecision, DrPolicy};
use crate::fairness::FairnessTracker;
use crate::model::{Booking, Interpreter};
use crate::policy::EffectivePolicy;

/// A candidate that survived eligibility filtering, carrying enough context
/// for the Scorer and the final DR decision.
pub struct Candidate {
    pub emp_code: String,
    pub hours_committed: f64,
    pub days_since_last_assignment: Option<f64>,
    pub dr_decision: DrDecision,
}

/// Why the candidate list ended up empty.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum EscalationReason {
    NoCandidates,
    AllConflict,
    AllDrBlocked,
    FairnessGuardrail,
}

pub struct CandidateFilter;

impl CandidateFilter {
    /// Build the ordered candidate list for a booking. `last_assignment_days`
    /// maps `emp_code -> days since last DR-independent assignment` (LRS input).
    #[allow(clippy::too_many_arguments)]
    pub fn build(
        booking: &Booking,
        interpreters: &[Interpreter],
        all_bookings: &[Booking],
        policy: &EffectivePolicy,
        now: DateTime<Utc>,
        last_assignment_days: impl Fn(&str) -> Option<f64>,
        last_dr_interpreter: Option<&str>,
    ) -> Result<CandidateSet, EscalationReason> {
        // 1-2: active interpreters with role INTERPRETER (environment scope
        // is applied by the caller when it queries `interpreters`).
        let mut pool: Vec<&Interpreter> = interpreters.iter().filter(|i| i.is_active).collect();

        // 4: language match.
        if let Some(lang) = &booking.language_code {
            pool.retain(|i| i.languages.iter().any(|l| l == lang));
        }

        // 8: pinned interpreter overrides everything else.
        if let Some(pinned) = &booking.selected_interpreter_emp_code {
            pool.retain(|i| &i.emp_code == pinned);
        }

        if pool.is_empty() {
            return Err(EscalationReason::NoCandidates);
        }

        // 5: conflict check.
        let conflict_checker = ConflictChecker::new(all_bookings);
        let non_conflicting: Vec<&Interpreter> = pool
            .iter()
            .filter(|i| {
                conflict_checker
                    .has_interpreter_conflict(
                        &i.emp_code,
                        booking.time_start,
                        booking.time_end,
                        Some(booking.booking_id),
                    )
                    .is_none()
            })
            .copied()
            .collect();

        if non_conflicting.is_empty() {
            return Err(EscalationReason::AllConflict);
        }

        // 6: fairness guardrail, relaxed if it would empty the pool.
        let scope: Vec<String> = non_conflicting.iter().map(|i| i.emp_code.clone()).collect();
        let fairness = FairnessTracker::new(all_bookings);
        let hours = fairness.hours_by_interpreter(&scope, now, policy.fairness_window_days);
        let duration_hours = (booking.time_end - booking.time_start).num_minutes() as f64 / 60.0;

        let within_guardrail: Vec<&Interpreter> = non_conflicting
            .iter()
            .filter(|i| {
                let projected =
                    FairnessTracker::simulate_assign(&hours, &i.emp_code, duration_hours);
                projected <= policy.max_gap_hours
            })
            .copied()
            .collect();

        let guardrail_relaxed = within_guardrail.is_empty();
        let surviving: Vec<&Interpreter> = if guardrail_relaxed {
            non_conflicting
        } else {
            within_guardrail
        };

        // 7: DR policy.
        let candidates: Vec<Candidate> = surviving
            .iter()
            .map(|i| {
                let would_be_consecutive =
                    booking.is_dr() && last_dr_interpreter == Some(i.emp_code.as_str());
                let dr_ctx = DrContext {
                    would_be_consecutive,
                    is_critical_coverage: surviving.len() == 1,
                    no_alternatives_available: false,
                    admin_flagged_emergency: false,
                };
                let dr_decision = DrPolicy::evaluate(policy.mode, policy.dr_consecutive_penalty, dr_ctx);
                Candidate {
                    emp_code: i.emp_code.clone(),
                    hours_committed: *hours.get(&i.emp_code).unwrap_or(&0.0),
                    days_since_last_assignment: last_assignment_days(&i.emp_code),
                    dr_decision,
                }
            })
            .collect();

        let mut not_blocked: Vec<Candidate> = candidates
            .into_iter()
            .filter(|c| !c.dr_decision.is_blocked)
            .collect();

        if not_blocked.is_empty() {
            return Err(EscalationReason::AllDrBlocked);
        }

        not_blocked.sort_by(|a, b| a.emp_code.cmp(&b.emp_code));

        Ok(CandidateSet {
            candidates: not_blocked,
            guardrail_relaxed,
        })
    }
}

/// The surviving candidates plus whether the fairness guardrail had to be
/// relaxed to avoid an empty pool (§4.2) — the Selector logs this as an
/// "escalated-fairness" note even though a candidate was still found.
pub struct CandidateSet {
    pub candidates: Vec<Candidate>,
    pub guardrail_relaxed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AutoAssignStatus, BookingStatus, MeetingType};
    use crate::policy::Mode;
    use chrono::Duration;

    fn policy() -> EffectivePolicy {
        EffectivePolicy {
            mode: Mode::Normal,
            w_fair: 1.0,
            w_urgency: 1.0,
            w_lrs: 1.0,
            fairness_window_days: 30,
            max_gap_hours: 20.0,
            dr_consecutive_penalty: -0.5,
            auto_assign_enabled: true,
        }
    }

    fn interpreter(emp_code: &str) -> Interpreter {
        Interpreter {
            emp_code: emp_code.to_string(),
            is_active: true,
            languages: vec!["en".to_string()],
            environment_id: Some("env-1".to_string()),
        }
    }

    fn booking(now: DateTime<Utc>) -> Booking {
        Booking {
            booking_id: 1,
            created_at: now,
            owner_emp_code: "owner".into(),
            owner_group: None,
            meeting_type: MeetingType::General,
            dr_type: None,
            time_start: now + Duration::hours(2),
            time_end: now + Duration::hours(3),
            meeting_room: None,
            language_code: None,
            selected_interpreter_emp_code: None,
            chairman_email: None,
            booking_status: BookingStatus::Waiting,
            interpreter_emp_code: None,
            auto_assign_at: now,
            auto_assign_status: AutoAssignStatus::Pending,
            auto_assign_locked_at: None,
            auto_assign_locked_by: None,
            pool_status: None,
            pool_entry_time: None,
            pool_deadline_time: None,
            pool_processing_attempts: 0,
            forward_environment_ids: Vec::new(),
        }
    }

    #[test]
    fn inactive_interpreters_are_excluded() {
        let now = Utc::now();
        let mut inactive = interpreter("E1");
        inactive.is_active = false;
        let interpreters = vec![inactive];
        let b = booking(now);
        let result = CandidateFilter::build(&b, &interpreters, &[], &policy(), now, |_| None, None);
        assert_eq!(result.err(), Some(EscalationReason::NoCandidates));
    }

    #[test]
    fn eligible_candidate_survives() {
        let now = Utc::now();
        let interpreters = vec![interpreter("E1")];
        let b = booking(now);
        let result = CandidateFilter::build(&b, &interpreters, &[], &policy(), now, |_| None, None)
            .expect("expected candidates");
        assert_eq!(result.candidates.len(), 1);
        assert!(!result.guardrail_relaxed);
    }

    #[test]
    fn pinned_interpreter_restricts_pool() {
        let now = Utc::now();
        let interpreters = vec![interpreter("E1"), interpreter("E2")];
        let mut b = booking(now);
        b.selected_interpreter_emp_code = Some("E2".to_string());
        let result = CandidateFilter::build(&b, &interpreters, &[], &policy(), now, |_| None, None)
            .expect("expected candidates");
        assert_eq!(result.candidates.len(), 1);
        assert_eq!(result.candidates[0].emp_code, "E2");
    }

    #[test]
    fn language_mismatch_excludes_candidate() {
        let now = Utc::now();
        let interpreters = vec![interpreter("E1")];
        let mut b = booking(now);
        b.language_code = Some("fr".to_string());
        let result = CandidateFilter::build(&b, &interpreters, &[], &policy(), now, |_| None, None);
        assert_eq!(result.err(), Some(EscalationReason::NoCandidates));
    }
}

impl std::fmt::Debug for EscalationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            EscalationReason::NoCandidates => "NO_CANDIDATES",
            EscalationReason::AllConflict => "ALL_CONFLICT",
            EscalationReason::AllDrBlocked => "ALL_DR_BLOCKED",
            EscalationReason::FairnessGuardrail => "FAIRNESS_GUARDRAIL",
        };
        write!(f, "{label}")
    }
}
