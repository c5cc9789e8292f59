//! Orchestration of candidate filtering and scoring into one decision (C7).

use chrono::{DateTime, Utc};

use crate::candidate::{Candidate, CandidateFilter, EscalationReason};
use crate::model::{Booking, Interpreter};
use crate::policy::{EffectivePolicy, MeetingTypePriority};
use crate::scoring::{ScoreBreakdown, Scorer, ScoringInput};

pub struct SelectionOutcome {
    pub chosen_emp_code: String,
    pub breakdown: ScoreBreakdown,
    pub all_breakdowns: Vec<ScoreBreakdown>,
    pub guardrail_relaxed: bool,
}

pub enum Selection {
    Decided(SelectionOutcome),
    Escalated(EscalationReason),
}

pub struct Selector;

impl Selector {
    #[allow(clippy::too_many_arguments)]
    pub fn select(
        booking: &Booking,
        interpreters: &[Interpreter],
        all_bookings: &[Booking],
        policy: &EffectivePolicy,
        thresholds: MeetingTypePriority,
        now: DateTime<Utc>,
        last_assignment_days: impl Fn(&str) -> Option<f64>,
        last_dr_interpreter: Option<&str>,
    ) -> Selection {
        let candidate_set = match CandidateFilter::build(
            booking,
            interpreters,
            all_bookings,
            policy,
            now,
            last_assignment_days,
            last_dr_interpreter,
        ) {
            Ok(set) => set,
            Err(reason) => return Selection::Escalated(reason),
        };

        let hours: Vec<f64> = candidate_set
            .candidates
            .iter()
            .map(|c| c.hours_committed)
            .collect();
        let hours_min = hours.iter().cloned().fold(f64::MAX, f64::min);
        let hours_max = hours.iter().cloned().fold(f64::MIN, f64::max);

        let mut breakdowns: Vec<ScoreBreakdown> = candidate_set
            .candidates
            .iter()
            .map(|c: &Candidate| {
                let input = ScoringInput {
                    booking,
                    emp_code: &c.emp_code,
                    now,
                    hours_for_candidate: c.hours_committed,
                    hours_min,
                    hours_max,
                    urgent_threshold_days: thresholds.urgent_threshold_days,
                    days_since_last_assignment: c.days_since_last_assignment,
                    fairness_window_days: policy.fairness_window_days,
                    dr_penalty: if c.dr_decision.penalty_applied {
                        c.dr_decision.penalty_amount
                    } else {
                        0.0
                    },
                };
                Scorer::score(policy, &input)
            })
            .collect();

        breakdowns.sort_by(Scorer::compare);

        let top = breakdowns.first().expect("non-empty candidate set").clone();

        Selection::Decided(SelectionOutcome {
            chosen_emp_code: top.emp_code.clone(),
            breakdown: top,
            all_breakdowns: breakdowns,
            guardrail_relaxed: candidate_set.guardrail_relaxed,
        })
    }
}
