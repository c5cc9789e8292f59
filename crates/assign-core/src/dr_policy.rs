//! DR (consecutive-assignment) policy (component C4).
//!
//! Modeled as a small table of rules evaluated in priority order, in the
//! style of a policy-gate rule engine, rather than a sprawling `if`/`else`
//! chain: each mode maps to an `effect` (allow / block / penalize) plus the
//! override conditions that can flip a block into an allow.

use serde::{Deserialize, Serialize};

use crate::policy::Mode;

/// Situational facts the DR policy needs to decide on a candidate.
#[derive(Debug, Clone, Copy)]
pub struct DrContext {
    pub would_be_consecutive: bool,
    pub is_critical_coverage: bool,
    pub no_alternatives_available: bool,
    pub admin_flagged_emergency: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrDecision {
    pub is_blocked: bool,
    pub penalty_applied: bool,
    pub penalty_amount: f64,
    pub override_applied: bool,
    pub reason: String,
}

pub struct DrPolicy;

impl DrPolicy {
    /// Evaluate the DR policy for one candidate, given the process mode and
    /// the global `dr_consecutive_penalty` tunable.
    pub fn evaluate(mode: Mode, dr_consecutive_penalty: f64, ctx: DrContext) -> DrDecision {
        if !ctx.would_be_consecutive {
            return DrDecision {
                is_blocked: false,
                penalty_applied: false,
                penalty_amount: 0.0,
                override_applied: false,
                reason: "not a consecutive DR assignment".into(),
            };
        }

        match mode {
            Mode::Balance => {
                let can_override = ctx.is_critical_coverage || ctx.no_alternatives_available;
                if can_override {
                    DrDecision {
                        is_blocked: false,
                        penalty_applied: false,
                        penalty_amount: 0.0,
                        override_applied: true,
                        reason: override_reason(ctx),
                    }
                } else {
                    DrDecision {
                        is_blocked: true,
                        penalty_applied: false,
                        penalty_amount: 0.0,
                        override_applied: false,
                        reason: "BALANCE mode forbids consecutive DR assignment".into(),
                    }
                }
            }
            Mode::Urgent => DrDecision {
                is_blocked: false,
                penalty_applied: true,
                penalty_amount: -0.2,
                override_applied: false,
                reason: "URGENT mode always permits, light penalty".into(),
            },
            Mode::Normal => {
                if ctx.admin_flagged_emergency {
                    DrDecision {
                        is_blocked: false,
                        penalty_applied: false,
                        penalty_amount: 0.0,
                        override_applied: true,
                        reason: "admin-flagged emergency override".into(),
                    }
                } else {
                    DrDecision {
                        is_blocked: false,
                        penalty_applied: true,
                        penalty_amount: dr_consecutive_penalty,
                        override_applied: false,
                        reason: "NORMAL mode applies configured DR penalty".into(),
                    }
                }
            }
            Mode::Custom => {
                let blocks = dr_consecutive_penalty <= -1.0;
                if blocks && !ctx.admin_flagged_emergency {
                    DrDecision {
                        is_blocked: true,
                        penalty_applied: false,
                        penalty_amount: 0.0,
                        override_applied: false,
                        reason: "CUSTOM mode: dr_consecutive_penalty <= -1.0 blocks".into(),
                    }
                } else {
                    DrDecision {
                        is_blocked: false,
                        penalty_applied: !blocks,
                        penalty_amount: if blocks { 0.0 } else { dr_consecutive_penalty },
                        override_applied: blocks,
                        reason: "CUSTOM mode decision derived from dr_consecutive_penalty".into(),
                    }
                }
            }
        }
    }
}

fn override_reason(ctx: DrContext) -> String {
    if ctx.is_critical_coverage {
        "override: candidate is the only qualifying interpreter".into()
    } else {
        "override: no alternatives remain after filtering".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(consecutive: bool) -> DrContext {
        DrContext {
            would_be_consecutive: consecutive,
            is_critical_coverage: false,
            no_alternatives_available: false,
            admin_flagged_emergency: false,
        }
    }

    #[test]
    fn balance_blocks_without_override() {
        let decision = DrPolicy::evaluate(Mode::Balance, -0.5, ctx(true));
        assert!(decision.is_blocked);
    }

    #[test]
    fn balance_overrides_on_critical_coverage() {
        let mut context = ctx(true);
        context.is_critical_coverage = true;
        let decision = DrPolicy::evaluate(Mode::Balance, -0.5, context);
        assert!(!decision.is_blocked);
        assert!(decision.override_applied);
    }

    #[test]
    fn urgent_never_blocks() {
        let decision = DrPolicy::evaluate(Mode::Urgent, -0.5, ctx(true));
        assert!(!decision.is_blocked);
        assert_eq!(decision.penalty_amount, -0.2);
    }

    #[test]
    fn normal_applies_configured_penalty() {
        let decision = DrPolicy::evaluate(Mode::Normal, -0.7, ctx(true));
        assert!(!decision.is_blocked);
        assert_eq!(decision.penalty_amount, -0.7);
    }

    #[test]
    fn normal_emergency_overrides_penalty() {
        let mut context = ctx(true);
        context.admin_flagged_emergency = true;
        let decision = DrPolicy::evaluate(Mode::Normal, -0.7, context);
        assert!(!decision.is_blocked);
        assert!(!decision.penalty_applied);
    }

    #[test]
    fn custom_blocks_on_strong_penalty() {
        let decision = DrPolicy::evaluate(Mode::Custom, -1.5, ctx(true));
        assert!(decision.is_blocked);
    }

    #[test]
    fn custom_permits_on_mild_penalty() {
        let decision = DrPolicy::evaluate(Mode::Custom, -0.3, ctx(true));
        assert!(!decision.is_blocked);
        assert_eq!(decision.penalty_amount, -0.3);
    }

    #[test]
    fn non_consecutive_never_blocked() {
        let decision = DrPolicy::evaluate(Mode::Balance, -0.5, ctx(false));
        assert!(!decision.is_blocked);
        assert!(!decision.penalty_applied);
    }
}
