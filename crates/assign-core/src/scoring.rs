//! Multi-objective candidate scoring (component C3).
//!
//! A weighted linear combination of explicit features, carried as an
//! explainable breakdown so an `AssignmentLog` entry can show its work.

use std::cmp::Ordering as CmpOrdering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::Booking;
use crate::policy::EffectivePolicy;

/// A single named term contributing to a candidate's total score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveTerm {
    pub name: String,
    pub weight: f64,
    pub score: f64,
    pub contribution: f64,
}

impl ObjectiveTerm {
    pub fn new(name: impl Into<String>, weight: f64, score: f64) -> Self {
        let score = score.clamp(0.0, 1.0);
        Self {
            name: name.into(),
            weight,
            contribution: weight * score,
            score,
        }
    }
}

/// Full scoring breakdown for one candidate against one booking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub emp_code: String,
    pub terms: Vec<ObjectiveTerm>,
    pub total_score: f64,
    pub scored_at: DateTime<Utc>,
}

impl ScoreBreakdown {
    fn new(emp_code: impl Into<String>) -> Self {
        Self {
            emp_code: emp_code.into(),
            terms: Vec::new(),
            total_score: 0.0,
            scored_at: Utc::now(),
        }
    }

    fn add_term(&mut self, term: ObjectiveTerm) {
        self.total_score += term.contribution;
        self.terms.push(term);
    }

    pub fn top_term(&self) -> Option<&ObjectiveTerm> {
        self.terms
            .iter()
            .max_by(|a, b| a.contribution.partial_cmp(&b.contribution).unwrap())
    }

    pub fn terms_by_contribution(&self) -> Vec<&ObjectiveTerm> {
        let mut sorted: Vec<_> = self.terms.iter().collect();
        sorted.sort_by(|a, b| b.contribution.partial_cmp(&a.contribution).unwrap());
        sorted
    }

    fn fairness_score(&self) -> f64 {
        self.terms
            .iter()
            .find(|t| t.name == "fairness")
            .map(|t| t.score)
            .unwrap_or(0.0)
    }

    fn lrs_score(&self) -> f64 {
        self.terms
            .iter()
            .find(|t| t.name == "lrs")
            .map(|t| t.score)
            .unwrap_or(0.0)
    }
}

/// Inputs needed to score one candidate against one booking.
pub struct ScoringInput<'a> {
    pub booking: &'a Booking,
    pub emp_code: &'a str,
    pub now: DateTime<Utc>,
    pub hours_for_candidate: f64,
    pub hours_min: f64,
    pub hours_max: f64,
    pub urgent_threshold_days: f64,
    pub days_since_last_assignment: Option<f64>,
    pub fairness_window_days: u32,
    /// Negative adjustment from DR policy, already signed (0.0 if none applies).
    pub dr_penalty: f64,
}

pub struct Scorer;

impl Scorer {
    /// Score one candidate, producing an explainable breakdown.
    pub fn score(policy: &EffectivePolicy, input: &ScoringInput) -> ScoreBreakdown {
        let mut breakdown = ScoreBreakdown::new(input.emp_code);

        let fairness = Self::fairness_score(input);
        breakdown.add_term(ObjectiveTerm::new("fairness", policy.w_fair, fairness));

        let urgency = Self::urgency_score(input);
        breakdown.add_term(ObjectiveTerm::new("urgency", policy.w_urgency, urgency));

        let lrs = Self::lrs_score(input);
        breakdown.add_term(ObjectiveTerm::new("lrs", policy.w_lrs, lrs));

        if input.dr_penalty != 0.0 {
            breakdown.add_term(ObjectiveTerm::new("dr_penalty", 1.0, 0.0).with_contribution(input.dr_penalty));
        }

        breakdown
    }

    fn fairness_score(input: &ScoringInput) -> f64 {
        let spread = (input.hours_max - input.hours_min).max(1.0);
        1.0 - (input.hours_for_candidate - input.hours_min) / spread
    }

    fn urgency_score(input: &ScoringInput) -> f64 {
        let lead_days = (input.booking.time_start - input.now).num_minutes() as f64 / (60.0 * 24.0);
        let denom = input.urgent_threshold_days + 1.0;
        ((input.urgent_threshold_days - lead_days + 1.0) / denom).clamp(0.0, 1.0)
    }

    fn lrs_score(input: &ScoringInput) -> f64 {
        match input.days_since_last_assignment {
            None => 1.0,
            Some(days) => (days / input.fairness_window_days.max(1) as f64).clamp(0.0, 1.0),
        }
    }

    /// Tie-break order: higher total, then higher fairness, then higher lrs,
    /// then `emp_code` ascending.
    pub fn compare(a: &ScoreBreakdown, b: &ScoreBreakdown) -> CmpOrdering {
        b.total_score
            .partial_cmp(&a.total_score)
            .unwrap_or(CmpOrdering::Equal)
            .then_with(|| {
                b.fairness_score()
                    .partial_cmp(&a.fairness_score())
                    .unwrap_or(CmpOrdering::Equal)
            })
            .then_with(|| {
                b.lrs_score()
                    .partial_cmp(&a.lrs_score())
                    .unwrap_or(CmpOrdering::Equal)
            })
            .then_with(|| a.emp_code.cmp(&b.emp_code))
    }
}

impl ObjectiveTerm {
    /// Override the contribution directly (used for signed penalty terms
    /// that aren't a clamped [0,1] score times weight).
    fn with_contribution(mut self, contribution: f64) -> Self {
        self.contribution = contribution;
        self
    }
}
