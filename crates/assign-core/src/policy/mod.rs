//! Policy storage, merging, and mode semantics (component C1).

mod toml_store;

pub use toml_store::{InMemoryPolicyStore, TomlPolicyStore};

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, PolicyError, Result};
use crate::model::MeetingType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Balance,
    Urgent,
    Normal,
    Custom,
}

/// Process-wide tunable policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalPolicy {
    pub mode: Mode,
    pub w_fair: f64,
    pub w_urgency: f64,
    pub w_lrs: f64,
    pub fairness_window_days: u32,
    pub max_gap_hours: f64,
    pub dr_consecutive_penalty: f64,
}

impl Default for GlobalPolicy {
    fn default() -> Self {
        Self {
            mode: Mode::Normal,
            w_fair: 1.0,
            w_urgency: 1.0,
            w_lrs: 1.0,
            fairness_window_days: 30,
            max_gap_hours: 20.0,
            dr_consecutive_penalty: -0.5,
        }
    }
}

impl GlobalPolicy {
    pub fn validate(&self) -> Result<()> {
        if self.w_fair < 0.0 || self.w_urgency < 0.0 || self.w_lrs < 0.0 {
            return Err(CoreError::Policy(PolicyError::InvalidValue {
                field: "weights".into(),
                message: "weights must be non-negative".into(),
            }));
        }
        if self.dr_consecutive_penalty > 0.0 {
            return Err(CoreError::Policy(PolicyError::InvalidValue {
                field: "dr_consecutive_penalty".into(),
                message: "penalty must be <= 0".into(),
            }));
        }
        if !(7..=90).contains(&self.fairness_window_days) {
            return Err(CoreError::Policy(PolicyError::InvalidValue {
                field: "fairness_window_days".into(),
                message: "must be within [7, 90]".into(),
            }));
        }
        if !(1.0..=100.0).contains(&self.max_gap_hours) {
            return Err(CoreError::Policy(PolicyError::InvalidValue {
                field: "max_gap_hours".into(),
                message: "must be within [1, 100]".into(),
            }));
        }
        Ok(())
    }

    /// Fields that are read-only outside CUSTOM mode.
    pub fn is_field_locked(&self, field: &str) -> bool {
        self.mode != Mode::Custom && matches!(field, "dr_consecutive_penalty")
    }
}

/// Per-meeting-type urgency/general thresholds, in days before `timeStart`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeetingTypePriority {
    pub urgent_threshold_days: f64,
    pub general_threshold_days: f64,
}

impl Default for MeetingTypePriority {
    fn default() -> Self {
        Self {
            urgent_threshold_days: 2.0,
            general_threshold_days: 14.0,
        }
    }
}

/// Per-environment overlay; any field overrides the global value when present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvOverlay {
    pub mode: Option<Mode>,
    pub w_fair: Option<f64>,
    pub w_urgency: Option<f64>,
    pub w_lrs: Option<f64>,
    pub fairness_window_days: Option<u32>,
    pub max_gap_hours: Option<f64>,
    pub dr_consecutive_penalty: Option<f64>,
    pub auto_assign_enabled: bool,
    #[serde(default)]
    pub meeting_type_priorities: HashMap<String, MeetingTypePriority>,
}

/// The merged, ready-to-use policy for one `(environment, mode)` pair.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectivePolicy {
    pub mode: Mode,
    pub w_fair: f64,
    pub w_urgency: f64,
    pub w_lrs: f64,
    pub fairness_window_days: u32,
    pub max_gap_hours: f64,
    pub dr_consecutive_penalty: f64,
    pub auto_assign_enabled: bool,
}

impl EffectivePolicy {
    fn merge(global: &GlobalPolicy, overlay: Option<&EnvOverlay>) -> Self {
        let overlay = overlay.cloned().unwrap_or_default();
        Self {
            mode: overlay.mode.unwrap_or(global.mode),
            w_fair: overlay.w_fair.unwrap_or(global.w_fair),
            w_urgency: overlay.w_urgency.unwrap_or(global.w_urgency),
            w_lrs: overlay.w_lrs.unwrap_or(global.w_lrs),
            fairness_window_days: overlay
                .fairness_window_days
                .unwrap_or(global.fairness_window_days),
            max_gap_hours: overlay.max_gap_hours.unwrap_or(global.max_gap_hours),
            dr_consecutive_penalty: overlay
                .dr_consecutive_penalty
                .unwrap_or(global.dr_consecutive_penalty),
            auto_assign_enabled: overlay.auto_assign_enabled,
        }
    }

    /// Resolve the mode-adjusted urgent/general thresholds (in days) for a meeting type.
    pub fn resolve_thresholds(&self, base: MeetingTypePriority) -> MeetingTypePriority {
        match self.mode {
            Mode::Urgent => MeetingTypePriority {
                urgent_threshold_days: base.urgent_threshold_days * 0.5,
                general_threshold_days: base.general_threshold_days * 0.5,
            },
            Mode::Balance => MeetingTypePriority {
                urgent_threshold_days: base.urgent_threshold_days,
                general_threshold_days: base.general_threshold_days * 1.5,
            },
            Mode::Normal | Mode::Custom => base,
        }
    }
}

/// Pure read port over policy storage (C1's contract).
#[async_trait]
pub trait PolicyStore: Send + Sync {
    async fn load_global_policy(&self) -> Result<GlobalPolicy>;
    async fn load_meeting_type_priority(
        &self,
        meeting_type: MeetingType,
        environment_id: Option<&str>,
    ) -> Result<MeetingTypePriority>;
    async fn load_env_overlay(&self, environment_id: &str) -> Result<Option<EnvOverlay>>;

    async fn effective_policy(&self, environment_id: Option<&str>) -> Result<EffectivePolicy> {
        let global = self.load_global_policy().await?;
        global.validate()?;
        let overlay = match environment_id {
            Some(env) => self.load_env_overlay(env).await?,
            None => None,
        };
        Ok(EffectivePolicy::merge(&global, overlay.as_ref()))
    }

    async fn resolve_thresholds(
        &self,
        environment_id: Option<&str>,
        meeting_type: MeetingType,
    ) -> Result<MeetingTypePriority> {
        let effective = self.effective_policy(environment_id).await?;
        let base = self
            .load_meeting_type_priority(meeting_type, environment_id)
            .await?;
        Ok(effective.resolve_thresholds(base))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlay_wins_over_global() {
        let global = GlobalPolicy::default();
        let overlay = EnvOverlay {
            w_fair: Some(5.0),
            auto_assign_enabled: true,
            ..Default::default()
        };
        let effective = EffectivePolicy::merge(&global, Some(&overlay));
        assert_eq!(effective.w_fair, 5.0);
        assert_eq!(effective.w_urgency, global.w_urgency);
        assert!(effective.auto_assign_enabled);
    }

    #[test]
    fn rejects_positive_dr_penalty() {
        let mut policy = GlobalPolicy::default();
        policy.dr_consecutive_penalty = 0.5;
        assert!(policy.validate().is_err());
    }

    #[test]
    fn rejects_out_of_range_window() {
        let mut policy = GlobalPolicy::default();
        policy.fairness_window_days = 200;
        assert!(policy.validate().is_err());
    }

    #[test]
    fn urgent_mode_shrinks_thresholds() {
        let effective = EffectivePolicy {
            mode: Mode::Urgent,
            w_fair: 1.0,
            w_urgency: 1.0,
            w_lrs: 1.0,
            fairness_window_days: 30,
            max_gap_hours: 20.0,
            dr_consecutive_penalty: -0.2,
            auto_assign_enabled: true,
        };
        let base = MeetingTypePriority::default();
        let resolved = effective.resolve_thresholds(base);
        assert!(resolved.urgent_threshold_days < base.urgent_threshold_days);
    }
}
