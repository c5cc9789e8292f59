//! Domain entities for the auto-assignment engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A request for interpretation at a specific time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub booking_id: i64,
    pub created_at: DateTime<Utc>,
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

    pub booking_status: BookingStatus,
    pub interpreter_emp_code: Option<String>,

    pub auto_assign_at: DateTime<Utc>,
    pub auto_assign_status: AutoAssignStatus,
    pub auto_assign_locked_at: Option<DateTime<Utc>>,
    pub auto_assign_locked_by: Option<String>,

    pub pool_status: Option<PoolStatus>,
    pub pool_entry_time: Option<DateTime<Utc>>,
    pub pool_deadline_time: Option<DateTime<Utc>>,
    pub pool_processing_attempts: u32,

    pub forward_environment_ids: Vec<String>,
}

impl Booking {
    /// Half-open interval overlap: `timeEnd == other.timeStart` is not a conflict.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.time_start < end && self.time_end > start
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self.booking_status,
            BookingStatus::Approve | BookingStatus::Cancel | BookingStatus::Complet
        )
    }

    pub fn is_dr(&self) -> bool {
        matches!(self.meeting_type, MeetingType::Dr)
    }

    /// The center code environment resolution keys off: the leading
    /// segment of `owner_group`'s `deptPath` (segments split on `\`).
    pub fn center_code(&self) -> Option<&str> {
        self.owner_group.as_deref().map(center_code_from_dept_path)
    }
}

/// Derives a center code from a `deptPath` string (segments separated by
/// `\`); the leading segment is the center.
pub fn center_code_from_dept_path(dept_path: &str) -> &str {
    dept_path.split('\\').next().unwrap_or(dept_path)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeetingType {
    Dr,
    Vip,
    Weekly,
    General,
    Urgent,
    President,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrType {
    DrPr,
    DrI,
    DrIi,
    DrK,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Waiting,
    Approve,
    Cancel,
    Complet,
}

impl BookingStatus {
    /// Table from the spec: legal `(from, to)` booking-status transitions.
    pub fn can_transition_to(self, to: BookingStatus) -> bool {
        use BookingStatus::*;
        matches!(
            (self, to),
            (Waiting, Waiting)
                | (Waiting, Approve)
                | (Waiting, Cancel)
                | (Approve, Approve)
                | (Approve, Cancel)
                | (Approve, Complet)
                | (Cancel, Cancel)
                | (Complet, Complet)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoAssignStatus {
    Pending,
    Skipped,
    Done,
    Locked,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolStatus {
    Waiting,
    Ready,
    Processing,
    Failed,
}

/// An employee eligible to interpret.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interpreter {
    pub emp_code: String,
    pub is_active: bool,
    pub languages: Vec<String>,
    pub environment_id: Option<String>,
}

/// An administrative grouping of centers, admins, and interpreters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    pub environment_id: String,
    pub center_codes: Vec<String>,
    pub interpreter_emp_codes: Vec<String>,
}

/// Immutable record of an assignment decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentLog {
    pub booking_id: i64,
    pub decided_at: DateTime<Utc>,
    pub outcome: AssignmentOutcome,
    pub interpreter_emp_code: Option<String>,
    pub reason: String,
    pub breakdown: Option<crate::scoring::ScoreBreakdown>,
    pub dr_decision: Option<crate::dr_policy::DrDecision>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentOutcome {
    Assigned,
    Escalated,
    Skipped,
}
