//! Core error types for assign-core.
//!
//! This module defines the error hierarchy using thiserror so that callers
//! can match on structured variants instead of parsing strings.

use thiserror::Error;

/// Core error type for assign-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// The request itself is malformed (shape/range violation).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The target entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A state-transition or scheduling invariant was violated.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A candidate interpreter has an overlapping booking.
    #[error("interpreter {emp_code} conflicts with booking {conflicting_booking_id}")]
    InterpreterConflict {
        emp_code: String,
        conflicting_booking_id: i64,
    },

    /// The requested interpreter is not eligible (inactive, wrong role, out of scope).
    #[error("interpreter {0} is not a valid candidate for this booking")]
    InvalidInterpreter(String),

    /// No candidate satisfies the fairness guardrail.
    #[error("fairness guardrail exceeded for all candidates")]
    FairnessGuardrail,

    /// All remaining candidates are blocked by DR consecutive-assignment policy.
    #[error("all candidates blocked by DR policy: {0}")]
    DrBlocked(String),

    /// A named lock could not be acquired within its timeout.
    #[error("lock timeout acquiring '{0}'")]
    LockTimeout(String),

    /// An administrative action violates policy (illegal transition, out-of-scope action).
    #[error("policy violation: {0}")]
    PolicyViolation(String),

    /// Policy configuration errors.
    #[error("policy error: {0}")]
    Policy(#[from] PolicyError),

    /// Storage-layer errors, propagated from the `Store` port.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Serialization/deserialization errors.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Anything else, carrying a correlation id for log cross-referencing.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Stable machine-readable tag for the taxonomy entry this error maps to.
    pub fn tag(&self) -> &'static str {
        match self {
            CoreError::BadRequest(_) => "BAD_REQUEST",
            CoreError::NotFound(_) => "NOT_FOUND",
            CoreError::Conflict(_) => "CONFLICT",
            CoreError::InterpreterConflict { .. } => "INTERPRETER_CONFLICT",
            CoreError::InvalidInterpreter(_) => "INVALID_INTERPRETER",
            CoreError::FairnessGuardrail => "FAIRNESS_GUARDRAIL",
            CoreError::DrBlocked(_) => "DR_BLOCKED",
            CoreError::LockTimeout(_) => "LOCK_TIMEOUT",
            CoreError::PolicyViolation(_) => "POLICY_VIOLATION",
            CoreError::Policy(_) => "POLICY_VIOLATION",
            CoreError::Store(_) => "INTERNAL_ERROR",
            CoreError::Json(_) => "BAD_REQUEST",
            CoreError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// True when the scheduler should retry this booking on a later pass
    /// rather than mark it failed.
    pub fn is_transient(&self) -> bool {
        matches!(self, CoreError::LockTimeout(_))
    }
}

/// Policy-store specific errors.
#[derive(Error, Debug)]
pub enum PolicyError {
    #[error("failed to load policy from {path}: {message}")]
    LoadFailed { path: String, message: String },

    #[error("failed to save policy to {path}: {message}")]
    SaveFailed { path: String, message: String },

    #[error("invalid policy value for '{field}': {message}")]
    InvalidValue { field: String, message: String },

    #[error("field '{field}' is locked under mode {mode}")]
    FieldLocked { field: String, mode: String },

    #[error("no policy overlay found for environment {0}")]
    MissingOverlay(String),
}

/// Errors surfaced by the `Store` port (the out-of-scope persistence engine).
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("entity not found: {0}")]
    NotFound(String),

    #[error("transaction failed: {0}")]
    TransactionFailed(String),

    #[error("optimistic concurrency conflict updating {0}")]
    StaleWrite(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<tokio::time::error::Elapsed> for CoreError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        CoreError::LockTimeout("unnamed".to_string())
    }
}

/// Result type alias for CoreError.
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
