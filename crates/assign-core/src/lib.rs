//! # Assign Core
//!
//! Core business logic for the interpreter auto-assignment engine. This
//! crate has no I/O of its own beyond the `Store`/`PolicyStore`/`NamedLock`
//! trait boundaries: callers supply concrete adapters (a database, a config
//! file, a distributed lock) and this crate supplies the decision logic.
//!
//! ## Architecture
//!
//! - **Candidate pipeline** ([`candidate`], [`conflict`], [`fairness`],
//!   [`dr_policy`]): narrows the interpreter pool for a booking down to the
//!   eligible, non-conflicting, policy-compliant set.
//! - **Scoring** ([`scoring`]): a weighted multi-objective scorer ranks
//!   surviving candidates.
//! - **Selection** ([`selector`]): combines the pipeline and the scorer into
//!   a single decision per booking.
//! - **Orchestration** ([`coordinator`], [`scheduler`], [`pool`]): the
//!   run-level machinery that turns a decision into a committed booking
//!   mutation and an audit log entry, with locking and retry.
//! - **Ports** ([`storage`], [`policy`], [`lock`]): the trait boundaries for
//!   persistence, policy configuration, and distributed locking, each with
//!   an in-memory reference implementation used by tests.

pub mod api;
pub mod candidate;
pub mod config;
pub mod conflict;
pub mod coordinator;
pub mod dr_policy;
pub mod error;
pub mod fairness;
pub mod lock;
pub mod model;
pub mod policy;
pub mod pool;
pub mod scheduler;
pub mod scoring;
pub mod selector;
pub mod storage;

pub use api::{AssignmentService, CreateBookingRequest, EtaReport};
pub use candidate::{Candidate, CandidateFilter, CandidateSet, EscalationReason};
pub use config::EnvConfig;
pub use conflict::ConflictChecker;
pub use coordinator::{AssignOutcome, RunCoordinator};
pub use dr_policy::{DrContext, DrDecision, DrPolicy};
pub use error::{CoreError, PolicyError, Result, StoreError};
pub use fairness::FairnessTracker;
pub use lock::{LockGuard, NamedLock, NamedLockRegistry};
pub use model::{
    AssignmentLog, AssignmentOutcome, AutoAssignStatus, Booking, BookingStatus, DrType,
    Environment, Interpreter, MeetingType, PoolStatus,
};
pub use policy::{
    EffectivePolicy, EnvOverlay, GlobalPolicy, InMemoryPolicyStore, MeetingTypePriority, Mode,
    PolicyStore, TomlPolicyStore,
};
pub use pool::{Pool, PoolEntry};
pub use scheduler::{PassKind, PassReport, Scheduler, SchedulerConfig};
pub use scoring::{ObjectiveTerm, ScoreBreakdown, Scorer, ScoringInput};
pub use selector::{Selection, SelectionOutcome, Selector};
pub use storage::{InMemoryStore, Store};
