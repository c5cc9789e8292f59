use assign_core::{AssignmentService, NamedLockRegistry, PassKind};
use clap::{Subcommand, ValueEnum};

use crate::json_store::JsonFileStore;
use crate::PolicyStoreImpl;

type Service = AssignmentService<JsonFileStore, PolicyStoreImpl, NamedLockRegistry>;

#[derive(Subcommand)]
pub enum AssignAction {
    /// Run the auto-assign decision for one booking
    One { booking_id: i64 },
    /// Drive one scheduler pass over all due bookings
    Pass {
        #[arg(long, value_enum, default_value = "manual")]
        kind: PassKindArg,
    },
}

#[derive(Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum PassKindArg {
    Tick,
    Manual,
}

impl From<PassKindArg> for PassKind {
    fn from(value: PassKindArg) -> Self {
        match value {
            PassKindArg::Tick => PassKind::Tick,
            PassKindArg::Manual => PassKind::Manual,
        }
    }
}

pub async fn run(service: &Service, action: AssignAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        AssignAction::One { booking_id } => {
            let outcome = service.assign(booking_id).await?;
            println!("{:?}", outcome);
        }
        AssignAction::Pass { kind } => {
            let report = service.run_scheduler_pass(kind.into()).await?;
            println!("{:?}", report);
        }
    }
    Ok(())
}
