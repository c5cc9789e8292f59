use assign_core::{AssignmentService, NamedLockRegistry};
use clap::Subcommand;

use crate::json_store::JsonFileStore;
use crate::PolicyStoreImpl;

type Service = AssignmentService<JsonFileStore, PolicyStoreImpl, NamedLockRegistry>;

#[derive(Subcommand)]
pub enum AdminAction {
    /// Bypass auto-assignment and approve a specific interpreter
    Approve {
        booking_id: i64,
        interpreter_emp_code: String,
        #[arg(long)]
        note: Option<String>,
    },
    /// Forward a waiting booking to other environments for scope resolution
    Forward {
        booking_id: i64,
        #[arg(long = "env", required = true)]
        environment_ids: Vec<String>,
        #[arg(long, default_value = "")]
        note: String,
    },
}

pub async fn run(service: &Service, action: AdminAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        AdminAction::Approve {
            booking_id,
            interpreter_emp_code,
            note,
        } => {
            let booking = service.admin_approve(booking_id, &interpreter_emp_code, note.as_deref()).await?;
            println!("{}", serde_json::to_string_pretty(&booking)?);
        }
        AdminAction::Forward {
            booking_id,
            environment_ids,
            note,
        } => {
            let booking = service.admin_forward(booking_id, environment_ids, &note).await?;
            println!("{}", serde_json::to_string_pretty(&booking)?);
        }
    }
    Ok(())
}
