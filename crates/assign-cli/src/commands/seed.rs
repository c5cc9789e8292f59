use assign_core::{Environment, Interpreter};
use clap::Subcommand;

use crate::json_store::JsonFileStore;

#[derive(Subcommand)]
pub enum SeedAction {
    /// Register an interpreter as a candidate for auto-assignment
    Interpreter {
        emp_code: String,
        #[arg(long = "lang", required = true)]
        languages: Vec<String>,
        #[arg(long)]
        environment_id: Option<String>,
        #[arg(long, default_value_t = true)]
        active: bool,
    },
    /// Register an environment and the centers it owns
    Environment {
        environment_id: String,
        #[arg(long = "center", required = true)]
        center_codes: Vec<String>,
    },
}

pub async fn run(store: &JsonFileStore, action: SeedAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        SeedAction::Interpreter {
            emp_code,
            languages,
            environment_id,
            active,
        } => {
            store
                .seed_interpreter(Interpreter {
                    emp_code: emp_code.clone(),
                    is_active: active,
                    languages,
                    environment_id,
                })
                .await?;
            println!("seeded interpreter {emp_code}");
        }
        SeedAction::Environment {
            environment_id,
            center_codes,
        } => {
            store
                .seed_environment(Environment {
                    environment_id: environment_id.clone(),
                    center_codes,
                    interpreter_emp_codes: Vec::new(),
                })
                .await?;
            println!("seeded environment {environment_id}");
        }
    }
    Ok(())
}
