use std::sync::Arc;

use assign_core::{AssignmentService, NamedLockRegistry, SchedulerConfig, TomlPolicyStore};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};

mod commands;
mod json_store;

use json_store::JsonFileStore;

/// The policy port backing this CLI: a TOML file under the same data
/// directory as the booking/interpreter state.
pub type PolicyStoreImpl = TomlPolicyStore;

#[derive(Parser)]
#[command(name = "assign-cli", version)]
#[command(about = "CLI front-end for the interpreter auto-assignment engine", long_about = None)]
struct Cli {
    /// Override the state file path (defaults to the platform data directory)
    #[arg(long, global = true)]
    state_file: Option<std::path::PathBuf>,
    /// Override the policy TOML path (defaults alongside the state file)
    #[arg(long, global = true)]
    policy_file: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Booking lifecycle operations
    Booking {
        #[command(subcommand)]
        action: commands::booking::BookingAction,
    },
    /// Auto-assignment operations
    Assign {
        #[command(subcommand)]
        action: commands::assign::AssignAction,
    },
    /// Administrative overrides
    Admin {
        #[command(subcommand)]
        action: commands::admin::AdminAction,
    },
    /// Demo data seeding
    Seed {
        #[command(subcommand)]
        action: commands::seed::SeedAction,
    },
    /// Generate shell completion script
    Complete {
        /// Shell type (bash, zsh, fish, elvish, powershell)
        shell: Shell,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Commands::Complete { shell } = cli.command {
        print_completions(shell);
        return;
    }

    let result = run(cli).await;
    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let state_path = cli.state_file.unwrap_or_else(json_store::default_store_path);
    let policy_path = cli.policy_file.unwrap_or_else(|| {
        state_path
            .parent()
            .map(|dir| dir.join("policy.toml"))
            .unwrap_or_else(|| std::path::PathBuf::from("policy.toml"))
    });

    let store = Arc::new(JsonFileStore::open(&state_path)?);
    let policy_store = Arc::new(TomlPolicyStore::new(policy_path));
    let lock = Arc::new(NamedLockRegistry::default());
    let service = AssignmentService::new(store.clone(), policy_store, lock, SchedulerConfig::default());

    match cli.command {
        Commands::Booking { action } => commands::booking::run(&service, action).await?,
        Commands::Assign { action } => commands::assign::run(&service, action).await?,
        Commands::Admin { action } => commands::admin::run(&service, action).await?,
        Commands::Seed { action } => commands::seed::run(&store, action).await?,
        Commands::Complete { .. } => unreachable!("handled before service construction"),
    }

    Ok(())
}

fn print_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let name = "assign-cli";
    generate(shell, &mut cmd, name, &mut std::io::stdout());
}
