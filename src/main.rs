//! User workload CLI.
//!
//! Loads configuration, wires the locator, breakers and typed clients, runs
//! one query and prints the result as JSON.
//!
//! ```text
//! user-workload [--config FILE] projects <manager>
//! user-workload [--config FILE] tasks <employee>
//! user-workload [--config FILE] workload <user>
//! user-workload [--config FILE] resolve-role <description>
//! user-workload [--config FILE] parse-user <file>
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde_json::json;
use tokio::sync::broadcast;

use user_workload::config::{load_config, WorkloadConfig};
use user_workload::discovery::InstanceRegistry;
use user_workload::health::HealthMonitor;
use user_workload::observability::{logging, metrics};
use user_workload::resilience::CircuitBreakerRegistry;
use user_workload::roles::{RoleRepository, RoleResolver, UserDto};
use user_workload::workload::{CountReport, WorkloadService};

#[derive(Parser)]
#[command(name = "user-workload")]
#[command(about = "Query peer services for a user's outstanding workload", long_about = None)]
struct Cli {
    /// TOML configuration file. Built-in defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Non-completed projects managed by a user
    Projects { manager: String },
    /// Non-completed tasks assigned to a user
    Tasks { employee: String },
    /// Both counts for a user, queried concurrently
    Workload { user: String },
    /// Resolve a role description to its persisted role
    ResolveRole { description: String },
    /// Parse a user payload from a JSON file, resolving its role
    ParseUser { file: PathBuf },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => WorkloadConfig::default(),
    };

    logging::init(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "user-workload starting");

    if config.observability.metrics_enabled {
        let addr: std::net::SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let registry = Arc::new(InstanceRegistry::new(&config.instances, &config.health_check));
    let breakers = CircuitBreakerRegistry::from_config(&config);
    let service = WorkloadService::from_config(&config, registry.clone(), &breakers)?;

    let roles = RoleResolver::new(Arc::new(RoleRepository::from_config(&config.roles)));

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let monitor = HealthMonitor::new(registry.clone(), config.health_check.clone())?;
    let monitor_handle = tokio::spawn(monitor.run(shutdown_rx));

    let output = match cli.command {
        Commands::Projects { manager } => {
            let result = service.projects().non_completed_count_by_manager(&manager).await;
            json!({
                "manager": manager,
                "projects": CountReport::from(&result),
                "breaker": service.projects().breaker().snapshot(),
            })
        }
        Commands::Tasks { employee } => {
            let result = service.tasks().non_completed_count_by_employee(&employee).await;
            json!({
                "employee": employee,
                "tasks": CountReport::from(&result),
                "breaker": service.tasks().breaker().snapshot(),
            })
        }
        Commands::Workload { user } => {
            let workload = service.workload(&user).await;
            json!({
                "user": workload.user_name,
                "projects": CountReport::from(&workload.projects),
                "tasks": CountReport::from(&workload.tasks),
                "breakers": breakers.snapshots(),
            })
        }
        Commands::ResolveRole { description } => {
            let role = roles.resolve(&description)?;
            serde_json::to_value(role)?
        }
        Commands::ParseUser { file } => {
            let bytes = tokio::fs::read(&file).await?;
            let user = UserDto::parse(&bytes, &roles)?;
            serde_json::to_value(user)?
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);

    let _ = shutdown_tx.send(());
    let _ = monitor_handle.await;

    tracing::info!("Shutdown complete");
    Ok(())
}
