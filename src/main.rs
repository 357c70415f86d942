use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use leadflow_core::{
    config::Config,
    domain::{Actor, Role},
    notify::{Notifier, TracingNotifier},
    policy,
    repository::JsonFileRepository,
    routing::CancelFlag,
    service::RoutingService,
    telemetry,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "leadflow", version, about = "Lead routing and deduplication")]
struct Cli {
    /// Snapshot JSON path (overrides LEADFLOW_SNAPSHOT_PATH)
    #[arg(long, global = true, value_name = "PATH")]
    snapshot: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Assign unassigned leads and scan for duplicates
    Run(ActorArgs),
    /// Scan visible leads for duplicate groups
    Scan(ActorArgs),
    /// Merge a pending duplicate group
    Merge(GroupArgs),
    /// Mark a pending duplicate group as not a duplicate
    Ignore(GroupArgs),
    /// Put an ignored duplicate group back up for review
    Retrigger(GroupArgs),
    /// Show the permissions and views of a role
    Permissions {
        #[arg(long)]
        role: Role,
    },
}

#[derive(Args)]
struct ActorArgs {
    /// Acting user id
    #[arg(long)]
    actor_id: String,
    /// Acting user role (super-admin, admin, sales-manager, sales-rep)
    #[arg(long)]
    role: Role,
    /// Acting user display name
    #[arg(long, default_value = "")]
    name: String,
}

impl ActorArgs {
    fn actor(&self) -> Actor {
        Actor::new(self.actor_id.clone(), self.role, self.name.clone())
    }
}

#[derive(Args)]
struct GroupArgs {
    #[command(flatten)]
    actor: ActorArgs,
    /// Duplicate group id
    group_id: String,
}

#[derive(Serialize)]
struct RolePermissions {
    role: Role,
    permissions: Vec<&'static str>,
    views: Vec<&'static str>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let mut config = Config::from_env()?;
    if let Some(path) = cli.snapshot {
        config.storage.snapshot_path = path;
    }
    let _metrics = telemetry::init(&config.telemetry)?;

    if let Commands::Permissions { role } = &cli.command {
        return print_json(&RolePermissions {
            role: *role,
            permissions: policy::permissions_for(*role),
            views: policy::accessible_views(*role),
        });
    }

    info!(
        snapshot = %config.storage.snapshot_path.display(),
        "Starting Leadflow"
    );
    let repo = Arc::new(JsonFileRepository::new(config.storage.snapshot_path.clone()));
    let notifier: Arc<dyn Notifier> = Arc::new(TracingNotifier);
    let service = RoutingService::new(repo, config, Some(notifier));

    match cli.command {
        Commands::Run(args) => {
            let cancel = CancelFlag::new();
            let on_signal = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    on_signal.cancel();
                }
            });
            let report = service.run_cycle(&args.actor(), &cancel).await?;
            print_json(&report)
        }
        Commands::Scan(args) => print_json(&service.scan_duplicates(&args.actor()).await?),
        Commands::Merge(args) => {
            print_json(&service.merge_group(&args.actor.actor(), &args.group_id).await?)
        }
        Commands::Ignore(args) => {
            print_json(&service.ignore_group(&args.actor.actor(), &args.group_id).await?)
        }
        Commands::Retrigger(args) => {
            print_json(&service.retrigger_group(&args.actor.actor(), &args.group_id).await?)
        }
        Commands::Permissions { .. } => Ok(()),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
