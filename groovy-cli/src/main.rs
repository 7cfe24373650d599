//! groovy CLI - run and administer the groovy backend
//!
//! - `serve`: apply the schema and run the HTTP API
//! - `migrate`: apply the schema only
//! - `create-superuser`: create a staff + superuser account

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod tracing_setup;

use tracing_setup::TracingConfig;

#[derive(Parser, Debug)]
#[command(
    name = "groovy",
    author,
    version,
    about = "Backend for the groovy university community app"
)]
struct Cli {
    /// Debug logging (unless RUST_LOG is set)
    #[arg(long, global = true)]
    debug: bool,

    /// Export traces over OTLP
    #[cfg(feature = "telemetry")]
    #[arg(long, global = true)]
    otel: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API server
    Serve(commands::serve::ServeArgs),
    /// Create or update the database schema and seed universities
    Migrate(commands::migrate::MigrateArgs),
    /// Create an administrator account
    CreateSuperuser(commands::superuser::SuperuserArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let tracing_config = TracingConfig {
        debug: cli.debug,
        #[cfg(feature = "telemetry")]
        otel: cli.otel,
        #[cfg(not(feature = "telemetry"))]
        otel: false,
    };
    tracing_setup::init(&tracing_config).ok();

    let result = match cli.command {
        Commands::Serve(args) => commands::run_serve(args).await,
        Commands::Migrate(args) => commands::run_migrate(args).await,
        Commands::CreateSuperuser(args) => commands::run_create_superuser(args).await,
    };

    tracing_setup::shutdown_otel();
    result
}
