//! HTTP server command
//!
//! Applies the schema, then serves the API until Ctrl+C or SIGTERM.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::Parser;
use groovy_server::db::migrations;
use groovy_server::http::{run_server, ServerConfig};

use super::DatabaseArgs;

#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Address to bind to
    #[arg(long, short = 'b', env = "GROOVY_BIND", default_value = "127.0.0.1:8000")]
    pub bind: SocketAddr,

    /// Allow permissive CORS (all origins) - use with caution
    #[arg(long)]
    pub cors_permissive: bool,

    #[command(flatten)]
    pub db: DatabaseArgs,
}

pub async fn run_serve(args: ServeArgs) -> Result<()> {
    tracing::info!("Starting groovy server on {}", args.bind);

    let pool = args.db.connect().await?;
    migrations::run(&pool)
        .await
        .context("Failed to run migrations")?;

    let config = ServerConfig {
        bind_addr: args.bind,
        cors_permissive: args.cors_permissive,
    };

    run_server(pool, config).await.context("Server error")?;
    Ok(())
}
