//! Command implementations for the groovy CLI

pub mod migrate;
pub mod serve;
pub mod superuser;

use anyhow::{Context, Result};
use clap::Args;
use groovy_server::db::{create_pool_with_options, pool::DEFAULT_MAX_CONNECTIONS};
use sqlx::PgPool;

pub use migrate::run_migrate;
pub use serve::run_serve;
pub use superuser::run_create_superuser;

/// Database connection flags shared by every command
#[derive(Args, Debug)]
pub struct DatabaseArgs {
    /// PostgreSQL connection URL
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    /// Maximum pooled connections
    #[arg(long, env = "GROOVY_MAX_CONNECTIONS", default_value_t = DEFAULT_MAX_CONNECTIONS)]
    pub max_connections: u32,
}

impl DatabaseArgs {
    pub async fn connect(&self) -> Result<PgPool> {
        create_pool_with_options(&self.database_url, self.max_connections)
            .await
            .context("Failed to create database pool")
    }
}
