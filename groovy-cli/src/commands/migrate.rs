//! Schema setup command

use anyhow::{Context, Result};
use clap::Parser;
use groovy_server::db::migrations;

use super::DatabaseArgs;

#[derive(Parser, Debug)]
pub struct MigrateArgs {
    #[command(flatten)]
    pub db: DatabaseArgs,
}

pub async fn run_migrate(args: MigrateArgs) -> Result<()> {
    let pool = args.db.connect().await?;
    migrations::run(&pool)
        .await
        .context("Failed to run migrations")?;
    println!("Schema is up to date");
    Ok(())
}
