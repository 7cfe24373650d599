//! Administrator account creation
//!
//! Superusers belong to YONSEI, class of 2018, first grade.

use anyhow::{Context, Result};
use clap::Parser;
use groovy_server::db::{migrations, NewUser, UniversityRepo, UserRepo};
use groovy_server::models::{Email, UniversityName};

use super::DatabaseArgs;

#[derive(Parser, Debug)]
pub struct SuperuserArgs {
    /// Login email
    #[arg(long)]
    pub email: String,

    /// Login password
    #[arg(long, env = "GROOVY_SUPERUSER_PASSWORD", hide_env_values = true)]
    pub password: String,

    #[command(flatten)]
    pub db: DatabaseArgs,
}

pub async fn run_create_superuser(args: SuperuserArgs) -> Result<()> {
    let email = Email::new(&args.email).context("Invalid email")?;

    let pool = args.db.connect().await?;
    migrations::run(&pool)
        .await
        .context("Failed to run migrations")?;

    let university = UniversityRepo::new(&pool)
        .get_by_name(UniversityName::Yonsei)
        .await
        .context("Default university missing")?;

    let new = NewUser::superuser(email, &args.password, university.id)
        .context("Invalid superuser fields")?;
    let user = UserRepo::new(&pool)
        .create(new)
        .await
        .context("Failed to create superuser")?;

    println!("Created superuser {}", user.display());
    Ok(())
}
