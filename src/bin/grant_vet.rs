//! Grants the veterinarian flag to an existing user, creating the vet
//! profile when the account has none.
//!
//! Run with: cargo run --bin grant-vet -- veterinario1

use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use tracing::info;

use vetclinic_api::{config, db, errors::ServiceError, services::users::UserService};

#[derive(Parser, Debug)]
#[command(name = "grant-vet", about = "Mark a user as a veterinarian")]
struct Cli {
    /// Username to grant the veterinarian flag to
    username: String,

    /// Database URL; defaults to the configured `database_url`
    #[arg(long)]
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut cfg = config::load_config().context("failed to load configuration")?;
    config::init_tracing(cfg.log_level(), false);
    if let Some(url) = cli.database_url {
        cfg.database_url = url;
    }

    let pool = db::establish_connection_from_app_config(&cfg).await?;
    let users = UserService::new(Arc::new(pool));

    match users.grant_vet(&cli.username).await {
        Ok(profile) => {
            info!(user_id = %profile.user_id, "veterinarian flag granted");
            println!("[OK] {} is now a veterinarian", cli.username);
            Ok(())
        }
        Err(ServiceError::NotFound(_)) => {
            anyhow::bail!("user \"{}\" not found", cli.username)
        }
        Err(err) => Err(err.into()),
    }
}
