//! Out-of-band maintenance: admin promotion and catalog seeding. These are
//! deliberately not exposed over HTTP.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sinfonia::{
    app,
    auth::repo::{PgUserStore, UserStore},
    db,
    error::StoreError,
    products::{repo::PgProductStore, services::seed_from_json},
};

#[derive(Parser)]
#[command(name = "sinfonia-admin", about = "Maintenance commands for the sinfonia backend")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Grant the admin flag to an existing user
    Promote { email: String },
    /// Revoke the admin flag
    Demote { email: String },
    /// Replace the product catalog with a JSON array of products
    SeedProducts { file: PathBuf },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    app::init_tracing();
    let cli = Cli::parse();

    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let pool = db::connect(&database_url).await?;
    db::migrate(&pool).await?;

    match cli.command {
        Command::Promote { email } => set_admin(PgUserStore::new(pool), &email, true).await,
        Command::Demote { email } => set_admin(PgUserStore::new(pool), &email, false).await,
        Command::SeedProducts { file } => {
            let json = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("read {}", file.display()))?;
            let n = seed_from_json(&PgProductStore::new(pool), &json).await?;
            tracing::info!(count = n, "products seeded");
            Ok(())
        }
    }
}

async fn set_admin(store: PgUserStore, email: &str, is_admin: bool) -> anyhow::Result<()> {
    match store.set_admin(email, is_admin).await {
        Ok(user) => {
            tracing::info!(user_id = %user.id, email = %user.email, is_admin, "admin flag updated");
            Ok(())
        }
        Err(StoreError::NotFound) => anyhow::bail!("no user with email {email}"),
        Err(e) => Err(e.into()),
    }
}
