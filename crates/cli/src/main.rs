//! Tourvisto CLI - Database migrations and elevation approvals.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! tv-cli migrate
//!
//! # List pending admin requests
//! tv-cli requests list --status pending
//!
//! # Approve or reject an account's admin request
//! tv-cli requests approve -a 5c1f9a3e-...
//! tv-cli requests reject -a 5c1f9a3e-...
//!
//! # Page through profiles
//! tv-cli profiles list --limit 20 --offset 40
//! ```
//!
//! # Environment Variables
//!
//! - `TOURVISTO_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

use tourvisto_core::RequestStatus;

mod commands;

#[derive(Parser)]
#[command(name = "tv-cli")]
#[command(author, version, about = "Tourvisto CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Review admin elevation requests
    Requests {
        #[command(subcommand)]
        action: RequestAction,
    },
    /// Inspect profiles
    Profiles {
        #[command(subcommand)]
        action: ProfileAction,
    },
}

#[derive(Subcommand)]
enum RequestAction {
    /// List elevation requests
    List {
        /// Only show requests in this status (`pending`, `approved`, `rejected`)
        #[arg(short, long)]
        status: Option<RequestStatus>,
    },
    /// Approve a pending request and make the account an admin
    Approve {
        /// Identity provider account id
        #[arg(short, long)]
        account: String,
    },
    /// Reject a pending request
    Reject {
        /// Identity provider account id
        #[arg(short, long)]
        account: String,
    },
}

#[derive(Subcommand)]
enum ProfileAction {
    /// List profiles, oldest first
    List {
        #[arg(short, long, default_value_t = 50)]
        limit: i64,

        #[arg(short, long, default_value_t = 0)]
        offset: i64,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Requests { action } => match action {
            RequestAction::List { status } => commands::requests::list(status).await?,
            RequestAction::Approve { account } => commands::requests::approve(&account).await?,
            RequestAction::Reject { account } => commands::requests::reject(&account).await?,
        },
        Commands::Profiles { action } => match action {
            ProfileAction::List { limit, offset } => {
                commands::profiles::list(limit, offset).await?;
            }
        },
    }
    Ok(())
}
