//! Sunleaf CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! sunleaf-cli migrate run
//!
//! # Create an admin account (password read from ADMIN_PASSWORD)
//! sunleaf-cli admin create -u kavi -e admin@sunleaf.farm -n "Kavi" -p 9876543210
//! ```
//!
//! # Commands
//!
//! - `migrate run` - Run database migrations
//! - `admin create` - Create an admin account

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "sunleaf-cli")]
#[command(author, version, about = "Sunleaf CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate {
        #[command(subcommand)]
        action: MigrateAction,
    },
    /// Manage admin accounts
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum MigrateAction {
    /// Apply all pending migrations
    Run,
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create a new admin account
    Create {
        /// Login username
        #[arg(short, long)]
        username: String,

        /// Email address
        #[arg(short, long)]
        email: String,

        /// Display name
        #[arg(short, long)]
        name: String,

        /// Phone number (10 digits, used for password recovery)
        #[arg(short, long)]
        phone: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
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
        Commands::Migrate { action } => match action {
            MigrateAction::Run => commands::migrate::run().await?,
        },
        Commands::Admin { action } => match action {
            AdminAction::Create {
                username,
                email,
                name,
                phone,
            } => {
                commands::admin::create_admin(&username, &email, &name, &phone).await?;
            }
        },
    }
    Ok(())
}
