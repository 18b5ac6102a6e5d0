//! Alankree CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! alankree-cli migrate
//!
//! # Load the sample catalog, replacing existing products
//! alankree-cli seed products --replace
//!
//! # Print an argon2 hash for ADMIN_PASSWORD_HASH
//! alankree-cli admin hash-password 'correct horse battery staple'
//!
//! # Reset a customer's password
//! alankree-cli user set-password -e priya@example.com -p 'new-password'
//! ```
//!
//! # Environment Variables
//!
//! - `DATABASE_URL` - `PostgreSQL` connection string (all database commands)

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "alankree-cli")]
#[command(author, version, about = "Alankree CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed the database
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
    /// Back-office account tools
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Customer account tools
    User {
        #[command(subcommand)]
        action: UserAction,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Insert the sample catalog
    Products {
        /// YAML catalog file (defaults to the bundled sample catalog)
        #[arg(short, long)]
        file: Option<String>,

        /// Delete every existing product first
        #[arg(long)]
        replace: bool,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Print an argon2 hash for `ADMIN_PASSWORD_HASH`
    HashPassword {
        /// Plain-text password
        password: String,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Set a customer's password
    SetPassword {
        /// Account email address
        #[arg(short, long)]
        email: String,

        /// New password
        #[arg(short, long)]
        password: String,
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
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { target } => match target {
            SeedTarget::Products { file, replace } => {
                commands::seed::products(file.as_deref(), replace).await?;
            }
        },
        Commands::Admin { action } => match action {
            AdminAction::HashPassword { password } => {
                commands::admin::hash_password(&password)?;
            }
        },
        Commands::User { action } => match action {
            UserAction::SetPassword { email, password } => {
                commands::user::set_password(&email, &password).await?;
            }
        },
    }
    Ok(())
}
