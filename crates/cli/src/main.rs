//! Partsyard CLI - Database migrations and shop management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! partsyard migrate
//!
//! # Register a Telegram chat for new-order messages
//! partsyard recipients add -n "Front desk" -c 123456789
//!
//! # Mark order 42 as shipped
//! partsyard orders set-status 42 SHP
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `recipients` - Manage order notification recipients
//! - `orders` - List orders and update status or payment

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "partsyard")]
#[command(author, version, about = "Partsyard CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage order notification recipients
    Recipients {
        #[command(subcommand)]
        action: RecipientAction,
    },
    /// Inspect and update orders
    Orders {
        #[command(subcommand)]
        action: OrderAction,
    },
}

#[derive(Subcommand)]
enum RecipientAction {
    /// Register a Telegram chat
    Add {
        /// Display name for the recipient
        #[arg(short, long)]
        name: String,

        /// Telegram chat ID
        #[arg(short, long, allow_negative_numbers = true)]
        chat_id: i64,
    },
    /// List all recipients
    List,
    /// Stop notifying a chat
    Deactivate {
        /// Telegram chat ID
        #[arg(short, long, allow_negative_numbers = true)]
        chat_id: i64,
    },
}

#[derive(Subcommand)]
enum OrderAction {
    /// List all orders, newest first
    List,
    /// Set an order's status (`NEW`, `PRC`, `PAY`, `SPS`, `SHP`, `CMP`, `CNC`)
    SetStatus {
        /// Order ID
        id: i32,
        /// Three-letter status code
        status: String,
    },
    /// Set or clear an order's paid flag
    SetPaid {
        /// Order ID
        id: i32,
        /// Paid flag
        #[arg(long, action = clap::ArgAction::Set, default_value_t = true)]
        paid: bool,
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
        Commands::Recipients { action } => match action {
            RecipientAction::Add { name, chat_id } => {
                commands::recipients::add(&name, chat_id).await?;
            }
            RecipientAction::List => commands::recipients::list().await?,
            RecipientAction::Deactivate { chat_id } => {
                commands::recipients::deactivate(chat_id).await?;
            }
        },
        Commands::Orders { action } => match action {
            OrderAction::List => commands::orders::list().await?,
            OrderAction::SetStatus { id, status } => {
                commands::orders::set_status(id, &status).await?;
            }
            OrderAction::SetPaid { id, paid } => commands::orders::set_paid(id, paid).await?,
        },
    }
    Ok(())
}
