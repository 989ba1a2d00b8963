//! Lotwise CLI - Report generation and database tools.
//!
//! # Usage
//!
//! ```bash
//! # Generate the June report from the database
//! lotwise report --from 2025-06-01 --to 2025-06-30
//!
//! # Generate JSON from a snapshot file, without a database
//! lotwise report --from 2025-06-01 --to 2025-06-30 --format json --snapshot snapshot.json
//!
//! # Run database migrations
//! lotwise migrate
//! ```
//!
//! # Commands
//!
//! - `report` - Generate a FIFO production report
//! - `migrate` - Run database migrations

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use lotwise_core::TenantId;
use lotwise_server::render::ReportFormat;

mod commands;

#[derive(Parser)]
#[command(name = "lotwise")]
#[command(author, version, about = "Lotwise CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a FIFO production report
    Report {
        /// First day of the report window (YYYY-MM-DD, inclusive)
        #[arg(long)]
        from: NaiveDate,

        /// Last day of the report window (YYYY-MM-DD, inclusive)
        #[arg(long)]
        to: NaiveDate,

        /// Restrict to one tenant's records
        #[arg(long)]
        tenant: Option<TenantId>,

        /// Output format (`html`, `json`)
        #[arg(short, long, default_value = "html")]
        format: ReportFormat,

        /// File to write the document to
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also persist the report to configured storage
        #[arg(long)]
        store: bool,

        /// Read records from a JSON snapshot file instead of the database
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },
    /// Run database migrations
    Migrate,
}

#[tokio::main]
async fn main() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "lotwise=info,lotwise_server=info,lotwise_core=info".into());
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Report {
            from,
            to,
            tenant,
            format,
            output,
            store,
            snapshot,
        } => {
            let args = commands::report::ReportArgs {
                from,
                to,
                tenant,
                format,
                output,
                store,
                snapshot,
            };
            commands::report::run(args).await?;
        }
        Commands::Migrate => commands::migrate::run().await?,
    }
    Ok(())
}
