//! Storage Advisor CLI
//!
//! A command-line tool for querying storage recommendations and costs from
//! the advisor service, or analyzing an inventory snapshot locally.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use commands::{analyze, catalog, costs, recommendations};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Storage Advisor CLI
#[derive(Parser)]
#[command(name = "sadv")]
#[command(author, version, about = "CLI for the Storage Cost Advisor", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via SADV_API_URL env var)
    #[arg(long, env = "SADV_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short, global = true)]
    pub format: Option<output::OutputFormat>,

    /// Print engine logs to stderr
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Get storage recommendations from the service
    #[command(subcommand)]
    Get(GetCommands),

    /// View cost analysis and savings
    #[command(subcommand)]
    Costs(CostsCommands),

    /// Analyze an inventory snapshot locally
    Analyze {
        /// Inventory snapshot (JSON)
        #[arg(long, short)]
        inventory: PathBuf,

        /// Baseline utilization percent below which downgrades are searched for
        #[arg(long)]
        threshold: Option<f64>,

        /// Length of the analysis window in days
        #[arg(long)]
        window_days: Option<u32>,

        /// Price every resource in this region instead of its own
        #[arg(long)]
        region: Option<String>,

        /// End of the analysis window (RFC 3339); defaults to now
        #[arg(long)]
        as_of: Option<DateTime<Utc>>,
    },

    /// Show the tier catalog
    Catalog {
        /// Only this storage class (premium_ssd, standard_ssd, standard_hdd, object_storage)
        #[arg(long, short)]
        class: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum GetCommands {
    /// Get recommendations
    Recommendations {
        /// Filter by account id or name
        #[arg(long, short)]
        account: Option<String>,

        /// Filter by kind (e.g. downgrade, decommission_candidate)
        #[arg(long, short)]
        kind: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum CostsCommands {
    /// Show cost analysis
    Show {
        /// Filter by account id or name (shows all accounts if not specified)
        #[arg(long, short)]
        account: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new("debug"))
            .with_writer(std::io::stderr)
            .init();
    }

    let config = config::Config::load()?;
    let format = config.format(cli.format)?;

    match cli.command {
        Commands::Get(GetCommands::Recommendations { account, kind }) => {
            let client = client::ApiClient::new(&config.api_url(cli.api_url))?;
            recommendations::get_recommendations(&client, account, kind, format).await?;
        }
        Commands::Costs(CostsCommands::Show { account }) => {
            let client = client::ApiClient::new(&config.api_url(cli.api_url))?;
            costs::show_costs(&client, account, format).await?;
        }
        Commands::Analyze {
            inventory,
            threshold,
            window_days,
            region,
            as_of,
        } => {
            let options = analyze::AnalyzeOptions {
                threshold,
                window_days,
                region,
                as_of,
            };
            analyze::analyze(&inventory, options, format).await?;
        }
        Commands::Catalog { class } => {
            catalog::show_catalog(class, format)?;
        }
    }

    Ok(())
}
