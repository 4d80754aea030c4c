use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod commands;

use crate::config::AppConfig;
use commands::{import_file, init_data, recalculate, serve};

#[derive(Parser)]
#[command(name = "sponsortrack")]
#[command(about = "SponsorTrack: child-sponsorship bookkeeping with a live web API")]
#[command(version)]
pub struct Cli {
    /// JSON file holding the dataset
    ///
    /// Overrides `data_file` from sponsortrack.toml.
    #[arg(short, long, global = true, env = "SPONSORTRACK_DATA_FILE")]
    pub data_file: Option<PathBuf>,

    /// EUR→UGX exchange rate used for every derived figure
    #[arg(short, long, global = true, env = "SPONSORTRACK_EXCHANGE_RATE")]
    pub exchange_rate: Option<f64>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the web server
    Serve {
        /// Bind address for the web server
        ///
        /// Format: IP:PORT (e.g., 0.0.0.0:3000, 127.0.0.1:8080)
        #[arg(short, long, env = "SPONSORTRACK_BIND_ADDRESS")]
        bind_address: Option<String>,
    },
    /// Write a fresh, empty dataset
    InitData {
        /// Overwrite an existing data file
        #[arg(short, long)]
        force: bool,
    },
    /// Recalculate every derived figure of the data file in place
    Recalculate,
    /// Bulk-import a JSON payload of students, sponsors and expenses
    ///
    /// The file holds `{ "students": {"CH": [...]}, "sponsors": {"CH": [...]},
    /// "expenses": [...] }`.
    Import {
        /// Path to the JSON payload
        #[arg(short, long)]
        json_path: PathBuf,

        /// students, sponsors, expenses or all
        #[arg(short, long, default_value = "all")]
        kind: String,

        /// replace, merge or append
        #[arg(short, long, default_value = "merge")]
        strategy: String,
    },
}

impl Cli {
    /// Resolves configuration, command line flags taking precedence.
    fn config(&self) -> Result<AppConfig> {
        let mut config = AppConfig::load()?;
        if let Some(data_file) = &self.data_file {
            config.data_file = data_file.clone();
        }
        if let Some(rate) = self.exchange_rate {
            config.exchange_rate = rate;
        }
        Ok(config)
    }

    pub async fn run(self) -> Result<()> {
        let mut config = self.config()?;
        match self.command {
            Commands::Serve { bind_address } => {
                if let Some(bind_address) = bind_address {
                    config.bind_address = bind_address;
                }
                serve(&config).await?;
            }
            Commands::InitData { force } => {
                init_data(&config, force).await?;
            }
            Commands::Recalculate => {
                recalculate(&config).await?;
            }
            Commands::Import { json_path, kind, strategy } => {
                import_file(&config, &json_path, &kind, &strategy).await?;
            }
        }
        Ok(())
    }
}
