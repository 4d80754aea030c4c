use anyhow::{Context, Result};
use common::{DEFAULT_EXCHANGE_RATE, ExchangeRate};
use config::{Config, Environment, File};
use moka::future::Cache;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::events::EventBus;
use crate::repository::Repository;
use crate::schemas::AppState;
use crate::store::JsonFileStore;

pub const DEFAULT_DATA_FILE: &str = "sponsortrack.json";
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:3000";

/// Runtime configuration.
///
/// Layered from built-in defaults, an optional `sponsortrack.{toml,yaml,json}`
/// in the working directory, then `SPONSORTRACK_*` environment variables
/// (after `.env` is loaded). Command line flags override the result.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AppConfig {
    /// JSON file holding the dataset
    pub data_file: PathBuf,
    pub bind_address: String,
    /// UGX per EUR
    pub exchange_rate: f64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_file: PathBuf::from(DEFAULT_DATA_FILE),
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            exchange_rate: DEFAULT_EXCHANGE_RATE,
        }
    }
}

impl AppConfig {
    /// Loads `.env`, the optional config file and the environment.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config::builder()
            .set_default("data_file", DEFAULT_DATA_FILE)?
            .set_default("bind_address", DEFAULT_BIND_ADDRESS)?
            .set_default("exchange_rate", DEFAULT_EXCHANGE_RATE)?
            .add_source(File::with_name("sponsortrack").required(false))
            .add_source(Environment::with_prefix("SPONSORTRACK"))
            .build()
            .context("failed to read configuration")?;

        let config: AppConfig = config
            .try_deserialize()
            .context("invalid configuration")?;
        debug!("Loaded configuration: {:?}", config);
        Ok(config)
    }

    pub fn rate(&self) -> ExchangeRate {
        ExchangeRate::new(self.exchange_rate)
    }
}

/// Opens the file-backed repository described by `config`.
pub async fn open_repository(config: &AppConfig, bus: EventBus) -> Result<Repository> {
    info!("Opening dataset at {}", config.data_file.display());
    let store = Arc::new(JsonFileStore::new(&config.data_file));
    let repository = Repository::open(store, bus, config.rate()).await?;
    Ok(repository)
}

/// Initialize application state
pub async fn initialize_app_state(config: &AppConfig) -> Result<AppState> {
    let repository = open_repository(config, EventBus::new()).await?;

    // Initialize cache
    let cache = Cache::builder()
        .max_capacity(100)
        .time_to_live(Duration::from_secs(300)) // 5 minutes
        .build();

    Ok(AppState::new(Arc::new(repository), cache))
}
