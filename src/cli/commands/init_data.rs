use anyhow::{Result, bail};
use compute::recalculate;
use model::entities::Dataset;
use tracing::{info, debug, trace};

use crate::config::AppConfig;
use crate::store::{DatasetStore, JsonFileStore};

/// Writes an empty, recalculated dataset to the configured data file.
pub async fn init_data(config: &AppConfig, force: bool) -> Result<()> {
    trace!("Entering init_data function");
    let store = JsonFileStore::new(&config.data_file);

    if !force && store.load().await?.is_some() {
        bail!(
            "{} already holds a dataset; pass --force to overwrite it",
            config.data_file.display()
        );
    }

    let rate = config.rate();
    let mut dataset = Dataset::empty(rate.ugx_per_euro());
    let summary = recalculate(&mut dataset, rate);
    debug!("Initialized {} programs and {} registries", summary.programs, summary.registries);

    store.save(&dataset).await?;
    info!("Empty dataset written to {}", config.data_file.display());
    Ok(())
}
