use anyhow::{Context, Result};
use tracing::{info, trace};

use crate::config::AppConfig;
use crate::store::{DatasetStore, JsonFileStore};

/// Recalculates the data file in place with the configured exchange rate.
pub async fn recalculate(config: &AppConfig) -> Result<()> {
    trace!("Entering recalculate function");
    let store = JsonFileStore::new(&config.data_file);
    let mut dataset = store
        .load()
        .await?
        .with_context(|| format!("{} does not exist; run init-data first", config.data_file.display()))?;

    let summary = compute::recalculate(&mut dataset, config.rate());
    store.save(&dataset).await?;

    info!(
        "Recalculated {} students and {} sponsors across {} programs",
        summary.students, summary.sponsors, summary.programs
    );
    Ok(())
}
