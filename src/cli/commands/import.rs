use anyhow::{Context, Result};
use chrono::Utc;
use compute::{ImportOptions, ImportPayload};
use model::entities::{ImportKind, MergeStrategy};
use serde::de::DeserializeOwned;
use std::path::Path;
use tracing::{info, debug, trace, warn};

use crate::config::{AppConfig, open_repository};
use crate::events::{EventBus, UpdateKind};

fn parse_choice<T: DeserializeOwned>(what: &str, raw: &str) -> Result<T> {
    serde_json::from_value(serde_json::Value::String(raw.trim().to_ascii_lowercase()))
        .with_context(|| format!("unknown {} '{}'", what, raw))
}

/// Imports a JSON payload into the configured data file.
pub async fn import_file(config: &AppConfig, json_path: &Path, kind: &str, strategy: &str) -> Result<()> {
    trace!("Entering import_file function");
    let kind: ImportKind = parse_choice("import kind", kind)?;
    let strategy: MergeStrategy = parse_choice("merge strategy", strategy)?;

    let bytes = tokio::fs::read(json_path)
        .await
        .with_context(|| format!("failed to read {}", json_path.display()))?;
    let payload: ImportPayload = serde_json::from_slice(&bytes)
        .with_context(|| format!("failed to parse {}", json_path.display()))?;
    debug!("Read import payload from {}", json_path.display());

    let options = ImportOptions {
        kind,
        strategy,
        file_name: json_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| json_path.display().to_string()),
        imported_at: Utc::now(),
    };

    let repository = open_repository(config, EventBus::new()).await?;
    let committed = repository
        .mutate(UpdateKind::DataImported, move |dataset, rate| {
            let outcome = compute::apply_import(dataset, payload, &options, rate);
            Ok((options.entity(), outcome))
        })
        .await?;

    let (_, outcome) = committed.output;
    for warning in &outcome.warnings {
        warn!("{} '{}' {}, stored as 0", warning.field, warning.raw, warning.reason);
    }
    info!(
        "Imported {} students, {} sponsors and {} expenses ({} sponsors rejected, {} rows skipped)",
        outcome.students, outcome.sponsors, outcome.expenses, outcome.rejected_sponsors, outcome.skipped
    );
    Ok(())
}
