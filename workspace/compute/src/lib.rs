pub mod edits;
pub mod error;
pub mod financial;
pub mod formula;
pub mod import;
pub mod recalc;
pub mod reports;

pub use edits::{EditOutcome, EntityRef};
pub use error::{ComputeError, Result};
pub use import::{ImportOptions, ImportOutcome, ImportPayload, apply_import};
pub use recalc::{RecalculationSummary, recalculate};

use common::ExchangeRate;
use model::entities::Dataset;

/// Applies an edit and recalculates the dataset when the edit succeeds.
///
/// The edit runs against a copy; the dataset is replaced only once both the
/// edit and the recalculation went through, so a rejected edit leaves it
/// untouched whatever the edit function did before failing.
pub fn apply_and_recalculate<T, F>(dataset: &mut Dataset, rate: ExchangeRate, edit: F) -> Result<T>
where
    F: FnOnce(&mut Dataset, ExchangeRate) -> Result<T>,
{
    let mut working = dataset.clone();
    let output = edit(&mut working, rate)?;
    recalculate(&mut working, rate);
    *dataset = working;
    Ok(output)
}
