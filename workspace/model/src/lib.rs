pub mod entities;
pub mod error;
pub mod numeric;

pub use error::{ModelError, Result};

// Re-export tracing for use in this crate
pub use tracing;
