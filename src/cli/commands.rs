pub mod import;
pub mod init_data;
pub mod recalculate;
pub mod serve;

pub use import::import_file;
pub use init_data::init_data;
pub use recalculate::recalculate;
pub use serve::serve;
