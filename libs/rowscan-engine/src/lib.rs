pub mod array;
pub mod bind;
pub mod cache;
pub mod config;
pub mod convert;
pub mod error;
pub mod memory;
pub mod reflect;
pub mod registry;
pub mod scan;
pub mod scanner;

pub use cache::ScanCache;
pub use config::ScanConfig;
pub use error::{RowError, ScanError};
pub use memory::MemoryCursor;
pub use scanner::{RowStream, Rows, ScanOutcome, Scanner};
