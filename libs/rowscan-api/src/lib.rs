// Lets `#[derive(Record)]` output, which names `::rowscan_api`, compile
// inside this crate's own tests.
extern crate self as rowscan_api;

pub mod convert;
pub mod converter;
pub mod cursor;
pub mod error;
pub mod mapping;
pub mod record;
pub mod schema;
pub mod value;

pub use record::Record;
pub use rowscan_api_derive::Record;
