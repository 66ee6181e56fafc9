pub mod csv_source;
pub mod error;
pub mod json_source;

pub use csv_source::{CsvExtract, CsvOptions};
pub use error::IngestError;
pub use json_source::{JsonExtract, JsonOptions};
