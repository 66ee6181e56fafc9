use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("no readable schema: {path} has no header row")]
    EmptySource { path: PathBuf },

    #[error("{path}: malformed records document: expected a JSON array of objects or one object per line")]
    UnsupportedJsonShape { path: PathBuf },
}
