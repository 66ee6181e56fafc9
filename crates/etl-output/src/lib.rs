pub mod csv_target;
pub mod json_target;

pub use csv_target::{CsvLoad, CsvTargetOptions};
pub use json_target::{JsonLoad, JsonTargetOptions};

use std::path::Path;

use anyhow::{Context, Result};

/// Create the destination's parent directory if it does not exist.
pub(crate) fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create {}", parent.display()))?;
    }
    Ok(())
}

/// Transient write failures worth one more attempt.
pub(crate) fn is_transient_io(error: &anyhow::Error) -> bool {
    error
        .chain()
        .filter_map(|cause| cause.downcast_ref::<std::io::Error>())
        .any(|io| {
            matches!(
                io.kind(),
                std::io::ErrorKind::Interrupted
                    | std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::WouldBlock
            )
        })
}
