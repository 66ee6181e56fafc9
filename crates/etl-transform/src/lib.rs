pub mod cast;
pub mod clean;
pub mod columns;
pub mod datetime;
pub mod derive;
pub mod error;
pub mod filter;
pub mod metadata;
pub mod script;
pub mod validate;

pub use cast::{CastOnError, CastOptions, CastStep};
pub use clean::{CleanOptions, CleanStep};
pub use columns::{RenameColumnsStep, RenameOptions, SelectColumnsStep, SelectOptions};
pub use derive::{DeriveColumnStep, DeriveOp, DeriveOptions};
pub use error::TransformError;
pub use filter::{CompareOp, FilterOptions, FilterRowsStep};
pub use metadata::{AddMetadataOptions, AddMetadataStep};
pub use script::{CommandScriptResolver, CommandScriptStep};
pub use validate::{ValidateOptions, ValidateSchemaStep};

use etl_core::TransformRegistry;
use etl_core::registry::factory_for;

/// The default transform library, registered under stable names, with
/// external script support wired in.
pub fn default_registry() -> TransformRegistry {
    TransformRegistry::new()
        .with_builtin("clean", factory_for("clean", CleanStep::from_options))
        .with_builtin(
            "filter_rows",
            factory_for("filter_rows", FilterRowsStep::from_options),
        )
        .with_builtin(
            "derive_column",
            factory_for("derive_column", DeriveColumnStep::from_options),
        )
        .with_builtin(
            "add_metadata",
            factory_for("add_metadata", AddMetadataStep::from_options),
        )
        .with_builtin(
            "rename_columns",
            factory_for("rename_columns", RenameColumnsStep::from_options),
        )
        .with_builtin(
            "select_columns",
            factory_for("select_columns", SelectColumnsStep::from_options),
        )
        .with_builtin("cast", factory_for("cast", CastStep::from_options))
        .with_builtin(
            "validate_schema",
            factory_for("validate_schema", ValidateSchemaStep::from_options),
        )
        .with_script_resolver(Box::new(CommandScriptResolver))
}
