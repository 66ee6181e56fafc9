pub mod retry;
pub mod values;

pub use retry::{RetryPolicy, retry_with_backoff};
pub use values::{
    any_to_f64, any_to_i64, any_to_string, any_to_string_non_empty, format_numeric, is_missing,
    parse_bool, parse_f64, parse_i64,
};
