//! Schema and message inputs.

use std::path::Path;

use crate::config::ConfigError;

/// Return the contents of the file at `value` if such a file exists,
/// otherwise `value` itself.
///
/// `field` names the option in error messages.
pub fn read_file_or_literal(field: &'static str, value: &str) -> Result<String, ConfigError> {
    let path = Path::new(value);
    if !path.is_file() {
        return Ok(value.to_string());
    }

    tracing::debug!("Reading {field} from {}", path.display());
    std::fs::read_to_string(path).map_err(|source| ConfigError::ReadInput {
        field,
        path: path.to_path_buf(),
        source,
    })
}
