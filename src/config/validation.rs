//! Configuration validation.
//!
//! # Responsibilities
//! - Structural checks on a resolved document (serde handles syntax)
//! - Reject documents with nothing to run: the required section must exist
//!   and hold at least one entry
//!
//! # Design Decisions
//! - Validation is a pure function over the resolved document
//! - The document's own schema is left to its consumers

use serde_yaml::Value;

use crate::config::document::ConfigDocument;
use crate::config::error::ConfigError;

/// Check that `required_section` is present and non-empty.
///
/// An empty section name disables the check.
pub fn validate(config: &ConfigDocument, required_section: &str) -> Result<(), ConfigError> {
    if required_section.is_empty() {
        return Ok(());
    }

    let populated = match config.get(required_section) {
        Some(Value::Mapping(entries)) => !entries.is_empty(),
        Some(Value::Sequence(entries)) => !entries.is_empty(),
        _ => false,
    };

    if populated {
        Ok(())
    } else {
        Err(ConfigError::Validation(format!(
            "no entries defined in '{required_section}'"
        )))
    }
}
