//! Conversion options.
//!
//! The core never reads files; a host (the CLI, a service) deserializes this
//! struct from wherever it keeps settings and hands it to the pipeline.

use crate::error::ConvertError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Emitted verbatim as `package <name>;`. Empty skips the line.
    pub package_name: String,
    /// Spaces per nesting level. Must be at least 1.
    pub indent_size: usize,
    pub add_access_modifiers: bool,
    /// When false every binding renders as `Object`.
    pub enable_type_inference: bool,
    /// Maximum cached conversions. 0 disables caching.
    pub cache_capacity: usize,
    /// Replace constant arithmetic by its result before inference.
    pub fold_constants: bool,
    pub emit_imports: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            package_name: "generated".into(),
            indent_size: 4,
            add_access_modifiers: true,
            enable_type_inference: true,
            cache_capacity: 1000,
            fold_constants: false,
            emit_imports: true,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConvertError> {
        if self.indent_size == 0 {
            return Err(ConvertError::InvalidConfig(
                "indentSize must be at least 1".into(),
            ));
        }
        let valid_segment = |segment: &str| {
            let mut chars = segment.chars();
            chars
                .next()
                .is_some_and(|c| c.is_alphabetic() || c == '_')
                && chars.all(|c| c.is_alphanumeric() || c == '_')
        };
        if !self.package_name.is_empty() && !self.package_name.split('.').all(valid_segment) {
            return Err(ConvertError::InvalidConfig(format!(
                "packageName `{}` is not a dotted identifier",
                self.package_name
            )));
        }
        Ok(())
    }

    /// Stable serialized form, used as the configuration part of a fingerprint.
    pub fn fingerprint_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap_or_default()
    }
}
