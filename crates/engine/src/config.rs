//! Validator options loaded from TOML.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::validator::Severity;

/// Errors that can occur when loading [`ValidatorOptions`].
#[derive(Debug, Error)]
pub enum ConfigError {
	/// The document is not valid TOML or does not match the options schema.
	#[error("TOML parse error: {0}")]
	Parse(#[from] toml::de::Error),

	/// The options could not be serialized.
	#[error("TOML serialize error: {0}")]
	Serialize(#[from] toml::ser::Error),
}

/// Tunables of a validator node.
///
/// ```toml
/// minimum_severity = "warning"
/// suppress_invalidatable_field_models = true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ValidatorOptions {
	/// Inclusive threshold: failures below it are not surfaced.
	pub minimum_severity: Severity,
	/// Warn and skip instead of failing when a changed field's model is one
	/// the validator cannot validate.
	pub suppress_invalidatable_field_models: bool,
	/// Warn and skip instead of failing when a field changes on a model no
	/// declared route reaches.
	pub suppress_unregistered_routes: bool,
}

impl Default for ValidatorOptions {
	fn default() -> Self {
		Self {
			minimum_severity: Severity::Info,
			suppress_invalidatable_field_models: false,
			suppress_unregistered_routes: false,
		}
	}
}

impl ValidatorOptions {
	pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
		Ok(toml::from_str(input)?)
	}

	pub fn to_toml_string(&self) -> Result<String, ConfigError> {
		Ok(toml::to_string(self)?)
	}
}
