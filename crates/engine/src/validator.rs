//! The boundary to the validation rule engine.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use editscope_session::ModelRef;
use parking_lot::RwLock;
use rustc_hash::FxHashMap as HashMap;
use serde::{Deserialize, Serialize};

/// Severity of a validation failure, ordered `Error > Warning > Info`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
	Error,
	Warning,
	Info,
}

impl Severity {
	const fn rank(self) -> u8 {
		match self {
			Self::Error => 2,
			Self::Warning => 1,
			Self::Info => 0,
		}
	}

	/// Whether this severity passes the inclusive `minimum`.
	pub fn meets(self, minimum: Severity) -> bool {
		self >= minimum
	}
}

impl PartialOrd for Severity {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl Ord for Severity {
	fn cmp(&self, other: &Self) -> Ordering {
		self.rank().cmp(&other.rank())
	}
}

/// One failed rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailure {
	/// Property path relative to the validated model, e.g. `Child.Hello`.
	pub property_name: String,
	pub message: String,
	pub severity: Severity,
}

impl ValidationFailure {
	pub fn new(property_name: impl Into<String>, message: impl Into<String>) -> Self {
		Self {
			property_name: property_name.into(),
			message: message.into(),
			severity: Severity::Error,
		}
	}

	#[must_use]
	pub fn with_severity(mut self, severity: Severity) -> Self {
		self.severity = severity;
		self
	}
}

/// Options a validator honours for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationStrategy {
	include_properties: Vec<String>,
}

impl ValidationStrategy {
	/// Restricts the run to `property` (and everything beneath it).
	pub fn include_property(&mut self, property: impl Into<String>) -> &mut Self {
		self.include_properties.push(property.into());
		self
	}

	pub fn included_properties(&self) -> &[String] {
		&self.include_properties
	}

	/// Whether rules for `property` should run. Without includes, all run.
	pub fn includes(&self, property: &str) -> bool {
		self.include_properties.is_empty()
			|| self.include_properties.iter().any(|included| {
				property == included
					|| property
						.strip_prefix(included.as_str())
						.is_some_and(|rest| rest.starts_with('.') || rest.starts_with('['))
			})
	}
}

/// Host hook adjusting the strategy of every run.
pub type ConfigureStrategy = Arc<dyn Fn(&mut ValidationStrategy) + Send + Sync>;

/// A rule engine for one kind of model.
pub trait Validator: Send + Sync {
	/// Whether `model` is a kind this validator knows.
	fn can_validate(&self, model: &ModelRef) -> bool;

	fn validate(&self, model: &ModelRef, strategy: &ValidationStrategy) -> Vec<ValidationFailure>;
}

/// Name under which a validator is registered in a [`ValidatorCatalog`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ValidatorKey(Arc<str>);

impl ValidatorKey {
	pub fn new(key: impl Into<Arc<str>>) -> Self {
		Self(key.into())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl From<&str> for ValidatorKey {
	fn from(key: &str) -> Self {
		Self::new(key)
	}
}

impl fmt::Display for ValidatorKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

type ValidatorFactory = Arc<dyn Fn() -> Arc<dyn Validator> + Send + Sync>;

/// Validator factories resolved by key.
#[derive(Default)]
pub struct ValidatorCatalog {
	factories: RwLock<HashMap<ValidatorKey, ValidatorFactory>>,
}

impl ValidatorCatalog {
	/// Registers `factory` under `key`, replacing any previous factory.
	pub fn register<F>(&self, key: impl Into<ValidatorKey>, factory: F)
	where
		F: Fn() -> Arc<dyn Validator> + Send + Sync + 'static,
	{
		self.factories.write().insert(key.into(), Arc::new(factory));
	}

	/// Creates the validator registered under `key`.
	pub fn resolve(&self, key: &ValidatorKey) -> Option<Arc<dyn Validator>> {
		let factory = self.factories.read().get(key).cloned()?;
		Some(factory())
	}

	pub fn contains(&self, key: &ValidatorKey) -> bool {
		self.factories.read().contains_key(key)
	}
}

impl fmt::Debug for ValidatorCatalog {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_set().entries(self.factories.read().keys()).finish()
	}
}
