//! The protocol between scope nodes and the validator that owns them.

use std::sync::Weak;

use editscope_session::{FieldPath, Session};

use crate::error::Result;

/// Result of [`ValidationNotifier::evaluate_validation_scope`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ValidationScope {
	pub is_within_scope: bool,
}

/// A request to validate the whole model.
#[derive(Debug, Clone)]
pub struct ModelValidationRequest {
	/// Session that raised the request.
	pub sender: Session,
	/// Session the request originated from before any forwarding.
	pub original_source: Session,
}

/// A field of the validator's own model changed.
#[derive(Debug, Clone)]
pub struct DirectFieldValidationRequest {
	pub sender: Session,
	pub field: FieldPath,
}

/// A field of a routed sub-model changed.
#[derive(Debug, Clone)]
pub struct NestedFieldValidationRequest {
	pub sender: Session,
	/// The field rewritten onto the route owner, e.g. `(city, "Address.Street")`.
	pub full_path: FieldPath,
	/// The field as raised, e.g. `(address, "Street")`.
	pub sub_field: FieldPath,
}

/// Validates on behalf of descendant scopes.
///
/// Implementations answer "not yet ready" calls (no resolved sessions) with
/// `Ok(())`.
pub trait ValidationNotifier: Send + Sync {
	/// Whether `candidate` belongs to the same root as this notifier.
	fn evaluate_validation_scope(&self, candidate: &Session) -> ValidationScope;

	fn notify_model_validation_requested(&self, request: ModelValidationRequest) -> Result<()>;

	fn notify_direct_field_validation_requested(
		&self,
		request: DirectFieldValidationRequest,
	) -> Result<()>;

	fn notify_nested_field_validation_requested(
		&self,
		request: NestedFieldValidationRequest,
	) -> Result<()>;
}

/// Cascaded handle to a [`ValidationNotifier`].
pub type NotifierRef = Weak<dyn ValidationNotifier>;

/// Receives the session events a node subscribed to.
pub trait SessionListener: Send + Sync {
	/// The root (or, for scopes, a forwarded) session requested validation.
	fn on_validation_requested(&self, sender: &Session) -> Result<()>;

	/// A field changed on the node's actor session.
	fn on_field_changed(&self, sender: &Session, field: &FieldPath) -> Result<()>;
}
