//! Error types for scope nodes and the transition engine.

use editscope_session::SessionError;
use thiserror::Error;

/// Broad category of a [`ScopeError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
	/// Invalid node parameters or pipeline setup. Fails the update pass.
	Configuration,
	/// Broken invariant between cooperating nodes; indicates an integration bug.
	Consistency,
	/// A lookup on behalf of an event found nothing to route to.
	Lookup,
	/// A session listener failed with an error foreign to this crate.
	Session,
}

/// Errors raised while transitioning nodes or routing validation.
#[derive(Debug, Error)]
pub enum ScopeError {
	/// Both an explicit model and an explicit session were supplied.
	#[error("{node}: supply either a model or a session, not both")]
	ModelAndSessionConflict { node: &'static str },

	/// Neither an explicit model nor an explicit session was supplied.
	#[error("{node}: requires either a model or a session")]
	MissingModelOrSession { node: &'static str },

	/// A rootpath node was given an explicit actor.
	#[error("{node}: operates on the ancestor session and accepts no explicit model or session")]
	UnexpectedExplicitActor { node: &'static str },

	/// Both a validator instance and a validator key were supplied.
	#[error("{node}: supply either a validator or a validator key, not both")]
	ValidatorSourceConflict { node: &'static str },

	/// Neither a validator instance nor a validator key was supplied.
	#[error("{node}: requires either a validator or a validator key")]
	MissingValidatorSource { node: &'static str },

	/// A validator key was supplied without a catalog to resolve it.
	#[error("{node}: validator key `{key}` requires a validator catalog")]
	MissingValidatorCatalog { node: &'static str, key: String },

	/// The catalog has no validator under the given key.
	#[error("no validator registered under `{0}`")]
	UnknownValidator(String),

	/// Two declared routes reach the same model.
	#[error("route `{path}` reaches a {model} already reached by another route")]
	DuplicateRouteModel { model: &'static str, path: String },

	/// A declared route names no member.
	#[error("route on {owner} names no member")]
	EmptyRoute { owner: &'static str },

	/// A declared route does not reach a model.
	#[error("route `{path}` on {owner} does not resolve to a model")]
	UnresolvableRoute { owner: &'static str, path: String },

	/// A handler with the same name is already registered.
	#[error("handler `{0}` is already registered")]
	DuplicateHandler(&'static str),

	/// No handler with that name is registered.
	#[error("handler `{0}` is not registered")]
	HandlerNotFound(&'static str),

	/// The session is already associated with a different root.
	#[error("session {session} is already associated with root {existing}, not {requested}")]
	ConflictingRootAssociation {
		session: u64,
		existing: u64,
		requested: u64,
	},

	/// No root association exists for the session.
	#[error("session {session} has no root association")]
	EntryNotFound { session: u64 },

	/// The registry token holds a value of a foreign type.
	#[error("property `{key}` holds a value of a foreign type")]
	ForeignProperty { key: &'static str },

	/// A cascaded validation notifier operates on a different root.
	#[error("{node}: the cascaded validation notifier operates in a different scope")]
	ScopeMismatch { node: &'static str },

	/// A non-null value was assigned to a transition that is disposing.
	#[error("cannot assign a value to a disposing transition")]
	SealedTransition,

	/// The node was already disposed.
	#[error("{node}: already disposed")]
	Disposed { node: &'static str },

	/// No ancestor session was provided.
	#[error("{node}: requires an ancestor session")]
	MissingAncestorSession { node: &'static str },

	/// The node could not determine the session it operates on.
	#[error("{node}: could not resolve its actor session")]
	MissingActorSession { node: &'static str },

	/// A routes scope has no cascaded validation notifier.
	#[error("{node}: requires a cascaded validation notifier")]
	MissingValidationNotifier { node: &'static str },

	/// A field changed on a model no declared route reaches.
	#[error("model {model} is not reachable through any declared route")]
	UnregisteredRoute { model: &'static str },

	/// The validator cannot validate the model owning a field.
	#[error("validator cannot validate models of type {model}")]
	UnvalidatableModel { model: &'static str },

	/// A session listener failed with an error foreign to this crate.
	#[error(transparent)]
	Session(SessionError),
}

impl ScopeError {
	pub fn kind(&self) -> ErrorKind {
		match self {
			Self::ModelAndSessionConflict { .. }
			| Self::MissingModelOrSession { .. }
			| Self::UnexpectedExplicitActor { .. }
			| Self::ValidatorSourceConflict { .. }
			| Self::MissingValidatorSource { .. }
			| Self::MissingValidatorCatalog { .. }
			| Self::UnknownValidator(_)
			| Self::DuplicateRouteModel { .. }
			| Self::EmptyRoute { .. }
			| Self::UnresolvableRoute { .. }
			| Self::DuplicateHandler(_)
			| Self::HandlerNotFound(_)
			| Self::MissingAncestorSession { .. }
			| Self::MissingActorSession { .. } => ErrorKind::Configuration,
			Self::ConflictingRootAssociation { .. }
			| Self::EntryNotFound { .. }
			| Self::ForeignProperty { .. }
			| Self::ScopeMismatch { .. }
			| Self::SealedTransition
			| Self::Disposed { .. }
			| Self::MissingValidationNotifier { .. } => ErrorKind::Consistency,
			Self::UnregisteredRoute { .. } | Self::UnvalidatableModel { .. } => ErrorKind::Lookup,
			Self::Session(_) => ErrorKind::Session,
		}
	}
}

impl From<SessionError> for ScopeError {
	/// Recovers a [`ScopeError`] raised inside a listener unchanged.
	fn from(error: SessionError) -> Self {
		match error {
			SessionError::Listener(inner) => match inner.downcast::<ScopeError>() {
				Ok(scope) => *scope,
				Err(other) => Self::Session(SessionError::Listener(other)),
			},
		}
	}
}

/// Result type for scope operations.
pub type Result<T> = std::result::Result<T, ScopeError>;
