//! Error types raised by sessions.

use thiserror::Error;

/// Error returned by a session listener.
///
/// Boxed so that callers layered above the session crate can raise their own
/// error types from inside a listener and recover them by downcasting once
/// emission returns.
pub type ListenerError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while emitting session events.
#[derive(Debug, Error)]
pub enum SessionError {
	/// A listener failed; emission stopped at that listener.
	#[error("session listener failed: {0}")]
	Listener(#[source] ListenerError),
}

impl SessionError {
	/// Returns the listener error when it has concrete type `E`.
	pub fn downcast_listener<E: std::error::Error + 'static>(&self) -> Option<&E> {
		match self {
			Self::Listener(error) => error.downcast_ref::<E>(),
		}
	}
}

/// Result type for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;
