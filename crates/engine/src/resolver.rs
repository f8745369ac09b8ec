//! Root resolution for one node.

use editscope_session::Session;

use crate::error::{Result, ScopeError};
use crate::root_registry::SharedRootRegistry;

/// Resolves the root session of a node from its ancestor and actor.
///
/// When the node operates on its ancestor, the ancestor is the root.
/// Otherwise the ancestor's registered root is used, falling back to the
/// ancestor itself when none is registered. Only the immediate ancestor is
/// consulted: nodes are updated top-down, so every ancestor node has
/// registered its own association by the time its descendants resolve.
pub fn resolve_root(
	registry: &SharedRootRegistry,
	node: &'static str,
	ancestor: Option<&Session>,
	actor: Option<&Session>,
) -> Result<Session> {
	let ancestor = ancestor.ok_or(ScopeError::MissingAncestorSession { node })?;
	let actor = actor.ok_or(ScopeError::MissingActorSession { node })?;

	if actor.ptr_eq(ancestor) {
		return Ok(ancestor.clone());
	}

	Ok(registry
		.try_get(ancestor)
		.unwrap_or_else(|| ancestor.clone()))
}

#[cfg(test)]
mod tests {
	use editscope_session::{Model, ModelRef};

	use super::*;

	#[derive(Debug)]
	struct Form;

	impl Model for Form {}

	fn session() -> Session {
		Session::new(ModelRef::new(Form))
	}

	#[test]
	fn actor_equal_to_ancestor_is_its_own_root() {
		let registry = SharedRootRegistry::new();
		let ancestor = session();
		let root = resolve_root(&registry, "t", Some(&ancestor), Some(&ancestor)).unwrap();
		assert!(root.ptr_eq(&ancestor));
	}

	#[test]
	fn registered_ancestor_yields_its_root() {
		let registry = SharedRootRegistry::new();
		let (form, ancestor, actor) = (session(), session(), session());
		registry.occupy(&ancestor, &form).unwrap();
		let root = resolve_root(&registry, "t", Some(&ancestor), Some(&actor)).unwrap();
		assert!(root.ptr_eq(&form));
	}

	#[test]
	fn unregistered_ancestor_becomes_root() {
		let registry = SharedRootRegistry::new();
		let (ancestor, actor) = (session(), session());
		let root = resolve_root(&registry, "t", Some(&ancestor), Some(&actor)).unwrap();
		assert!(root.ptr_eq(&ancestor));
	}

	#[test]
	fn missing_sessions_fail() {
		let registry = SharedRootRegistry::new();
		let s = session();
		assert!(matches!(
			resolve_root(&registry, "t", None, Some(&s)),
			Err(ScopeError::MissingAncestorSession { node: "t" })
		));
		assert!(matches!(
			resolve_root(&registry, "t", Some(&s), None),
			Err(ScopeError::MissingActorSession { node: "t" })
		));
	}
}
