//! Handlers shared by every node kind.

use std::sync::Weak;

use editscope_session::{ListenerError, Session, WeakSession};

use super::PassContext;
use crate::error::{Result, ScopeError};
use crate::nodes::AncestorLink;
use crate::notify::SessionListener;
use crate::resolver;
use crate::transition::ParametersTransition;

pub const SET_PROVIDED_SESSIONS: &str = "set_provided_sessions";
pub const DERIVE_ACTOR_FROM_ANCESTOR: &str = "derive_actor_from_ancestor";
pub const RESOLVE_ROOT: &str = "resolve_root";
pub const WIRE_ROOT: &str = "wire_root";
pub const WIRE_ANCESTOR: &str = "wire_ancestor";
pub const WIRE_ACTOR: &str = "wire_actor";
pub const ATTACH_MESSAGE_STORES: &str = "attach_message_stores";
pub const MAINTAIN_ROOT_REGISTRY: &str = "maintain_root_registry";

/// Node state of nodes that derive their actor from the ancestor.
pub trait DerivesActor {
	fn ancestor_link(&self) -> AncestorLink;
}

/// Copies the ancestor and the requested actor from the node inputs.
pub fn set_provided_sessions<X>(t: &mut ParametersTransition, cx: &mut PassContext<'_, X>) -> Result<()> {
	if t.is_disposing() {
		return Ok(());
	}
	t.ancestor_mut().set_new(cx.inputs.ancestor.clone())?;
	t.actor_mut().set_new(cx.inputs.actor.clone())
}

/// Supplies an actor when none was provided.
///
/// The previously derived actor is kept while the ancestor is unchanged.
/// Otherwise a new session over the ancestor's model is created, sharing the
/// ancestor's field state for [`AncestorLink::Direct`].
pub fn derive_actor_from_ancestor<X: DerivesActor>(
	t: &mut ParametersTransition,
	cx: &mut PassContext<'_, X>,
) -> Result<()> {
	if t.is_disposing() || t.actor().is_new_non_null() {
		return Ok(());
	}
	// Missing ancestors are reported by root resolution.
	let Some(ancestor) = t.ancestor().new_value().cloned() else {
		return Ok(());
	};

	let reuse = cx.last.is_actor_ancestor_derived()
		&& t.ancestor().is_new_same()
		&& t.actor().is_old_non_null();
	if reuse {
		t.actor_mut().keep_old()?;
	} else {
		let actor = Session::new(ancestor.model().clone());
		if cx.ext.ancestor_link() == AncestorLink::Direct {
			actor.alias_internal_state(&ancestor);
		}
		tracing::debug!(
			node = t.node(),
			actor = actor.id(),
			ancestor = ancestor.id(),
			"pipeline.derive_actor"
		);
		t.actor_mut().set_new(Some(actor))?;
	}
	t.mark_actor_ancestor_derived();
	Ok(())
}

/// Resolves the root through the shared root registry.
pub fn resolve_root<X>(t: &mut ParametersTransition, cx: &mut PassContext<'_, X>) -> Result<()> {
	if t.is_disposing() {
		return Ok(());
	}
	let root = resolver::resolve_root(
		cx.registry,
		t.node(),
		t.ancestor().new_value(),
		t.actor().new_value(),
	)?;
	t.root_mut().set_new(Some(root))
}

/// Subscribes the node to validation requests of its root.
pub fn wire_root<X>(t: &mut ParametersTransition, cx: &mut PassContext<'_, X>) -> Result<()> {
	if t.root().is_new_same() {
		return Ok(());
	}
	if let Some(sub) = cx.wiring.root_validation.take() {
		sub.unsubscribe();
	}
	if let Some(root) = t.root().new_value() {
		let listener = cx.listener.clone();
		cx.wiring.root_validation = Some(root.on_validation_requested(move |sender, _| {
			forward(&listener, |node| node.on_validation_requested(sender))
		}));
	}
	Ok(())
}

/// Drops any subscription the node holds on a replaced ancestor.
pub fn wire_ancestor<X>(t: &mut ParametersTransition, cx: &mut PassContext<'_, X>) -> Result<()> {
	if t.ancestor().is_new_different()
		&& let Some(sub) = cx.wiring.ancestor.take()
	{
		sub.unsubscribe();
	}
	Ok(())
}

/// Subscribes to field changes of the actor, and bubbles the actor's
/// validation requests up to the root when the two differ.
pub fn wire_actor<X>(t: &mut ParametersTransition, cx: &mut PassContext<'_, X>) -> Result<()> {
	let actor_changed = t.actor().is_new_different();

	if actor_changed {
		if let Some(sub) = cx.wiring.actor_field_changed.take() {
			sub.unsubscribe();
		}
		if let Some(actor) = t.actor().new_value() {
			let listener = cx.listener.clone();
			cx.wiring.actor_field_changed = Some(actor.on_field_changed(move |sender, event| {
				forward(&listener, |node| node.on_field_changed(sender, &event.field))
			}));
		}
	}

	if actor_changed || t.root().is_new_different() {
		if let Some(sub) = cx.wiring.actor_bubble.take() {
			sub.unsubscribe();
		}
		if t.is_actor_and_root_distinct()
			&& let (Some(actor), Some(root)) = (t.actor().new_value(), t.root().new_value())
		{
			let root = root.downgrade();
			cx.wiring.actor_bubble = Some(actor.on_validation_requested(move |_, _| bubble_up(&root)));
		}
	}
	Ok(())
}

/// Gives validator nodes a message store on the root, and on the actor when
/// it differs from the root and keeps its own field state.
pub fn attach_message_stores<X>(t: &mut ParametersTransition, cx: &mut PassContext<'_, X>) -> Result<()> {
	let root_changed = t.root().is_new_different();

	if root_changed {
		if let Some(store) = cx.wiring.root_store.take() {
			store.clear();
		}
		cx.wiring.root_store = t.root().new_value().map(Session::message_store);
	} else if t.actor().is_new_different()
		&& let Some(store) = &cx.wiring.root_store
	{
		// Messages on the root describe the previous actor's model.
		store.clear();
	}

	if root_changed || t.actor().is_new_different() {
		if let Some(store) = cx.wiring.actor_store.take() {
			store.clear();
		}
		if t.is_actor_and_root_distinct()
			&& let (Some(actor), Some(root)) = (t.actor().new_value(), t.root().new_value())
			&& !actor.shares_state_with(root)
		{
			cx.wiring.actor_store = Some(actor.message_store());
		}
	}
	Ok(())
}

/// Moves the node's occupation of the shared root registry to the new
/// actor and root.
///
/// [`Wiring::occupied`] only names a session once its occupation succeeded,
/// so a pass failing here leaves nothing to release twice.
///
/// [`Wiring::occupied`]: super::Wiring::occupied
pub fn maintain_root_registry<X>(t: &mut ParametersTransition, cx: &mut PassContext<'_, X>) -> Result<()> {
	if t.actor().is_new_same() && t.root().is_new_same() {
		return Ok(());
	}
	if let Some(old) = cx.wiring.occupied.take() {
		cx.registry.disoccupy(&old)?;
	}
	if let (Some(actor), Some(root)) = (t.actor().new_value(), t.root().new_value()) {
		cx.registry.occupy(actor, root)?;
		cx.wiring.occupied = Some(actor.clone());
	}
	Ok(())
}

fn forward(
	listener: &Weak<dyn SessionListener>,
	call: impl FnOnce(&dyn SessionListener) -> Result<()>,
) -> std::result::Result<(), ListenerError> {
	let Some(node) = listener.upgrade() else {
		return Ok(());
	};
	call(&*node).map_err(ListenerError::from)
}

fn bubble_up(root: &WeakSession) -> std::result::Result<(), ListenerError> {
	let Some(root) = root.upgrade() else {
		return Ok(());
	};
	tracing::trace!(root = root.id(), "pipeline.bubble_up");
	root.validate()
		.map(|_| ())
		.map_err(|err| ListenerError::from(ScopeError::from(err)))
}
