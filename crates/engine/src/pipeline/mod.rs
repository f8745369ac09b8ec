//! Ordered, named transition handlers.

pub mod builtin;

use std::fmt;
use std::sync::{Arc, Weak};

use arc_swap::ArcSwap;
use editscope_session::{MessageStore, Session, Subscription};

use crate::error::{Result, ScopeError};
use crate::notify::{NotifierRef, SessionListener};
use crate::root_registry::SharedRootRegistry;
use crate::routes::RouteSet;
use crate::transition::{ChildContent, ParametersTransition};

/// A handler reacting to one [`ParametersTransition`].
///
/// `X` is node-specific state the handler may read and mutate.
pub type Handler<X> = fn(&mut ParametersTransition, &mut PassContext<'_, X>) -> Result<()>;

/// What the host hands a node for one update pass.
#[derive(Clone, Default)]
pub struct NodeInputs {
	/// Session cascaded from the parent.
	pub ancestor: Option<Session>,
	/// Session the node wants to operate on, if it does not derive one.
	pub actor: Option<Session>,
	pub child_content: Option<ChildContent>,
	pub routes: Option<RouteSet>,
	/// Validation notifier cascaded from an enclosing validator.
	pub notifier: Option<NotifierRef>,
}

impl fmt::Debug for NodeInputs {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("NodeInputs")
			.field("ancestor", &self.ancestor)
			.field("actor", &self.actor)
			.field("child_content", &self.child_content)
			.field("routes", &self.routes.as_ref().map(|routes| routes.len()))
			.field("notifier", &self.notifier.is_some())
			.finish()
	}
}

/// Subscriptions and message stores a node currently holds.
///
/// Handlers fill and drain these slots symmetrically across passes.
#[derive(Debug, Default)]
pub struct Wiring {
	pub root_validation: Option<Subscription>,
	pub ancestor: Option<Subscription>,
	pub actor_field_changed: Option<Subscription>,
	pub actor_bubble: Option<Subscription>,
	pub root_store: Option<MessageStore>,
	pub actor_store: Option<MessageStore>,
	/// Session this node holds an occupation of in the shared root registry.
	pub occupied: Option<Session>,
}

impl Wiring {
	/// Whether every slot is empty.
	pub fn is_unwired(&self) -> bool {
		self.root_validation.is_none()
			&& self.ancestor.is_none()
			&& self.actor_field_changed.is_none()
			&& self.actor_bubble.is_none()
			&& self.root_store.is_none()
			&& self.actor_store.is_none()
			&& self.occupied.is_none()
	}

	/// Drops every subscription, clears both stores and gives up the
	/// registry occupation, leaving all slots empty.
	pub fn release(&mut self, registry: &SharedRootRegistry) -> Result<()> {
		let subscriptions = [
			self.root_validation.take(),
			self.ancestor.take(),
			self.actor_field_changed.take(),
			self.actor_bubble.take(),
		];
		for sub in subscriptions.into_iter().flatten() {
			sub.unsubscribe();
		}
		for store in [self.root_store.take(), self.actor_store.take()].into_iter().flatten() {
			store.clear();
		}
		match self.occupied.take() {
			Some(session) => registry.disoccupy(&session).map(|_| ()),
			None => Ok(()),
		}
	}
}

/// Everything besides the transition a handler may touch.
pub struct PassContext<'a, X> {
	pub inputs: &'a NodeInputs,
	/// The transition of the previous pass.
	pub last: &'a ParametersTransition,
	pub wiring: &'a mut Wiring,
	pub registry: &'static SharedRootRegistry,
	pub listener: &'a Weak<dyn SessionListener>,
	pub ext: &'a mut X,
}

/// Where to insert a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerPosition {
	Start,
	End,
	Before(&'static str),
	After(&'static str),
}

/// A named handler.
pub struct Registration<X> {
	name: &'static str,
	handler: Handler<X>,
}

impl<X> Registration<X> {
	pub fn name(&self) -> &'static str {
		self.name
	}

	pub fn handler(&self) -> Handler<X> {
		self.handler
	}
}

impl<X> Clone for Registration<X> {
	fn clone(&self) -> Self {
		*self
	}
}

impl<X> Copy for Registration<X> {}

impl<X> fmt::Debug for Registration<X> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Registration").field(&self.name).finish()
	}
}

/// Ordered handler list shared by every node of one kind.
///
/// Readers get an immutable snapshot; writers swap in a modified copy, so a
/// pass in flight always iterates one consistent ordering.
pub struct HandlerRegistry<X> {
	snap: ArcSwap<Vec<Registration<X>>>,
}

impl<X> HandlerRegistry<X> {
	pub fn new() -> Self {
		Self {
			snap: ArcSwap::from_pointee(Vec::new()),
		}
	}

	/// A registry holding `handlers` in iteration order. Repeated names keep
	/// their first occurrence.
	pub fn from_ordered(handlers: impl IntoIterator<Item = (&'static str, Handler<X>)>) -> Self {
		let mut list: Vec<Registration<X>> = Vec::new();
		for (name, handler) in handlers {
			if !list.iter().any(|reg| reg.name == name) {
				list.push(Registration { name, handler });
			}
		}
		Self {
			snap: ArcSwap::from_pointee(list),
		}
	}

	/// Inserts `handler` under `name` at `position`.
	pub fn register(
		&self,
		name: &'static str,
		handler: Handler<X>,
		position: HandlerPosition,
	) -> Result<()> {
		self.update(|list| {
			if list.iter().any(|reg| reg.name == name) {
				return Err(ScopeError::DuplicateHandler(name));
			}
			let index = match position {
				HandlerPosition::Start => 0,
				HandlerPosition::End => list.len(),
				HandlerPosition::Before(target) => index_of(list, target)?,
				HandlerPosition::After(target) => index_of(list, target)? + 1,
			};
			list.insert(index, Registration { name, handler });
			Ok(())
		})
	}

	/// Removes the handler registered under `name`.
	pub fn remove(&self, name: &'static str) -> Result<()> {
		self.update(|list| {
			let index = index_of(list, name)?;
			list.remove(index);
			Ok(())
		})
	}

	/// The current ordering.
	pub fn registrations(&self) -> Arc<Vec<Registration<X>>> {
		self.snap.load_full()
	}

	pub fn names(&self) -> Vec<&'static str> {
		self.snap.load().iter().map(|reg| reg.name).collect()
	}

	pub fn contains(&self, name: &str) -> bool {
		self.snap.load().iter().any(|reg| reg.name == name)
	}

	fn update(&self, mut apply: impl FnMut(&mut Vec<Registration<X>>) -> Result<()>) -> Result<()> {
		loop {
			let cur = self.snap.load_full();
			let mut next = (*cur).clone();
			apply(&mut next)?;

			let prev = self.snap.compare_and_swap(&cur, Arc::new(next));
			if Arc::ptr_eq(&prev, &cur) {
				return Ok(());
			}
		}
	}
}

fn index_of<X>(list: &[Registration<X>], name: &'static str) -> Result<usize> {
	list.iter()
		.position(|reg| reg.name == name)
		.ok_or(ScopeError::HandlerNotFound(name))
}

impl<X> Default for HandlerRegistry<X> {
	fn default() -> Self {
		Self::new()
	}
}

impl<X> fmt::Debug for HandlerRegistry<X> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_list().entries(self.names()).finish()
	}
}

#[cfg(test)]
mod tests;
