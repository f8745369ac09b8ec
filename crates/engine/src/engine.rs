//! Per-node driver of the handler pipeline.

use std::fmt;
use std::sync::{Arc, Weak};

use editscope_session::Session;

use crate::error::{Result, ScopeError};
use crate::notify::{NotifierRef, SessionListener};
use crate::pipeline::{HandlerRegistry, NodeInputs, PassContext, Wiring};
use crate::root_registry::SharedRootRegistry;
use crate::transition::ParametersTransition;

/// What a node hands to its descendants.
#[derive(Clone)]
pub struct Cascade {
	pub session: Session,
	pub notifier: Option<NotifierRef>,
}

impl Cascade {
	/// Inputs for a child node receiving this cascade.
	pub fn to_inputs(&self) -> NodeInputs {
		NodeInputs {
			ancestor: Some(self.session.clone()),
			notifier: self.notifier.clone(),
			..NodeInputs::default()
		}
	}
}

impl fmt::Debug for Cascade {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Cascade")
			.field("session", &self.session)
			.field("notifier", &self.notifier.is_some())
			.finish()
	}
}

/// How a node presents itself to its descendants after the last pass.
#[derive(Debug, Clone)]
pub enum CascadePlan {
	/// No actor is resolved yet; nothing is handed down.
	Pending,
	/// The node operates on its ancestor; descendants see the ancestor as is.
	Passthrough,
	/// The node hands down its own actor. Descendants keyed on it must be
	/// rebuilt when the session changes.
	Provide { session: Session },
}

/// Runs the handler pipeline for one node and keeps what the node holds
/// between passes: the last transition and its subscriptions.
pub struct SessionTransitionEngine<X> {
	node: &'static str,
	handlers: Arc<HandlerRegistry<X>>,
	registry: &'static SharedRootRegistry,
	listener: Weak<dyn SessionListener>,
	last: ParametersTransition,
	transitioned_once: bool,
	wiring: Wiring,
}

impl<X> SessionTransitionEngine<X> {
	pub fn new(
		node: &'static str,
		handlers: Arc<HandlerRegistry<X>>,
		listener: Weak<dyn SessionListener>,
	) -> Self {
		Self {
			node,
			handlers,
			registry: SharedRootRegistry::global(),
			listener,
			last: ParametersTransition::first(node),
			transitioned_once: false,
			wiring: Wiring::default(),
		}
	}

	pub fn node(&self) -> &'static str {
		self.node
	}

	pub fn handlers(&self) -> &Arc<HandlerRegistry<X>> {
		&self.handlers
	}

	pub fn registry(&self) -> &'static SharedRootRegistry {
		self.registry
	}

	/// The transition of the last completed pass.
	pub fn last(&self) -> &ParametersTransition {
		&self.last
	}

	pub fn wiring(&self) -> &Wiring {
		&self.wiring
	}

	/// Runs one update pass.
	///
	/// The transition is retained only when every handler succeeds. A failed
	/// pass releases everything the node holds, including what earlier
	/// handlers of the same pass wired, and the next pass starts over as a
	/// first one.
	pub fn run_pass(&mut self, inputs: &NodeInputs, ext: &mut X) -> Result<()> {
		let mut transition = if self.transitioned_once {
			ParametersTransition::following(&self.last)
		} else {
			ParametersTransition::first(self.node)
		};
		self.transitioned_once = true;

		transition
			.child_content_mut()
			.set_new(inputs.child_content.clone())?;
		transition.routes_mut().set_new(inputs.routes.clone())?;

		tracing::trace!(node = self.node, first = transition.is_first(), "engine.pass");
		if let Err(err) = self.execute(&mut transition, inputs, ext) {
			self.unwind(&err);
			return Err(err);
		}
		self.last = transition;
		Ok(())
	}

	/// Runs the teardown pass: every new value is `None`, so each handler
	/// unwinds what it wired. Whatever a failing handler left behind is
	/// released anyway, and the first error is returned.
	pub fn run_disposal(&mut self, ext: &mut X) -> Result<()> {
		let mut transition = ParametersTransition::disposing(&self.last);
		tracing::trace!(node = self.node, "engine.dispose");
		let inputs = NodeInputs::default();
		let handled = self.execute(&mut transition, &inputs, ext);
		let released = self.wiring.release(self.registry);
		self.last = transition;
		handled.and(released)
	}

	fn unwind(&mut self, cause: &ScopeError) {
		tracing::debug!(node = self.node, %cause, "engine.unwind");
		if let Err(err) = self.wiring.release(self.registry) {
			tracing::warn!(node = self.node, %err, "engine.unwind_failed");
		}
		self.last = ParametersTransition::first(self.node);
		self.transitioned_once = false;
	}

	fn execute(
		&mut self,
		transition: &mut ParametersTransition,
		inputs: &NodeInputs,
		ext: &mut X,
	) -> Result<()> {
		let registrations = self.handlers.registrations();
		let mut cx = PassContext {
			inputs,
			last: &self.last,
			wiring: &mut self.wiring,
			registry: self.registry,
			listener: &self.listener,
			ext,
		};
		for registration in registrations.iter() {
			tracing::trace!(node = self.node, handler = registration.name(), "engine.handler");
			(registration.handler())(transition, &mut cx)?;
		}
		Ok(())
	}

	pub fn cascade_plan(&self) -> CascadePlan {
		if self.last.is_actor_and_ancestor_same() {
			return CascadePlan::Passthrough;
		}
		match self.last.actor().new_value() {
			Some(session) => CascadePlan::Provide {
				session: session.clone(),
			},
			None => CascadePlan::Pending,
		}
	}

	pub fn root(&self) -> Option<&Session> {
		self.last.root().new_value()
	}

	pub fn ancestor(&self) -> Option<&Session> {
		self.last.ancestor().new_value()
	}

	pub fn actor(&self) -> Option<&Session> {
		self.last.actor().new_value()
	}
}

impl<X> fmt::Debug for SessionTransitionEngine<X> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("SessionTransitionEngine")
			.field("node", &self.node)
			.field("handlers", &self.handlers)
			.field("last", &self.last)
			.finish_non_exhaustive()
	}
}
