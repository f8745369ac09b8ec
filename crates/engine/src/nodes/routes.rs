//! Scope translating field changes of routed sub-models for the owning
//! validator.

use std::fmt;
use std::sync::{Arc, LazyLock, Weak};

use editscope_session::{FieldPath, ModelRef, Session};
use parking_lot::Mutex;

use super::AncestorLink;
use crate::disposal::{DisposalLatch, DisposalState};
use crate::engine::{Cascade, CascadePlan, SessionTransitionEngine};
use crate::error::{Result, ScopeError};
use crate::notify::{
	DirectFieldValidationRequest, ModelValidationRequest, NestedFieldValidationRequest,
	NotifierRef, SessionListener, ValidationNotifier,
};
use crate::pipeline::builtin::{
	DERIVE_ACTOR_FROM_ANCESTOR, DerivesActor, MAINTAIN_ROOT_REGISTRY, RESOLVE_ROOT,
	SET_PROVIDED_SESSIONS, WIRE_ACTOR, WIRE_ANCESTOR, WIRE_ROOT, derive_actor_from_ancestor,
	maintain_root_registry, resolve_root, set_provided_sessions, wire_actor, wire_ancestor,
	wire_root,
};
use crate::pipeline::{Handler, HandlerRegistry, NodeInputs, PassContext};
use crate::routes::{RouteRegistry, RouteSet};
use crate::transition::{ChildContent, ParametersTransition};

pub const BIND_ROUTES_NOTIFIER: &str = "bind_routes_notifier";
pub const REBUILD_ROUTES: &str = "rebuild_routes";

const NODE: &str = "routes_scope";

/// Host parameters of one [`RoutesScope::update`] pass.
#[derive(Clone, Default)]
pub struct RoutesParams {
	pub ancestor: Option<Session>,
	pub notifier: Option<NotifierRef>,
	pub routes: Option<RouteSet>,
	pub suppress_unregistered_routes: bool,
	pub child_content: Option<ChildContent>,
}

/// Pass state of a routes scope.
#[derive(Default)]
pub struct RoutesPass {
	notifier: Option<NotifierRef>,
	routes: RouteRegistry,
	ancestor_model: Option<ModelRef>,
	suppress_unregistered_routes: bool,
}

impl RoutesPass {
	pub fn routes(&self) -> &RouteRegistry {
		&self.routes
	}

	pub fn notifier(&self) -> Option<&NotifierRef> {
		self.notifier.as_ref()
	}
}

impl DerivesActor for RoutesPass {
	fn ancestor_link(&self) -> AncestorLink {
		AncestorLink::Direct
	}
}

impl fmt::Debug for RoutesPass {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RoutesPass")
			.field("notifier", &self.notifier.is_some())
			.field("routes", &self.routes)
			.field("ancestor_model", &self.ancestor_model)
			.finish()
	}
}

/// Binds the cascaded notifier once it is known to serve this scope's root.
pub fn bind_routes_notifier(
	t: &mut ParametersTransition,
	cx: &mut PassContext<'_, RoutesPass>,
) -> Result<()> {
	if t.is_disposing() {
		cx.ext.notifier = None;
		return Ok(());
	}
	let node = t.node();
	let notifier = cx
		.inputs
		.notifier
		.clone()
		.ok_or(ScopeError::MissingValidationNotifier { node })?;
	let unchanged = t.root().is_new_same()
		&& cx
			.ext
			.notifier
			.as_ref()
			.is_some_and(|bound| Weak::ptr_eq(bound, &notifier));
	if unchanged {
		return Ok(());
	}

	let live = notifier
		.upgrade()
		.ok_or(ScopeError::MissingValidationNotifier { node })?;
	let root = t
		.root()
		.new_value()
		.ok_or(ScopeError::MissingActorSession { node })?;
	if !live.evaluate_validation_scope(root).is_within_scope {
		return Err(ScopeError::ScopeMismatch { node });
	}
	cx.ext.notifier = Some(notifier);
	Ok(())
}

/// Rebuilds the route map from the declared routes.
pub fn rebuild_routes(t: &mut ParametersTransition, cx: &mut PassContext<'_, RoutesPass>) -> Result<()> {
	if t.is_disposing() {
		cx.ext.routes.clear();
		cx.ext.ancestor_model = None;
		return Ok(());
	}
	cx.ext.routes.initialize(t.routes().new_value().map(|routes| &routes[..]))?;
	cx.ext.ancestor_model = t.ancestor().new_value().map(|ancestor| ancestor.model().clone());
	Ok(())
}

static HANDLERS: LazyLock<Arc<HandlerRegistry<RoutesPass>>> = LazyLock::new(|| {
	Arc::new(HandlerRegistry::from_ordered([
		(SET_PROVIDED_SESSIONS, set_provided_sessions as Handler<RoutesPass>),
		(DERIVE_ACTOR_FROM_ANCESTOR, derive_actor_from_ancestor),
		(RESOLVE_ROOT, resolve_root),
		(BIND_ROUTES_NOTIFIER, bind_routes_notifier),
		(REBUILD_ROUTES, rebuild_routes),
		(WIRE_ROOT, wire_root),
		(WIRE_ANCESTOR, wire_ancestor),
		(WIRE_ACTOR, wire_actor),
		(MAINTAIN_ROOT_REGISTRY, maintain_root_registry),
	]))
});

struct RoutesState {
	engine: SessionTransitionEngine<RoutesPass>,
	pass: RoutesPass,
}

enum Routed {
	Direct(DirectFieldValidationRequest),
	Nested(NestedFieldValidationRequest),
}

/// Derives an actor sharing the ancestor's field state and reports field
/// changes of routed sub-models to the cascaded notifier as nested paths.
pub struct RoutesScope {
	latch: DisposalLatch,
	state: Mutex<RoutesState>,
}

impl RoutesScope {
	pub fn new() -> Arc<Self> {
		Self::with_handlers(Self::default_handlers())
	}

	pub fn default_handlers() -> Arc<HandlerRegistry<RoutesPass>> {
		HANDLERS.clone()
	}

	pub fn with_handlers(handlers: Arc<HandlerRegistry<RoutesPass>>) -> Arc<Self> {
		Arc::new_cyclic(|this: &Weak<Self>| {
			let listener: Weak<dyn SessionListener> = this.clone();
			Self {
				latch: DisposalLatch::new(),
				state: Mutex::new(RoutesState {
					engine: SessionTransitionEngine::new(NODE, handlers, listener),
					pass: RoutesPass::default(),
				}),
			}
		})
	}

	pub fn update(&self, params: RoutesParams) -> Result<()> {
		if self.latch.is_disposed() {
			return Err(ScopeError::Disposed { node: NODE });
		}
		let inputs = NodeInputs {
			ancestor: params.ancestor,
			actor: None,
			child_content: params.child_content,
			routes: params.routes,
			notifier: params.notifier,
		};
		let mut state = self.state.lock();
		let RoutesState { engine, pass } = &mut *state;
		pass.suppress_unregistered_routes = params.suppress_unregistered_routes;
		let result = engine.run_pass(&inputs, pass);
		if result.is_err() {
			// The engine released every subscription; forget the bound notifier and routes too.
			*pass = RoutesPass {
				suppress_unregistered_routes: params.suppress_unregistered_routes,
				..RoutesPass::default()
			};
		}
		result
	}

	pub fn cascade(&self) -> Option<Cascade> {
		let state = self.state.lock();
		Some(Cascade {
			session: state.engine.actor()?.clone(),
			notifier: state.pass.notifier.clone(),
		})
	}

	pub fn cascade_plan(&self) -> CascadePlan {
		self.state.lock().engine.cascade_plan()
	}

	pub fn root(&self) -> Option<Session> {
		self.state.lock().engine.root().cloned()
	}

	pub fn ancestor(&self) -> Option<Session> {
		self.state.lock().engine.ancestor().cloned()
	}

	pub fn actor(&self) -> Option<Session> {
		self.state.lock().engine.actor().cloned()
	}

	/// Access path registered for `model`.
	pub fn route_for(&self, model: &ModelRef) -> Option<FieldPath> {
		self.state.lock().pass.routes.lookup(model).cloned()
	}

	pub fn is_disposed(&self) -> bool {
		self.latch.is_disposed()
	}

	pub fn dispose(&self) -> Result<()> {
		if !self.latch.try_acquire(DisposalState::SYNC) {
			return Ok(());
		}
		self.teardown()
	}

	pub async fn dispose_async(&self) -> Result<()> {
		if !self.latch.try_acquire(DisposalState::ASYNC) {
			return Ok(());
		}
		self.teardown()
	}

	fn teardown(&self) -> Result<()> {
		if !self.latch.try_acquire(DisposalState::COMMON) {
			return Ok(());
		}
		let mut state = self.state.lock();
		let RoutesState { engine, pass } = &mut *state;
		let result = engine.run_disposal(pass);
		*pass = RoutesPass::default();
		tracing::debug!(node = NODE, ok = result.is_ok(), "routes_scope.dispose");
		result
	}

	fn route(&self, sender: &Session, field: &FieldPath) -> Result<Option<Routed>> {
		let state = self.state.lock();
		let pass = &state.pass;
		if pass.ancestor_model.as_ref() == Some(field.owner()) {
			return Ok(Some(Routed::Direct(DirectFieldValidationRequest {
				sender: sender.clone(),
				field: field.clone(),
			})));
		}
		if let Some(path) = pass.routes.lookup(field.owner()) {
			return Ok(Some(Routed::Nested(NestedFieldValidationRequest {
				sender: sender.clone(),
				full_path: path.join(field.name()),
				sub_field: field.clone(),
			})));
		}

		let model = field.owner().type_name();
		if pass.suppress_unregistered_routes {
			tracing::warn!(node = NODE, model, field = field.name(), "routes_scope.unregistered_route");
			return Ok(None);
		}
		Err(ScopeError::UnregisteredRoute { model })
	}

	fn live_notifier(&self) -> Option<Arc<dyn ValidationNotifier>> {
		self.state.lock().pass.notifier.as_ref().and_then(Weak::upgrade)
	}
}

impl SessionListener for RoutesScope {
	fn on_validation_requested(&self, sender: &Session) -> Result<()> {
		let Some(notifier) = self.live_notifier() else {
			return Ok(());
		};
		notifier.notify_model_validation_requested(ModelValidationRequest {
			sender: sender.clone(),
			original_source: sender.clone(),
		})
	}

	fn on_field_changed(&self, sender: &Session, field: &FieldPath) -> Result<()> {
		let Some(notifier) = self.live_notifier() else {
			return Ok(());
		};
		match self.route(sender, field)? {
			Some(Routed::Direct(request)) => notifier.notify_direct_field_validation_requested(request)?,
			Some(Routed::Nested(request)) => notifier.notify_nested_field_validation_requested(request)?,
			None => return Ok(()),
		}
		Ok(sender.notify_validation_state_changed()?)
	}
}

impl fmt::Debug for RoutesScope {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RoutesScope")
			.field("disposed", &self.latch.state())
			.finish_non_exhaustive()
	}
}
