//! Scope that isolates or derives an actor session without validating.

use std::fmt;
use std::sync::{Arc, LazyLock, Weak};

use editscope_session::{FieldPath, ModelRef, Session};
use parking_lot::Mutex;

use super::{ActorSource, AncestorLink, ModelSession};
use crate::disposal::{DisposalLatch, DisposalState};
use crate::engine::{Cascade, CascadePlan, SessionTransitionEngine};
use crate::error::{Result, ScopeError};
use crate::notify::{NotifierRef, SessionListener};
use crate::pipeline::builtin::{
	DERIVE_ACTOR_FROM_ANCESTOR, DerivesActor, MAINTAIN_ROOT_REGISTRY, RESOLVE_ROOT,
	SET_PROVIDED_SESSIONS, WIRE_ACTOR, WIRE_ANCESTOR, derive_actor_from_ancestor,
	maintain_root_registry, resolve_root, set_provided_sessions, wire_actor, wire_ancestor,
};
use crate::pipeline::{Handler, HandlerRegistry, NodeInputs};
use crate::transition::ChildContent;

const NODE: &str = "model_scope";

/// Host parameters of one [`ModelScope::update`] pass.
#[derive(Clone, Default)]
pub struct ScopeParams {
	pub ancestor: Option<Session>,
	pub model: Option<ModelRef>,
	pub session: Option<Session>,
	pub link: AncestorLink,
	pub notifier: Option<NotifierRef>,
	pub child_content: Option<ChildContent>,
}

/// Pass state of a model scope.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScopePass {
	pub link: AncestorLink,
}

impl DerivesActor for ScopePass {
	fn ancestor_link(&self) -> AncestorLink {
		self.link
	}
}

/// The shared pipeline without root validation or message stores.
static HANDLERS: LazyLock<Arc<HandlerRegistry<ScopePass>>> = LazyLock::new(|| {
	Arc::new(HandlerRegistry::from_ordered([
		(SET_PROVIDED_SESSIONS, set_provided_sessions as Handler<ScopePass>),
		(DERIVE_ACTOR_FROM_ANCESTOR, derive_actor_from_ancestor),
		(RESOLVE_ROOT, resolve_root),
		(WIRE_ANCESTOR, wire_ancestor),
		(WIRE_ACTOR, wire_actor),
		(MAINTAIN_ROOT_REGISTRY, maintain_root_registry),
	]))
});

struct ScopeState {
	engine: SessionTransitionEngine<ScopePass>,
	pass: ScopePass,
	model_session: ModelSession,
	notifier: Option<NotifierRef>,
}

/// Provides descendants with an explicit or derived actor session.
///
/// With neither model nor session, the actor is a new session over the
/// ancestor's model, kept while the ancestor is unchanged. The cascaded
/// validation notifier is passed through untouched.
pub struct ModelScope {
	latch: DisposalLatch,
	state: Mutex<ScopeState>,
}

impl ModelScope {
	pub fn new() -> Arc<Self> {
		Self::with_handlers(Self::default_handlers())
	}

	pub fn default_handlers() -> Arc<HandlerRegistry<ScopePass>> {
		HANDLERS.clone()
	}

	pub fn with_handlers(handlers: Arc<HandlerRegistry<ScopePass>>) -> Arc<Self> {
		Arc::new_cyclic(|this: &Weak<Self>| {
			let listener: Weak<dyn SessionListener> = this.clone();
			Self {
				latch: DisposalLatch::new(),
				state: Mutex::new(ScopeState {
					engine: SessionTransitionEngine::new(NODE, handlers, listener),
					pass: ScopePass::default(),
					model_session: ModelSession::default(),
					notifier: None,
				}),
			}
		})
	}

	pub fn update(&self, params: ScopeParams) -> Result<()> {
		if self.latch.is_disposed() {
			return Err(ScopeError::Disposed { node: NODE });
		}
		let source = ActorSource::from_parts(NODE, params.model, params.session)?;

		let mut state = self.state.lock();
		let ScopeState {
			engine,
			pass,
			model_session,
			notifier,
		} = &mut *state;
		let inputs = NodeInputs {
			ancestor: params.ancestor,
			actor: model_session.resolve(NODE, &source),
			child_content: params.child_content,
			routes: None,
			notifier: params.notifier,
		};
		pass.link = params.link;
		if let Err(err) = engine.run_pass(&inputs, pass) {
			*notifier = None;
			return Err(err);
		}
		*notifier = inputs.notifier;
		Ok(())
	}

	pub fn cascade(&self) -> Option<Cascade> {
		let state = self.state.lock();
		Some(Cascade {
			session: state.engine.actor()?.clone(),
			notifier: state.notifier.clone(),
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
		let ScopeState {
			engine,
			pass,
			model_session,
			notifier,
		} = &mut *state;
		let result = engine.run_disposal(pass);
		*model_session = ModelSession::default();
		*notifier = None;
		tracing::debug!(node = NODE, ok = result.is_ok(), "model_scope.dispose");
		result
	}
}

impl SessionListener for ModelScope {
	fn on_validation_requested(&self, _sender: &Session) -> Result<()> {
		Ok(())
	}

	fn on_field_changed(&self, _sender: &Session, _field: &FieldPath) -> Result<()> {
		Ok(())
	}
}

impl fmt::Debug for ModelScope {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ModelScope")
			.field("disposed", &self.latch.state())
			.finish_non_exhaustive()
	}
}
