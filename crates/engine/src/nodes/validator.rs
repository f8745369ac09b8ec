//! The node that owns a validator and answers router calls.

use std::sync::{Arc, LazyLock, Weak};

use editscope_session::{FieldPath, MessageStore, ModelRef, Session};
use parking_lot::Mutex;

use super::{ActorSource, ModelSession, RoutesParams, RoutesScope};
use crate::config::ValidatorOptions;
use crate::disposal::{DisposalLatch, DisposalState};
use crate::engine::{Cascade, CascadePlan, SessionTransitionEngine};
use crate::error::{Result, ScopeError};
use crate::notify::{
	DirectFieldValidationRequest, ModelValidationRequest, NestedFieldValidationRequest,
	NotifierRef, SessionListener, ValidationNotifier, ValidationScope,
};
use crate::pipeline::builtin::{
	ATTACH_MESSAGE_STORES, MAINTAIN_ROOT_REGISTRY, RESOLVE_ROOT, SET_PROVIDED_SESSIONS,
	WIRE_ACTOR, WIRE_ANCESTOR, WIRE_ROOT, attach_message_stores, maintain_root_registry,
	resolve_root, set_provided_sessions, wire_actor, wire_ancestor, wire_root,
};
use crate::pipeline::{Handler, HandlerRegistry, NodeInputs};
use crate::routes::RouteSet;
use crate::transition::ChildContent;
use crate::validator::{
	ConfigureStrategy, ValidationFailure, ValidationStrategy, Validator, ValidatorCatalog,
	ValidatorKey,
};

/// Where a validator's actor comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidatorFlavour {
	/// Validates the ancestor session itself.
	Rootpath,
	/// Validates an explicit model or session beneath the ancestor.
	Subpath,
}

impl ValidatorFlavour {
	fn node(self) -> &'static str {
		match self {
			Self::Rootpath => "model_validator.rootpath",
			Self::Subpath => "model_validator.subpath",
		}
	}
}

/// Host parameters of one [`ModelValidator::update`] pass.
#[derive(Clone, Default)]
pub struct ValidatorParams {
	pub ancestor: Option<Session>,
	pub model: Option<ModelRef>,
	pub session: Option<Session>,
	pub validator: Option<Arc<dyn Validator>>,
	pub validator_key: Option<ValidatorKey>,
	pub catalog: Option<Arc<ValidatorCatalog>>,
	pub options: ValidatorOptions,
	pub configure: Option<ConfigureStrategy>,
	pub routes: Option<RouteSet>,
	pub child_content: Option<ChildContent>,
}

static HANDLERS: LazyLock<Arc<HandlerRegistry<()>>> = LazyLock::new(|| {
	Arc::new(HandlerRegistry::from_ordered([
		(SET_PROVIDED_SESSIONS, set_provided_sessions as Handler<()>),
		(RESOLVE_ROOT, resolve_root),
		(WIRE_ROOT, wire_root),
		(WIRE_ANCESTOR, wire_ancestor),
		(WIRE_ACTOR, wire_actor),
		(ATTACH_MESSAGE_STORES, attach_message_stores),
		(MAINTAIN_ROOT_REGISTRY, maintain_root_registry),
	]))
});

struct ValidatorState {
	engine: SessionTransitionEngine<()>,
	model_session: ModelSession,
	validator: Option<Arc<dyn Validator>>,
	resolved_key: Option<ValidatorKey>,
	options: ValidatorOptions,
	configure: Option<ConfigureStrategy>,
	routes_scope: Option<Arc<RoutesScope>>,
}

impl ValidatorState {
	fn resolve_validator(
		&mut self,
		node: &'static str,
		validator: Option<Arc<dyn Validator>>,
		key: Option<ValidatorKey>,
		catalog: Option<&ValidatorCatalog>,
	) -> Result<()> {
		match (validator, key) {
			(Some(_), Some(_)) => Err(ScopeError::ValidatorSourceConflict { node }),
			(None, None) => Err(ScopeError::MissingValidatorSource { node }),
			(Some(validator), None) => {
				self.validator = Some(validator);
				self.resolved_key = None;
				Ok(())
			}
			(None, Some(key)) => {
				let catalog = catalog.ok_or_else(|| ScopeError::MissingValidatorCatalog {
					node,
					key: key.to_string(),
				})?;
				if self.validator.is_some() && self.resolved_key.as_ref() == Some(&key) {
					return Ok(());
				}
				let validator = catalog
					.resolve(&key)
					.ok_or_else(|| ScopeError::UnknownValidator(key.to_string()))?;
				tracing::debug!(node, key = %key, "validator.resolve");
				self.validator = Some(validator);
				self.resolved_key = Some(key);
				Ok(())
			}
		}
	}

	/// Everything a validation run needs, or `None` before the first
	/// successful pass.
	fn ready(&self) -> Option<Ready> {
		let wiring = self.engine.wiring();
		Some(Ready {
			actor: self.engine.actor()?.clone(),
			validator: self.validator.clone()?,
			root_store: wiring.root_store.clone()?,
			actor_store: wiring.actor_store.clone(),
			options: self.options.clone(),
			configure: self.configure.clone(),
		})
	}
}

/// Snapshot taken under the node lock; validation runs without it.
struct Ready {
	actor: Session,
	validator: Arc<dyn Validator>,
	root_store: MessageStore,
	actor_store: Option<MessageStore>,
	options: ValidatorOptions,
	configure: Option<ConfigureStrategy>,
}

impl Ready {
	fn run(&self, model: &ModelRef, mut strategy: ValidationStrategy) -> Vec<ValidationFailure> {
		if let Some(configure) = &self.configure {
			configure(&mut strategy);
		}
		let minimum = self.options.minimum_severity;
		self.validator
			.validate(model, &strategy)
			.into_iter()
			.filter(|failure| failure.severity.meets(minimum))
			.collect()
	}

	fn stores(&self) -> impl Iterator<Item = &MessageStore> {
		std::iter::once(&self.root_store).chain(self.actor_store.as_ref())
	}

	fn check_model(&self, node: &'static str, model: &ModelRef) -> Result<bool> {
		if self.validator.can_validate(model) {
			return Ok(true);
		}
		if self.options.suppress_invalidatable_field_models {
			tracing::warn!(node, model = model.type_name(), "validator.unvalidatable_model");
			return Ok(false);
		}
		Err(ScopeError::UnvalidatableModel {
			model: model.type_name(),
		})
	}
}

/// Validates a model session and serves as the [`ValidationNotifier`] of the
/// scopes beneath it.
///
/// Declaring routes creates an owned [`RoutesScope`] whose actor shares the
/// validator's field state, so nested sub-model editors report into the same
/// messages.
pub struct ModelValidator {
	flavour: ValidatorFlavour,
	this: Weak<ModelValidator>,
	latch: DisposalLatch,
	state: Mutex<ValidatorState>,
}

impl ModelValidator {
	/// A validator of the ancestor session.
	pub fn rootpath() -> Arc<Self> {
		Self::with_handlers(ValidatorFlavour::Rootpath, Self::default_handlers())
	}

	/// A validator of an explicit model or session.
	pub fn subpath() -> Arc<Self> {
		Self::with_handlers(ValidatorFlavour::Subpath, Self::default_handlers())
	}

	/// The handler registry shared by every validator built without an
	/// explicit one.
	pub fn default_handlers() -> Arc<HandlerRegistry<()>> {
		HANDLERS.clone()
	}

	pub fn with_handlers(flavour: ValidatorFlavour, handlers: Arc<HandlerRegistry<()>>) -> Arc<Self> {
		Arc::new_cyclic(|this: &Weak<Self>| {
			let listener: Weak<dyn SessionListener> = this.clone();
			Self {
				flavour,
				this: this.clone(),
				latch: DisposalLatch::new(),
				state: Mutex::new(ValidatorState {
					engine: SessionTransitionEngine::new(flavour.node(), handlers, listener),
					model_session: ModelSession::default(),
					validator: None,
					resolved_key: None,
					options: ValidatorOptions::default(),
					configure: None,
					routes_scope: None,
				}),
			}
		})
	}

	pub fn flavour(&self) -> ValidatorFlavour {
		self.flavour
	}

	fn node(&self) -> &'static str {
		self.flavour.node()
	}

	fn notifier(&self) -> NotifierRef {
		self.this.clone()
	}

	/// Runs one update pass with `params`.
	pub fn update(&self, params: ValidatorParams) -> Result<()> {
		let node = self.node();
		if self.latch.is_disposed() {
			return Err(ScopeError::Disposed { node });
		}
		let ValidatorParams {
			ancestor,
			model,
			session,
			validator,
			validator_key,
			catalog,
			options,
			configure,
			routes,
			child_content,
		} = params;

		let (scope_update, released_scope) = {
			let mut state = self.state.lock();
			let actor = match self.flavour {
				ValidatorFlavour::Rootpath => {
					if model.is_some() || session.is_some() {
						return Err(ScopeError::UnexpectedExplicitActor { node });
					}
					ancestor.clone()
				}
				ValidatorFlavour::Subpath => match ActorSource::from_parts(node, model, session)? {
					ActorSource::UseAncestor => return Err(ScopeError::MissingModelOrSession { node }),
					source => state.model_session.resolve(node, &source),
				},
			};
			state.resolve_validator(node, validator, validator_key, catalog.as_deref())?;

			let inputs = NodeInputs {
				ancestor,
				actor,
				child_content,
				routes: routes.clone(),
				notifier: None,
			};
			if let Err(err) = state.engine.run_pass(&inputs, &mut ()) {
				let released = state.routes_scope.take();
				drop(state);
				if let Some(scope) = released
					&& let Err(dispose_err) = scope.dispose()
				{
					tracing::warn!(node, err = %dispose_err, "validator.release_routes_scope_failed");
				}
				return Err(err);
			}

			let suppress_unregistered_routes = options.suppress_unregistered_routes;
			state.options = options;
			state.configure = configure;

			match (routes, state.engine.actor().cloned()) {
				(Some(routes), Some(actor)) => {
					let scope = state.routes_scope.get_or_insert_with(RoutesScope::new).clone();
					let params = RoutesParams {
						ancestor: Some(actor),
						notifier: Some(self.notifier()),
						routes: Some(routes),
						suppress_unregistered_routes,
						child_content: None,
					};
					(Some((scope, params)), None)
				}
				_ => (None, state.routes_scope.take()),
			}
		};

		if let Some(scope) = released_scope {
			tracing::debug!(node, "validator.release_routes_scope");
			scope.dispose()?;
		}
		if let Some((scope, params)) = scope_update {
			scope.update(params)?;
		}
		Ok(())
	}

	/// What descendants receive: the routes scope's actor when routes are
	/// declared, else this node's actor, with this node as notifier.
	pub fn cascade(&self) -> Option<Cascade> {
		let (actor, scope) = {
			let state = self.state.lock();
			(state.engine.actor().cloned(), state.routes_scope.clone())
		};
		if let Some(scope) = scope {
			return scope.cascade();
		}
		Some(Cascade {
			session: actor?,
			notifier: Some(self.notifier()),
		})
	}

	pub fn cascade_plan(&self) -> CascadePlan {
		let scope = self.state.lock().routes_scope.clone();
		match scope {
			Some(scope) => scope.cascade_plan(),
			None => self.state.lock().engine.cascade_plan(),
		}
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

	/// The owned routes scope, while routes are declared.
	pub fn routes_scope(&self) -> Option<Arc<RoutesScope>> {
		self.state.lock().routes_scope.clone()
	}

	pub fn handlers(&self) -> Arc<HandlerRegistry<()>> {
		self.state.lock().engine.handlers().clone()
	}

	/// Requests full validation through the root session and reports whether
	/// the root holds no message afterwards. `None` before the first pass.
	pub fn validate(&self) -> Result<Option<bool>> {
		let Some(root) = self.root() else {
			return Ok(None);
		};
		Ok(Some(root.validate()?))
	}

	/// Validates the whole actor model, replacing every message this node
	/// added.
	pub fn validate_model(&self) -> Result<()> {
		let Some(ready) = self.state.lock().ready() else {
			return Ok(());
		};
		let model = ready.actor.model().clone();
		let failures = ready.run(&model, ValidationStrategy::default());
		tracing::trace!(node = self.node(), failures = failures.len(), "validator.model");

		for store in ready.stores() {
			store.clear();
		}
		for failure in &failures {
			let field = FieldPath::derive(&model, &failure.property_name);
			for store in ready.stores() {
				store.add(&field, failure.message.clone());
			}
		}
		Ok(ready.actor.notify_validation_state_changed()?)
	}

	/// Validates one field of a model the validator knows.
	pub fn validate_direct_field(&self, field: &FieldPath) -> Result<()> {
		let Some(ready) = self.state.lock().ready() else {
			return Ok(());
		};
		if !ready.check_model(self.node(), field.owner())? {
			return Ok(());
		}
		let mut strategy = ValidationStrategy::default();
		strategy.include_property(field.name());
		let failures = ready.run(field.owner(), strategy);
		tracing::trace!(node = self.node(), field = %field, failures = failures.len(), "validator.field");

		record(&ready, field, &failures);
		Ok(ready.actor.notify_validation_state_changed()?)
	}

	/// Validates `full_path` on its owner and records the outcome under
	/// `sub_field`, the field as raised on the sub-model.
	pub fn validate_nested_field(&self, full_path: &FieldPath, sub_field: &FieldPath) -> Result<()> {
		let Some(ready) = self.state.lock().ready() else {
			return Ok(());
		};
		if !ready.check_model(self.node(), full_path.owner())? {
			return Ok(());
		}
		let mut strategy = ValidationStrategy::default();
		strategy.include_property(full_path.name());
		let failures = ready.run(full_path.owner(), strategy);
		tracing::trace!(node = self.node(), field = %full_path, failures = failures.len(), "validator.nested_field");

		record(&ready, sub_field, &failures);
		Ok(ready.actor.notify_validation_state_changed()?)
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
		let scope = self.state.lock().routes_scope.take();
		let scope_result = scope.map_or(Ok(()), |scope| scope.dispose());

		let mut state = self.state.lock();
		let engine_result = state.engine.run_disposal(&mut ());
		state.model_session = ModelSession::default();
		state.validator = None;
		state.resolved_key = None;
		state.configure = None;
		drop(state);

		let result = scope_result.and(engine_result);
		tracing::debug!(node = self.node(), ok = result.is_ok(), "validator.dispose");
		result
	}
}

fn record(ready: &Ready, field: &FieldPath, failures: &[ValidationFailure]) {
	for store in ready.stores() {
		store.clear_field(field);
		for failure in failures {
			store.add(field, failure.message.clone());
		}
	}
}

impl ValidationNotifier for ModelValidator {
	fn evaluate_validation_scope(&self, candidate: &Session) -> ValidationScope {
		let state = self.state.lock();
		let Some(root) = state.engine.root() else {
			return ValidationScope::default();
		};
		let is_within_scope = root.ptr_eq(candidate)
			|| state
				.engine
				.registry()
				.try_get(candidate)
				.is_some_and(|found| found.ptr_eq(root));
		ValidationScope { is_within_scope }
	}

	fn notify_model_validation_requested(&self, request: ModelValidationRequest) -> Result<()> {
		let Some(root) = self.root() else {
			return Ok(());
		};
		// The root subscription already validates this request.
		if request.original_source.ptr_eq(&root) {
			tracing::trace!(node = self.node(), sender = request.sender.id(), "validator.dedup");
			return Ok(());
		}
		self.validate_model()
	}

	fn notify_direct_field_validation_requested(
		&self,
		request: DirectFieldValidationRequest,
	) -> Result<()> {
		self.validate_direct_field(&request.field)
	}

	fn notify_nested_field_validation_requested(
		&self,
		request: NestedFieldValidationRequest,
	) -> Result<()> {
		self.validate_nested_field(&request.full_path, &request.sub_field)
	}
}

impl SessionListener for ModelValidator {
	fn on_validation_requested(&self, _sender: &Session) -> Result<()> {
		self.validate_model()
	}

	fn on_field_changed(&self, _sender: &Session, field: &FieldPath) -> Result<()> {
		self.validate_direct_field(field)
	}
}

impl std::fmt::Debug for ModelValidator {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ModelValidator")
			.field("flavour", &self.flavour)
			.field("disposed", &self.latch.state())
			.finish_non_exhaustive()
	}
}
