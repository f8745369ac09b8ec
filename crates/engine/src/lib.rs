//! Keeps the root, ancestor, and actor sessions of nested edit scopes
//! consistent across update passes, and routes validation between them.
//!
//! Each node kind ([`ModelValidator`], [`ModelScope`], [`RoutesScope`]) owns
//! one [`SessionTransitionEngine`] that runs an ordered [`HandlerRegistry`]
//! over a [`ParametersTransition`] on every pass.

/// Value caches invalidated explicitly or by revision.
pub mod cached;
/// Validator options loaded from TOML.
pub mod config;
/// One-shot disposal latch.
pub mod disposal;
/// Per-node pipeline driver.
pub mod engine;
/// Engine error types.
pub mod error;
/// Concrete node kinds.
pub mod nodes;
/// Validation notifier and session listener contracts.
pub mod notify;
/// Ordered, named transition handlers.
pub mod pipeline;
/// Root resolution.
pub mod resolver;
/// Reference-counted actor to root associations.
pub mod root_registry;
/// Declared routes to sub-models.
pub mod routes;
/// Old/new value pairs with cached predicates.
pub mod transition;
/// Validation rule engine boundary.
pub mod validator;

pub use config::{ConfigError, ValidatorOptions};
pub use disposal::{DisposalLatch, DisposalState};
pub use engine::{Cascade, CascadePlan, SessionTransitionEngine};
pub use error::{ErrorKind, Result, ScopeError};
pub use nodes::{
	ActorSource, AncestorLink, ModelScope, ModelValidator, RoutesParams, RoutesPass, RoutesScope,
	ScopeParams, ScopePass, ValidatorFlavour, ValidatorParams,
};
pub use notify::{
	DirectFieldValidationRequest, ModelValidationRequest, NestedFieldValidationRequest,
	NotifierRef, SessionListener, ValidationNotifier, ValidationScope,
};
pub use pipeline::{
	Handler, HandlerPosition, HandlerRegistry, NodeInputs, PassContext, Registration, Wiring,
};
pub use root_registry::SharedRootRegistry;
pub use routes::{Route, RouteRegistry, RouteSet};
pub use transition::{ChildContent, ParametersTransition, Transition, TransitionValue};
pub use validator::{
	ConfigureStrategy, Severity, ValidationFailure, ValidationStrategy, Validator,
	ValidatorCatalog, ValidatorKey,
};
