//! Concrete node kinds built on [`SessionTransitionEngine`].
//!
//! [`SessionTransitionEngine`]: crate::SessionTransitionEngine

mod routes;
mod scope;
mod validator;

use editscope_session::{ModelRef, Session};

use crate::error::{Result, ScopeError};

pub use routes::{
	BIND_ROUTES_NOTIFIER, REBUILD_ROUTES, RoutesParams, RoutesPass, RoutesScope,
	bind_routes_notifier, rebuild_routes,
};
pub use scope::{ModelScope, ScopeParams, ScopePass};
pub use validator::{ModelValidator, ValidatorFlavour, ValidatorParams};

/// Which session a node operates on.
#[derive(Debug, Clone)]
pub enum ActorSource {
	/// A session over this model, reused while the model is unchanged.
	ExplicitModel(ModelRef),
	/// Exactly this session.
	ExplicitSession(Session),
	/// The ancestor, or a session derived from it.
	UseAncestor,
}

impl ActorSource {
	/// Builds the source from optional host parameters, rejecting both at once.
	pub fn from_parts(
		node: &'static str,
		model: Option<ModelRef>,
		session: Option<Session>,
	) -> Result<Self> {
		match (model, session) {
			(Some(_), Some(_)) => Err(ScopeError::ModelAndSessionConflict { node }),
			(Some(model), None) => Ok(Self::ExplicitModel(model)),
			(None, Some(session)) => Ok(Self::ExplicitSession(session)),
			(None, None) => Ok(Self::UseAncestor),
		}
	}
}

/// How a derived actor relates to its ancestor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AncestorLink {
	/// Own field state; validators beneath do not write into the ancestor's.
	#[default]
	Isolated,
	/// Shares the ancestor's field state and property bag.
	Direct,
}

/// Session cache for [`ActorSource::ExplicitModel`].
#[derive(Debug, Default)]
struct ModelSession {
	cached: Option<Session>,
}

impl ModelSession {
	/// The session for `source`, or `None` for [`ActorSource::UseAncestor`].
	fn resolve(&mut self, node: &'static str, source: &ActorSource) -> Option<Session> {
		match source {
			ActorSource::ExplicitSession(session) => {
				self.cached = None;
				Some(session.clone())
			}
			ActorSource::ExplicitModel(model) => {
				if let Some(session) = &self.cached
					&& session.model() == model
				{
					return Some(session.clone());
				}
				let session = Session::new(model.clone());
				tracing::debug!(node, session = session.id(), "node.model_session");
				self.cached = Some(session.clone());
				Some(session)
			}
			ActorSource::UseAncestor => {
				self.cached = None;
				None
			}
		}
	}
}
