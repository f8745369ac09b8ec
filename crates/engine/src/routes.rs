//! Declared routes from a node's model to the sub-models beneath it.

use std::sync::Arc;

use editscope_session::{FieldPath, ModelRef};
use rustc_hash::FxHashMap as HashMap;

use crate::error::{Result, ScopeError};

/// An access chain from an owner model through one or more members.
///
/// `Route::new(city).member("Address").member("Street")` reaches the model
/// `city.Address.Street` and has the access path `(city, "Address.Street")`.
#[derive(Debug, Clone)]
pub struct Route {
	owner: ModelRef,
	members: Vec<String>,
}

/// The routes declared on one node, compared by identity across passes.
pub type RouteSet = Arc<[Route]>;

impl Route {
	pub fn new(owner: ModelRef) -> Self {
		Self {
			owner,
			members: Vec::new(),
		}
	}

	/// Parses a dotted member chain such as `"Address.Street"`.
	pub fn parse(owner: ModelRef, chain: &str) -> Self {
		Self {
			owner,
			members: chain
				.split('.')
				.filter(|segment| !segment.is_empty())
				.map(str::to_owned)
				.collect(),
		}
	}

	#[must_use]
	pub fn member(mut self, name: impl Into<String>) -> Self {
		self.members.push(name.into());
		self
	}

	pub fn owner(&self) -> &ModelRef {
		&self.owner
	}

	pub fn members(&self) -> &[String] {
		&self.members
	}

	/// Walks the members and returns the model reached.
	pub fn resolve(&self) -> Result<ModelRef> {
		if self.members.is_empty() {
			return Err(ScopeError::EmptyRoute {
				owner: self.owner.type_name(),
			});
		}

		let mut current = self.owner.clone();
		for member in &self.members {
			current = current
				.get()
				.member(member)
				.ok_or_else(|| ScopeError::UnresolvableRoute {
					owner: self.owner.type_name(),
					path: self.members.join("."),
				})?;
		}
		Ok(current)
	}

	/// The field path naming the reached model from the owner.
	pub fn access_path(&self) -> FieldPath {
		FieldPath::new(self.owner.clone(), self.members.join("."))
	}
}

/// Map from a reachable sub-model to its access path.
#[derive(Debug, Default)]
pub struct RouteRegistry {
	paths: HashMap<ModelRef, FieldPath>,
}

impl RouteRegistry {
	/// Rebuilds the map from `routes`.
	///
	/// Leaves the registry empty when any route fails.
	pub fn initialize(&mut self, routes: Option<&[Route]>) -> Result<()> {
		self.paths.clear();
		let Some(routes) = routes else {
			return Ok(());
		};

		for route in routes {
			let model = route.resolve().inspect_err(|_| self.paths.clear())?;
			if self.paths.contains_key(&model) {
				let model_name = model.type_name();
				self.paths.clear();
				return Err(ScopeError::DuplicateRouteModel {
					model: model_name,
					path: route.members.join("."),
				});
			}
			self.paths.insert(model, route.access_path());
		}
		Ok(())
	}

	pub fn lookup(&self, model: &ModelRef) -> Option<&FieldPath> {
		self.paths.get(model)
	}

	pub fn len(&self) -> usize {
		self.paths.len()
	}

	pub fn is_empty(&self) -> bool {
		self.paths.is_empty()
	}

	pub fn clear(&mut self) {
		self.paths.clear();
	}
}
