//! Host model handles compared by identity.

use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A host model object that sessions edit and validators inspect.
///
/// Models are navigated by name instead of reflection: a model exposes the
/// sub-models it owns through [`Model::member`] and indexed elements through
/// [`Model::element`]. Scalar members are not models and resolve to `None`.
pub trait Model: Any + Send + Sync + fmt::Debug {
	/// Returns the sub-model reachable through the member `name`.
	fn member(&self, name: &str) -> Option<ModelRef> {
		let _ = name;
		None
	}

	/// Returns the element at `index` when this model is a collection.
	fn element(&self, index: &str) -> Option<ModelRef> {
		let _ = index;
		None
	}

	/// Type name used in diagnostics and as the default validator key.
	fn type_name(&self) -> &'static str {
		std::any::type_name::<Self>()
	}
}

/// Shared, identity-compared handle to a [`Model`].
///
/// Two handles are equal only when they point at the same allocation, never
/// by value.
#[derive(Clone)]
pub struct ModelRef(Arc<dyn Model>);

impl ModelRef {
	/// Wraps a model in a new shared allocation.
	pub fn new<M: Model>(model: M) -> Self {
		Self(Arc::new(model))
	}

	/// Wraps an already shared model.
	pub fn from_arc(model: Arc<dyn Model>) -> Self {
		Self(model)
	}

	/// Borrows the model as a trait object.
	pub fn get(&self) -> &dyn Model {
		&*self.0
	}

	/// Downcasts to the concrete model type.
	pub fn downcast_ref<M: Model>(&self) -> Option<&M> {
		let any: &dyn Any = &*self.0;
		any.downcast_ref::<M>()
	}

	/// See [`Model::type_name`].
	pub fn type_name(&self) -> &'static str {
		self.0.type_name()
	}

	/// Address used for identity comparison and hashing.
	pub fn addr(&self) -> usize {
		Arc::as_ptr(&self.0).cast::<()>() as usize
	}

	pub fn ptr_eq(&self, other: &Self) -> bool {
		self.addr() == other.addr()
	}
}

impl PartialEq for ModelRef {
	fn eq(&self, other: &Self) -> bool {
		self.ptr_eq(other)
	}
}

impl Eq for ModelRef {}

impl Hash for ModelRef {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.addr().hash(state);
	}
}

impl fmt::Debug for ModelRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "ModelRef({}@{:#x})", self.type_name(), self.addr())
	}
}

impl<M: Model> From<Arc<M>> for ModelRef {
	fn from(model: Arc<M>) -> Self {
		Self(model)
	}
}
