//! Old/new value pairs tracked across update passes.

mod parameters;

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use editscope_session::Session;

use crate::cached::Cached;
use crate::error::{Result, ScopeError};
use crate::routes::RouteSet;

pub use parameters::ParametersTransition;

/// Identity comparison used by [`Transition`].
pub trait TransitionValue: Clone {
	fn same(&self, other: &Self) -> bool;
}

impl TransitionValue for Session {
	/// Same session object over the same model.
	fn same(&self, other: &Self) -> bool {
		self.ptr_eq(other) && self.model() == other.model()
	}
}

impl TransitionValue for bool {
	fn same(&self, other: &Self) -> bool {
		self == other
	}
}

impl TransitionValue for RouteSet {
	fn same(&self, other: &Self) -> bool {
		Arc::ptr_eq(self, other)
	}
}

/// Opaque host content rendered beneath a node, compared by identity.
#[derive(Clone)]
pub struct ChildContent(Arc<dyn Any + Send + Sync>);

impl ChildContent {
	pub fn new<T: Any + Send + Sync>(content: T) -> Self {
		Self(Arc::new(content))
	}

	pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
		self.0.downcast_ref()
	}
}

impl TransitionValue for ChildContent {
	fn same(&self, other: &Self) -> bool {
		Arc::ptr_eq(&self.0, &other.0)
	}
}

impl fmt::Debug for ChildContent {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "ChildContent({:p})", Arc::as_ptr(&self.0))
	}
}

/// The old and new value of one tracked quantity for one update pass.
///
/// `old` is `None` on the first transition. Derived predicates are cached
/// and recomputed after any assignment.
pub struct Transition<T> {
	old: Option<T>,
	new: Option<T>,
	is_first: bool,
	sealed: bool,
	revision: u64,
	same: Cached<bool>,
}

impl<T: TransitionValue> Transition<T> {
	/// A first transition: no previous value exists.
	pub fn first() -> Self {
		Self {
			old: None,
			new: None,
			is_first: true,
			sealed: false,
			revision: 0,
			same: Cached::new(),
		}
	}

	/// A transition continuing from the previous pass's new value.
	pub fn following(old: Option<T>) -> Self {
		Self {
			old,
			is_first: false,
			..Self::first()
		}
	}

	pub fn old_value(&self) -> Option<&T> {
		self.old.as_ref()
	}

	pub fn new_value(&self) -> Option<&T> {
		self.new.as_ref()
	}

	pub fn is_first(&self) -> bool {
		self.is_first
	}

	/// Assigns the new value.
	///
	/// Fails with [`ScopeError::SealedTransition`] when assigning a value to a
	/// sealed (disposing) transition. Clearing is always allowed.
	pub fn set_new(&mut self, value: Option<T>) -> Result<()> {
		if self.sealed && value.is_some() {
			return Err(ScopeError::SealedTransition);
		}
		self.new = value;
		self.touch();
		Ok(())
	}

	/// Carries the old value over as the new value.
	pub fn keep_old(&mut self) -> Result<()> {
		self.set_new(self.old.clone())
	}

	/// Takes the new value, leaving `None`.
	pub fn take_new(&mut self) -> Option<T> {
		let value = self.new.take();
		self.touch();
		value
	}

	pub fn seal(&mut self) {
		self.sealed = true;
	}

	pub fn is_sealed(&self) -> bool {
		self.sealed
	}

	/// Drops cached predicates without changing any value.
	pub fn invalidate(&mut self) {
		self.touch();
	}

	/// Advances on every assignment or invalidation.
	pub fn revision(&self) -> u64 {
		self.revision
	}

	/// Old and new are identical, or both absent.
	pub fn is_new_same(&self) -> bool {
		self.same.get_or_update(|| match (&self.old, &self.new) {
			(Some(old), Some(new)) => old.same(new),
			(None, None) => true,
			_ => false,
		})
	}

	pub fn is_new_different(&self) -> bool {
		!self.is_new_same()
	}

	pub fn is_old_non_null(&self) -> bool {
		self.old.is_some()
	}

	pub fn is_new_non_null(&self) -> bool {
		self.new.is_some()
	}

	pub fn is_new_null(&self) -> bool {
		self.new.is_none()
	}

	/// Exactly one of old and new is present.
	pub fn is_new_null_state_changed(&self) -> bool {
		self.is_old_non_null() != self.is_new_non_null()
	}

	fn touch(&mut self) {
		self.revision += 1;
		self.same.invalidate();
	}
}

impl<T: fmt::Debug> fmt::Debug for Transition<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Transition")
			.field("old", &self.old)
			.field("new", &self.new)
			.field("is_first", &self.is_first)
			.field("sealed", &self.sealed)
			.finish()
	}
}
