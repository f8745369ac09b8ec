//! Lazily computed values with explicit invalidation.

use std::cell::Cell;
use std::fmt;

/// A lazily computed value that is recomputed after [`Cached::invalidate`].
pub struct Cached<T: Copy> {
	slot: Cell<Option<T>>,
}

impl<T: Copy> Cached<T> {
	pub const fn new() -> Self {
		Self {
			slot: Cell::new(None),
		}
	}

	/// Returns the cached value, computing it first when stale.
	pub fn get_or_update(&self, compute: impl FnOnce() -> T) -> T {
		if let Some(value) = self.slot.get() {
			return value;
		}
		let value = compute();
		self.slot.set(Some(value));
		value
	}

	pub fn invalidate(&self) {
		self.slot.set(None);
	}

	/// The cached value, if fresh.
	pub fn peek(&self) -> Option<T> {
		self.slot.get()
	}
}

impl<T: Copy> Default for Cached<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T: Copy + fmt::Debug> fmt::Debug for Cached<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self.slot.get() {
			Some(value) => write!(f, "Cached({value:?})"),
			None => f.write_str("Cached(<stale>)"),
		}
	}
}

/// A cached value tagged with the revision it was computed at.
///
/// Reading with any other revision recomputes, so callers only need a
/// counter that advances on every mutation of the inputs.
pub struct RevisionCached<T: Copy> {
	slot: Cell<Option<(u64, T)>>,
}

impl<T: Copy> RevisionCached<T> {
	pub const fn new() -> Self {
		Self {
			slot: Cell::new(None),
		}
	}

	pub fn get_or_update(&self, revision: u64, compute: impl FnOnce() -> T) -> T {
		if let Some((cached_at, value)) = self.slot.get()
			&& cached_at == revision
		{
			return value;
		}
		let value = compute();
		self.slot.set(Some((revision, value)));
		value
	}

	pub fn invalidate(&self) {
		self.slot.set(None);
	}
}

impl<T: Copy> Default for RevisionCached<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T: Copy + fmt::Debug> fmt::Debug for RevisionCached<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self.slot.get() {
			Some((revision, value)) => write!(f, "RevisionCached({value:?}@{revision})"),
			None => f.write_str("RevisionCached(<stale>)"),
		}
	}
}

#[cfg(test)]
mod tests {
	use std::cell::Cell;

	use super::*;

	#[test]
	fn computes_once_until_invalidated() {
		let calls = Cell::new(0);
		let cached = Cached::new();
		let compute = || {
			calls.set(calls.get() + 1);
			42
		};
		assert_eq!(cached.get_or_update(compute), 42);
		assert_eq!(cached.get_or_update(compute), 42);
		assert_eq!(calls.get(), 1);

		cached.invalidate();
		assert_eq!(cached.peek(), None);
		assert_eq!(cached.get_or_update(compute), 42);
		assert_eq!(calls.get(), 2);
	}

	#[test]
	fn revision_change_recomputes() {
		let cached = RevisionCached::new();
		assert!(cached.get_or_update(1, || true));
		assert!(cached.get_or_update(1, || false));
		assert!(!cached.get_or_update(2, || false));
	}
}
