//! Reference-counted actor to root association stored in session property bags.

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, LazyLock};

use editscope_session::{PropertyBag, PropertyKey, PropertyValue, Session};

use crate::error::{Result, ScopeError};

struct RootEntry {
	root: Session,
	counter: AtomicUsize,
}

impl RootEntry {
	/// Increments unless the entry is being removed. Returns the new count.
	fn try_increment(&self) -> Option<usize> {
		let mut current = self.counter.load(Ordering::Acquire);
		loop {
			if current == 0 {
				return None;
			}
			match self.counter.compare_exchange_weak(
				current,
				current + 1,
				Ordering::AcqRel,
				Ordering::Acquire,
			) {
				Ok(_) => return Some(current + 1),
				Err(actual) => current = actual,
			}
		}
	}

	/// Decrements and returns the new count.
	fn decrement(&self) -> usize {
		let mut current = self.counter.load(Ordering::Acquire);
		loop {
			let next = current.saturating_sub(1);
			match self.counter.compare_exchange_weak(
				current,
				next,
				Ordering::AcqRel,
				Ordering::Acquire,
			) {
				Ok(_) => return next,
				Err(actual) => current = actual,
			}
		}
	}
}

/// Discovers the root of a session without walking the node tree.
///
/// Every node occupies its actor once for the root it resolved. The entry
/// lives in the actor's property bag and disappears when the last occupier
/// leaves, so sessions aliasing one property bag share one entry.
pub struct SharedRootRegistry {
	key: PropertyKey,
}

static GLOBAL: LazyLock<SharedRootRegistry> = LazyLock::new(SharedRootRegistry::new);

impl SharedRootRegistry {
	/// A registry with its own private token, independent of [`Self::global`].
	pub fn new() -> Self {
		Self {
			key: PropertyKey::unique("shared-root"),
		}
	}

	/// The registry shared by every node in the process.
	pub fn global() -> &'static Self {
		&GLOBAL
	}

	fn entry_of(&self, value: &PropertyValue) -> Result<Arc<RootEntry>> {
		let value: Arc<dyn Any + Send + Sync> = value.clone();
		value
			.downcast::<RootEntry>()
			.map_err(|_| ScopeError::ForeignProperty {
				key: self.key.label(),
			})
	}

	fn lookup(&self, bag: &PropertyBag) -> Result<Option<Arc<RootEntry>>> {
		bag.get(&self.key)
			.map(|value| self.entry_of(&value))
			.transpose()
	}

	/// Associates `session` with `root`, or counts one more occupier of an
	/// existing association. Returns the new count.
	pub fn occupy(&self, session: &Session, root: &Session) -> Result<usize> {
		let bag = session.properties();

		if let Some(entry) = self.lookup(&bag)? {
			ensure_root(session, &entry, root)?;
			if let Some(counter) = entry.try_increment() {
				tracing::debug!(session = session.id(), root = root.id(), counter, "root_registry.occupy");
				return Ok(counter);
			}
		}

		let mut map = bag.write();
		let counter = match map.get(&self.key) {
			Some(value) => {
				let entry = self.entry_of(value)?;
				ensure_root(session, &entry, root)?;
				entry.counter.fetch_add(1, Ordering::AcqRel) + 1
			}
			None => {
				let entry = RootEntry {
					root: root.clone(),
					counter: AtomicUsize::new(1),
				};
				map.insert(self.key, Arc::new(entry));
				1
			}
		};
		tracing::debug!(session = session.id(), root = root.id(), counter, "root_registry.occupy");
		Ok(counter)
	}

	/// Counts one occupier of `session` less, removing the association when
	/// none remain. Returns the remaining count.
	pub fn disoccupy(&self, session: &Session) -> Result<usize> {
		let bag = session.properties();
		let mut map = bag.write();
		let Some(value) = map.get(&self.key) else {
			return Err(ScopeError::EntryNotFound {
				session: session.id(),
			});
		};
		let entry = self.entry_of(value)?;
		let counter = entry.decrement();
		if counter == 0 {
			map.remove(&self.key);
		}
		tracing::debug!(session = session.id(), counter, "root_registry.disoccupy");
		Ok(counter)
	}

	/// The root associated with `session`, if any.
	pub fn try_get(&self, session: &Session) -> Option<Session> {
		self.try_get_with_counter(session).map(|(root, _)| root)
	}

	/// The root associated with `session` and its occupier count.
	pub fn try_get_with_counter(&self, session: &Session) -> Option<(Session, usize)> {
		let entry = self.lookup(&session.properties()).ok().flatten()?;
		let counter = entry.counter.load(Ordering::Acquire);
		(counter > 0).then(|| (entry.root.clone(), counter))
	}
}

fn ensure_root(session: &Session, entry: &RootEntry, root: &Session) -> Result<()> {
	if entry.root.ptr_eq(root) {
		return Ok(());
	}
	Err(ScopeError::ConflictingRootAssociation {
		session: session.id(),
		existing: entry.root.id(),
		requested: root.id(),
	})
}

impl Default for SharedRootRegistry {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Debug for SharedRootRegistry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("SharedRootRegistry")
			.field("key", &self.key)
			.finish()
	}
}
