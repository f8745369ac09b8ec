//! Out-of-band session properties keyed by opaque tokens.

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use rustc_hash::FxHashMap as HashMap;

/// Value stored in a [`PropertyBag`].
pub type PropertyValue = Arc<dyn Any + Send + Sync>;

/// Process-wide unique key for a [`PropertyBag`] entry.
///
/// Keys cannot be forged: the only way to obtain one is [`PropertyKey::unique`],
/// so an entry is reachable only by the component that minted its key.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PropertyKey {
	id: u64,
	label: &'static str,
}

static NEXT_KEY: AtomicU64 = AtomicU64::new(1);

impl PropertyKey {
	pub fn unique(label: &'static str) -> Self {
		Self {
			id: NEXT_KEY.fetch_add(1, Ordering::Relaxed),
			label,
		}
	}

	pub fn label(&self) -> &'static str {
		self.label
	}
}

impl fmt::Debug for PropertyKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "PropertyKey({}#{})", self.label, self.id)
	}
}

pub type PropertyMap = HashMap<PropertyKey, PropertyValue>;

/// Settable bag of properties attached to a session.
///
/// A bag may be shared by several sessions when one aliases another's
/// internal state.
#[derive(Default)]
pub struct PropertyBag {
	map: RwLock<PropertyMap>,
}

impl PropertyBag {
	pub fn get(&self, key: &PropertyKey) -> Option<PropertyValue> {
		self.map.read().get(key).cloned()
	}

	pub fn insert(&self, key: PropertyKey, value: PropertyValue) -> Option<PropertyValue> {
		self.map.write().insert(key, value)
	}

	pub fn remove(&self, key: &PropertyKey) -> Option<PropertyValue> {
		self.map.write().remove(key)
	}

	pub fn contains(&self, key: &PropertyKey) -> bool {
		self.map.read().contains_key(key)
	}

	pub fn len(&self) -> usize {
		self.map.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.map.read().is_empty()
	}

	/// Shared access for compound lookups.
	pub fn read(&self) -> RwLockReadGuard<'_, PropertyMap> {
		self.map.read()
	}

	/// Exclusive access for compound read-modify-write sequences.
	pub fn write(&self) -> RwLockWriteGuard<'_, PropertyMap> {
		self.map.write()
	}
}

impl fmt::Debug for PropertyBag {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_set().entries(self.map.read().keys()).finish()
	}
}
