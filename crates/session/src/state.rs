//! Per-field edit state and the message stores that write into it.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use rustc_hash::FxHashMap as HashMap;

use crate::field::FieldPath;
use crate::session::Session;

/// Identifies the writer of a validation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StoreId(u64);

static NEXT_STORE: AtomicU64 = AtomicU64::new(1);

impl StoreId {
	fn next() -> Self {
		Self(NEXT_STORE.fetch_add(1, Ordering::Relaxed))
	}
}

#[derive(Debug, Default)]
struct FieldState {
	modified: bool,
	messages: Vec<(StoreId, String)>,
}

impl FieldState {
	fn is_vacant(&self) -> bool {
		!self.modified && self.messages.is_empty()
	}
}

/// Dirty flags and validation messages for every field a session has seen.
///
/// Several sessions may share one instance after aliasing.
#[derive(Default)]
pub struct FieldStates {
	fields: RwLock<HashMap<FieldPath, FieldState>>,
}

impl FieldStates {
	pub fn mark_modified(&self, field: &FieldPath) {
		self.fields.write().entry(field.clone()).or_default().modified = true;
	}

	pub fn is_modified(&self, field: &FieldPath) -> bool {
		self.fields.read().get(field).is_some_and(|state| state.modified)
	}

	pub fn is_any_modified(&self) -> bool {
		self.fields.read().values().any(|state| state.modified)
	}

	/// Clears every dirty flag, keeping messages.
	pub fn mark_all_unmodified(&self) {
		let mut fields = self.fields.write();
		for state in fields.values_mut() {
			state.modified = false;
		}
		fields.retain(|_, state| !state.is_vacant());
	}

	pub fn messages_for(&self, field: &FieldPath) -> Vec<String> {
		self.fields
			.read()
			.get(field)
			.map(|state| state.messages.iter().map(|(_, msg)| msg.clone()).collect())
			.unwrap_or_default()
	}

	/// All messages from all stores, grouped by field.
	pub fn messages(&self) -> Vec<(FieldPath, String)> {
		self.fields
			.read()
			.iter()
			.flat_map(|(field, state)| {
				state
					.messages
					.iter()
					.map(move |(_, msg)| (field.clone(), msg.clone()))
			})
			.collect()
	}

	pub fn has_messages(&self) -> bool {
		self.fields.read().values().any(|state| !state.messages.is_empty())
	}

	fn add(&self, store: StoreId, field: &FieldPath, message: String) {
		self.fields
			.write()
			.entry(field.clone())
			.or_default()
			.messages
			.push((store, message));
	}

	fn clear_store(&self, store: StoreId) {
		let mut fields = self.fields.write();
		for state in fields.values_mut() {
			state.messages.retain(|(owner, _)| *owner != store);
		}
		fields.retain(|_, state| !state.is_vacant());
	}

	fn clear_store_field(&self, store: StoreId, field: &FieldPath) {
		let mut fields = self.fields.write();
		let Some(state) = fields.get_mut(field) else {
			return;
		};
		state.messages.retain(|(owner, _)| *owner != store);
		if state.is_vacant() {
			fields.remove(field);
		}
	}

	fn count_for_store(&self, store: StoreId) -> usize {
		self.fields
			.read()
			.values()
			.map(|state| state.messages.iter().filter(|(owner, _)| *owner == store).count())
			.sum()
	}
}

impl fmt::Debug for FieldStates {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("FieldStates")
			.field("fields", &self.fields.read().len())
			.finish()
	}
}

/// Writes validation messages into one session's field state.
///
/// Each store only clears what it added itself. Writes go through the
/// session on every call, so a store keeps working after the session aliases
/// another session's state.
#[derive(Debug, Clone)]
pub struct MessageStore {
	session: Session,
	id: StoreId,
}

impl MessageStore {
	pub fn new(session: Session) -> Self {
		Self {
			session,
			id: StoreId::next(),
		}
	}

	pub fn id(&self) -> StoreId {
		self.id
	}

	pub fn session(&self) -> &Session {
		&self.session
	}

	pub fn add(&self, field: &FieldPath, message: impl Into<String>) {
		self.session.field_states().add(self.id, field, message.into());
	}

	pub fn clear(&self) {
		self.session.field_states().clear_store(self.id);
	}

	pub fn clear_field(&self, field: &FieldPath) {
		self.session.field_states().clear_store_field(self.id, field);
	}

	/// Number of messages this store currently holds.
	pub fn len(&self) -> usize {
		self.session.field_states().count_for_store(self.id)
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}
