//! The edit session handle.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::broadcast::{Broadcast, Channel, Subscription};
use crate::error::{ListenerError, Result};
use crate::field::FieldPath;
use crate::model::ModelRef;
use crate::properties::PropertyBag;
use crate::state::{FieldStates, MessageStore};

/// Raised after a field value was edited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldChanged {
	pub field: FieldPath,
}

/// Raised when the whole model should be validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationRequested;

/// Raised after validation messages were added or removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationStateChanged;

static NEXT_SESSION: AtomicU64 = AtomicU64::new(1);

struct SessionInner {
	id: u64,
	model: ModelRef,
	fields: RwLock<Arc<FieldStates>>,
	properties: RwLock<Arc<PropertyBag>>,
	field_changed: Broadcast<FieldChanged>,
	validation_requested: Broadcast<ValidationRequested>,
	validation_state_changed: Broadcast<ValidationStateChanged>,
}

/// A model plus its per-field edit state, property bag, and event channels.
///
/// Cloning yields another handle to the same session. Sessions are compared
/// by identity only, see [`Session::ptr_eq`].
#[derive(Clone)]
pub struct Session(Arc<SessionInner>);

impl Session {
	/// Creates an isolated session over `model`.
	pub fn new(model: ModelRef) -> Self {
		let id = NEXT_SESSION.fetch_add(1, Ordering::Relaxed);
		tracing::debug!(session = id, model = model.type_name(), "session.create");
		Self(Arc::new(SessionInner {
			id,
			model,
			fields: RwLock::new(Arc::default()),
			properties: RwLock::new(Arc::default()),
			field_changed: Broadcast::default(),
			validation_requested: Broadcast::default(),
			validation_state_changed: Broadcast::default(),
		}))
	}

	/// Process-unique id, used in diagnostics.
	pub fn id(&self) -> u64 {
		self.0.id
	}

	pub fn model(&self) -> &ModelRef {
		&self.0.model
	}

	pub fn ptr_eq(&self, other: &Self) -> bool {
		Arc::ptr_eq(&self.0, &other.0)
	}

	pub fn downgrade(&self) -> WeakSession {
		WeakSession(Arc::downgrade(&self.0))
	}

	pub fn field_changed(&self) -> &Broadcast<FieldChanged> {
		&self.0.field_changed
	}

	pub fn validation_requested(&self) -> &Broadcast<ValidationRequested> {
		&self.0.validation_requested
	}

	pub fn validation_state_changed(&self) -> &Broadcast<ValidationStateChanged> {
		&self.0.validation_state_changed
	}

	pub fn on_field_changed<F>(&self, listener: F) -> Subscription
	where
		F: Fn(&Session, &FieldChanged) -> std::result::Result<(), ListenerError> + Send + Sync + 'static,
	{
		let id = self.0.field_changed.subscribe(listener);
		Subscription::new(self.clone(), Channel::FieldChanged, id)
	}

	pub fn on_validation_requested<F>(&self, listener: F) -> Subscription
	where
		F: Fn(&Session, &ValidationRequested) -> std::result::Result<(), ListenerError>
			+ Send
			+ Sync
			+ 'static,
	{
		let id = self.0.validation_requested.subscribe(listener);
		Subscription::new(self.clone(), Channel::ValidationRequested, id)
	}

	pub fn on_validation_state_changed<F>(&self, listener: F) -> Subscription
	where
		F: Fn(&Session, &ValidationStateChanged) -> std::result::Result<(), ListenerError>
			+ Send
			+ Sync
			+ 'static,
	{
		let id = self.0.validation_state_changed.subscribe(listener);
		Subscription::new(self.clone(), Channel::ValidationStateChanged, id)
	}

	/// Marks `field` as modified and raises [`FieldChanged`].
	pub fn notify_field_changed(&self, field: &FieldPath) -> Result<()> {
		self.field_states().mark_modified(field);
		self.0.field_changed.emit(
			self,
			&FieldChanged {
				field: field.clone(),
			},
		)
	}

	/// Raises [`ValidationRequested`] and reports whether no message remains.
	pub fn validate(&self) -> Result<bool> {
		self.0.validation_requested.emit(self, &ValidationRequested)?;
		Ok(!self.field_states().has_messages())
	}

	pub fn notify_validation_state_changed(&self) -> Result<()> {
		self.0
			.validation_state_changed
			.emit(self, &ValidationStateChanged)
	}

	/// Creates a message store writing into this session.
	pub fn message_store(&self) -> MessageStore {
		MessageStore::new(self.clone())
	}

	pub fn field_states(&self) -> Arc<FieldStates> {
		self.0.fields.read().clone()
	}

	pub fn properties(&self) -> Arc<PropertyBag> {
		self.0.properties.read().clone()
	}

	pub fn validation_messages(&self) -> Vec<String> {
		self.field_states()
			.messages()
			.into_iter()
			.map(|(_, msg)| msg)
			.collect()
	}

	pub fn messages_for(&self, field: &FieldPath) -> Vec<String> {
		self.field_states().messages_for(field)
	}

	pub fn is_valid(&self, field: &FieldPath) -> bool {
		self.messages_for(field).is_empty()
	}

	pub fn is_modified(&self, field: &FieldPath) -> bool {
		self.field_states().is_modified(field)
	}

	pub fn is_any_modified(&self) -> bool {
		self.field_states().is_any_modified()
	}

	pub fn mark_as_unmodified(&self) {
		self.field_states().mark_all_unmodified();
	}

	/// Makes this session share `source`'s field state and property bag.
	///
	/// Event channels stay separate: listeners on `source` do not observe
	/// events raised on `self`.
	pub fn alias_internal_state(&self, source: &Session) {
		if self.ptr_eq(source) {
			return;
		}
		let fields = source.field_states();
		let properties = source.properties();
		*self.0.fields.write() = fields;
		*self.0.properties.write() = properties;
		tracing::debug!(session = self.id(), source = source.id(), "session.alias");
	}

	/// Whether both sessions currently share one field state.
	pub fn shares_state_with(&self, other: &Session) -> bool {
		Arc::ptr_eq(&self.field_states(), &other.field_states())
	}
}

impl PartialEq for Session {
	fn eq(&self, other: &Self) -> bool {
		self.ptr_eq(other)
	}
}

impl Eq for Session {}

impl fmt::Debug for Session {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Session")
			.field("id", &self.0.id)
			.field("model", &self.0.model)
			.finish()
	}
}

/// Non-owning handle to a [`Session`].
#[derive(Clone, Default)]
pub struct WeakSession(Weak<SessionInner>);

impl WeakSession {
	pub fn upgrade(&self) -> Option<Session> {
		self.0.upgrade().map(Session)
	}
}

impl fmt::Debug for WeakSession {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self.upgrade() {
			Some(session) => write!(f, "WeakSession({})", session.id()),
			None => f.write_str("WeakSession(<dropped>)"),
		}
	}
}
