//! Synchronous multicast channels owned by a session.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::error::{ListenerError, SessionError};
use crate::session::Session;

/// Identifies one subscription on one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

static NEXT_SUBSCRIPTION: AtomicU64 = AtomicU64::new(1);

impl SubscriptionId {
	fn next() -> Self {
		Self(NEXT_SUBSCRIPTION.fetch_add(1, Ordering::Relaxed))
	}
}

type Listener<E> = Arc<dyn Fn(&Session, &E) -> Result<(), ListenerError> + Send + Sync>;

/// A list of listeners invoked in subscription order.
///
/// Emission snapshots the listener list before invoking anything, so a
/// listener may subscribe, unsubscribe, or emit on other channels without
/// deadlocking. The first listener error stops emission and is returned to
/// the emitter.
pub struct Broadcast<E> {
	listeners: Mutex<Vec<(SubscriptionId, Listener<E>)>>,
}

impl<E> Default for Broadcast<E> {
	fn default() -> Self {
		Self {
			listeners: Mutex::new(Vec::new()),
		}
	}
}

impl<E> Broadcast<E> {
	/// Appends a listener.
	pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
	where
		F: Fn(&Session, &E) -> Result<(), ListenerError> + Send + Sync + 'static,
	{
		let id = SubscriptionId::next();
		self.listeners.lock().push((id, Arc::new(listener)));
		id
	}

	/// Removes a listener. Returns false when it was not subscribed.
	pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
		let mut listeners = self.listeners.lock();
		let Some(pos) = listeners.iter().position(|(sub, _)| *sub == id) else {
			return false;
		};
		listeners.remove(pos);
		true
	}

	pub fn listener_count(&self) -> usize {
		self.listeners.lock().len()
	}

	pub(crate) fn emit(&self, sender: &Session, event: &E) -> Result<(), SessionError> {
		let snapshot: Vec<Listener<E>> = self
			.listeners
			.lock()
			.iter()
			.map(|(_, listener)| listener.clone())
			.collect();

		for listener in snapshot {
			listener(sender, event).map_err(SessionError::Listener)?;
		}
		Ok(())
	}
}

impl<E> fmt::Debug for Broadcast<E> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Broadcast")
			.field("listeners", &self.listener_count())
			.finish()
	}
}

/// Which channel of a session a [`Subscription`] is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
	FieldChanged,
	ValidationRequested,
	ValidationStateChanged,
}

/// A subscription on a specific session, detached explicitly.
///
/// Not detached on drop: owners unwind subscriptions deliberately so that
/// wiring and unwiring stay symmetric.
#[derive(Debug, Clone)]
pub struct Subscription {
	session: Session,
	channel: Channel,
	id: SubscriptionId,
}

impl Subscription {
	pub(crate) fn new(session: Session, channel: Channel, id: SubscriptionId) -> Self {
		Self {
			session,
			channel,
			id,
		}
	}

	pub fn session(&self) -> &Session {
		&self.session
	}

	pub fn channel(&self) -> Channel {
		self.channel
	}

	pub fn id(&self) -> SubscriptionId {
		self.id
	}

	/// Detaches the listener. Returns false when it was already gone.
	pub fn unsubscribe(self) -> bool {
		match self.channel {
			Channel::FieldChanged => self.session.field_changed().unsubscribe(self.id),
			Channel::ValidationRequested => self.session.validation_requested().unsubscribe(self.id),
			Channel::ValidationStateChanged => {
				self.session.validation_state_changed().unsubscribe(self.id)
			}
		}
	}
}
