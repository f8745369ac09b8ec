//! Edit sessions: a model plus its per-field edit state and event channels.

/// Synchronous listener lists and subscription handles.
pub mod broadcast;
/// Session error types.
pub mod error;
/// Field paths and property-path derivation.
pub mod field;
/// Host model trait and identity handle.
pub mod model;
/// Token-keyed property bags.
pub mod properties;
/// The session handle and its events.
pub mod session;
/// Field dirty flags and validation message stores.
pub mod state;

pub use broadcast::{Broadcast, Channel, Subscription, SubscriptionId};
pub use error::{ListenerError, SessionError};
pub use field::FieldPath;
pub use model::{Model, ModelRef};
pub use properties::{PropertyBag, PropertyKey, PropertyValue};
pub use session::{FieldChanged, Session, ValidationRequested, ValidationStateChanged, WeakSession};
pub use state::{FieldStates, MessageStore, StoreId};

#[cfg(test)]
mod tests;
