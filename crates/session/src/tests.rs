use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use proptest::prelude::*;

use crate::{FieldPath, Model, ModelRef, PropertyBag, PropertyKey, Session, SessionError};

#[derive(Debug)]
struct Form;

impl Model for Form {}

fn session() -> Session {
	Session::new(ModelRef::new(Form))
}

#[derive(Debug, thiserror::Error)]
#[error("boom")]
struct Boom;

#[test]
fn test_listeners_run_in_subscription_order() {
	let s = session();
	let order = Arc::new(Mutex::new(Vec::new()));
	for tag in ["a", "b", "c"] {
		let order = order.clone();
		s.on_validation_requested(move |_, _| {
			order.lock().push(tag);
			Ok(())
		});
	}
	s.validate().unwrap();
	assert_eq!(*order.lock(), ["a", "b", "c"]);
}

#[test]
fn test_unsubscribe_detaches_listener() {
	let s = session();
	let hits = Arc::new(AtomicUsize::new(0));
	let sub = {
		let hits = hits.clone();
		s.on_validation_requested(move |_, _| {
			hits.fetch_add(1, Ordering::SeqCst);
			Ok(())
		})
	};
	s.validate().unwrap();
	assert!(sub.clone().unsubscribe());
	assert!(!sub.unsubscribe());
	s.validate().unwrap();
	assert_eq!(hits.load(Ordering::SeqCst), 1);
	assert_eq!(s.validation_requested().listener_count(), 0);
}

#[test]
fn test_listener_error_stops_emission() {
	let s = session();
	let hits = Arc::new(AtomicUsize::new(0));
	s.on_validation_requested(|_, _| Err(Boom.into()));
	{
		let hits = hits.clone();
		s.on_validation_requested(move |_, _| {
			hits.fetch_add(1, Ordering::SeqCst);
			Ok(())
		});
	}
	let err = s.validate().unwrap_err();
	assert!(matches!(err, SessionError::Listener(_)));
	assert!(err.downcast_listener::<Boom>().is_some());
	assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[test]
fn test_listener_may_unsubscribe_itself() {
	let s = session();
	let slot: Arc<Mutex<Option<crate::Subscription>>> = Arc::default();
	let sub = {
		let slot = slot.clone();
		s.on_validation_requested(move |_, _| {
			if let Some(sub) = slot.lock().take() {
				sub.unsubscribe();
			}
			Ok(())
		})
	};
	*slot.lock() = Some(sub);
	s.validate().unwrap();
	assert_eq!(s.validation_requested().listener_count(), 0);
}

#[test]
fn test_field_changed_marks_modified() {
	let s = session();
	let field = FieldPath::new(s.model().clone(), "Hello");
	let seen = Arc::new(Mutex::new(None));
	{
		let seen = seen.clone();
		s.on_field_changed(move |_, event| {
			*seen.lock() = Some(event.field.clone());
			Ok(())
		});
	}
	assert!(!s.is_modified(&field));
	s.notify_field_changed(&field).unwrap();
	assert!(s.is_modified(&field));
	assert_eq!(seen.lock().as_ref(), Some(&field));

	s.mark_as_unmodified();
	assert!(!s.is_any_modified());
}

#[test]
fn test_validate_reports_messages() {
	let s = session();
	let field = FieldPath::new(s.model().clone(), "Hello");
	let store = s.message_store();
	{
		let store = store.clone();
		let field = field.clone();
		s.on_validation_requested(move |_, _| {
			store.clear();
			store.add(&field, "must be World");
			Ok(())
		});
	}
	assert!(!s.validate().unwrap());
	assert_eq!(s.messages_for(&field), ["must be World"]);
	assert!(!s.is_valid(&field));
	assert_eq!(store.len(), 1);
}

#[test]
fn test_stores_clear_only_their_own_messages() {
	let s = session();
	let field = FieldPath::new(s.model().clone(), "Hello");
	let a = s.message_store();
	let b = s.message_store();
	a.add(&field, "from a");
	b.add(&field, "from b");

	a.clear_field(&field);
	assert_eq!(s.messages_for(&field), ["from b"]);
	b.clear();
	assert!(s.validation_messages().is_empty());
}

#[test]
fn test_alias_shares_state_not_events() {
	let ancestor = session();
	let actor = Session::new(ancestor.model().clone());
	let key = PropertyKey::unique("test");
	ancestor.properties().insert(key, Arc::new(7_u32));

	let hits = Arc::new(AtomicUsize::new(0));
	{
		let hits = hits.clone();
		ancestor.on_field_changed(move |_, _| {
			hits.fetch_add(1, Ordering::SeqCst);
			Ok(())
		});
	}

	actor.alias_internal_state(&ancestor);
	assert!(actor.shares_state_with(&ancestor));
	assert!(actor.properties().contains(&key));

	let field = FieldPath::new(actor.model().clone(), "Hello");
	actor.notify_field_changed(&field).unwrap();
	assert!(ancestor.is_modified(&field));
	assert_eq!(hits.load(Ordering::SeqCst), 0);
	assert!(!actor.ptr_eq(&ancestor));
}

#[test]
fn test_weak_session_upgrade() {
	let s = session();
	let weak = s.downgrade();
	assert!(weak.upgrade().is_some_and(|up| up.ptr_eq(&s)));
	drop(s);
	assert!(weak.upgrade().is_none());
}

#[test]
fn test_property_keys_are_unique() {
	let bag = PropertyBag::default();
	let a = PropertyKey::unique("same");
	let b = PropertyKey::unique("same");
	bag.insert(a, Arc::new(1_u8));
	assert!(bag.contains(&a));
	assert!(!bag.contains(&b));
	assert!(bag.remove(&a).is_some());
	assert!(bag.is_empty());
}

proptest! {
	/// A store holds exactly the messages it added since its last clear.
	#[test]
	fn prop_store_counts_own_messages(ops in prop::collection::vec((any::<bool>(), 0usize..3), 0..40)) {
		let s = session();
		let fields: Vec<_> = ["A", "B", "C"]
			.into_iter()
			.map(|name| FieldPath::new(s.model().clone(), name))
			.collect();
		let mine = s.message_store();
		let other = s.message_store();
		let mut expected = [0usize; 3];

		for (clear, idx) in ops {
			if clear {
				mine.clear_field(&fields[idx]);
				expected[idx] = 0;
			} else {
				mine.add(&fields[idx], "m");
				other.add(&fields[idx], "o");
				expected[idx] += 1;
			}
		}

		prop_assert_eq!(mine.len(), expected.iter().sum::<usize>());
		mine.clear();
		prop_assert!(mine.is_empty());
	}
}
