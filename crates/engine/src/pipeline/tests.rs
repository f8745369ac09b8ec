use std::sync::{Arc, Weak};

use editscope_session::{FieldPath, Model, ModelRef, Session};

use super::builtin::{
	MAINTAIN_ROOT_REGISTRY, RESOLVE_ROOT, SET_PROVIDED_SESSIONS, WIRE_ACTOR, WIRE_ANCESTOR,
	WIRE_ROOT, maintain_root_registry, resolve_root, set_provided_sessions, wire_actor,
	wire_ancestor, wire_root,
};
use super::{HandlerPosition, HandlerRegistry, NodeInputs, PassContext};
use crate::engine::SessionTransitionEngine;
use crate::error::{Result, ScopeError};
use crate::notify::SessionListener;
use crate::transition::ParametersTransition;

#[derive(Debug)]
struct Form;

impl Model for Form {}

fn session() -> Session {
	Session::new(ModelRef::new(Form))
}

struct Silent;

impl SessionListener for Silent {
	fn on_validation_requested(&self, _: &Session) -> Result<()> {
		Ok(())
	}

	fn on_field_changed(&self, _: &Session, _: &FieldPath) -> Result<()> {
		Ok(())
	}
}

fn detached() -> Weak<dyn SessionListener> {
	Weak::<Silent>::new()
}

type Trace = Vec<&'static str>;

fn first(_: &mut ParametersTransition, cx: &mut PassContext<'_, Trace>) -> Result<()> {
	cx.ext.push("first");
	Ok(())
}

fn second(_: &mut ParametersTransition, cx: &mut PassContext<'_, Trace>) -> Result<()> {
	cx.ext.push("second");
	Ok(())
}

fn third(_: &mut ParametersTransition, cx: &mut PassContext<'_, Trace>) -> Result<()> {
	cx.ext.push("third");
	Ok(())
}

fn failing(t: &mut ParametersTransition, _: &mut PassContext<'_, Trace>) -> Result<()> {
	Err(ScopeError::MissingActorSession { node: t.node() })
}

fn refuse_when_disposing(t: &mut ParametersTransition, _: &mut PassContext<'_, Trace>) -> Result<()> {
	if t.is_disposing() {
		return Err(ScopeError::SealedTransition);
	}
	Ok(())
}

fn wired_registry(extra: Option<(&'static str, super::Handler<Trace>)>) -> Arc<HandlerRegistry<Trace>> {
	let registry = Arc::new(HandlerRegistry::<Trace>::new());
	for (name, handler) in [
		(SET_PROVIDED_SESSIONS, set_provided_sessions as super::Handler<Trace>),
		(RESOLVE_ROOT, resolve_root),
		(WIRE_ROOT, wire_root),
		(WIRE_ACTOR, wire_actor),
		(MAINTAIN_ROOT_REGISTRY, maintain_root_registry),
	] {
		registry.register(name, handler, HandlerPosition::End).unwrap();
	}
	if let Some((name, handler)) = extra {
		registry.register(name, handler, HandlerPosition::End).unwrap();
	}
	registry
}

fn subscribe_ancestor(t: &mut ParametersTransition, cx: &mut PassContext<'_, Trace>) -> Result<()> {
	if t.ancestor().is_new_different()
		&& let Some(ancestor) = t.ancestor().new_value()
	{
		cx.wiring.ancestor = Some(ancestor.on_field_changed(|_, _| Ok(())));
	}
	Ok(())
}

#[test]
fn test_register_positions() {
	let registry = HandlerRegistry::<Trace>::new();
	registry.register("b", second, HandlerPosition::End).unwrap();
	registry.register("a", first, HandlerPosition::Start).unwrap();
	registry.register("d", third, HandlerPosition::End).unwrap();
	registry.register("c", third, HandlerPosition::Before("d")).unwrap();
	registry.register("e", first, HandlerPosition::After("d")).unwrap();
	registry.register("a2", second, HandlerPosition::After("a")).unwrap();

	assert_eq!(registry.names(), ["a", "a2", "b", "c", "d", "e"]);
	assert!(registry.contains("c"));
	assert!(!registry.contains("z"));
}

#[test]
fn test_register_rejects_duplicates_and_unknown_targets() {
	let registry = HandlerRegistry::<Trace>::new();
	registry.register("a", first, HandlerPosition::End).unwrap();

	assert!(matches!(
		registry.register("a", second, HandlerPosition::End),
		Err(ScopeError::DuplicateHandler("a"))
	));
	assert!(matches!(
		registry.register("b", second, HandlerPosition::Before("missing")),
		Err(ScopeError::HandlerNotFound("missing"))
	));
	assert!(matches!(
		registry.remove("missing"),
		Err(ScopeError::HandlerNotFound("missing"))
	));
	assert_eq!(registry.names(), ["a"]);
}

#[test]
fn test_from_ordered_keeps_first_occurrence() {
	let registry = HandlerRegistry::<Trace>::from_ordered([
		("a", first as super::Handler<Trace>),
		("b", second),
		("a", third),
	]);
	assert_eq!(registry.names(), ["a", "b"]);

	let mut trace = Trace::new();
	let mut engine = SessionTransitionEngine::new("test", Arc::new(registry), detached());
	engine.run_pass(&NodeInputs::default(), &mut trace).unwrap();
	assert_eq!(trace, ["first", "second"]);
}

#[test]
fn test_snapshot_survives_mutation() {
	let registry = HandlerRegistry::<Trace>::new();
	registry.register("a", first, HandlerPosition::End).unwrap();
	let snapshot = registry.registrations();

	registry.register("b", second, HandlerPosition::End).unwrap();
	registry.remove("a").unwrap();

	assert_eq!(snapshot.len(), 1);
	assert_eq!(snapshot[0].name(), "a");
	assert_eq!(registry.names(), ["b"]);
}

#[test]
fn test_engine_runs_handlers_in_order() {
	let registry = Arc::new(HandlerRegistry::<Trace>::new());
	registry.register("third", third, HandlerPosition::End).unwrap();
	registry.register("first", first, HandlerPosition::Start).unwrap();
	registry.register("second", second, HandlerPosition::After("first")).unwrap();

	let mut engine = SessionTransitionEngine::new("test", registry, detached());
	let mut trace = Trace::new();
	engine.run_pass(&NodeInputs::default(), &mut trace).unwrap();
	engine.run_disposal(&mut trace).unwrap();

	assert_eq!(trace, ["first", "second", "third", "first", "second", "third"]);
}

#[test]
fn test_failed_pass_is_not_retained() {
	let registry = Arc::new(HandlerRegistry::<Trace>::new());
	registry.register(SET_PROVIDED_SESSIONS, set_provided_sessions, HandlerPosition::End).unwrap();
	registry.register("failing", failing, HandlerPosition::End).unwrap();

	let mut engine = SessionTransitionEngine::new("test", registry.clone(), detached());
	let ancestor = session();
	let inputs = NodeInputs {
		ancestor: Some(ancestor.clone()),
		actor: Some(ancestor.clone()),
		..NodeInputs::default()
	};
	assert!(matches!(
		engine.run_pass(&inputs, &mut Trace::new()),
		Err(ScopeError::MissingActorSession { node: "test" })
	));
	assert!(engine.actor().is_none());

	registry.remove("failing").unwrap();
	engine.run_pass(&inputs, &mut Trace::new()).unwrap();
	assert!(engine.actor().is_some_and(|actor| actor.ptr_eq(&ancestor)));
	assert!(!engine.last().is_first());
}

#[test]
fn test_builtin_wiring_is_unwound_on_disposal() {
	let registry = Arc::new(HandlerRegistry::<Trace>::new());
	for (name, handler) in [
		(SET_PROVIDED_SESSIONS, set_provided_sessions as super::Handler<Trace>),
		(RESOLVE_ROOT, resolve_root),
		(WIRE_ROOT, wire_root),
		(WIRE_ACTOR, wire_actor),
		(MAINTAIN_ROOT_REGISTRY, maintain_root_registry),
	] {
		registry.register(name, handler, HandlerPosition::End).unwrap();
	}

	let mut engine = SessionTransitionEngine::new("test", registry, detached());
	let (root, actor) = (session(), session());
	let inputs = NodeInputs {
		ancestor: Some(root.clone()),
		actor: Some(actor.clone()),
		..NodeInputs::default()
	};
	engine.run_pass(&inputs, &mut Trace::new()).unwrap();

	assert!(engine.root().is_some_and(|r| r.ptr_eq(&root)));
	assert_eq!(root.validation_requested().listener_count(), 1);
	assert_eq!(actor.field_changed().listener_count(), 1);
	assert_eq!(actor.validation_requested().listener_count(), 1);
	assert!(engine.registry().try_get(&actor).is_some_and(|r| r.ptr_eq(&root)));

	// Unchanged inputs leave the wiring alone.
	engine.run_pass(&inputs, &mut Trace::new()).unwrap();
	assert_eq!(root.validation_requested().listener_count(), 1);
	assert_eq!(engine.registry().try_get_with_counter(&actor).map(|(_, n)| n), Some(1));

	engine.run_disposal(&mut Trace::new()).unwrap();
	assert!(engine.wiring().is_unwired());
	assert_eq!(root.validation_requested().listener_count(), 0);
	assert_eq!(actor.field_changed().listener_count(), 0);
	assert_eq!(actor.validation_requested().listener_count(), 0);
	assert!(engine.registry().try_get(&actor).is_none());
}

#[test]
fn test_actor_validation_bubbles_to_root() {
	let registry = Arc::new(HandlerRegistry::<Trace>::new());
	for (name, handler) in [
		(SET_PROVIDED_SESSIONS, set_provided_sessions as super::Handler<Trace>),
		(RESOLVE_ROOT, resolve_root),
		(WIRE_ACTOR, wire_actor),
	] {
		registry.register(name, handler, HandlerPosition::End).unwrap();
	}

	let mut engine = SessionTransitionEngine::new("test", registry, detached());
	let (root, actor) = (session(), session());
	let inputs = NodeInputs {
		ancestor: Some(root.clone()),
		actor: Some(actor.clone()),
		..NodeInputs::default()
	};
	engine.run_pass(&inputs, &mut Trace::new()).unwrap();

	let hits = Arc::new(parking_lot::Mutex::new(0));
	let counter = hits.clone();
	let _sub = root.on_validation_requested(move |_, _| {
		*counter.lock() += 1;
		Ok(())
	});
	assert!(actor.validate().unwrap());
	assert_eq!(*hits.lock(), 1);
}

#[test]
fn test_ancestor_subscription_moves_with_ancestor() {
	let registry = Arc::new(HandlerRegistry::<Trace>::new());
	registry.register(SET_PROVIDED_SESSIONS, set_provided_sessions, HandlerPosition::End).unwrap();
	registry.register(WIRE_ANCESTOR, wire_ancestor, HandlerPosition::End).unwrap();
	registry.register("subscribe_ancestor", subscribe_ancestor, HandlerPosition::After(WIRE_ANCESTOR)).unwrap();

	let mut engine = SessionTransitionEngine::new("test", registry, detached());
	let (a, b) = (session(), session());

	let with = |ancestor: &Session| NodeInputs {
		ancestor: Some(ancestor.clone()),
		..NodeInputs::default()
	};
	engine.run_pass(&with(&a), &mut Trace::new()).unwrap();
	assert_eq!(a.field_changed().listener_count(), 1);

	engine.run_pass(&with(&a), &mut Trace::new()).unwrap();
	assert_eq!(a.field_changed().listener_count(), 1);

	engine.run_pass(&with(&b), &mut Trace::new()).unwrap();
	assert_eq!(a.field_changed().listener_count(), 0);
	assert_eq!(b.field_changed().listener_count(), 1);

	engine.run_disposal(&mut Trace::new()).unwrap();
	assert_eq!(b.field_changed().listener_count(), 0);
	assert!(engine.wiring().is_unwired());
}

#[test]
fn test_failed_pass_releases_what_it_wired() {
	let registry = wired_registry(Some(("failing", failing)));
	let mut engine = SessionTransitionEngine::new("test", registry, detached());
	let (root, actor) = (session(), session());
	let inputs = NodeInputs {
		ancestor: Some(root.clone()),
		actor: Some(actor.clone()),
		..NodeInputs::default()
	};

	assert!(engine.run_pass(&inputs, &mut Trace::new()).is_err());
	assert!(engine.wiring().is_unwired());
	assert!(engine.actor().is_none());
	assert_eq!(root.validation_requested().listener_count(), 0);
	assert_eq!(actor.field_changed().listener_count(), 0);
	assert_eq!(actor.validation_requested().listener_count(), 0);
	assert!(engine.registry().try_get(&actor).is_none());

	engine.run_disposal(&mut Trace::new()).unwrap();
}

#[test]
fn test_conflicting_occupation_releases_the_previous_actor_once() {
	let registry = wired_registry(None);
	let (first_root, second_root) = (session(), session());
	let (held, contested) = (session(), session());

	let mut owner = SessionTransitionEngine::new("owner", registry.clone(), detached());
	owner
		.run_pass(
			&NodeInputs {
				ancestor: Some(first_root.clone()),
				actor: Some(contested.clone()),
				..NodeInputs::default()
			},
			&mut Trace::new(),
		)
		.unwrap();

	let mut engine = SessionTransitionEngine::new("test", registry, detached());
	engine
		.run_pass(
			&NodeInputs {
				ancestor: Some(first_root.clone()),
				actor: Some(held.clone()),
				..NodeInputs::default()
			},
			&mut Trace::new(),
		)
		.unwrap();
	assert_eq!(engine.registry().try_get_with_counter(&held).map(|(_, n)| n), Some(1));

	let moved = NodeInputs {
		ancestor: Some(second_root.clone()),
		actor: Some(contested.clone()),
		..NodeInputs::default()
	};
	assert!(matches!(
		engine.run_pass(&moved, &mut Trace::new()),
		Err(ScopeError::ConflictingRootAssociation { .. })
	));
	assert!(engine.registry().try_get(&held).is_none());
	assert_eq!(contested.field_changed().listener_count(), 1);
	assert_eq!(second_root.validation_requested().listener_count(), 0);

	engine.run_disposal(&mut Trace::new()).unwrap();
	assert_eq!(
		engine.registry().try_get_with_counter(&contested).map(|(_, n)| n),
		Some(1)
	);

	owner.run_disposal(&mut Trace::new()).unwrap();
	assert!(owner.registry().try_get(&contested).is_none());
}

#[test]
fn test_failing_disposal_still_releases_everything() {
	let registry = wired_registry(None);
	registry
		.register("refuse", refuse_when_disposing, HandlerPosition::Start)
		.unwrap();
	let mut engine = SessionTransitionEngine::new("test", registry, detached());
	let (root, actor) = (session(), session());
	engine
		.run_pass(
			&NodeInputs {
				ancestor: Some(root.clone()),
				actor: Some(actor.clone()),
				..NodeInputs::default()
			},
			&mut Trace::new(),
		)
		.unwrap();

	assert!(matches!(
		engine.run_disposal(&mut Trace::new()),
		Err(ScopeError::SealedTransition)
	));
	assert!(engine.wiring().is_unwired());
	assert_eq!(root.validation_requested().listener_count(), 0);
	assert_eq!(actor.field_changed().listener_count(), 0);
	assert!(engine.registry().try_get(&actor).is_none());
}
