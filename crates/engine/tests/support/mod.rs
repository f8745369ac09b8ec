//! Test models and validators shared by the scenario tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use editscope_engine::{
	Severity, ValidationFailure, ValidationStrategy, Validator, ValidatorParams,
};
use editscope_session::{FieldPath, Model, ModelRef, Session};
use parking_lot::{Mutex, RwLock};

/// Leaf model with a single `Hello` field.
#[derive(Debug)]
pub struct Child {
	pub hello: RwLock<String>,
}

impl Model for Child {}

/// Top-level model owning a [`Child`] under `Child`.
#[derive(Debug)]
pub struct Form {
	pub hello: RwLock<String>,
	pub child: ModelRef,
}

impl Model for Form {
	fn member(&self, name: &str) -> Option<ModelRef> {
		(name == "Child").then(|| self.child.clone())
	}
}

/// A model no validator knows.
#[derive(Debug)]
pub struct Stranger;

impl Model for Stranger {}

pub fn child(hello: &str) -> ModelRef {
	ModelRef::new(Child {
		hello: RwLock::new(hello.to_owned()),
	})
}

pub fn form(hello: &str, child_hello: &str) -> ModelRef {
	ModelRef::new(Form {
		hello: RwLock::new(hello.to_owned()),
		child: child(child_hello),
	})
}

pub fn child_of(form: &ModelRef) -> ModelRef {
	form.downcast_ref::<Form>()
		.map(|form| form.child.clone())
		.expect("form model")
}

pub fn set_hello(model: &ModelRef, value: &str) {
	if let Some(form) = model.downcast_ref::<Form>() {
		*form.hello.write() = value.to_owned();
	} else if let Some(child) = model.downcast_ref::<Child>() {
		*child.hello.write() = value.to_owned();
	}
}

pub fn hello_field(model: &ModelRef) -> FieldPath {
	FieldPath::new(model.clone(), "Hello")
}

pub const HELLO_MESSAGE: &str = "Hello must be World";
pub const CHILD_HELLO_MESSAGE: &str = "Child hello must be World";

/// Requires every `Hello` to be `World`. Knows [`Form`] and [`Child`].
#[derive(Default)]
pub struct HelloValidator {
	runs: AtomicUsize,
	includes: Mutex<Vec<Vec<String>>>,
}

impl HelloValidator {
	pub fn shared() -> Arc<Self> {
		Arc::new(Self::default())
	}

	pub fn runs(&self) -> usize {
		self.runs.load(Ordering::SeqCst)
	}

	/// Included properties of every run so far.
	pub fn includes(&self) -> Vec<Vec<String>> {
		self.includes.lock().clone()
	}
}

impl Validator for HelloValidator {
	fn can_validate(&self, model: &ModelRef) -> bool {
		model.downcast_ref::<Form>().is_some() || model.downcast_ref::<Child>().is_some()
	}

	fn validate(&self, model: &ModelRef, strategy: &ValidationStrategy) -> Vec<ValidationFailure> {
		self.runs.fetch_add(1, Ordering::SeqCst);
		self.includes
			.lock()
			.push(strategy.included_properties().to_vec());

		let mut failures = Vec::new();
		if let Some(form) = model.downcast_ref::<Form>() {
			if strategy.includes("Hello") && *form.hello.read() != "World" {
				failures.push(ValidationFailure::new("Hello", HELLO_MESSAGE));
			}
			if let Some(child) = form.child.downcast_ref::<Child>()
				&& strategy.includes("Child.Hello")
				&& *child.hello.read() != "World"
			{
				failures.push(ValidationFailure::new("Child.Hello", CHILD_HELLO_MESSAGE));
			}
		} else if let Some(child) = model.downcast_ref::<Child>()
			&& strategy.includes("Hello")
			&& *child.hello.read() != "World"
		{
			failures.push(ValidationFailure::new("Hello", CHILD_HELLO_MESSAGE));
		}
		failures
	}
}

/// Only knows [`Form`].
#[derive(Default)]
pub struct FormOnlyValidator;

impl Validator for FormOnlyValidator {
	fn can_validate(&self, model: &ModelRef) -> bool {
		model.downcast_ref::<Form>().is_some()
	}

	fn validate(&self, _: &ModelRef, _: &ValidationStrategy) -> Vec<ValidationFailure> {
		Vec::new()
	}
}

/// Reports one failure of each severity on `Hello`.
#[derive(Default)]
pub struct GradedValidator;

impl Validator for GradedValidator {
	fn can_validate(&self, _: &ModelRef) -> bool {
		true
	}

	fn validate(&self, _: &ModelRef, _: &ValidationStrategy) -> Vec<ValidationFailure> {
		vec![
			ValidationFailure::new("Hello", "error"),
			ValidationFailure::new("Hello", "warning").with_severity(Severity::Warning),
			ValidationFailure::new("Hello", "info").with_severity(Severity::Info),
		]
	}
}

/// Parameters of a validator using `validator` beneath `ancestor`.
pub fn params(ancestor: &Session, validator: Arc<dyn Validator>) -> ValidatorParams {
	ValidatorParams {
		ancestor: Some(ancestor.clone()),
		validator: Some(validator),
		..ValidatorParams::default()
	}
}

pub fn sorted(mut messages: Vec<String>) -> Vec<String> {
	messages.sort();
	messages
}
