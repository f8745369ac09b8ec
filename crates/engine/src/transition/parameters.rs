use std::fmt;

use editscope_session::Session;

use super::{ChildContent, Transition};
use crate::cached::RevisionCached;
use crate::routes::RouteSet;

/// Everything that changes for one node in one update pass.
///
/// Built fresh per pass from the previous pass's new values and handed to
/// each registered handler in order. Predicates combining several records
/// are cached against the sum of the records' revisions, so a mutation of
/// any record is observed by the next read.
pub struct ParametersTransition {
	node: &'static str,
	is_first: bool,
	is_disposing: bool,
	root: Transition<Session>,
	ancestor: Transition<Session>,
	actor: Transition<Session>,
	child_content: Transition<ChildContent>,
	routes: Transition<RouteSet>,
	actor_ancestor_derived: bool,
	actor_root_distinct: RevisionCached<bool>,
	actor_ancestor_same: RevisionCached<bool>,
	actor_ancestor_distinct: RevisionCached<bool>,
}

impl ParametersTransition {
	/// The first pass of `node`.
	pub fn first(node: &'static str) -> Self {
		Self {
			node,
			is_first: true,
			is_disposing: false,
			root: Transition::first(),
			ancestor: Transition::first(),
			actor: Transition::first(),
			child_content: Transition::first(),
			routes: Transition::first(),
			actor_ancestor_derived: false,
			actor_root_distinct: RevisionCached::new(),
			actor_ancestor_same: RevisionCached::new(),
			actor_ancestor_distinct: RevisionCached::new(),
		}
	}

	/// A pass continuing from `last`.
	pub fn following(last: &Self) -> Self {
		Self {
			is_first: false,
			root: Transition::following(last.root.new_value().cloned()),
			ancestor: Transition::following(last.ancestor.new_value().cloned()),
			actor: Transition::following(last.actor.new_value().cloned()),
			child_content: Transition::following(last.child_content.new_value().cloned()),
			routes: Transition::following(last.routes.new_value().cloned()),
			..Self::first(last.node)
		}
	}

	/// The teardown pass after `last`: every record is sealed, so all new
	/// values stay `None`.
	pub fn disposing(last: &Self) -> Self {
		let mut transition = Self::following(last);
		transition.is_disposing = true;
		transition.root.seal();
		transition.ancestor.seal();
		transition.actor.seal();
		transition.child_content.seal();
		transition.routes.seal();
		transition
	}

	/// Label of the node undergoing the transition.
	pub fn node(&self) -> &'static str {
		self.node
	}

	pub fn is_first(&self) -> bool {
		self.is_first
	}

	pub fn is_disposing(&self) -> bool {
		self.is_disposing
	}

	pub fn root(&self) -> &Transition<Session> {
		&self.root
	}

	pub fn root_mut(&mut self) -> &mut Transition<Session> {
		&mut self.root
	}

	pub fn ancestor(&self) -> &Transition<Session> {
		&self.ancestor
	}

	pub fn ancestor_mut(&mut self) -> &mut Transition<Session> {
		&mut self.ancestor
	}

	pub fn actor(&self) -> &Transition<Session> {
		&self.actor
	}

	pub fn actor_mut(&mut self) -> &mut Transition<Session> {
		&mut self.actor
	}

	pub fn child_content(&self) -> &Transition<ChildContent> {
		&self.child_content
	}

	pub fn child_content_mut(&mut self) -> &mut Transition<ChildContent> {
		&mut self.child_content
	}

	pub fn routes(&self) -> &Transition<RouteSet> {
		&self.routes
	}

	pub fn routes_mut(&mut self) -> &mut Transition<RouteSet> {
		&mut self.routes
	}

	/// Whether the actor of this pass was derived from the ancestor rather
	/// than provided.
	pub fn is_actor_ancestor_derived(&self) -> bool {
		self.actor_ancestor_derived
	}

	pub fn mark_actor_ancestor_derived(&mut self) {
		self.actor_ancestor_derived = true;
	}

	fn revision(&self) -> u64 {
		self.root.revision() + self.ancestor.revision() + self.actor.revision()
	}

	/// Actor and root are both present and different sessions.
	pub fn is_actor_and_root_distinct(&self) -> bool {
		self.actor_root_distinct.get_or_update(self.revision(), || {
			both_present(&self.actor, &self.root).is_some_and(|(actor, root)| !actor.ptr_eq(root))
		})
	}

	/// Actor and ancestor are both present and the same session.
	pub fn is_actor_and_ancestor_same(&self) -> bool {
		self.actor_ancestor_same.get_or_update(self.revision(), || {
			both_present(&self.actor, &self.ancestor)
				.is_some_and(|(actor, ancestor)| actor.ptr_eq(ancestor))
		})
	}

	/// Actor and ancestor are both present and different sessions.
	pub fn is_actor_and_ancestor_distinct(&self) -> bool {
		self.actor_ancestor_distinct.get_or_update(self.revision(), || {
			both_present(&self.actor, &self.ancestor)
				.is_some_and(|(actor, ancestor)| !actor.ptr_eq(ancestor))
		})
	}
}

fn both_present<'a>(
	a: &'a Transition<Session>,
	b: &'a Transition<Session>,
) -> Option<(&'a Session, &'a Session)> {
	Some((a.new_value()?, b.new_value()?))
}

impl fmt::Debug for ParametersTransition {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ParametersTransition")
			.field("node", &self.node)
			.field("is_first", &self.is_first)
			.field("is_disposing", &self.is_disposing)
			.field("root", &self.root)
			.field("ancestor", &self.ancestor)
			.field("actor", &self.actor)
			.field("actor_ancestor_derived", &self.actor_ancestor_derived)
			.finish_non_exhaustive()
	}
}
