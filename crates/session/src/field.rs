//! Field paths: a model owner plus a (possibly dotted) member name.

use std::fmt;

use crate::model::ModelRef;

/// Identifies one field of one model instance.
///
/// Equality is reference equality on [`FieldPath::owner`] and string equality
/// on [`FieldPath::name`]. The name may be a dotted path when the owner is a
/// top-level model and the field lives on a nested model, e.g.
/// `("City", "Address.Street")`.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
	owner: ModelRef,
	name: String,
}

impl FieldPath {
	pub fn new(owner: ModelRef, name: impl Into<String>) -> Self {
		Self {
			owner,
			name: name.into(),
		}
	}

	pub fn owner(&self) -> &ModelRef {
		&self.owner
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	/// Appends `sub` to this path, keeping the owner.
	///
	/// `("City", "Address").join("Street")` is `("City", "Address.Street")`.
	pub fn join(&self, sub: &str) -> Self {
		Self {
			owner: self.owner.clone(),
			name: format!("{}.{}", self.name, sub),
		}
	}

	/// Maps a validator property path onto the model that actually owns the
	/// last segment.
	///
	/// Parses paths like `Items[3].Child.Name` and walks [`Model::member`] and
	/// [`Model::element`] as far as values resolve. When a segment does not
	/// resolve to a model the walk stops there, yielding that segment as the
	/// field name on the deepest model reached.
	///
	/// [`Model::member`]: crate::Model::member
	/// [`Model::element`]: crate::Model::element
	pub fn derive(model: &ModelRef, property_path: &str) -> Self {
		let mut current = model.clone();
		let mut rest = property_path;

		loop {
			let Some(end) = rest.find(['.', '[']).filter(|&end| end > 0) else {
				let name = rest.strip_suffix(']').unwrap_or(rest);
				return Self::new(current, name);
			};

			let token = &rest[..end];
			rest = &rest[end + 1..];

			let next = match token.strip_suffix(']') {
				Some(index) => current.get().element(index),
				None => current.get().member(token),
			};

			match next {
				Some(model) => current = model,
				None => {
					let name = token.strip_suffix(']').unwrap_or(token);
					return Self::new(current, name);
				}
			}
		}
	}
}

impl fmt::Debug for FieldPath {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("FieldPath")
			.field("owner", &self.owner)
			.field("name", &self.name)
			.finish()
	}
}

impl fmt::Display for FieldPath {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}::{}", self.owner.type_name(), self.name)
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use super::*;
	use crate::Model;

	#[derive(Debug)]
	struct Leaf;

	impl Model for Leaf {}

	#[derive(Debug)]
	struct List {
		items: Vec<ModelRef>,
	}

	impl Model for List {
		fn element(&self, index: &str) -> Option<ModelRef> {
			self.items.get(index.parse::<usize>().ok()?).cloned()
		}
	}

	#[derive(Debug)]
	struct Root {
		child: ModelRef,
		list: ModelRef,
	}

	impl Model for Root {
		fn member(&self, name: &str) -> Option<ModelRef> {
			match name {
				"Child" => Some(self.child.clone()),
				"Items" => Some(self.list.clone()),
				_ => None,
			}
		}
	}

	fn fixture() -> (ModelRef, ModelRef, ModelRef) {
		let child = ModelRef::new(Leaf);
		let item = ModelRef::new(Leaf);
		let list = ModelRef::new(List {
			items: vec![ModelRef::new(Leaf), item.clone()],
		});
		let root = ModelRef::new(Root {
			child: child.clone(),
			list,
		});
		(root, child, item)
	}

	#[test]
	fn derive_plain_name_stays_on_model() {
		let (root, _, _) = fixture();
		assert_eq!(FieldPath::derive(&root, "Hello"), FieldPath::new(root, "Hello"));
	}

	#[test]
	fn derive_walks_members() {
		let (root, child, _) = fixture();
		assert_eq!(
			FieldPath::derive(&root, "Child.Hello"),
			FieldPath::new(child, "Hello")
		);
	}

	#[test]
	fn derive_walks_indexers() {
		let (root, _, item) = fixture();
		assert_eq!(
			FieldPath::derive(&root, "Items[1].Name"),
			FieldPath::new(item, "Name")
		);
	}

	#[test]
	fn derive_stops_at_unresolved_segment() {
		let (root, _, _) = fixture();
		assert_eq!(
			FieldPath::derive(&root, "Missing.Name"),
			FieldPath::new(root, "Missing")
		);
	}

	#[test]
	fn equality_is_by_owner_identity() {
		let a = ModelRef::from(Arc::new(Leaf));
		let b = ModelRef::from(Arc::new(Leaf));
		assert_ne!(FieldPath::new(a.clone(), "X"), FieldPath::new(b, "X"));
		assert_eq!(FieldPath::new(a.clone(), "X"), FieldPath::new(a, "X"));
	}

	#[test]
	fn join_concatenates_with_dot() {
		let (root, _, _) = fixture();
		let path = FieldPath::new(root.clone(), "Child").join("Hello");
		assert_eq!(path, FieldPath::new(root, "Child.Hello"));
	}
}
