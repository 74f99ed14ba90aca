//! Ordered scope lists joined with a provider-defined separator.

// std
use std::slice::Iter;
// self
use crate::_prelude::*;

/// Ordered set of requested scopes.
///
/// Insertion order is preserved because several providers document their scope strings in a
/// fixed order; duplicates and blank entries are dropped.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct ScopeList(Vec<String>);
impl ScopeList {
	/// Builds a list from any iterator of scope strings.
	pub fn new<I, S>(scopes: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		let mut list = Vec::new();

		for scope in scopes {
			let scope = scope.into();
			let scope = scope.trim();

			if scope.is_empty() || list.iter().any(|existing: &String| existing == scope) {
				continue;
			}

			list.push(scope.to_owned());
		}

		Self(list)
	}

	/// Joins the scopes with `separator` (space, comma, or nothing).
	pub fn join(&self, separator: &str) -> String {
		self.0.join(separator)
	}

	/// Returns `true` if `scope` was requested.
	pub fn contains(&self, scope: &str) -> bool {
		self.0.iter().any(|value| value == scope)
	}

	/// Returns `true` if exactly `scope` was requested.
	pub fn is_only(&self, scope: &str) -> bool {
		self.0.len() == 1 && self.contains(scope)
	}

	/// Number of scopes.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Returns `true` when no scope was requested.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Iterates the scopes in request order.
	pub fn iter(&self) -> Iter<'_, String> {
		self.0.iter()
	}
}
impl From<Vec<String>> for ScopeList {
	fn from(value: Vec<String>) -> Self {
		Self::new(value)
	}
}
impl From<ScopeList> for Vec<String> {
	fn from(value: ScopeList) -> Self {
		value.0
	}
}
impl<'a> IntoIterator for &'a ScopeList {
	type IntoIter = Iter<'a, String>;
	type Item = &'a String;

	fn into_iter(self) -> Self::IntoIter {
		self.iter()
	}
}
