//! Auth-domain value objects: scopes, access tokens, normalized token responses, and users.

pub mod scope;
pub mod token;
pub mod user;

pub use scope::*;
pub use token::{access::*, grant::*, response::*};
pub use user::*;

// self
use crate::_prelude::*;

/// Reads `key` as a non-empty string, rendering numbers as their decimal text.
pub(crate) fn field_str(map: &Map<String, Value>, key: &str) -> Option<String> {
	match map.get(key)? {
		Value::String(value) if !value.is_empty() => Some(value.to_owned()),
		Value::Number(value) => Some(value.to_string()),
		_ => None,
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn field_str_accepts_strings_and_numbers() {
		let map = serde_json::json!({ "id": 42, "name": "n", "empty": "", "flag": true });
		let map = map.as_object().expect("Fixture should be an object.");

		assert_eq!(field_str(map, "id").as_deref(), Some("42"));
		assert_eq!(field_str(map, "name").as_deref(), Some("n"));
		assert_eq!(field_str(map, "empty"), None);
		assert_eq!(field_str(map, "flag"), None);
		assert_eq!(field_str(map, "missing"), None);
	}
}
