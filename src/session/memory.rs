//! Thread-safe in-memory [`SessionStore`] implementation for local development and tests.

// self
use crate::{
	_prelude::*,
	session::{SessionFuture, SessionStore},
};

type SessionMap = Arc<RwLock<HashMap<String, Value>>>;

/// Session backend that keeps values in-process; clones share the same map.
#[derive(Clone, Debug, Default)]
pub struct MemorySession(SessionMap);
impl MemorySession {
	/// Number of stored keys.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns `true` when nothing is stored.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}
}
impl SessionStore for MemorySession {
	fn set<'a>(&'a self, key: &'a str, value: Value) -> SessionFuture<'a, ()> {
		let map = self.0.clone();

		Box::pin(async move {
			map.write().insert(key.to_owned(), value);

			Ok(())
		})
	}

	fn get<'a>(&'a self, key: &'a str) -> SessionFuture<'a, Option<Value>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(map.read().get(key).cloned()) })
	}

	fn remove<'a>(&'a self, key: &'a str) -> SessionFuture<'a, Option<Value>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(map.write().remove(key)) })
	}
}
