//! Session capability the registry uses to persist the authenticated user.
//!
//! The host web framework owns the real session; it plugs in by implementing [`SessionStore`].
//! [`MemorySession`] is the built-in in-process implementation for tests and demos.

pub mod memory;

pub use memory::MemorySession;

// self
use crate::_prelude::*;

/// Boxed future returned by [`SessionStore`] operations.
pub type SessionFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, SessionError>> + 'a + Send>>;

/// Key/value session contract.
pub trait SessionStore
where
	Self: Send + Sync,
{
	/// Stores `value` under `key`, replacing any previous value.
	fn set<'a>(&'a self, key: &'a str, value: Value) -> SessionFuture<'a, ()>;

	/// Returns the value stored under `key`, if any.
	fn get<'a>(&'a self, key: &'a str) -> SessionFuture<'a, Option<Value>>;

	/// Removes and returns the value stored under `key`.
	fn remove<'a>(&'a self, key: &'a str) -> SessionFuture<'a, Option<Value>>;
}

/// Error type produced by [`SessionStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum SessionError {
	/// A stored value could not be converted to or from its typed form.
	#[error("Session serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure of the host session.
	#[error("Session backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}
impl From<serde_json::Error> for SessionError {
	fn from(e: serde_json::Error) -> Self {
		Self::Serialization { message: e.to_string() }
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::error::Error as _;
	// self
	use super::*;

	#[test]
	fn session_error_converts_into_crate_error_with_source() {
		let session_error = SessionError::Backend { message: "redis unreachable".into() };
		let error: Error = session_error.clone().into();

		assert!(matches!(error, Error::Session(_)));
		assert!(error.to_string().contains("redis unreachable"));
		assert_eq!(
			error.source().map(ToString::to_string),
			Some(session_error.to_string()),
		);
	}
}
