//! Bearer access-token value object.

// self
use crate::_prelude::*;

/// Non-empty access token issued by a provider.
///
/// Equality and [`Display`] both resolve to the token string, so the value can be dropped straight
/// into query strings and headers. [`Debug`] stays redacted to keep the token out of logs.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccessToken(String);
impl AccessToken {
	/// Wraps `value`, rejecting empty or whitespace-only strings.
	pub fn new(value: impl Into<String>) -> Result<Self> {
		let value = value.into();

		if value.trim().is_empty() {
			return Err(Error::invalid_argument("access token cannot be empty"));
		}

		Ok(Self(value))
	}

	/// Returns the token string. Callers must avoid logging it.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}
impl TryFrom<String> for AccessToken {
	type Error = Error;

	fn try_from(value: String) -> Result<Self> {
		Self::new(value)
	}
}
impl TryFrom<&str> for AccessToken {
	type Error = Error;

	fn try_from(value: &str) -> Result<Self> {
		Self::new(value)
	}
}
impl From<AccessToken> for String {
	fn from(value: AccessToken) -> Self {
		value.0
	}
}
impl AsRef<str> for AccessToken {
	fn as_ref(&self) -> &str {
		self.as_str()
	}
}
impl PartialEq<str> for AccessToken {
	fn eq(&self, other: &str) -> bool {
		self.0 == other
	}
}
impl PartialEq<&str> for AccessToken {
	fn eq(&self, other: &&str) -> bool {
		self.0 == *other
	}
}
impl Debug for AccessToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("AccessToken").field(&"<redacted>").finish()
	}
}
impl Display for AccessToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}
