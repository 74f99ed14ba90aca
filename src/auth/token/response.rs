//! Canonical token response and the normalizer that produces it from provider payloads.

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, field_str},
};

/// Field names a provider uses for the canonical token slots.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TokenFieldNames {
	/// Access-token key.
	pub access_token: &'static str,
	/// Refresh-token key.
	pub refresh_token: &'static str,
	/// Lifetime key.
	pub expires_in: &'static str,
}
impl TokenFieldNames {
	/// RFC 6749 names used by most providers.
	pub const OAUTH2: Self =
		Self { access_token: "access_token", refresh_token: "refresh_token", expires_in: "expires_in" };
	/// Tencent Cloud `GetUserAccessToken` names.
	pub const TENCENT: Self = Self {
		access_token: "UserAccessToken",
		refresh_token: "UserRefreshToken",
		expires_in: "ExpiresAt",
	};
}
impl Default for TokenFieldNames {
	fn default() -> Self {
		Self::OAUTH2
	}
}

/// Raw input accepted by [`TokenResponse::normalize`].
#[derive(Clone, Debug)]
pub enum TokenPayload {
	/// Undecoded response body.
	Bytes(Vec<u8>),
	/// Already-decoded document.
	Value(Value),
}
impl From<Vec<u8>> for TokenPayload {
	fn from(value: Vec<u8>) -> Self {
		Self::Bytes(value)
	}
}
impl From<&[u8]> for TokenPayload {
	fn from(value: &[u8]) -> Self {
		Self::Bytes(value.to_vec())
	}
}
impl From<&str> for TokenPayload {
	fn from(value: &str) -> Self {
		Self::Bytes(value.as_bytes().to_vec())
	}
}
impl From<Value> for TokenPayload {
	fn from(value: Value) -> Self {
		Self::Value(value)
	}
}
impl From<Map<String, Value>> for TokenPayload {
	fn from(value: Map<String, Value>) -> Self {
		Self::Value(Value::Object(value))
	}
}

/// Canonical token response.
///
/// The access token is always present and non-empty; `expires_in` falls back to `0` when the
/// provider omits it or sends something that is not an integer. The decoded payload is kept in
/// [`TokenResponse::raw`] for provider-specific post-processing.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct TokenResponse {
	access_token: AccessToken,
	refresh_token: Option<String>,
	expires_in: i64,
	token_type: String,
	raw: Map<String, Value>,
}
impl TokenResponse {
	/// Default `token_type` when the provider does not send one.
	pub const DEFAULT_TOKEN_TYPE: &'static str = "bearer";

	/// Builds a response around a token the caller already holds.
	pub fn new(access_token: AccessToken) -> Self {
		Self {
			access_token,
			refresh_token: None,
			expires_in: 0,
			token_type: Self::DEFAULT_TOKEN_TYPE.into(),
			raw: Map::new(),
		}
	}

	/// Normalizes a provider payload using the provider's field names.
	///
	/// Fails with [`Error::AuthorizeFailed`] when the payload is not a JSON object or when the
	/// access-token field is missing or empty.
	pub fn normalize(payload: impl Into<TokenPayload>, names: TokenFieldNames) -> Result<Self> {
		let value = match payload.into() {
			TokenPayload::Value(value) => value,
			TokenPayload::Bytes(bytes) => serde_json::from_slice(&bytes).map_err(|_| {
				Error::authorize_failed(
					"token response is not valid JSON",
					String::from_utf8_lossy(&bytes).into_owned(),
				)
			})?,
		};
		let Value::Object(raw) = value else {
			return Err(Error::authorize_failed("token response is not a JSON object", value));
		};
		let Some(access_token) = field_str(&raw, names.access_token) else {
			return Err(Error::authorize_failed(
				format!("token response lacks `{}`", names.access_token),
				raw,
			));
		};

		Ok(Self {
			access_token: AccessToken::new(access_token)?,
			refresh_token: field_str(&raw, names.refresh_token),
			expires_in: raw.get(names.expires_in).map(parse_expires_in).unwrap_or_default(),
			token_type: field_str(&raw, "token_type")
				.unwrap_or_else(|| Self::DEFAULT_TOKEN_TYPE.into()),
			raw,
		})
	}

	/// Sets the refresh token.
	pub fn with_refresh_token(mut self, refresh_token: Option<String>) -> Self {
		self.refresh_token = refresh_token.filter(|token| !token.is_empty());

		self
	}

	/// Sets the lifetime in seconds.
	pub fn with_expires_in(mut self, expires_in: i64) -> Self {
		self.expires_in = expires_in;

		self
	}

	/// Access token.
	pub fn access_token(&self) -> &AccessToken {
		&self.access_token
	}

	/// Refresh token, when issued.
	pub fn refresh_token(&self) -> Option<&str> {
		self.refresh_token.as_deref()
	}

	/// Lifetime in seconds; `0` when unknown.
	pub fn expires_in(&self) -> i64 {
		self.expires_in
	}

	/// Token type; `bearer` unless the provider says otherwise.
	pub fn token_type(&self) -> &str {
		&self.token_type
	}

	/// Decoded provider payload.
	pub fn raw(&self) -> &Map<String, Value> {
		&self.raw
	}

	/// Reads a non-empty string field from the raw payload.
	pub fn raw_str(&self, key: &str) -> Option<String> {
		field_str(&self.raw, key)
	}

	/// Flattens the response: the raw payload overlaid with the canonical keys.
	pub fn to_map(&self) -> Map<String, Value> {
		let mut map = self.raw.clone();

		map.insert("access_token".into(), self.access_token.as_str().into());
		map.insert(
			"refresh_token".into(),
			self.refresh_token.clone().map(Value::String).unwrap_or(Value::Null),
		);
		map.insert("expires_in".into(), self.expires_in.into());
		map.insert("token_type".into(), self.token_type.clone().into());

		map
	}
}
impl TryFrom<Map<String, Value>> for TokenResponse {
	type Error = Error;

	fn try_from(value: Map<String, Value>) -> Result<Self> {
		Self::normalize(value, TokenFieldNames::OAUTH2)
	}
}
impl From<TokenResponse> for Map<String, Value> {
	fn from(value: TokenResponse) -> Self {
		value.to_map()
	}
}
impl Debug for TokenResponse {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenResponse")
			.field("access_token", &self.access_token)
			.field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
			.field("expires_in", &self.expires_in)
			.field("token_type", &self.token_type)
			.field("raw_keys", &self.raw.keys().collect::<Vec<_>>())
			.finish()
	}
}

fn parse_expires_in(value: &Value) -> i64 {
	match value {
		Value::Number(number) =>
			number.as_i64().or_else(|| number.as_f64().map(|float| float as i64)).unwrap_or_default(),
		Value::String(text) => {
			let text = text.trim();

			text.parse::<i64>()
				.ok()
				.or_else(|| text.parse::<f64>().ok().map(|float| float as i64))
				.unwrap_or_default()
		},
		_ => 0,
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn normalizes_string_lifetimes() {
		let response =
			TokenResponse::normalize(r#"{"access_token":"X","expires_in":"3600"}"#, TokenFieldNames::OAUTH2)
				.expect("Token body should normalize.");

		assert_eq!(response.access_token(), "X");
		assert_eq!(response.expires_in(), 3600);
		assert_eq!(response.refresh_token(), None);
		assert_eq!(response.token_type(), "bearer");
	}

	#[test]
	fn rejects_empty_and_non_object_payloads() {
		for payload in [serde_json::json!({}), serde_json::json!([1, 2]), serde_json::json!("x")] {
			let err = TokenResponse::normalize(payload.clone(), TokenFieldNames::OAUTH2)
				.expect_err("Payload without a token should fail.");

			assert!(matches!(err, Error::AuthorizeFailed { .. }), "{payload}: {err:?}");
		}

		assert!(matches!(
			TokenResponse::normalize("not json", TokenFieldNames::OAUTH2),
			Err(Error::AuthorizeFailed { .. })
		));
		assert!(matches!(
			TokenResponse::normalize(serde_json::json!({ "access_token": "" }), TokenFieldNames::OAUTH2),
			Err(Error::AuthorizeFailed { .. })
		));
	}

	#[test]
	fn normalizing_canonical_maps_is_idempotent() {
		let canonical = serde_json::json!({
			"access_token": "X",
			"refresh_token": "R",
			"expires_in": 7200,
			"token_type": "bearer",
			"openid": "o",
		});
		let Value::Object(canonical) = canonical else { unreachable!() };
		let once = TokenResponse::normalize(canonical.clone(), TokenFieldNames::OAUTH2)
			.expect("Canonical map should normalize.");
		let twice = TokenResponse::normalize(once.to_map(), TokenFieldNames::OAUTH2)
			.expect("Normalized map should normalize again.");

		assert_eq!(once.to_map(), canonical);
		assert_eq!(twice.to_map(), canonical);
	}

	#[test]
	fn defaults_missing_optional_fields() {
		let response =
			TokenResponse::normalize(serde_json::json!({ "access_token": "X" }), TokenFieldNames::OAUTH2)
				.expect("Minimal body should normalize.");
		let map = response.to_map();

		assert_eq!(map["refresh_token"], Value::Null);
		assert_eq!(map["expires_in"], 0);
	}

	#[test]
	fn reads_provider_specific_names() {
		let response = TokenResponse::normalize(
			serde_json::json!({
				"UserAccessToken": "T",
				"UserRefreshToken": "R",
				"ExpiresAt": 1_700_000_000,
				"UserOpenId": "o1",
			}),
			TokenFieldNames::TENCENT,
		)
		.expect("Tencent body should normalize.");

		assert_eq!(response.access_token(), "T");
		assert_eq!(response.refresh_token(), Some("R"));
		assert_eq!(response.expires_in(), 1_700_000_000);
		assert_eq!(response.raw_str("UserOpenId").as_deref(), Some("o1"));
	}

	#[test]
	fn debug_redacts_tokens() {
		let response = TokenResponse::new(AccessToken::new("secret-token").expect("Token is valid."))
			.with_refresh_token(Some("secret-refresh".into()));
		let rendered = format!("{response:?}");

		assert!(!rendered.contains("secret-token"));
		assert!(!rendered.contains("secret-refresh"));
	}
}
