//! Canonical user record returned by every authentication flow.

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, ScopeList, TokenResponse},
	config::ProviderKind,
};

/// Profile fields a provider's mapping step extracts from its raw payload.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
	/// Provider-scoped user identifier.
	pub id: String,
	/// Login name; falls back to `id` on the final [`User`].
	pub username: Option<String>,
	/// Display nickname.
	pub nickname: Option<String>,
	/// Display name.
	pub name: Option<String>,
	/// Email address.
	pub email: Option<String>,
	/// Avatar URL.
	pub avatar: Option<String>,
}

/// Snapshot of the driver that produced a [`User`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverInfo {
	/// Provider type.
	pub provider: ProviderKind,
	/// Application identifier.
	pub appid: String,
	/// Scopes the driver requested.
	pub scopes: ScopeList,
}

/// Authenticated user.
///
/// Built from a [`UserProfile`] plus the raw payload, then decorated with token data before it is
/// handed to the caller. There is no public mutation after that point.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "Map<String, Value>", try_from = "Map<String, Value>")]
pub struct User {
	profile: UserProfile,
	raw: Map<String, Value>,
	driver: DriverInfo,
	token: Option<AccessToken>,
	refresh_token: Option<String>,
	expires_in: Option<i64>,
	token_response: Option<TokenResponse>,
}
impl User {
	/// Creates an undecorated user.
	pub fn new(profile: UserProfile, raw: Map<String, Value>, driver: DriverInfo) -> Self {
		Self {
			profile,
			raw,
			driver,
			token: None,
			refresh_token: None,
			expires_in: None,
			token_response: None,
		}
	}

	pub(crate) fn with_token(mut self, token: AccessToken) -> Self {
		self.token = Some(token);

		self
	}

	pub(crate) fn with_refresh_token(mut self, refresh_token: Option<String>) -> Self {
		self.refresh_token = refresh_token.filter(|token| !token.is_empty());

		self
	}

	pub(crate) fn with_expires_in(mut self, expires_in: i64) -> Self {
		self.expires_in = Some(expires_in);

		self
	}

	pub(crate) fn with_token_response(mut self, response: TokenResponse) -> Self {
		self.token_response = Some(response);

		self
	}

	/// Provider-scoped identifier.
	pub fn id(&self) -> &str {
		&self.profile.id
	}

	/// Login name, or the id when the provider has none.
	pub fn username(&self) -> &str {
		self.profile.username.as_deref().filter(|name| !name.is_empty()).unwrap_or(&self.profile.id)
	}

	/// Display nickname.
	pub fn nickname(&self) -> Option<&str> {
		self.profile.nickname.as_deref()
	}

	/// Display name.
	pub fn name(&self) -> Option<&str> {
		self.profile.name.as_deref()
	}

	/// Email address.
	pub fn email(&self) -> Option<&str> {
		self.profile.email.as_deref()
	}

	/// Avatar URL.
	pub fn avatar(&self) -> Option<&str> {
		self.profile.avatar.as_deref()
	}

	/// Mapped profile fields.
	pub fn profile(&self) -> &UserProfile {
		&self.profile
	}

	/// Raw provider payload.
	pub fn raw(&self) -> &Map<String, Value> {
		&self.raw
	}

	/// Driver snapshot.
	pub fn driver(&self) -> &DriverInfo {
		&self.driver
	}

	/// Provider type that authenticated this user.
	pub fn provider(&self) -> ProviderKind {
		self.driver.provider
	}

	/// Access token used to fetch the profile.
	pub fn token(&self) -> Option<&AccessToken> {
		self.token.as_ref()
	}

	/// Refresh token, when issued.
	pub fn refresh_token(&self) -> Option<&str> {
		self.refresh_token.as_deref()
	}

	/// Token lifetime in seconds.
	pub fn expires_in(&self) -> Option<i64> {
		self.expires_in
	}

	/// Normalized token response from the code exchange.
	pub fn token_response(&self) -> Option<&TokenResponse> {
		self.token_response.as_ref()
	}

	/// Flattens the user into a string-keyed map.
	pub fn to_map(&self) -> Map<String, Value> {
		fn opt(value: Option<&str>) -> Value {
			value.map(|value| Value::String(value.to_owned())).unwrap_or(Value::Null)
		}

		let mut map = Map::new();

		map.insert("id".into(), self.id().into());
		map.insert("username".into(), self.username().into());
		map.insert("nickname".into(), opt(self.nickname()));
		map.insert("name".into(), opt(self.name()));
		map.insert("email".into(), opt(self.email()));
		map.insert("avatar".into(), opt(self.avatar()));
		map.insert("token".into(), opt(self.token.as_ref().map(AccessToken::as_str)));
		map.insert("refresh_token".into(), opt(self.refresh_token()));
		map.insert("expires_in".into(), self.expires_in.map(Value::from).unwrap_or(Value::Null));
		map.insert("raw".into(), Value::Object(self.raw.clone()));
		map.insert(
			"token_response".into(),
			self.token_response
				.as_ref()
				.map(|response| Value::Object(response.to_map()))
				.unwrap_or(Value::Null),
		);
		map.insert("driver".into(), serde_json::to_value(&self.driver).unwrap_or(Value::Null));

		map
	}
}
impl From<User> for Map<String, Value> {
	fn from(value: User) -> Self {
		value.to_map()
	}
}
impl TryFrom<Map<String, Value>> for User {
	type Error = serde_json::Error;

	fn try_from(value: Map<String, Value>) -> Result<Self, Self::Error> {
		#[derive(Deserialize)]
		struct Stored {
			id: String,
			username: Option<String>,
			nickname: Option<String>,
			name: Option<String>,
			email: Option<String>,
			avatar: Option<String>,
			token: Option<AccessToken>,
			refresh_token: Option<String>,
			expires_in: Option<i64>,
			#[serde(default)]
			raw: Map<String, Value>,
			token_response: Option<TokenResponse>,
			driver: DriverInfo,
		}

		let stored: Stored = serde_json::from_value(Value::Object(value))?;

		Ok(Self {
			profile: UserProfile {
				id: stored.id,
				username: stored.username,
				nickname: stored.nickname,
				name: stored.name,
				email: stored.email,
				avatar: stored.avatar,
			},
			raw: stored.raw,
			driver: stored.driver,
			token: stored.token,
			refresh_token: stored.refresh_token,
			expires_in: stored.expires_in,
			token_response: stored.token_response,
		})
	}
}
impl Debug for User {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("User")
			.field("profile", &self.profile)
			.field("driver", &self.driver)
			.field("token", &self.token)
			.field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
			.field("expires_in", &self.expires_in)
			.finish()
	}
}
