//! Gitee.

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, ProviderIdentity, TokenGrant, UserProfile, field_str},
	config::{ProviderConfig, ProviderKind},
	driver::{Driver, DriverCore, DriverFuture, oauth2_token_fields},
	http::{QueryEncoding, QueryFields},
};

const AUTHORIZE_URL: &str = "https://gitee.com/oauth/authorize";
const TOKEN_URL: &str = "https://gitee.com/oauth/token";
const USER_URL: &str = "https://gitee.com/api/v5/user";

/// Gitee driver.
#[derive(Clone, Debug)]
pub struct Gitee {
	core: DriverCore,
}
impl Gitee {
	/// Creates the driver, validating `config`.
	pub fn new(config: ProviderConfig) -> Result<Self> {
		Ok(Self { core: DriverCore::new(ProviderKind::Gitee, config, &[])? })
	}
}
impl Driver for Gitee {
	fn core(&self) -> &DriverCore {
		&self.core
	}

	fn core_mut(&mut self) -> &mut DriverCore {
		&mut self.core
	}

	fn authorize_endpoint(&self) -> &'static str {
		AUTHORIZE_URL
	}

	fn token_fields(&self, code: &str) -> QueryFields {
		let mut fields = oauth2_token_fields(&self.core, code);

		fields.set("grant_type", "authorization_code");

		fields
	}

	fn request_token<'a>(&'a self, code: &'a str) -> DriverFuture<'a, TokenGrant> {
		Box::pin(async move {
			let response = self
				.core
				.post_form(
					TOKEN_URL,
					&self.token_fields(code),
					QueryEncoding::Rfc1738,
					"application/x-www-form-urlencoded",
				)
				.await?;

			Ok(TokenGrant::new(response.token(response.body.clone(), self.token_field_names())?))
		})
	}

	fn request_user<'a>(
		&'a self,
		token: &'a AccessToken,
		_: &'a ProviderIdentity,
	) -> DriverFuture<'a, Map<String, Value>> {
		Box::pin(async move {
			let query = QueryFields::from_iter([("access_token", token.as_str())]);
			let response = self.core.get(USER_URL, &query, QueryEncoding::Rfc1738, &[]).await?;
			let body = response.json_object()?;

			// Gitee reports failures as `{"message": "..."}`, usually with a 401.
			if let Some(message) = field_str(&body, "message") {
				return Err(response.reject(message, body));
			}

			Ok(body)
		})
	}

	fn map_user(&self, raw: &Map<String, Value>, _: &ProviderIdentity) -> UserProfile {
		UserProfile {
			id: field_str(raw, "id").unwrap_or_default(),
			username: field_str(raw, "login"),
			nickname: field_str(raw, "name"),
			name: field_str(raw, "login"),
			email: field_str(raw, "email"),
			avatar: field_str(raw, "avatar_url"),
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn token_fields_carry_grant_type() {
		let driver = Gitee::new(ProviderConfig::new("a", "s").with_redirect_url("https://cb"))
			.expect("Gitee config should be valid.");

		assert_eq!(
			driver.token_fields("c").encode(QueryEncoding::Rfc1738),
			"client_id=a&client_secret=s&code=c&redirect_uri=https%3A%2F%2Fcb&grant_type=authorization_code"
		);
	}

	#[test]
	fn maps_numeric_ids() {
		let driver = Gitee::new(ProviderConfig::new("a", "s")).expect("Gitee config should be valid.");
		let raw = serde_json::json!({ "id": 7, "login": "octo", "name": "Octo", "avatar_url": "https://a" });
		let Value::Object(raw) = raw else { unreachable!() };
		let profile = driver.map_user(&raw, &ProviderIdentity::default());

		assert_eq!(profile.id, "7");
		assert_eq!(profile.name.as_deref(), Some("octo"));
		assert_eq!(profile.nickname.as_deref(), Some("Octo"));
		assert_eq!(profile.avatar.as_deref(), Some("https://a"));
	}
}
