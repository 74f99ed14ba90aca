//! Oschina.

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, ProviderIdentity, TokenGrant, UserProfile, field_str},
	config::{ProviderConfig, ProviderKind},
	driver::{Driver, DriverCore, DriverFuture, oauth2_token_fields},
	http::{QueryEncoding, QueryFields},
	provider::error_summary,
};

const AUTHORIZE_URL: &str = "https://www.oschina.net/action/oauth2/authorize";
const TOKEN_URL: &str = "https://www.oschina.net/action/openapi/token";
const USER_URL: &str = "https://www.oschina.net/action/openapi/user";

/// Oschina driver.
#[derive(Clone, Debug)]
pub struct Oschina {
	core: DriverCore,
}
impl Oschina {
	/// Creates the driver, validating `config`.
	pub fn new(config: ProviderConfig) -> Result<Self> {
		Ok(Self { core: DriverCore::new(ProviderKind::Oschina, config, &[])? })
	}
}
impl Driver for Oschina {
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

		fields.set("grant_type", "authorization_code").set("dataType", "json");

		fields
	}

	fn request_token<'a>(&'a self, code: &'a str) -> DriverFuture<'a, TokenGrant> {
		Box::pin(async move {
			let response = self
				.core
				.get(TOKEN_URL, &self.token_fields(code), self.query_encoding(), &[])
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
			let query = QueryFields::from_iter([("access_token", token.as_str()), ("dataType", "json")]);
			let response = self.core.get(USER_URL, &query, QueryEncoding::Rfc1738, &[]).await?;
			let body = response.json_object()?;

			if body.contains_key("error") {
				return Err(response.reject(error_summary(&body, "Oschina rejected the token"), body));
			}

			Ok(body)
		})
	}

	fn map_user(&self, raw: &Map<String, Value>, _: &ProviderIdentity) -> UserProfile {
		let name = field_str(raw, "name");

		UserProfile {
			id: field_str(raw, "id").unwrap_or_default(),
			nickname: name.clone(),
			name,
			email: field_str(raw, "email"),
			avatar: field_str(raw, "avatar"),
			..Default::default()
		}
	}
}
