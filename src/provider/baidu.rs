//! Baidu open platform.

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, ProviderIdentity, TokenGrant, UserProfile, field_str},
	config::{ProviderConfig, ProviderKind},
	driver::{Driver, DriverCore, DriverFuture, oauth2_token_fields},
	http::{QueryEncoding, QueryFields},
	provider::error_summary,
};

const AUTHORIZE_URL: &str = "https://openapi.baidu.com/oauth/2.0/authorize";
const TOKEN_URL: &str = "https://openapi.baidu.com/oauth/2.0/token";
const USER_URL: &str = "https://openapi.baidu.com/rest/2.0/passport/users/getInfo";
const PORTRAIT_URL: &str = "http://tb.himg.baidu.com/sys/portraitn/item/";

/// Baidu driver.
#[derive(Clone, Debug)]
pub struct Baidu {
	core: DriverCore,
	display: String,
}
impl Baidu {
	/// Scopes requested when none are configured.
	pub const DEFAULT_SCOPES: &'static [&'static str] = &["basic"];

	/// Creates the driver, validating `config`.
	pub fn new(config: ProviderConfig) -> Result<Self> {
		Ok(Self {
			core: DriverCore::new(ProviderKind::Baidu, config, Self::DEFAULT_SCOPES)?,
			display: "popup".into(),
		})
	}

	/// Sets the authorize page style (`page`, `popup`, `dialog`, `mobile`, ...).
	pub fn with_display(mut self, display: impl Into<String>) -> Self {
		self.display = display.into();

		self
	}
}
impl Driver for Baidu {
	fn core(&self) -> &DriverCore {
		&self.core
	}

	fn core_mut(&mut self) -> &mut DriverCore {
		&mut self.core
	}

	fn authorize_endpoint(&self) -> &'static str {
		AUTHORIZE_URL
	}

	fn code_fields(&self, redirect_url: Option<&str>) -> Result<QueryFields> {
		let mut fields = QueryFields::new();

		fields
			.set("client_id", self.core.appid())
			.set("redirect_uri", redirect_url.unwrap_or_default())
			.set("scope", self.core.scopes().join(self.scope_separator()))
			.set("response_type", "code")
			.set("display", self.display.as_str());

		for (key, value) in self.core.parameters().iter() {
			fields.set_if_absent(key, value);
		}
		if let Some(state) = self.core.state() {
			fields.set("state", state);
		}

		Ok(fields)
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

			if body.contains_key("error_code") || body.contains_key("error") {
				return Err(response.reject(error_summary(&body, "Baidu rejected the token"), body));
			}

			Ok(body)
		})
	}

	fn map_user(&self, raw: &Map<String, Value>, _: &ProviderIdentity) -> UserProfile {
		let username = field_str(raw, "username");

		UserProfile {
			id: field_str(raw, "openid").or_else(|| field_str(raw, "userid")).unwrap_or_default(),
			nickname: username.clone(),
			name: username,
			avatar: field_str(raw, "portrait").map(|portrait| format!("{PORTRAIT_URL}{portrait}")),
			..Default::default()
		}
	}
}
