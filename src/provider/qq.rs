//! QQ Connect.
//!
//! The token endpoint answers with a form-encoded body on success and a JSONP
//! `callback( {...} );` envelope on failure; `/oauth2.0/me` always answers JSONP.

// crates.io
use url::form_urlencoded;
// self
use crate::{
	_prelude::*,
	auth::{AccessToken, ProviderIdentity, TokenGrant, UserProfile, field_str},
	config::{ProviderConfig, ProviderKind},
	driver::{Driver, DriverCore, DriverFuture, oauth2_token_fields},
	http::{ProviderResponse, QueryEncoding, QueryFields},
	provider::error_summary,
};

const AUTHORIZE_URL: &str = "https://graph.qq.com/oauth2.0/authorize";
const TOKEN_URL: &str = "https://graph.qq.com/oauth2.0/token";
const ME_URL: &str = "https://graph.qq.com/oauth2.0/me";
const USER_URL: &str = "https://graph.qq.com/user/get_user_info";

/// QQ driver.
#[derive(Clone, Debug)]
pub struct Qq {
	core: DriverCore,
	with_union_id: bool,
}
impl Qq {
	/// Scopes requested when none are configured.
	pub const DEFAULT_SCOPES: &'static [&'static str] = &["get_user_info"];

	/// Creates the driver, validating `config`.
	pub fn new(config: ProviderConfig) -> Result<Self> {
		Ok(Self {
			core: DriverCore::new(ProviderKind::Qq, config, Self::DEFAULT_SCOPES)?,
			with_union_id: false,
		})
	}

	/// Asks `/oauth2.0/me` for the cross-application union id as well.
	pub fn with_union_id(mut self) -> Self {
		self.with_union_id = true;

		self
	}

	async fn me(&self, token: &AccessToken) -> Result<Map<String, Value>> {
		let mut query = QueryFields::from_iter([("access_token", token.as_str())]);

		if self.with_union_id {
			query.set("unionid", "1");
		}

		let response = self.core.get(ME_URL, &query, QueryEncoding::Rfc1738, &[]).await?;
		let text = response.text();
		let me = match serde_json::from_str::<Value>(unwrap_jsonp(&text).unwrap_or(&text)) {
			Ok(Value::Object(me)) => me,
			_ => return Err(response.reject("QQ openid lookup returned an unreadable body", text)),
		};

		if me.contains_key("error") || field_str(&me, "openid").is_none() {
			return Err(response.reject(error_summary(&me, "QQ openid lookup failed"), me));
		}

		Ok(me)
	}
}
impl Driver for Qq {
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
				.get(TOKEN_URL, &self.token_fields(code), self.query_encoding(), &[])
				.await?;

			Ok(TokenGrant::new(response.token(parse_token_body(&response)?, self.token_field_names())?))
		})
	}

	fn request_user<'a>(
		&'a self,
		token: &'a AccessToken,
		_: &'a ProviderIdentity,
	) -> DriverFuture<'a, Map<String, Value>> {
		Box::pin(async move {
			let me = self.me(token).await?;
			let openid = field_str(&me, "openid").unwrap_or_default();
			let query = QueryFields::from_iter([
				("access_token", token.as_str()),
				("fmt", "json"),
				("openid", openid.as_str()),
				("oauth_consumer_key", self.core.appid()),
			]);
			let response = self.core.get(USER_URL, &query, QueryEncoding::Rfc1738, &[]).await?;
			let mut body = response.json_object()?;

			if body.get("ret").and_then(Value::as_i64).is_some_and(|ret| ret != 0) {
				return Err(response.reject(error_summary(&body, "QQ rejected the token"), body));
			}

			body.insert("openid".into(), openid.into());
			body.insert(
				"unionid".into(),
				field_str(&me, "unionid").map(Value::String).unwrap_or(Value::Null),
			);

			Ok(body)
		})
	}

	fn map_user(&self, raw: &Map<String, Value>, _: &ProviderIdentity) -> UserProfile {
		let nickname = field_str(raw, "nickname");

		UserProfile {
			id: field_str(raw, "openid").unwrap_or_default(),
			name: nickname.clone(),
			nickname,
			email: field_str(raw, "email"),
			avatar: field_str(raw, "figureurl_qq_2"),
			..Default::default()
		}
	}
}

/// Returns the JSON document wrapped in `callback( ... );`, if `text` is JSONP.
fn unwrap_jsonp(text: &str) -> Option<&str> {
	let text = text.trim();
	let rest = text.strip_prefix("callback")?.trim_start().strip_prefix('(')?;
	let end = rest.rfind(')')?;

	Some(rest[..end].trim())
}

fn parse_token_body(response: &ProviderResponse) -> Result<Map<String, Value>> {
	let text = response.text();

	if let Some(inner) = unwrap_jsonp(&text) {
		let body = serde_json::from_str::<Value>(inner).unwrap_or_else(|_| Value::String(text.clone()));
		let message = match &body {
			Value::Object(map) => error_summary(map, "QQ rejected the code"),
			_ => "QQ rejected the code".into(),
		};

		return Err(response.reject(message, body));
	}
	if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(&text) {
		if map.contains_key("error") {
			return Err(response.reject(error_summary(&map, "QQ rejected the code"), map));
		}

		return Ok(map);
	}

	Ok(form_urlencoded::parse(text.trim().as_bytes())
		.map(|(key, value)| (key.into_owned(), Value::String(value.into_owned())))
		.collect())
}
