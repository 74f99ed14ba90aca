//! Alipay open platform.
//!
//! Every gateway call carries the public fields (`app_id`, `method`, `timestamp`, ...) and an
//! `RSA2` signature over all of them; see [`crate::sign::rsa2`]. The configured `secret` is the
//! application's RSA private key.

// crates.io
use time::macros::{format_description, offset};
// self
use crate::{
	_prelude::*,
	auth::{AccessToken, ProviderIdentity, TokenGrant, UserProfile, field_str},
	config::{ProviderConfig, ProviderKind},
	driver::{Driver, DriverCore, DriverFuture},
	error::ConfigError,
	http::{ProviderResponse, QueryEncoding, QueryFields},
	sign::rsa2,
};

const AUTHORIZE_URL: &str = "https://openauth.alipay.com/oauth2/publicAppAuthorize.htm";
const GATEWAY_URL: &str = "https://openapi.alipay.com/gateway.do";
const CONTENT_TYPE: &str = "application/x-www-form-urlencoded;charset=utf-8";
const TOKEN_METHOD: &str = "alipay.system.oauth.token";
const USER_METHOD: &str = "alipay.user.info.share";
const SUCCESS_CODE: &str = "10000";

/// Alipay driver.
#[derive(Clone, Debug)]
pub struct Alipay {
	core: DriverCore,
}
impl Alipay {
	/// Scopes requested when none are configured.
	pub const DEFAULT_SCOPES: &'static [&'static str] = &["auth_user"];
	/// Gateway API version.
	pub const API_VERSION: &'static str = "1.0";

	/// Creates the driver, validating `config`.
	pub fn new(config: ProviderConfig) -> Result<Self> {
		Ok(Self { core: DriverCore::new(ProviderKind::Alipay, config, Self::DEFAULT_SCOPES)? })
	}

	/// Builds the signed field set for one gateway call issued at `at`.
	pub fn signed_fields(
		&self,
		method: &str,
		extra: &[(&str, &str)],
		at: OffsetDateTime,
	) -> Result<BTreeMap<String, String>> {
		let timestamp = at
			.to_offset(offset!(+8))
			.format(format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"))
			.map_err(|e| ConfigError::Signing { reason: e.to_string() })?;
		let mut fields = [
			("app_id", self.core.appid()),
			("format", "json"),
			("charset", "UTF-8"),
			("sign_type", "RSA2"),
			("method", method),
			("timestamp", timestamp.as_str()),
			("version", Self::API_VERSION),
		]
		.into_iter()
		.chain(extra.iter().copied())
		.map(|(key, value)| (key.to_owned(), value.to_owned()))
		.collect::<BTreeMap<_, _>>();
		let signature = rsa2::sign_fields(&fields, self.core.secret())?;

		fields.insert("sign".into(), signature);

		Ok(fields)
	}

	async fn call(&self, method: &str, extra: &[(&str, &str)]) -> Result<ProviderResponse> {
		let fields = self.signed_fields(method, extra, OffsetDateTime::now_utc())?;

		self.core
			.post_form(GATEWAY_URL, &QueryFields::from_iter(fields), QueryEncoding::Rfc1738, CONTENT_TYPE)
			.await
	}
}
impl Driver for Alipay {
	fn core(&self) -> &DriverCore {
		&self.core
	}

	fn core_mut(&mut self) -> &mut DriverCore {
		&mut self.core
	}

	fn authorize_endpoint(&self) -> &'static str {
		AUTHORIZE_URL
	}

	fn scope_separator(&self) -> &'static str {
		","
	}

	fn code_fields(&self, redirect_url: Option<&str>) -> Result<QueryFields> {
		let Some(redirect_url) = redirect_url else {
			return Err(ConfigError::MissingRedirectUrl { provider: "alipay" }.into());
		};
		let core = &self.core;
		let mut fields = QueryFields::new();

		fields
			.set("app_id", core.appid())
			.set("scope", core.scopes().join(self.scope_separator()))
			.set("redirect_uri", redirect_url);
		fields.extend(core.parameters().clone());

		if let Some(state) = core.state() {
			fields.set("state", state);
		}

		Ok(fields)
	}

	fn request_token<'a>(&'a self, code: &'a str) -> DriverFuture<'a, TokenGrant> {
		Box::pin(async move {
			let response =
				self.call(TOKEN_METHOD, &[("code", code), ("grant_type", "authorization_code")]).await?;
			let body = response.json_object()?;
			let inner = envelope(&response, &body, "alipay_system_oauth_token_response")?;
			let identity = ProviderIdentity {
				open_id: field_str(&inner, "open_id").or_else(|| field_str(&inner, "user_id")),
				union_id: None,
			};

			Ok(TokenGrant::new(response.token(inner, self.token_field_names())?).with_identity(identity))
		})
	}

	fn request_user<'a>(
		&'a self,
		token: &'a AccessToken,
		_: &'a ProviderIdentity,
	) -> DriverFuture<'a, Map<String, Value>> {
		Box::pin(async move {
			let response = self.call(USER_METHOD, &[("auth_token", token.as_str())]).await?;
			let body = response.json_object()?;
			let inner = envelope(&response, &body, "alipay_user_info_share_response")?;

			if field_str(&inner, "code").is_some_and(|code| code != SUCCESS_CODE) {
				return Err(response.reject(summary(&inner), body));
			}

			Ok(inner)
		})
	}

	fn map_user(&self, raw: &Map<String, Value>, _: &ProviderIdentity) -> UserProfile {
		UserProfile {
			id: field_str(raw, "user_id").or_else(|| field_str(raw, "open_id")).unwrap_or_default(),
			name: field_str(raw, "nick_name"),
			nickname: field_str(raw, "nick_name"),
			email: field_str(raw, "email"),
			avatar: field_str(raw, "avatar"),
			..Default::default()
		}
	}
}

/// Unwraps `<method>_response`, failing on the gateway's `error_response`.
fn envelope(
	response: &ProviderResponse,
	body: &Map<String, Value>,
	key: &str,
) -> Result<Map<String, Value>> {
	if let Some(Value::Object(error)) = body.get("error_response") {
		return Err(response.reject(summary(error), body.clone()));
	}

	match body.get(key) {
		Some(Value::Object(inner)) => Ok(inner.clone()),
		_ => Err(response.reject(format!("Alipay response lacks `{key}`"), body.clone())),
	}
}

fn summary(inner: &Map<String, Value>) -> String {
	let code = field_str(inner, "code").unwrap_or_default();
	let message = field_str(inner, "sub_msg")
		.or_else(|| field_str(inner, "msg"))
		.unwrap_or_else(|| "Alipay rejected the call".into());

	if code.is_empty() { message } else { format!("{code}: {message}") }
}
