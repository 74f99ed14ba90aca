//! DingTalk scan login.
//!
//! DingTalk never hands out a user access token to this flow: the callback code is traded for the
//! profile in one signed call, [`Dingtalk::user_from_code`]. The generic token exchange and
//! token-to-user lookup therefore fail with [`ConfigError::Unsupported`].

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, ProviderIdentity, TokenGrant, User, UserProfile, field_str},
	config::{ProviderConfig, ProviderKind},
	driver::{Driver, DriverCore, DriverFuture},
	error::ConfigError,
	http::QueryFields,
	obs::{self, FlowStage},
	provider::error_summary,
	sign,
};

const AUTHORIZE_URL: &str = "https://oapi.dingtalk.com/connect/qrconnect";
const USER_BY_CODE_URL: &str = "https://oapi.dingtalk.com/sns/getuserinfo_bycode";

/// DingTalk driver.
#[derive(Clone, Debug)]
pub struct Dingtalk {
	core: DriverCore,
}
impl Dingtalk {
	/// Scopes requested when none are configured.
	pub const DEFAULT_SCOPES: &'static [&'static str] = &["snsapi_login"];

	/// Creates the driver, validating `config`.
	pub fn new(config: ProviderConfig) -> Result<Self> {
		Ok(Self { core: DriverCore::new(ProviderKind::Dingtalk, config, Self::DEFAULT_SCOPES)? })
	}

	/// Trades a temporary auth code for the user's profile in one signed call.
	pub fn user_from_code<'a>(&'a self, code: &'a str) -> DriverFuture<'a, User> {
		let timestamp = (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64;

		self.user_from_code_at(code, timestamp)
	}

	fn user_from_code_at<'a>(&'a self, code: &'a str, timestamp_ms: i64) -> DriverFuture<'a, User> {
		Box::pin(obs::observe(self.kind(), FlowStage::UserFromCode, async move {
			if code.trim().is_empty() {
				return Err(Error::invalid_argument("code parameter cannot be empty"));
			}

			let query = self.signed_query(timestamp_ms)?;
			let body = serde_json::json!({ "tmp_auth_code": code });
			let response = self.core.post_json(USER_BY_CODE_URL, &query, &body).await?;
			let body = response.json_object()?;

			if body.get("errcode").and_then(Value::as_i64) != Some(0) {
				return Err(response.reject(error_summary(&body, "DingTalk rejected the code"), body));
			}

			let user_info = match body.get("user_info") {
				Some(Value::Object(user_info)) => user_info.clone(),
				_ => return Err(response.reject("DingTalk response lacks `user_info`", body)),
			};
			let identity = ProviderIdentity::from_raw(&user_info, "openid", "unionid");

			Ok(self.map_user_to_canonical(user_info, &identity))
		}))
	}

	fn signed_query(&self, timestamp_ms: i64) -> Result<QueryFields> {
		let timestamp = timestamp_ms.to_string();
		let signature = sign::hmac_base64(&timestamp, self.core.secret())?;
		let mut query = QueryFields::new();

		query
			.set("accessKey", self.core.appid())
			.set("timestamp", timestamp)
			.set("signature", signature);

		Ok(query)
	}
}
impl Driver for Dingtalk {
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
		""
	}

	fn code_fields(&self, redirect_url: Option<&str>) -> Result<QueryFields> {
		let core = &self.core;
		let mut fields = QueryFields::new();

		fields
			.set("appid", core.appid())
			.set("response_type", "code")
			.set("scope", core.scopes().join(self.scope_separator()))
			.set("redirect_uri", redirect_url.unwrap_or_default());
		fields.extend(core.parameters().clone());

		if let Some(state) = core.state() {
			fields.set("state", state);
		}

		Ok(fields)
	}

	fn request_token<'a>(&'a self, _: &'a str) -> DriverFuture<'a, TokenGrant> {
		Box::pin(async {
			Err(ConfigError::Unsupported { provider: "dingtalk", operation: "token exchange" }.into())
		})
	}

	fn request_user<'a>(
		&'a self,
		_: &'a AccessToken,
		_: &'a ProviderIdentity,
	) -> DriverFuture<'a, Map<String, Value>> {
		Box::pin(async {
			Err(ConfigError::Unsupported { provider: "dingtalk", operation: "token-based user lookup" }
				.into())
		})
	}

	fn map_user(&self, raw: &Map<String, Value>, _: &ProviderIdentity) -> UserProfile {
		let nick = field_str(raw, "nick");

		UserProfile {
			id: field_str(raw, "openid").unwrap_or_default(),
			name: nick.clone(),
			nickname: nick,
			..Default::default()
		}
	}
}
