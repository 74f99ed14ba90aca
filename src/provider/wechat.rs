//! WeChat open platform, including the third-party platform ("component") mode.

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, ProviderIdentity, ScopeList, TokenGrant, UserProfile, field_str},
	config::{ProviderConfig, ProviderKind},
	driver::{Driver, DriverCore, DriverFuture},
	http::{QueryEncoding, QueryFields},
	provider::error_summary,
};

const QRCONNECT_URL: &str = "https://open.weixin.qq.com/connect/qrconnect";
const OAUTH2_AUTHORIZE_URL: &str = "https://open.weixin.qq.com/connect/oauth2/authorize";
const TOKEN_URL: &str = "https://api.weixin.qq.com/sns/oauth2/access_token";
const COMPONENT_TOKEN_URL: &str = "https://api.weixin.qq.com/sns/oauth2/component/access_token";
const USER_URL: &str = "https://api.weixin.qq.com/sns/userinfo";

/// Third-party platform credentials used when an authorized component acts for the app.
#[derive(Clone, PartialEq, Eq)]
pub struct WechatComponent {
	/// Component app id.
	pub id: String,
	/// Component access token.
	pub token: String,
}
impl WechatComponent {
	/// Creates a component from its app id and access token.
	pub fn new(id: impl Into<String>, token: impl Into<String>) -> Self {
		Self { id: id.into(), token: token.into() }
	}

	/// Reads a component from loosely named keys.
	///
	/// The id is taken from `id`, `oappid`, `app_id`, or `component_app_id`; the token from `token`,
	/// `osecret`, `app_token`, `access_token`, or `component_access_token`. Both must be present.
	pub fn from_entries<'a, I>(entries: I) -> Result<Self>
	where
		I: IntoIterator<Item = (&'a str, &'a Value)>,
	{
		let mut id = None;
		let mut token = None;

		for (key, value) in entries {
			let Some(value) = value.as_str().filter(|value| !value.is_empty()) else {
				continue;
			};

			match key {
				"id" | "oappid" | "app_id" | "component_app_id" => id = Some(value.to_owned()),
				"token" | "osecret" | "app_token" | "access_token" | "component_access_token" =>
					token = Some(value.to_owned()),
				_ => {},
			}
		}

		match (id, token) {
			(Some(id), Some(token)) => Ok(Self { id, token }),
			_ => Err(Error::invalid_argument(
				"WeChat component config needs both an app id and an access token",
			)),
		}
	}

	/// Reads a component from the `extra` keys of a provider config (`oappid`/`osecret`, ...).
	pub fn from_config(config: &ProviderConfig) -> Result<Self> {
		Self::from_entries(config.extra.iter().map(|(key, value)| (key.as_str(), value)))
	}
}
impl Debug for WechatComponent {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("WechatComponent").field("id", &self.id).field("token", &"<redacted>").finish()
	}
}

/// WeChat driver.
///
/// Unless a state is set explicitly, every authorization URL carries a fresh random one.
#[derive(Clone, Debug)]
pub struct Wechat {
	core: DriverCore,
	with_country_code: bool,
	component: Option<WechatComponent>,
}
impl Wechat {
	/// Scopes requested when none are configured.
	pub const DEFAULT_SCOPES: &'static [&'static str] = &["snsapi_login"];

	/// Creates the driver, validating `config`.
	pub fn new(config: ProviderConfig) -> Result<Self> {
		Ok(Self {
			core: DriverCore::new(ProviderKind::Wechat, config, Self::DEFAULT_SCOPES)?,
			with_country_code: false,
			component: None,
		})
	}

	/// Asks `userinfo` for country codes instead of localized names (drops `lang`).
	pub fn with_country_code(mut self) -> Self {
		self.with_country_code = true;

		self
	}

	/// Switches to third-party platform mode.
	///
	/// A lone `snsapi_login` scope is downgraded to `snsapi_base`, which components are limited to.
	pub fn with_component(mut self, component: WechatComponent) -> Self {
		if self.core.scopes().is_only("snsapi_login") {
			self.core.set_scopes(ScopeList::new(["snsapi_base"]));
		}

		self.component = Some(component);

		self
	}

	/// Active component, if any.
	pub fn component(&self) -> Option<&WechatComponent> {
		self.component.as_ref()
	}

	fn language(&self) -> Option<&str> {
		if self.with_country_code {
			return None;
		}

		Some(self.core.parameters().get("lang").unwrap_or("zh_CN"))
	}
}
impl Driver for Wechat {
	fn core(&self) -> &DriverCore {
		&self.core
	}

	fn core_mut(&mut self) -> &mut DriverCore {
		&mut self.core
	}

	fn authorize_endpoint(&self) -> &'static str {
		if self.core.scopes().contains("snsapi_login") { QRCONNECT_URL } else { OAUTH2_AUTHORIZE_URL }
	}

	fn authorize_fragment(&self) -> Option<&'static str> {
		Some("wechat_redirect")
	}

	fn code_fields(&self, redirect_url: Option<&str>) -> Result<QueryFields> {
		let core = &self.core;
		let state = match core.state() {
			Some(state) => state.to_owned(),
			None => hex::encode(rand::random::<[u8; 16]>()),
		};
		let mut fields = QueryFields::new();

		fields
			.set("appid", core.appid())
			.set("redirect_uri", redirect_url.unwrap_or_default())
			.set("response_type", "code")
			.set("scope", core.scopes().join(self.scope_separator()))
			.set("state", state)
			.set("connect_redirect", "1");
		fields.extend(core.parameters().clone());

		if let Some(component) = &self.component {
			fields.set("component_appid", component.id.as_str());
		}

		Ok(fields)
	}

	fn token_fields(&self, code: &str) -> QueryFields {
		let mut fields = QueryFields::new();

		fields.set("appid", self.core.appid());

		match &self.component {
			Some(component) => fields
				.set("component_appid", component.id.as_str())
				.set("component_access_token", component.token.as_str()),
			None => fields.set("secret", self.core.secret()),
		};

		fields.set("code", code).set("grant_type", "authorization_code");

		fields
	}

	fn request_token<'a>(&'a self, code: &'a str) -> DriverFuture<'a, TokenGrant> {
		Box::pin(async move {
			let endpoint = if self.component.is_some() { COMPONENT_TOKEN_URL } else { TOKEN_URL };
			let response =
				self.core.get(endpoint, &self.token_fields(code), self.query_encoding(), &[]).await?;
			let body = response.json_object()?;

			if body.get("errcode").and_then(Value::as_i64).is_some_and(|code| code != 0) {
				return Err(response.reject(error_summary(&body, "WeChat rejected the code"), body));
			}

			let identity = ProviderIdentity::from_raw(&body, "openid", "unionid");

			Ok(TokenGrant::new(response.token(body, self.token_field_names())?).with_identity(identity))
		})
	}

	fn request_user<'a>(
		&'a self,
		token: &'a AccessToken,
		identity: &'a ProviderIdentity,
	) -> DriverFuture<'a, Map<String, Value>> {
		Box::pin(async move {
			let Some(openid) = identity.open_id.as_deref() else {
				return Err(Error::invalid_argument("WeChat profile lookup needs an openid"));
			};

			// `snsapi_base` grants no profile access; the identity is all there is.
			if self.core.scopes().contains("snsapi_base") {
				let mut raw = Map::new();

				raw.insert("openid".into(), openid.into());
				raw.insert(
					"unionid".into(),
					identity.union_id.clone().map(Value::String).unwrap_or(Value::Null),
				);

				return Ok(raw);
			}

			let mut query = QueryFields::from_iter([("access_token", token.as_str()), ("openid", openid)]);

			if let Some(lang) = self.language() {
				query.set("lang", lang);
			}

			let response = self.core.get(USER_URL, &query, QueryEncoding::Rfc1738, &[]).await?;
			let body = response.json_object()?;

			if body.get("errcode").and_then(Value::as_i64).is_some_and(|code| code != 0) {
				return Err(response.reject(error_summary(&body, "WeChat rejected the token"), body));
			}

			Ok(body)
		})
	}

	fn map_user(&self, raw: &Map<String, Value>, identity: &ProviderIdentity) -> UserProfile {
		let nickname = field_str(raw, "nickname");

		UserProfile {
			id: field_str(raw, "openid").or_else(|| identity.open_id.clone()).unwrap_or_default(),
			name: nickname.clone(),
			nickname,
			avatar: field_str(raw, "headimgurl"),
			..Default::default()
		}
	}
}
