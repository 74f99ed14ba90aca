//! Provider configuration records and the registry's application table.
//!
//! [`ProviderConfig`] mirrors what operators paste from each provider console: the app
//! identifier, the secret (an RSA private key for Alipay, the SecretId for Tencent Cloud), an
//! optional second secret, the redirect URL, requested scopes, and extra authorize parameters.
//! Records deserialize from any serde format; validation happens when a driver is constructed.

// self
use crate::{_prelude::*, error::ConfigError};

/// Closed set of supported providers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
	/// Alipay open platform (RSA2-signed gateway).
	Alipay,
	/// Baidu open platform.
	Baidu,
	/// QQ Connect.
	Qq,
	/// WeChat open platform.
	Wechat,
	/// Gitee.
	Gitee,
	/// Oschina.
	Oschina,
	/// DingTalk scan login.
	Dingtalk,
	/// Tencent Cloud (TC3-signed API).
	#[serde(alias = "qcloud")]
	Tencent,
}
impl ProviderKind {
	/// Every supported provider.
	pub const ALL: [Self; 8] = [
		Self::Alipay,
		Self::Baidu,
		Self::Qq,
		Self::Wechat,
		Self::Gitee,
		Self::Oschina,
		Self::Dingtalk,
		Self::Tencent,
	];

	/// Returns a stable lowercase label suitable for logs, spans, and registry lookups.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Alipay => "alipay",
			Self::Baidu => "baidu",
			Self::Qq => "qq",
			Self::Wechat => "wechat",
			Self::Gitee => "gitee",
			Self::Oschina => "oschina",
			Self::Dingtalk => "dingtalk",
			Self::Tencent => "tencent",
		}
	}
}
impl Display for ProviderKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for ProviderKind {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let lowered = s.trim().to_ascii_lowercase();

		if lowered == "qcloud" {
			return Ok(Self::Tencent);
		}

		Self::ALL
			.into_iter()
			.find(|kind| kind.as_str() == lowered)
			.ok_or_else(|| ConfigError::UnknownProvider { name: s.to_owned() })
	}
}

/// Per-provider configuration record.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
	/// Application identifier (`client_id`, `app_id`, or Tencent's app id).
	#[serde(default, alias = "app_id", alias = "appId")]
	pub appid: String,
	/// Application secret; Alipay's RSA private key; Tencent Cloud's SecretId.
	#[serde(default)]
	pub secret: String,
	/// Second secret; Tencent Cloud's SecretKey.
	#[serde(default, alias = "secretKey", skip_serializing_if = "Option::is_none")]
	pub secret_key: Option<String>,
	/// Redirect URL registered with the provider.
	#[serde(default, alias = "redirect", skip_serializing_if = "Option::is_none")]
	pub redirect_url: Option<String>,
	/// Requested scopes; a plain string is split on whitespace.
	#[serde(default, deserialize_with = "de_scopes", skip_serializing_if = "Option::is_none")]
	pub scopes: Option<Vec<String>>,
	/// Extra authorize-endpoint parameters.
	#[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
	pub parameters: BTreeMap<String, String>,
	/// Replaces scheme, host, and port of every server-to-server call (sandboxes, tests).
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub api_base: Option<Url>,
	/// Keys with no dedicated slot (display metadata, WeChat `oappid`/`osecret`, ...).
	#[serde(flatten)]
	pub extra: BTreeMap<String, Value>,
}
impl ProviderConfig {
	/// Creates a configuration carrying the two mandatory credentials.
	pub fn new(appid: impl Into<String>, secret: impl Into<String>) -> Self {
		Self { appid: appid.into(), secret: secret.into(), ..Default::default() }
	}

	/// Sets the second secret (Tencent Cloud SecretKey).
	pub fn with_secret_key(mut self, secret_key: impl Into<String>) -> Self {
		self.secret_key = Some(secret_key.into());

		self
	}

	/// Sets the redirect URL.
	pub fn with_redirect_url(mut self, redirect_url: impl Into<String>) -> Self {
		self.redirect_url = Some(redirect_url.into());

		self
	}

	/// Overrides the provider's default scopes.
	pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.scopes = Some(scopes.into_iter().map(Into::into).collect());

		self
	}

	/// Adds one extra authorize parameter.
	pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.parameters.insert(key.into(), value.into());

		self
	}

	/// Routes server-to-server calls to another origin.
	pub fn with_api_base(mut self, api_base: Url) -> Self {
		self.api_base = Some(api_base);

		self
	}

	/// Stores a key without a dedicated slot.
	pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
		self.extra.insert(key.into(), value.into());

		self
	}

	/// Returns a string-valued extra key, ignoring empty strings.
	pub fn extra_str(&self, key: &str) -> Option<&str> {
		self.extra.get(key).and_then(Value::as_str).filter(|value| !value.is_empty())
	}

	/// Validates the invariants every driver relies on.
	pub fn validate(&self, kind: ProviderKind) -> Result<(), ConfigError> {
		if self.appid.trim().is_empty() {
			return Err(ConfigError::MissingField { field: "appid" });
		}
		if self.secret.trim().is_empty() {
			return Err(ConfigError::MissingField { field: "secret" });
		}
		if kind == ProviderKind::Tencent
			&& self.secret_key.as_deref().is_none_or(|key| key.trim().is_empty())
		{
			return Err(ConfigError::MissingField { field: "secret_key" });
		}

		Ok(())
	}
}
impl Debug for ProviderConfig {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ProviderConfig")
			.field("appid", &self.appid)
			.field("secret", &"<redacted>")
			.field("secret_key", &self.secret_key.as_ref().map(|_| "<redacted>"))
			.field("redirect_url", &self.redirect_url)
			.field("scopes", &self.scopes)
			.field("parameters", &self.parameters)
			.field("api_base", &self.api_base)
			.finish()
	}
}

/// One entry of the registry's application table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
	/// Provider type; defaults to the application name when absent.
	#[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
	pub kind: Option<ProviderKind>,
	/// Provider configuration.
	#[serde(flatten)]
	pub provider: ProviderConfig,
}

/// Registry configuration: named applications, each bound to a provider type.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ThirdConfig {
	/// Applications keyed by name.
	#[serde(default)]
	pub apps: BTreeMap<String, AppConfig>,
}
impl ThirdConfig {
	/// Registers an application under `name`.
	pub fn with_app(
		mut self,
		name: impl Into<String>,
		kind: Option<ProviderKind>,
		provider: ProviderConfig,
	) -> Self {
		self.apps.insert(name.into(), AppConfig { kind, provider });

		self
	}
}

fn de_scopes<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
	D: serde::Deserializer<'de>,
{
	#[derive(Deserialize)]
	#[serde(untagged)]
	enum Scopes {
		Joined(String),
		List(Vec<String>),
	}

	let scopes = match Option::<Scopes>::deserialize(deserializer)? {
		None => return Ok(None),
		Some(Scopes::Joined(joined)) => joined.split_whitespace().map(str::to_owned).collect(),
		Some(Scopes::List(list)) => list,
	};

	Ok(Some(scopes).filter(|scopes: &Vec<String>| !scopes.is_empty()))
}
