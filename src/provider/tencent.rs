//! Tencent Cloud login.
//!
//! Every API call is a TC3-signed `GET https://{host}/?{query}`. The profile lookup is a two-step
//! protocol: the user access token is first traded for temporary federation credentials on the STS
//! host, and `GetUserBaseInfo` is then signed with those credentials plus the `X-TC-Token` header.

// crates.io
use oauth2::{HttpRequest, http::Method};
// self
use crate::{
	_prelude::*,
	auth::{AccessToken, ProviderIdentity, TokenFieldNames, TokenGrant, User, UserProfile, field_str},
	config::{ProviderConfig, ProviderKind},
	driver::{Driver, DriverCore, DriverFuture},
	http::{self, ProviderResponse, QueryEncoding, QueryFields},
	obs::{self, FlowStage},
	sign::tc3::{self, SignedRequestContext, Tc3Credential},
};

const AUTHORIZE_URL: &str = "https://cloud.tencent.com/open/authorize";
const OPEN_HOST: &str = "open.tencentcloudapi.com";
const STS_HOST: &str = "sts.tencentcloudapi.com";
const OPEN_VERSION: &str = "2018-12-25";
const STS_VERSION: &str = "2018-08-13";
const REGION: &str = "ap-guangzhou";
const FEDERATION_DURATION_SECS: &str = "7200";

/// Temporary credentials returned by `GetThirdPartyFederationToken`.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct FederationCredentials {
	/// Session token sent as `X-TC-Token`.
	#[serde(rename = "Token")]
	pub token: String,
	/// Temporary SecretId.
	#[serde(rename = "TmpSecretId")]
	pub tmp_secret_id: String,
	/// Temporary SecretKey.
	#[serde(rename = "TmpSecretKey")]
	pub tmp_secret_key: String,
}
impl FederationCredentials {
	fn credential(&self) -> Tc3Credential<'_> {
		Tc3Credential { secret_id: &self.tmp_secret_id, secret_key: &self.tmp_secret_key }
	}
}
impl Debug for FederationCredentials {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("FederationCredentials")
			.field("token", &"<redacted>")
			.field("tmp_secret_id", &self.tmp_secret_id)
			.field("tmp_secret_key", &"<redacted>")
			.finish()
	}
}

/// One Tencent Cloud API call before signing.
#[derive(Clone, Debug)]
struct ApiCall<'a> {
	host: &'a str,
	action: &'a str,
	version: &'a str,
	query: BTreeMap<String, String>,
	headers: Vec<(&'static str, String)>,
}

/// Tencent Cloud driver.
///
/// `secret` holds the SecretId and `secret_key` the SecretKey.
#[derive(Clone, Debug)]
pub struct Tencent {
	core: DriverCore,
}
impl Tencent {
	/// Scopes requested when none are configured.
	pub const DEFAULT_SCOPES: &'static [&'static str] = &["login"];

	/// Creates the driver, validating `config` (including `secret_key`).
	pub fn new(config: ProviderConfig) -> Result<Self> {
		Ok(Self { core: DriverCore::new(ProviderKind::Tencent, config, Self::DEFAULT_SCOPES)? })
	}

	/// Trades a user access token for temporary federation credentials.
	///
	/// The token is forwarded as given, including an empty one from an identity-only exchange.
	pub fn federation_token<'a>(&'a self, token: &'a str) -> DriverFuture<'a, FederationCredentials> {
		Box::pin(obs::observe(self.kind(), FlowStage::FederationToken, async move {
			let call = ApiCall {
				host: STS_HOST,
				action: "GetThirdPartyFederationToken",
				version: STS_VERSION,
				query: BTreeMap::from([
					("UserAccessToken".to_owned(), token.to_owned()),
					("Duration".to_owned(), FEDERATION_DURATION_SECS.to_owned()),
					("ApiAppId".to_owned(), "0".to_owned()),
				]),
				headers: vec![("X-TC-Region", REGION.to_owned())],
			};
			let (response, inner) = self.perform(call, &self.long_lived_credential()).await?;

			if let Some(credentials @ Value::Object(_)) = inner.get("Credentials") {
				return response.decode(credentials);
			}

			Err(response.reject("Get Federation Token failed", inner))
		}))
	}

	/// Fetches `GetUserBaseInfo` with credentials federated from `token`.
	async fn profile(&self, token: &str) -> Result<Map<String, Value>> {
		let credentials = self.federation_token(token).await?;
		let call = ApiCall {
			host: OPEN_HOST,
			action: "GetUserBaseInfo",
			version: OPEN_VERSION,
			query: BTreeMap::new(),
			headers: vec![("X-TC-Token", credentials.token.clone())],
		};
		let (_, inner) = self.perform(call, &credentials.credential()).await?;

		Ok(inner)
	}

	fn long_lived_credential(&self) -> Tc3Credential<'_> {
		Tc3Credential {
			secret_id: self.core.secret(),
			secret_key: self.core.config().secret_key.as_deref().unwrap_or_default(),
		}
	}

	fn prepare(&self, call: &ApiCall, credential: &Tc3Credential, timestamp: i64) -> Result<HttpRequest> {
		let context = SignedRequestContext::sign_get(
			call.action,
			call.version,
			call.host,
			call.query.clone(),
			credential,
			timestamp,
		)?;
		let url = context.query_fields().append_to(
			&self.core.endpoint(&format!("https://{}/", call.host))?,
			QueryEncoding::Rfc1738,
		)?;
		let timestamp = context.timestamp.to_string();
		let mut headers = vec![
			("X-TC-Action", context.action.as_str()),
			("X-TC-Timestamp", timestamp.as_str()),
			("X-TC-Version", context.version.as_str()),
			("Content-Type", tc3::CONTENT_TYPE),
			("Authorization", context.authorization()),
			("Accept", "application/json"),
		];

		headers.extend(call.headers.iter().map(|(name, value)| (*name, value.as_str())));

		http::build_request(Method::GET, &url, &headers, Vec::new())
	}

	/// Signs and sends one call, returning the response and its `Response` object.
	async fn perform(
		&self,
		call: ApiCall<'_>,
		credential: &Tc3Credential<'_>,
	) -> Result<(ProviderResponse, Map<String, Value>)> {
		let request = self.prepare(&call, credential, OffsetDateTime::now_utc().unix_timestamp())?;
		let response = self.core.send(request).await?;
		let mut body = response.json_object()?;
		let inner = match body.remove("Response") {
			Some(Value::Object(inner)) => inner,
			Some(other) => return Err(response.reject("Tencent Cloud `Response` is not an object", other)),
			None => body,
		};

		if let Some(Value::Object(error)) = inner.get("Error") {
			let message = format!(
				"{}: {}",
				field_str(error, "Code").unwrap_or_default(),
				field_str(error, "Message").unwrap_or_default()
			);

			return Err(response.reject(message, inner));
		}

		Ok((response, inner))
	}
}
impl Driver for Tencent {
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
		let core = &self.core;
		let mut fields = QueryFields::new();

		fields
			.set("app_id", core.appid())
			.set("redirect_url", redirect_url.unwrap_or_default())
			.set("scope", core.scopes().join(self.scope_separator()))
			.set("response_type", "code");
		fields.extend(core.parameters().clone());

		if let Some(state) = core.state() {
			fields.set("state", state);
		}

		Ok(fields)
	}

	fn token_field_names(&self) -> TokenFieldNames {
		TokenFieldNames::TENCENT
	}

	fn token_fields(&self, code: &str) -> QueryFields {
		QueryFields::from_iter([("UserAuthCode", code)])
	}

	fn request_token<'a>(&'a self, code: &'a str) -> DriverFuture<'a, TokenGrant> {
		Box::pin(async move {
			let call = ApiCall {
				host: OPEN_HOST,
				action: "GetUserAccessToken",
				version: OPEN_VERSION,
				query: self.token_fields(code).into_iter().collect(),
				headers: Vec::new(),
			};
			let (response, inner) = self.perform(call, &self.long_lived_credential()).await?;
			let identity = ProviderIdentity::from_raw(&inner, "UserOpenId", "UserUnionId");

			if identity.open_id.is_none() {
				return Err(response.reject("Tencent Cloud response lacks `UserOpenId`", inner));
			}

			let names = self.token_field_names();

			if field_str(&inner, names.access_token).is_none() {
				return Ok(TokenGrant::identity_only(identity));
			}

			Ok(TokenGrant::new(response.token(inner, names)?).with_identity(identity))
		})
	}

	fn request_user<'a>(
		&'a self,
		token: &'a AccessToken,
		_: &'a ProviderIdentity,
	) -> DriverFuture<'a, Map<String, Value>> {
		Box::pin(self.profile(token.as_str()))
	}

	fn build_user_from_grant<'a>(&'a self, grant: &'a TokenGrant) -> DriverFuture<'a, User> {
		Box::pin(async move {
			if let Some(token) = grant.access_token() {
				return self.build_user_from_token(token, &grant.identity).await;
			}

			let raw = obs::observe(self.kind(), FlowStage::FetchUser, self.profile("")).await?;

			Ok(self.map_user_to_canonical(raw, &grant.identity))
		})
	}

	fn map_user(&self, raw: &Map<String, Value>, identity: &ProviderIdentity) -> UserProfile {
		let nickname = field_str(raw, "Nickname");

		UserProfile {
			id: identity.open_id.clone().unwrap_or_default(),
			name: nickname.clone(),
			nickname,
			..Default::default()
		}
	}
}
