//! Shared driver contract for every provider.
//!
//! A provider implements a handful of hooks (authorize endpoint and fields, token exchange,
//! profile lookup, profile mapping) on top of a [`DriverCore`]; the provided methods on [`Driver`]
//! compose them into the public flows:
//!
//! - [`Driver::build_authorization_url`] builds the redirect target for the browser.
//! - [`Driver::exchange_code_for_token`] trades the callback code for a [`TokenGrant`].
//! - [`Driver::build_user_from_token`] fetches and maps the profile for a token.
//! - [`Driver::authenticate_with_code`] and [`Driver::authenticate_with_token`] run the whole flow.
//!
//! Identity learned during the exchange (Tencent Cloud's open id) travels inside the grant, so the
//! profile lookup never depends on state hidden in the driver.

// crates.io
use oauth2::http::Method;
use url::form_urlencoded;
// self
use crate::{
	_prelude::*,
	auth::{
		AccessToken, DriverInfo, ProviderIdentity, ScopeList, TokenFieldNames, TokenGrant, TokenResponse,
		User, UserProfile,
	},
	config::{ProviderConfig, ProviderKind},
	error::ConfigError,
	http::{self, HttpTransport, ProviderResponse, QueryEncoding, QueryFields},
	obs::{self, FlowOutcome, FlowSpan, FlowStage},
};

/// Boxed future returned by driver operations.
pub type DriverFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// Configuration and per-flow settings shared by every driver.
#[derive(Clone)]
pub struct DriverCore {
	kind: ProviderKind,
	config: ProviderConfig,
	redirect_url: Option<String>,
	scopes: ScopeList,
	state: Option<String>,
	parameters: QueryFields,
	transport: Arc<dyn HttpTransport>,
}
impl DriverCore {
	/// Validates `config` and applies the provider's default scopes when none are configured.
	pub fn new(kind: ProviderKind, config: ProviderConfig, default_scopes: &[&str]) -> Result<Self> {
		config.validate(kind)?;

		let scopes = match &config.scopes {
			Some(scopes) => ScopeList::new(scopes.iter().map(String::as_str)),
			None => ScopeList::new(default_scopes.iter().copied()),
		};
		let parameters = QueryFields::from_iter(config.parameters.clone());

		Ok(Self {
			kind,
			redirect_url: config.redirect_url.clone().filter(|url| !url.is_empty()),
			config,
			scopes,
			state: None,
			parameters,
			transport: http::default_transport(),
		})
	}

	/// Provider type.
	pub fn kind(&self) -> ProviderKind {
		self.kind
	}

	/// Validated configuration.
	pub fn config(&self) -> &ProviderConfig {
		&self.config
	}

	/// Application identifier.
	pub fn appid(&self) -> &str {
		&self.config.appid
	}

	/// Application secret.
	pub fn secret(&self) -> &str {
		&self.config.secret
	}

	/// Redirect URL currently in effect.
	pub fn redirect_url(&self) -> Option<&str> {
		self.redirect_url.as_deref()
	}

	/// Requested scopes.
	pub fn scopes(&self) -> &ScopeList {
		&self.scopes
	}

	/// Opaque state echoed by the provider.
	pub fn state(&self) -> Option<&str> {
		self.state.as_deref()
	}

	/// Extra authorize-endpoint parameters.
	pub fn parameters(&self) -> &QueryFields {
		&self.parameters
	}

	/// Snapshot attached to every [`User`] this driver builds.
	pub fn driver_info(&self) -> DriverInfo {
		DriverInfo { provider: self.kind, appid: self.config.appid.clone(), scopes: self.scopes.clone() }
	}

	/// Sets the opaque state.
	pub fn set_state(&mut self, state: impl Into<String>) {
		self.state = Some(state.into()).filter(|state| !state.is_empty());
	}

	/// Replaces the requested scopes.
	pub fn set_scopes(&mut self, scopes: ScopeList) {
		self.scopes = scopes;
	}

	/// Merges extra authorize parameters; later keys win.
	pub fn merge_parameters<I, K, V>(&mut self, parameters: I)
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		self.parameters.extend(parameters);
	}

	/// Overrides the redirect URL.
	pub fn set_redirect_url(&mut self, redirect_url: impl Into<String>) {
		self.redirect_url = Some(redirect_url.into()).filter(|url| !url.is_empty());
	}

	/// Replaces the HTTP transport.
	pub fn set_transport(&mut self, transport: Arc<dyn HttpTransport>) {
		self.transport = transport;
	}

	/// Parses a server-to-server endpoint, moving it onto `api_base` when one is configured.
	pub fn endpoint(&self, endpoint: &str) -> Result<Url> {
		let mut url = Url::parse(endpoint)
			.map_err(|source| ConfigError::InvalidEndpoint { url: endpoint.to_owned(), source })?;
		let Some(base) = &self.config.api_base else {
			return Ok(url);
		};
		let invalid = || ConfigError::InvalidApiBase { url: base.to_string() };

		url.set_scheme(base.scheme()).map_err(|_| invalid())?;
		url.set_host(base.host_str()).map_err(|_| invalid())?;
		url.set_port(base.port()).map_err(|_| invalid())?;

		Ok(url)
	}

	/// Sends a prepared request through the configured transport.
	pub async fn send(&self, request: oauth2::HttpRequest) -> Result<ProviderResponse> {
		Ok(self.transport.send(request).await?.into())
	}

	/// `GET endpoint?query`.
	pub async fn get(
		&self,
		endpoint: &str,
		query: &QueryFields,
		encoding: QueryEncoding,
		headers: &[(&str, &str)],
	) -> Result<ProviderResponse> {
		let url = query.append_to(&self.endpoint(endpoint)?, encoding)?;
		let mut all_headers = vec![("accept", "application/json")];

		all_headers.extend_from_slice(headers);

		self.send(http::build_request(Method::GET, &url, &all_headers, Vec::new())?).await
	}

	/// `POST endpoint` with a form-encoded body.
	pub async fn post_form(
		&self,
		endpoint: &str,
		fields: &QueryFields,
		encoding: QueryEncoding,
		content_type: &str,
	) -> Result<ProviderResponse> {
		let url = self.endpoint(endpoint)?;
		let headers = [("content-type", content_type), ("accept", "application/json")];

		self.send(http::build_request(
			Method::POST,
			&url,
			&headers,
			fields.encode(encoding).into_bytes(),
		)?)
		.await
	}

	/// `POST endpoint?query` with a JSON body.
	pub async fn post_json(
		&self,
		endpoint: &str,
		query: &QueryFields,
		body: &Value,
	) -> Result<ProviderResponse> {
		let url = query.append_to(&self.endpoint(endpoint)?, QueryEncoding::Rfc1738)?;
		let headers = [("content-type", "application/json"), ("accept", "application/json")];
		let body = serde_json::to_vec(body)
			.map_err(|e| Error::invalid_argument(format!("request body cannot be encoded: {e}")))?;

		self.send(http::build_request(Method::POST, &url, &headers, body)?).await
	}
}
impl Debug for DriverCore {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("DriverCore")
			.field("kind", &self.kind)
			.field("config", &self.config)
			.field("redirect_url", &self.redirect_url)
			.field("scopes", &self.scopes)
			.field("state", &self.state)
			.field("parameters", &self.parameters)
			.finish_non_exhaustive()
	}
}

/// Values the caller's web layer extracted from the inbound callback request.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackParams {
	/// Authorization code (`code`).
	#[serde(default)]
	pub code: Option<String>,
	/// Authorization code under Alipay's name (`auth_code`).
	#[serde(default)]
	pub auth_code: Option<String>,
	/// Echoed state.
	#[serde(default)]
	pub state: Option<String>,
	/// Access token for the bring-your-own-token flow.
	#[serde(default)]
	pub token: Option<String>,
	/// Refresh token for the bring-your-own-token flow.
	#[serde(default)]
	pub refresh_token: Option<String>,
	/// Token lifetime for the bring-your-own-token flow.
	#[serde(default)]
	pub expires_in: Option<String>,
	/// Open id for providers whose profile lookup needs one (Tencent Cloud).
	#[serde(default)]
	pub openid: Option<String>,
}
impl CallbackParams {
	/// Parses a raw query string (without `?`).
	pub fn from_query(query: &str) -> Self {
		let mut params = Self::default();

		for (key, value) in form_urlencoded::parse(query.trim_start_matches('?').as_bytes()) {
			let value = Some(value.into_owned());

			match key.as_ref() {
				"code" => params.code = value,
				"auth_code" => params.auth_code = value,
				"state" => params.state = value,
				"token" => params.token = value,
				"refresh_token" => params.refresh_token = value,
				"expires_in" => params.expires_in = value,
				"openid" => params.openid = value,
				_ => {},
			}
		}

		params
	}

	/// Returns `code`, falling back to `auth_code`; empty values count as absent.
	pub fn code(&self) -> Option<&str> {
		non_empty(&self.code).or_else(|| non_empty(&self.auth_code))
	}

	/// Returns the bring-your-own token, if present.
	pub fn token(&self) -> Option<&str> {
		non_empty(&self.token)
	}

	/// Token lifetime in seconds; `0` when absent or not an integer.
	pub fn expires_in_secs(&self) -> i64 {
		non_empty(&self.expires_in).and_then(|value| value.trim().parse().ok()).unwrap_or_default()
	}
}

/// `client_id`, `client_secret`, `code`, and `redirect_uri`, in that order.
pub fn oauth2_token_fields(core: &DriverCore, code: &str) -> QueryFields {
	let mut fields = QueryFields::new();

	fields
		.set("client_id", core.appid())
		.set("client_secret", core.secret())
		.set("code", code)
		.set("redirect_uri", core.redirect_url().unwrap_or_default());

	fields
}

fn authorization_url<D>(driver: &D, redirect_override: Option<&str>) -> Result<Url>
where
	D: ?Sized + Driver,
{
	let redirect_url =
		redirect_override.filter(|url| !url.is_empty()).or(driver.core().redirect_url());
	let fields = driver.code_fields(redirect_url)?;
	let endpoint = driver.authorize_endpoint();
	let base = Url::parse(endpoint)
		.map_err(|source| ConfigError::InvalidEndpoint { url: endpoint.to_owned(), source })?;
	let mut url = fields.append_to(&base, driver.query_encoding())?;

	url.set_fragment(driver.authorize_fragment());

	Ok(url)
}

fn non_empty(value: &Option<String>) -> Option<&str> {
	value.as_deref().filter(|value| !value.trim().is_empty())
}

/// Provider contract.
///
/// Implementors supply the required hooks; everything else has a default that matches the plain
/// OAuth 2.0 shape and can be overridden where a provider deviates from it.
pub trait Driver
where
	Self: Send + Sync,
{
	/// Shared configuration.
	fn core(&self) -> &DriverCore;

	/// Mutable access for builder methods.
	fn core_mut(&mut self) -> &mut DriverCore;

	/// Authorize endpoint the browser is sent to.
	fn authorize_endpoint(&self) -> &'static str;

	/// Exchanges a non-empty code for a token grant.
	fn request_token<'a>(&'a self, code: &'a str) -> DriverFuture<'a, TokenGrant>;

	/// Fetches the raw profile for a token.
	fn request_user<'a>(
		&'a self,
		token: &'a AccessToken,
		identity: &'a ProviderIdentity,
	) -> DriverFuture<'a, Map<String, Value>>;

	/// Renames raw profile fields into a [`UserProfile`].
	fn map_user(&self, raw: &Map<String, Value>, identity: &ProviderIdentity) -> UserProfile;

	/// Provider type.
	fn kind(&self) -> ProviderKind {
		self.core().kind()
	}

	/// Separator used to join scopes.
	fn scope_separator(&self) -> &'static str {
		" "
	}

	/// Space encoding of authorize and token query strings.
	fn query_encoding(&self) -> QueryEncoding {
		QueryEncoding::Rfc1738
	}

	/// Fragment appended to the authorize URL.
	fn authorize_fragment(&self) -> Option<&'static str> {
		None
	}

	/// Query fields sent to the authorize endpoint.
	fn code_fields(&self, redirect_url: Option<&str>) -> Result<QueryFields> {
		let core = self.core();
		let mut fields = QueryFields::new();

		fields
			.set("client_id", core.appid())
			.set("redirect_uri", redirect_url.unwrap_or_default())
			.set("scope", core.scopes().join(self.scope_separator()))
			.set("response_type", "code");
		fields.extend(core.parameters().clone());

		if let Some(state) = core.state() {
			fields.set("state", state);
		}

		Ok(fields)
	}

	/// Field names of the canonical token slots.
	fn token_field_names(&self) -> TokenFieldNames {
		TokenFieldNames::OAUTH2
	}

	/// Fields sent to the token endpoint.
	fn token_fields(&self, code: &str) -> QueryFields {
		oauth2_token_fields(self.core(), code)
	}

	/// Builds the authorization URL, optionally overriding the configured redirect URL.
	fn build_authorization_url(&self, redirect_override: Option<&str>) -> Result<Url> {
		let kind = self.kind();
		let _span = FlowSpan::new(kind, FlowStage::AuthorizeUrl).entered();

		obs::record_flow_outcome(kind, FlowStage::AuthorizeUrl, FlowOutcome::Attempt);

		let result = authorization_url(self, redirect_override);

		match &result {
			Ok(_) => obs::record_flow_outcome(kind, FlowStage::AuthorizeUrl, FlowOutcome::Success),
			Err(e) => {
				obs::record_failure(kind, FlowStage::AuthorizeUrl, e);
				obs::record_flow_outcome(kind, FlowStage::AuthorizeUrl, FlowOutcome::Failure);
			},
		}

		result
	}

	/// Exchanges `code` for a token grant.
	fn exchange_code_for_token<'a>(&'a self, code: &'a str) -> DriverFuture<'a, TokenGrant> {
		Box::pin(obs::observe(self.kind(), FlowStage::ExchangeCode, async move {
			if code.trim().is_empty() {
				return Err(Error::invalid_argument("code parameter cannot be empty"));
			}

			self.request_token(code).await
		}))
	}

	/// Fetches the raw profile for `token`.
	fn fetch_user_by_token<'a>(
		&'a self,
		token: &'a AccessToken,
		identity: &'a ProviderIdentity,
	) -> DriverFuture<'a, Map<String, Value>> {
		Box::pin(obs::observe(self.kind(), FlowStage::FetchUser, self.request_user(token, identity)))
	}

	/// Maps a raw profile into an undecorated [`User`]; no I/O.
	fn map_user_to_canonical(&self, raw: Map<String, Value>, identity: &ProviderIdentity) -> User {
		User::new(self.map_user(&raw, identity), raw, self.core().driver_info())
	}

	/// Fetches and maps the profile for `token`, attaching the token.
	fn build_user_from_token<'a>(
		&'a self,
		token: &'a AccessToken,
		identity: &'a ProviderIdentity,
	) -> DriverFuture<'a, User> {
		Box::pin(async move {
			let raw = self.fetch_user_by_token(token, identity).await?;

			Ok(self.map_user_to_canonical(raw, identity).with_token(token.clone()))
		})
	}

	/// Builds the user for an exchanged grant.
	///
	/// Grants without an access token fail here; drivers whose provider can vouch for an identity
	/// without issuing a token override this.
	fn build_user_from_grant<'a>(&'a self, grant: &'a TokenGrant) -> DriverFuture<'a, User> {
		Box::pin(async move {
			let Some(token) = grant.access_token() else {
				return Err(Error::authorize_failed("token exchange issued no access token", Value::Null));
			};

			self.build_user_from_token(token, &grant.identity).await
		})
	}

	/// Runs the whole authorization-code flow.
	fn authenticate_with_code<'a>(&'a self, code: &'a str) -> DriverFuture<'a, User> {
		Box::pin(async move {
			let grant = self.exchange_code_for_token(code).await?;
			let user = self.build_user_from_grant(&grant).await?;
			let TokenGrant { response, .. } = grant;
			let Some(response) = response else {
				return Ok(user);
			};

			Ok(user
				.with_refresh_token(response.refresh_token().map(str::to_owned))
				.with_expires_in(response.expires_in())
				.with_token_response(response))
		})
	}

	/// Runs the authorization-code flow with the code found in `params` (`code` or `auth_code`).
	fn authenticate_callback<'a>(&'a self, params: &'a CallbackParams) -> DriverFuture<'a, User> {
		Box::pin(async move {
			let code = params
				.code()
				.ok_or_else(|| Error::invalid_argument("code parameter cannot be empty"))?;

			self.authenticate_with_code(code).await
		})
	}

	/// Builds the user for a token the caller already holds (mobile SDK flow).
	fn authenticate_with_token<'a>(&'a self, params: &'a CallbackParams) -> DriverFuture<'a, User> {
		Box::pin(async move {
			let token = AccessToken::new(params.token().unwrap_or_default())
				.map_err(|_| Error::invalid_argument("token parameter cannot be empty"))?;
			let identity = params
				.openid
				.as_deref()
				.filter(|openid| !openid.is_empty())
				.map(ProviderIdentity::with_open_id)
				.unwrap_or_default();
			let user = self.build_user_from_token(&token, &identity).await?;

			Ok(user
				.with_refresh_token(params.refresh_token.clone())
				.with_expires_in(params.expires_in_secs()))
		})
	}

	/// Exchanges `code` and returns `target` carrying the token for a follow-up
	/// [`Driver::authenticate_with_token`] call.
	fn callback_url<'a>(&'a self, target: &'a str, code: &'a str) -> DriverFuture<'a, Url> {
		Box::pin(async move {
			let base = Url::parse(target)
				.map_err(|source| ConfigError::InvalidEndpoint { url: target.to_owned(), source })?;
			let grant = self.exchange_code_for_token(code).await?;
			let mut fields = QueryFields::new();

			if let Some(response) = &grant.response {
				fields.set("token", response.access_token().as_str());

				if let Some(refresh_token) = response.refresh_token() {
					fields.set("refresh_token", refresh_token);
				}

				fields
					.set("expires_in", response.expires_in().to_string())
					.set("type", response.token_type());
			} else {
				fields.set("type", TokenResponse::DEFAULT_TOKEN_TYPE);
			}

			if let Some(openid) = &grant.identity.open_id {
				fields.set("openid", openid.as_str());
			}

			fields.append_to(&base, self.query_encoding())
		})
	}

	/// Sets the opaque state sent to the authorize endpoint.
	fn with_state(mut self, state: impl Into<String>) -> Self
	where
		Self: Sized,
	{
		self.core_mut().set_state(state);

		self
	}

	/// Replaces the requested scopes.
	fn with_scopes<I, S>(mut self, scopes: I) -> Self
	where
		Self: Sized,
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.core_mut().set_scopes(ScopeList::new(scopes));

		self
	}

	/// Merges extra authorize parameters.
	fn with_parameters<I, K, V>(mut self, parameters: I) -> Self
	where
		Self: Sized,
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		self.core_mut().merge_parameters(parameters);

		self
	}

	/// Overrides the redirect URL.
	fn with_redirect_url(mut self, redirect_url: impl Into<String>) -> Self
	where
		Self: Sized,
	{
		self.core_mut().set_redirect_url(redirect_url);

		self
	}

	/// Replaces the HTTP transport.
	fn with_transport(mut self, transport: Arc<dyn HttpTransport>) -> Self
	where
		Self: Sized,
	{
		self.core_mut().set_transport(transport);

		self
	}
}
