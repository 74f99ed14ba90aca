//! Transport primitives for provider calls.
//!
//! Drivers only ever see [`HttpTransport`], a dyn-safe "send a request, get status + body"
//! contract. Concrete stacks plug in through [`ProviderHttpClient`], which hands out short-lived
//! [`AsyncHttpClient`] handles, paired with a [`TransportErrorMapper`] that turns the stack's
//! failures into crate errors. [`MappedTransport`] glues the two together. Non-2xx responses are
//! not transport failures: providers put their error envelopes in the body, so drivers inspect it.

// std
#[cfg(feature = "reqwest")] use std::ops::Deref;
use std::vec::IntoIter;
// crates.io
use oauth2::{
	AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse,
	http::{Method, Request},
};
use serde::de::DeserializeOwned;
use url::form_urlencoded;
// self
use crate::{
	_prelude::*,
	auth::{TokenFieldNames, TokenPayload, TokenResponse},
	error::{ConfigError, TransportError},
};

/// Boxed future returned by [`HttpTransport::send`].
pub type TransportFuture<'a> = Pin<Box<dyn Future<Output = Result<HttpResponse>> + 'a + Send>>;

/// Dyn-safe HTTP transport used by every driver.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Sends `request` and resolves to the provider's response, whatever its status.
	fn send(&self, request: HttpRequest) -> TransportFuture<'_>;
}

/// Abstraction over HTTP stacks able to execute provider calls.
///
/// Implementations hand out [`AsyncHttpClient`] handles that own whatever state they need, so the
/// request futures stay `Send` for the lifetime of the call.
pub trait ProviderHttpClient
where
	Self: 'static + Send + Sync,
{
	/// Concrete error emitted by the underlying transport.
	type TransportError: 'static + Send + Sync + StdError;

	/// [`AsyncHttpClient`] handle used for one call.
	type Handle: for<'c> AsyncHttpClient<
			'c,
			Error = HttpClientError<Self::TransportError>,
			Future: 'c + Send,
		>
		+ 'static
		+ Send
		+ Sync;

	/// Builds a handle for one call.
	fn handle(&self) -> Self::Handle;
}

/// Maps HTTP transport failures into crate [`Error`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] emitted by the transport into a crate error.
	fn map_transport_error(&self, error: HttpClientError<E>) -> Error;
}

/// Default mapper for reqwest-backed transports.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
#[cfg(feature = "reqwest")]
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(&self, err: HttpClientError<ReqwestError>) -> Error {
		match err {
			HttpClientError::Reqwest(inner) if inner.is_builder() => ConfigError::from(*inner).into(),
			HttpClientError::Reqwest(inner) => TransportError::from(*inner).into(),
			HttpClientError::Http(inner) => ConfigError::from(inner).into(),
			HttpClientError::Io(inner) => TransportError::Io(inner).into(),
			HttpClientError::Other(message) => TransportError::Other { message }.into(),
			_ => TransportError::Other { message: "unclassified HTTP client failure".into() }.into(),
		}
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[cfg(feature = "reqwest")]
#[derive(Clone, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl ProviderHttpClient for ReqwestHttpClient {
	type Handle = ReqwestHandle;
	type TransportError = ReqwestError;

	fn handle(&self) -> Self::Handle {
		ReqwestHandle(self.0.clone())
	}
}

/// [`AsyncHttpClient`] handle returned by [`ReqwestHttpClient`].
#[cfg(feature = "reqwest")]
#[derive(Clone)]
pub struct ReqwestHandle(ReqwestClient);
#[cfg(feature = "reqwest")]
impl<'c> AsyncHttpClient<'c> for ReqwestHandle {
	type Error = HttpClientError<ReqwestError>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send + Sync>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		Box::pin(async move {
			let response =
				self.0.execute(request.try_into().map_err(Box::new)?).await.map_err(Box::new)?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let mut response_new =
				HttpResponse::new(response.bytes().await.map_err(Box::new)?.to_vec());

			*response_new.status_mut() = status;
			*response_new.headers_mut() = headers;

			Ok(response_new)
		})
	}
}

/// Pairs a [`ProviderHttpClient`] with its [`TransportErrorMapper`].
#[derive(Clone, Debug, Default)]
pub struct MappedTransport<C, M> {
	client: C,
	mapper: M,
}
impl<C, M> MappedTransport<C, M>
where
	C: ProviderHttpClient,
	M: TransportErrorMapper<C::TransportError>,
{
	/// Creates a transport from a client and its mapper.
	pub fn new(client: C, mapper: M) -> Self {
		Self { client, mapper }
	}
}
impl<C, M> HttpTransport for MappedTransport<C, M>
where
	C: ProviderHttpClient,
	M: TransportErrorMapper<C::TransportError>,
{
	fn send(&self, request: HttpRequest) -> TransportFuture<'_> {
		let handle = self.client.handle();

		Box::pin(async move {
			handle.call(request).await.map_err(|e| self.mapper.map_transport_error(e))
		})
	}
}

/// Transport used when no HTTP stack is compiled in.
#[derive(Clone, Copy, Debug, Default)]
pub struct UnconfiguredTransport;
impl HttpTransport for UnconfiguredTransport {
	fn send(&self, _: HttpRequest) -> TransportFuture<'_> {
		Box::pin(async { Err(ConfigError::MissingTransport.into()) })
	}
}

/// Returns the transport drivers use unless another one is supplied.
#[cfg(feature = "reqwest")]
pub fn default_transport() -> Arc<dyn HttpTransport> {
	Arc::new(MappedTransport::new(ReqwestHttpClient::default(), ReqwestTransportErrorMapper))
}
/// Returns the transport drivers use unless another one is supplied.
#[cfg(not(feature = "reqwest"))]
pub fn default_transport() -> Arc<dyn HttpTransport> {
	Arc::new(UnconfiguredTransport)
}

/// Space-encoding mode for query strings and form bodies.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum QueryEncoding {
	/// `application/x-www-form-urlencoded`: spaces become `+`.
	#[default]
	Rfc1738,
	/// Percent-encoding only: spaces become `%20`.
	Rfc3986,
}

/// Ordered query or form fields where a later write to an existing key replaces it in place.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryFields(Vec<(String, String)>);
impl QueryFields {
	/// Creates an empty field list.
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets `key`, replacing an existing value in place or appending a new pair.
	pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
		let key = key.into();
		let value = value.into();

		match self.0.iter_mut().find(|(existing, _)| *existing == key) {
			Some((_, slot)) => *slot = value,
			None => self.0.push((key, value)),
		}

		self
	}

	/// Sets `key` only when it is not present yet.
	pub fn set_if_absent(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
		let key = key.into();

		if !self.contains(&key) {
			self.0.push((key, value.into()));
		}

		self
	}

	/// Returns the value stored under `key`.
	pub fn get(&self, key: &str) -> Option<&str> {
		self.0.iter().find(|(existing, _)| existing == key).map(|(_, value)| value.as_str())
	}

	/// Returns `true` if `key` is present.
	pub fn contains(&self, key: &str) -> bool {
		self.0.iter().any(|(existing, _)| existing == key)
	}

	/// Removes `key` and returns its value.
	pub fn remove(&mut self, key: &str) -> Option<String> {
		let index = self.0.iter().position(|(existing, _)| existing == key)?;

		Some(self.0.remove(index).1)
	}

	/// Number of fields.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Returns `true` when no field is set.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Iterates the fields in insertion order.
	pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
		self.0.iter().map(|(key, value)| (key.as_str(), value.as_str()))
	}

	/// Encodes the fields as a query string (without `?`).
	pub fn encode(&self, encoding: QueryEncoding) -> String {
		let encoded = form_urlencoded::Serializer::new(String::new()).extend_pairs(&self.0).finish();

		match encoding {
			QueryEncoding::Rfc1738 => encoded,
			QueryEncoding::Rfc3986 => encoded.replace('+', "%20"),
		}
	}

	/// Returns `base` with the fields appended to its query.
	pub fn append_to(&self, base: &Url, encoding: QueryEncoding) -> Result<Url> {
		if self.is_empty() {
			return Ok(base.clone());
		}

		let encoded = self.encode(encoding);
		let mut url = base.clone();
		let query = match base.query() {
			Some(existing) if !existing.is_empty() => format!("{existing}&{encoded}"),
			_ => encoded,
		};

		url.set_query(Some(&query));

		Ok(url)
	}
}
impl<K, V> Extend<(K, V)> for QueryFields
where
	K: Into<String>,
	V: Into<String>,
{
	fn extend<I>(&mut self, iter: I)
	where
		I: IntoIterator<Item = (K, V)>,
	{
		for (key, value) in iter {
			self.set(key, value);
		}
	}
}
impl<K, V> FromIterator<(K, V)> for QueryFields
where
	K: Into<String>,
	V: Into<String>,
{
	fn from_iter<I>(iter: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
	{
		let mut fields = Self::new();

		fields.extend(iter);

		fields
	}
}
impl IntoIterator for QueryFields {
	type IntoIter = IntoIter<(String, String)>;
	type Item = (String, String);

	fn into_iter(self) -> Self::IntoIter {
		self.0.into_iter()
	}
}

/// Status and body of one provider response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderResponse {
	/// HTTP status code.
	pub status: u16,
	/// Raw body bytes.
	pub body: Vec<u8>,
}
impl ProviderResponse {
	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Body decoded as UTF-8, lossily.
	pub fn text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}

	/// Body decoded as JSON.
	pub fn json(&self) -> Result<Value> {
		serde_json::from_slice(&self.body)
			.map_err(|_| self.reject("provider response is not valid JSON", self.text()))
	}

	/// Body decoded as a JSON object.
	pub fn json_object(&self) -> Result<Map<String, Value>> {
		match self.json()? {
			Value::Object(map) => Ok(map),
			other => Err(self.reject("provider response is not a JSON object", other)),
		}
	}

	/// Decodes `value` into `T`, reporting the failing path.
	pub fn decode<T>(&self, value: &Value) -> Result<T>
	where
		T: DeserializeOwned,
	{
		serde_path_to_error::deserialize(value).map_err(|e| {
			self.reject(format!("provider response field `{}` is malformed", e.path()), value.clone())
		})
	}

	/// Normalizes `value` as a token response, attaching this response's status to failures.
	pub fn token(&self, value: impl Into<TokenPayload>, names: TokenFieldNames) -> Result<TokenResponse> {
		TokenResponse::normalize(value, names).map_err(|e| match e {
			Error::AuthorizeFailed { message, body, .. } => self.reject(message, body),
			other => other,
		})
	}

	/// Builds an [`Error::AuthorizeFailed`] carrying this response's status.
	pub fn reject(&self, message: impl Into<String>, body: impl Into<Value>) -> Error {
		Error::AuthorizeFailed { message: message.into(), status: Some(self.status), body: body.into() }
	}
}
impl From<HttpResponse> for ProviderResponse {
	fn from(value: HttpResponse) -> Self {
		Self { status: value.status().as_u16(), body: value.into_body() }
	}
}

/// Builds a request with the given headers and body.
pub fn build_request(
	method: Method,
	url: &Url,
	headers: &[(&str, &str)],
	body: Vec<u8>,
) -> Result<HttpRequest> {
	let mut builder = Request::builder().method(method).uri(url.as_str());

	for (name, value) in headers {
		builder = builder.header(*name, *value);
	}

	builder.body(body).map_err(|e| ConfigError::from(e).into())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn set_replaces_in_place() {
		let mut fields = QueryFields::new();

		fields.set("a", "1").set("b", "2").set("a", "3").set_if_absent("b", "4");

		assert_eq!(fields.iter().collect::<Vec<_>>(), vec![("a", "3"), ("b", "2")]);
		assert_eq!(fields.remove("a").as_deref(), Some("3"));
		assert!(!fields.contains("a"));
	}

	#[test]
	fn encodings_differ_only_in_spaces() {
		let fields = QueryFields::from_iter([("scope", "a b"), ("redirect_uri", "https://cb")]);

		assert_eq!(fields.encode(QueryEncoding::Rfc1738), "scope=a+b&redirect_uri=https%3A%2F%2Fcb");
		assert_eq!(fields.encode(QueryEncoding::Rfc3986), "scope=a%20b&redirect_uri=https%3A%2F%2Fcb");
	}

	#[test]
	fn append_keeps_existing_query() {
		let base = Url::parse("https://example.com/x?dataType=json").expect("Fixture URL is valid.");
		let url = QueryFields::from_iter([("k", "v")])
			.append_to(&base, QueryEncoding::Rfc1738)
			.expect("Query should append.");

		assert_eq!(url.as_str(), "https://example.com/x?dataType=json&k=v");
	}

	#[test]
	fn responses_reject_non_objects_with_status() {
		let response = ProviderResponse { status: 502, body: b"[1]".to_vec() };
		let err = response.json_object().expect_err("Arrays are not objects.");

		assert!(matches!(err, Error::AuthorizeFailed { status: Some(502), .. }));
		assert!(!response.is_success());
	}

	#[tokio::test]
	async fn unconfigured_transport_reports_missing_transport() {
		let request = build_request(
			Method::GET,
			&Url::parse("https://example.com").expect("Fixture URL is valid."),
			&[],
			Vec::new(),
		)
		.expect("Request should build.");
		let err = UnconfiguredTransport.send(request).await.expect_err("Send should fail.");

		assert!(matches!(err, Error::Config(ConfigError::MissingTransport)));
	}
}
