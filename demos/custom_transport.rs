//! Plugs a non-reqwest HTTP stack into a driver.
//!
//! 1. Implement [`ProviderHttpClient`] so each call gets its own [`AsyncHttpClient`] handle.
//! 2. Provide a [`TransportErrorMapper`] that turns the stack's failures into crate errors.
//! 3. Wrap both in [`MappedTransport`] and hand it to [`Driver::with_transport`].

// std
use std::{
	error::Error as StdError,
	fmt::{Display, Formatter, Result as FmtResult},
	future::Future,
	pin::Pin,
	sync::Arc,
};
// crates.io
use color_eyre::Result;
// self
use oauth2_third::{
	config::ProviderConfig,
	driver::Driver,
	error::{Error, TransportError},
	http::{MappedTransport, ProviderHttpClient, TransportErrorMapper},
	oauth2::{AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse},
	provider::Gitee,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let config = ProviderConfig::new("gitee-demo", "gitee-secret")
		.with_redirect_url("https://app.example.com/login/gitee");
	let driver = Gitee::new(config.clone())?.with_transport(Arc::new(MappedTransport::new(
		MockHttpClient::default(),
		MockTransportErrorMapper,
	)));
	let user = driver.authenticate_with_code("demo-code").await?;

	println!("Signed in {} ({}) through the mock transport.", user.username(), user.id());

	let failing = Gitee::new(config.clone())?.with_transport(Arc::new(MappedTransport::new(
		MockHttpClient::transport_error(MockTransportError::DnsFailure { host: "gitee.com" }),
		MockTransportErrorMapper,
	)));

	match failing.authenticate_with_code("demo-code").await {
		Ok(_) => println!("Mock transport unexpectedly succeeded."),
		Err(e) => println!("Transport error mapped by the driver: {e}."),
	}

	let other = Gitee::new(config)?.with_transport(Arc::new(MappedTransport::new(
		MockHttpClient::other_error("upstream connection closed"),
		MockTransportErrorMapper,
	)));

	match other.exchange_code_for_token("demo-code").await {
		Ok(_) => println!("Mock transport unexpectedly produced a token."),
		Err(e) => println!("An HttpClientError::Other variant made it through the mapper: {e}."),
	}

	Ok(())
}

#[derive(Clone, Debug)]
enum MockTransportError {
	DnsFailure { host: &'static str },
}
impl Display for MockTransportError {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::DnsFailure { host } => write!(f, "DNS lookup failed for {host}"),
		}
	}
}
impl StdError for MockTransportError {}

#[derive(Clone)]
enum MockBehavior {
	Success,
	TransportError(MockTransportError),
	Other(&'static str),
}

#[derive(Clone)]
struct MockHttpClient {
	behavior: MockBehavior,
}
impl MockHttpClient {
	fn success() -> Self {
		Self { behavior: MockBehavior::Success }
	}

	fn transport_error(error: MockTransportError) -> Self {
		Self { behavior: MockBehavior::TransportError(error) }
	}

	fn other_error(message: &'static str) -> Self {
		Self { behavior: MockBehavior::Other(message) }
	}
}
impl Default for MockHttpClient {
	fn default() -> Self {
		Self::success()
	}
}
impl ProviderHttpClient for MockHttpClient {
	type Handle = MockHttpHandle;
	type TransportError = MockTransportError;

	fn handle(&self) -> Self::Handle {
		MockHttpHandle { behavior: self.behavior.clone() }
	}
}

struct MockHttpHandle {
	behavior: MockBehavior,
}
impl<'a> AsyncHttpClient<'a> for MockHttpHandle {
	type Error = HttpClientError<MockTransportError>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'a + Send + Sync>>;

	fn call(&'a self, request: HttpRequest) -> Self::Future {
		let behavior = self.behavior.clone();
		let path = request.uri().path().to_owned();

		Box::pin(async move {
			match behavior {
				MockBehavior::Success if path == "/oauth/token" => Ok(HttpResponse::new(
					b"{\"access_token\":\"mock-access\",\"token_type\":\"bearer\",\"expires_in\":86400}"
						.to_vec(),
				)),
				MockBehavior::Success => Ok(HttpResponse::new(
					b"{\"id\":42,\"login\":\"mock-user\",\"name\":\"Mock User\"}".to_vec(),
				)),
				// The oauth2 crate names the boxed-transport variant `Reqwest`, whatever the stack.
				MockBehavior::TransportError(error) => Err(HttpClientError::Reqwest(Box::new(error))),
				MockBehavior::Other(message) => Err(HttpClientError::Other(message.to_owned())),
			}
		})
	}
}

#[derive(Clone, Default)]
struct MockTransportErrorMapper;
impl TransportErrorMapper<MockTransportError> for MockTransportErrorMapper {
	fn map_transport_error(&self, error: HttpClientError<MockTransportError>) -> Error {
		match error {
			HttpClientError::Reqwest(inner) => TransportError::network(*inner).into(),
			HttpClientError::Other(message) => TransportError::Other { message }.into(),
			_ => TransportError::Other { message: "mock transport failure".into() }.into(),
		}
	}
}
