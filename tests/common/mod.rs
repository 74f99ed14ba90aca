//! Shared fixtures for integration tests.

#![allow(dead_code)]

// std
use std::{collections::VecDeque, sync::Arc};
// crates.io
use httpmock::MockServer;
use oauth2_third::{
	config::ProviderConfig,
	error::{Error, TransportError},
	http::{HttpTransport, TransportFuture},
	oauth2::{HttpRequest, HttpResponse, http::StatusCode},
	url::Url,
};
use parking_lot::Mutex;

/// Provider config whose server-to-server calls land on `server` over plain HTTP.
///
/// `base_url` would report `https` once httpmock's TLS support is compiled in, and the mock
/// server's certificate is not trusted by the default transport.
pub fn mock_config(server: &MockServer, appid: &str, secret: &str) -> ProviderConfig {
	let base = mock_base(server);

	ProviderConfig::new(appid, secret).with_redirect_url("https://cb").with_api_base(base)
}

/// Plain-HTTP base URL of `server`.
pub fn mock_base(server: &MockServer) -> Url {
	Url::parse(&format!("http://{}", server.address())).expect("Mock server address should parse.")
}

/// Canned reply replayed by [`RecordingTransport`].
#[derive(Clone, Debug)]
pub enum Reply {
	/// HTTP response with a status and body.
	Body(u16, String),
	/// Transport-level failure.
	Fail(&'static str),
}

/// What [`RecordingTransport`] saw of one request.
#[derive(Clone, Debug)]
pub struct Recorded {
	pub method: String,
	pub url: Url,
	pub headers: Vec<(String, String)>,
	pub body: String,
}
impl Recorded {
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers
			.iter()
			.find(|(key, _)| key.eq_ignore_ascii_case(name))
			.map(|(_, value)| value.as_str())
	}

	pub fn query(&self, key: &str) -> Option<String> {
		self.url.query_pairs().find(|(k, _)| k == key).map(|(_, value)| value.into_owned())
	}
}

/// In-memory transport that records every request and replays canned replies in order.
#[derive(Debug, Default)]
pub struct RecordingTransport {
	replies: Mutex<VecDeque<Reply>>,
	requests: Mutex<Vec<Recorded>>,
}
impl RecordingTransport {
	pub fn new<I>(replies: I) -> Arc<Self>
	where
		I: IntoIterator<Item = Reply>,
	{
		Arc::new(Self { replies: Mutex::new(replies.into_iter().collect()), ..Default::default() })
	}

	pub fn json(status: u16, body: serde_json::Value) -> Reply {
		Reply::Body(status, body.to_string())
	}

	pub fn requests(&self) -> Vec<Recorded> {
		self.requests.lock().clone()
	}
}
impl HttpTransport for RecordingTransport {
	fn send(&self, request: HttpRequest) -> TransportFuture<'_> {
		self.requests.lock().push(Recorded {
			method: request.method().to_string(),
			url: Url::parse(&request.uri().to_string()).expect("Request URI should be absolute."),
			headers: request
				.headers()
				.iter()
				.map(|(name, value)| {
					(name.to_string(), value.to_str().unwrap_or_default().to_owned())
				})
				.collect(),
			body: String::from_utf8_lossy(request.body()).into_owned(),
		});

		let reply = self.replies.lock().pop_front();

		Box::pin(async move {
			match reply {
				Some(Reply::Body(status, body)) => {
					let mut response = HttpResponse::new(body.into_bytes());

					*response.status_mut() =
						StatusCode::from_u16(status).expect("Fixture status should be valid.");

					Ok(response)
				},
				Some(Reply::Fail(message)) =>
					Err(Error::Transport(TransportError::Other { message: message.into() })),
				None => Err(Error::Transport(TransportError::Other {
					message: "no canned reply left".into(),
				})),
			}
		})
	}
}
