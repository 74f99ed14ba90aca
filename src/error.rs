//! Crate-level error types shared across drivers, signers, and the registry.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, IO).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Session backend failure.
	#[error("{0}")]
	Session(
		#[from]
		#[source]
		crate::session::SessionError,
	),

	/// A required call parameter was missing or empty.
	#[error("Invalid argument: {reason}.")]
	InvalidArgument {
		/// Human-readable description of the rejected argument.
		reason: String,
	},
	/// Provider rejected the call or answered with a payload the driver cannot use.
	#[error("Authorization failed: {message}.")]
	AuthorizeFailed {
		/// Provider- or driver-supplied summary.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Raw provider payload kept for diagnostics.
		body: Value,
	},
}
impl Error {
	/// Builds an [`Error::InvalidArgument`].
	pub fn invalid_argument(reason: impl Into<String>) -> Self {
		Self::InvalidArgument { reason: reason.into() }
	}

	/// Builds an [`Error::AuthorizeFailed`] without an HTTP status.
	pub fn authorize_failed(message: impl Into<String>, body: impl Into<Value>) -> Self {
		Self::AuthorizeFailed { message: message.into(), status: None, body: body.into() }
	}

	/// Returns the raw provider payload carried by [`Error::AuthorizeFailed`].
	pub fn provider_body(&self) -> Option<&Value> {
		match self {
			Self::AuthorizeFailed { body, .. } => Some(body),
			_ => None,
		}
	}
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// No HTTP transport is available for server-to-server calls.
	#[error("No HTTP transport is configured; enable the `reqwest` feature or supply one.")]
	MissingTransport,

	/// A mandatory configuration field is empty.
	#[error("Configuration field `{field}` cannot be empty.")]
	MissingField {
		/// Name of the missing field.
		field: &'static str,
	},
	/// The provider needs a redirect URL but none was configured.
	#[error("Provider `{provider}` requires a redirect URL matching its console settings.")]
	MissingRedirectUrl {
		/// Provider label.
		provider: &'static str,
	},
	/// Signing was requested without an RSA private key.
	#[error("No RSA private key is configured.")]
	MissingPrivateKey,
	/// The configured RSA private key cannot be decoded.
	#[error("RSA private key is invalid: {reason}.")]
	InvalidPrivateKey {
		/// Decoder failure summary.
		reason: String,
	},
	/// Signing primitive failed.
	#[error("Request signing failed: {reason}.")]
	Signing {
		/// Signer failure summary.
		reason: String,
	},
	/// A configured or derived URL cannot be parsed.
	#[error("Endpoint URL `{url}` is invalid.")]
	InvalidEndpoint {
		/// Offending URL text.
		url: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// The configured `api_base` cannot stand in for a provider origin.
	#[error("API base `{url}` cannot replace a provider origin.")]
	InvalidApiBase {
		/// Offending base URL.
		url: String,
	},
	/// Registry lookup found no such application or provider type.
	#[error("Unknown provider `{name}`.")]
	UnknownProvider {
		/// Requested name.
		name: String,
	},
	/// The provider deliberately does not support the requested operation.
	#[error("Provider `{provider}` does not support {operation}.")]
	Unsupported {
		/// Provider label.
		provider: &'static str,
		/// Operation label.
		operation: &'static str,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the provider.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the provider.")]
	Io(#[from] std::io::Error),
	/// Transport reported a failure it could not classify.
	#[error("HTTP client error occurred while calling the provider: {message}.")]
	Other {
		/// Transport-supplied description.
		message: String,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}
