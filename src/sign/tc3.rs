//! Tencent Cloud `TC3-HMAC-SHA256` request signatures.
//!
//! The signature covers a canonical request (method, sorted query, the `content-type` and `host`
//! headers, and the payload digest) and is keyed by a chain derived from the secret key, the UTC
//! date, and the service name (the host's first DNS label).

// crates.io
use time::macros::format_description;
// self
use crate::{
	_prelude::*,
	error::ConfigError,
	http::{QueryEncoding, QueryFields},
	sign::{hmac_sha256, sha256_hex},
};

/// Algorithm label placed in the string to sign and the `Authorization` header.
pub const ALGORITHM: &str = "TC3-HMAC-SHA256";
/// Headers covered by the signature.
pub const SIGNED_HEADERS: &str = "content-type;host";
/// Content type every Tencent Cloud call is signed with.
pub const CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=utf-8";

/// Request attributes covered by the signature.
#[derive(Clone, Copy, Debug)]
pub struct Tc3Request<'a> {
	/// HTTP method, uppercase.
	pub method: &'a str,
	/// Host header value.
	pub host: &'a str,
	/// Already-sorted, already-encoded query string (without `?`).
	pub query: &'a str,
	/// Request body; empty for GET.
	pub payload: &'a [u8],
	/// Content-Type header value.
	pub content_type: &'a str,
	/// Unix timestamp in seconds.
	pub timestamp: i64,
}

/// Signing credential pair.
#[derive(Clone, Copy)]
pub struct Tc3Credential<'a> {
	/// SecretId, or a temporary `TmpSecretId`.
	pub secret_id: &'a str,
	/// SecretKey, or a temporary `TmpSecretKey`.
	pub secret_key: &'a str,
}
impl Debug for Tc3Credential<'_> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Tc3Credential")
			.field("secret_id", &self.secret_id)
			.field("secret_key", &"<redacted>")
			.finish()
	}
}

/// Output of [`sign`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tc3Signature {
	/// `YYYY-MM-DD` in UTC.
	pub date: String,
	/// Service name taken from the host.
	pub service: String,
	/// `date/service/tc3_request`.
	pub credential_scope: String,
	/// Lowercase hex signature.
	pub signature: String,
	/// Full `Authorization` header value.
	pub authorization: String,
}

/// Returns the service name: the first DNS label of `host`.
pub fn service_from_host(host: &str) -> &str {
	host.split('.').next().unwrap_or(host)
}

/// Formats the UTC calendar date of `timestamp` as `YYYY-MM-DD`.
pub fn credential_date(timestamp: i64) -> Result<String, ConfigError> {
	let at = OffsetDateTime::from_unix_timestamp(timestamp)
		.map_err(|e| ConfigError::Signing { reason: e.to_string() })?;

	at.format(format_description!("[year]-[month]-[day]"))
		.map_err(|e| ConfigError::Signing { reason: e.to_string() })
}

/// Builds the canonical request string.
pub fn canonical_request(
	method: &str,
	query: &str,
	content_type: &str,
	host: &str,
	payload: &[u8],
) -> String {
	format!(
		"{method}\n/\n{query}\ncontent-type:{content_type}\nhost:{host}\n\n{SIGNED_HEADERS}\n{}",
		sha256_hex(payload)
	)
}

/// Builds the string to sign.
pub fn string_to_sign(timestamp: i64, credential_scope: &str, canonical_request: &str) -> String {
	format!(
		"{ALGORITHM}\n{timestamp}\n{credential_scope}\n{}",
		sha256_hex(canonical_request.as_bytes())
	)
}

/// Derives `secretSigning` from the secret key, date, and service.
pub fn derive_signing_key(secret_key: &str, date: &str, service: &str) -> Result<Vec<u8>, ConfigError> {
	let secret_date = hmac_sha256(format!("TC3{secret_key}").as_bytes(), date.as_bytes())?;
	let secret_service = hmac_sha256(&secret_date, service.as_bytes())?;

	hmac_sha256(&secret_service, b"tc3_request")
}

/// Signs one request.
pub fn sign(request: &Tc3Request, credential: &Tc3Credential) -> Result<Tc3Signature, ConfigError> {
	let date = credential_date(request.timestamp)?;
	let service = service_from_host(request.host).to_owned();
	let credential_scope = format!("{date}/{service}/tc3_request");
	let canonical = canonical_request(
		request.method,
		request.query,
		request.content_type,
		request.host,
		request.payload,
	);
	let to_sign = string_to_sign(request.timestamp, &credential_scope, &canonical);
	let key = derive_signing_key(credential.secret_key, &date, &service)?;
	let signature = hex::encode(hmac_sha256(&key, to_sign.as_bytes())?);
	let authorization = format!(
		"{ALGORITHM} Credential={}/{credential_scope}, SignedHeaders={SIGNED_HEADERS}, Signature={signature}",
		credential.secret_id
	);

	Ok(Tc3Signature { date, service, credential_scope, signature, authorization })
}

/// One signed `GET` call to a Tencent Cloud API; lives only as long as the call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedRequestContext {
	/// `X-TC-Action`.
	pub action: String,
	/// `X-TC-Version`.
	pub version: String,
	/// API host, such as `open.tencentcloudapi.com`.
	pub host: String,
	/// Unix timestamp in seconds (`X-TC-Timestamp`).
	pub timestamp: i64,
	/// Query fields, kept sorted.
	pub query: BTreeMap<String, String>,
	/// Request body; empty for GET.
	pub payload: String,
	/// Computed signature.
	pub signature: Tc3Signature,
}
impl SignedRequestContext {
	/// Signs a `GET https://{host}/?{query}` call.
	pub fn sign_get(
		action: impl Into<String>,
		version: impl Into<String>,
		host: impl Into<String>,
		query: BTreeMap<String, String>,
		credential: &Tc3Credential,
		timestamp: i64,
	) -> Result<Self, ConfigError> {
		let host = host.into();
		let query_string = encode_query(&query);
		let signature = sign(
			&Tc3Request {
				method: "GET",
				host: &host,
				query: &query_string,
				payload: b"",
				content_type: CONTENT_TYPE,
				timestamp,
			},
			credential,
		)?;

		Ok(Self {
			action: action.into(),
			version: version.into(),
			host,
			timestamp,
			query,
			payload: String::new(),
			signature,
		})
	}

	/// Query fields in signing order.
	pub fn query_fields(&self) -> QueryFields {
		QueryFields::from_iter(self.query.iter().map(|(key, value)| (key.clone(), value.clone())))
	}

	/// The exact query string covered by the signature.
	pub fn query_string(&self) -> String {
		encode_query(&self.query)
	}

	/// `date/service/tc3_request`.
	pub fn credential_scope(&self) -> &str {
		&self.signature.credential_scope
	}

	/// `Authorization` header value.
	pub fn authorization(&self) -> &str {
		&self.signature.authorization
	}
}

fn encode_query(query: &BTreeMap<String, String>) -> String {
	QueryFields::from_iter(query.iter().map(|(key, value)| (key.clone(), value.clone())))
		.encode(QueryEncoding::Rfc1738)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	const TIMESTAMP: i64 = 1_700_000_000;

	fn credential() -> Tc3Credential<'static> {
		Tc3Credential { secret_id: "SID", secret_key: "SKEY" }
	}

	#[test]
	fn derives_date_and_service() {
		assert_eq!(credential_date(TIMESTAMP).expect("Timestamp should format."), "2023-11-14");
		assert_eq!(service_from_host("open.tencentcloudapi.com"), "open");
		assert_eq!(service_from_host("sts.tencentcloudapi.com"), "sts");
		assert_eq!(service_from_host("localhost"), "localhost");
	}

	#[test]
	fn signing_key_is_scoped_to_the_service() {
		let open = derive_signing_key("SKEY", "2023-11-14", "open").expect("Key should derive.");
		let sts = derive_signing_key("SKEY", "2023-11-14", "sts").expect("Key should derive.");

		assert_eq!(
			hex::encode(&open),
			"2499fc50fce35cc8d9ed39b85e475a4a38d20b4c564b630b2acf299247a3b25f"
		);
		assert_eq!(
			hex::encode(&sts),
			"796c40549dc2246eca92b2ffbf69586123c1f3c548fe34bd3c1ab69a60207fd0"
		);
		assert_ne!(open, sts);
	}

	#[test]
	fn canonical_request_layout() {
		let canonical =
			canonical_request("GET", "UserAuthCode=code-1", CONTENT_TYPE, "open.tencentcloudapi.com", b"");

		assert_eq!(
			canonical,
			"GET\n/\nUserAuthCode=code-1\ncontent-type:application/x-www-form-urlencoded; charset=utf-8\nhost:open.tencentcloudapi.com\n\ncontent-type;host\ne3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
		);
		assert!(
			string_to_sign(TIMESTAMP, "2023-11-14/open/tc3_request", &canonical).starts_with(
				"TC3-HMAC-SHA256\n1700000000\n2023-11-14/open/tc3_request\n148723522cc7e921"
			)
		);
	}

	#[test]
	fn sign_is_deterministic_for_fixed_inputs() {
		let request = Tc3Request {
			method: "GET",
			host: "open.tencentcloudapi.com",
			query: "UserAuthCode=code-1",
			payload: b"",
			content_type: CONTENT_TYPE,
			timestamp: TIMESTAMP,
		};
		let first = sign(&request, &credential()).expect("Signing should succeed.");
		let again = sign(&request, &credential()).expect("Signing should succeed.");

		assert_eq!(first, again);
		assert_eq!(first.signature, "2eace014db12bf1ac59909fa20750b7ea92c06fc3f0b3dce7d7ef4e0568cc704");
		assert_eq!(
			first.authorization,
			"TC3-HMAC-SHA256 Credential=SID/2023-11-14/open/tc3_request, SignedHeaders=content-type;host, Signature=2eace014db12bf1ac59909fa20750b7ea92c06fc3f0b3dce7d7ef4e0568cc704"
		);
	}

	#[test]
	fn context_signs_the_sorted_query() {
		let query = BTreeMap::from([("UserAuthCode".to_owned(), "code-1".to_owned())]);
		let context = SignedRequestContext::sign_get(
			"GetUserAccessToken",
			"2018-12-25",
			"open.tencentcloudapi.com",
			query,
			&credential(),
			TIMESTAMP,
		)
		.expect("Context should sign.");

		assert_eq!(context.query_string(), "UserAuthCode=code-1");
		assert_eq!(context.credential_scope(), "2023-11-14/open/tc3_request");
		assert_eq!(
			context.signature.signature,
			"2eace014db12bf1ac59909fa20750b7ea92c06fc3f0b3dce7d7ef4e0568cc704"
		);
	}
}
