//! Alipay `RSA2` signatures: SHA256withRSA over a sorted `key=value&...` string.

// crates.io
use base64::{Engine, engine::general_purpose::STANDARD};
use rsa::{
	RsaPrivateKey,
	pkcs1::DecodeRsaPrivateKey,
	pkcs1v15::SigningKey,
	pkcs8::DecodePrivateKey,
	signature::{SignatureEncoding, Signer},
};
use sha2::Sha256;
// self
use crate::{_prelude::*, error::ConfigError};

/// Builds the canonical signing input.
///
/// Keys are visited in ascending order and keys listed in `except` are skipped. Values are used
/// verbatim (no URL encoding).
pub fn canonical_string(fields: &BTreeMap<String, String>, except: &[&str]) -> String {
	fields
		.iter()
		.filter(|(key, _)| !except.contains(&key.as_str()))
		.map(|(key, value)| format!("{key}={value}"))
		.collect::<Vec<_>>()
		.join("&")
}

/// Decodes a private key given as bare base64 PKCS#1, or as a PEM block (PKCS#1 or PKCS#8).
pub fn load_private_key(key: &str) -> Result<RsaPrivateKey, ConfigError> {
	let key = key.trim();

	if key.is_empty() {
		return Err(ConfigError::MissingPrivateKey);
	}
	if key.contains("-----BEGIN") {
		return if key.contains("BEGIN PRIVATE KEY") {
			RsaPrivateKey::from_pkcs8_pem(key)
				.map_err(|e| ConfigError::InvalidPrivateKey { reason: e.to_string() })
		} else {
			RsaPrivateKey::from_pkcs1_pem(key)
				.map_err(|e| ConfigError::InvalidPrivateKey { reason: e.to_string() })
		};
	}

	let compact = key.split_whitespace().collect::<String>();
	let der = STANDARD
		.decode(compact)
		.map_err(|e| ConfigError::InvalidPrivateKey { reason: e.to_string() })?;

	RsaPrivateKey::from_pkcs1_der(&der)
		.or_else(|_| RsaPrivateKey::from_pkcs8_der(&der))
		.map_err(|e| ConfigError::InvalidPrivateKey { reason: e.to_string() })
}

/// Signs `content` with SHA256withRSA and returns the base64 signature.
pub fn sign(content: &str, private_key: &str) -> Result<String, ConfigError> {
	let signing_key = SigningKey::<Sha256>::new(load_private_key(private_key)?);
	let signature = signing_key
		.try_sign(content.as_bytes())
		.map_err(|e| ConfigError::Signing { reason: e.to_string() })?;

	Ok(STANDARD.encode(signature.to_bytes()))
}

/// Signs a field set, excluding `sign` from the canonical string.
pub fn sign_fields(fields: &BTreeMap<String, String>, private_key: &str) -> Result<String, ConfigError> {
	sign(&canonical_string(fields, &["sign"]), private_key)
}
