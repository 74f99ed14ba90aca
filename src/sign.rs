//! Pure signing primitives used by providers that authenticate API calls cryptographically.
//!
//! [`rsa2`] covers Alipay's SHA256withRSA over a canonical parameter string, [`tc3`] covers
//! Tencent Cloud's TC3-HMAC-SHA256 key chain, and [`hmac_base64`] covers DingTalk's timestamp
//! signature. Nothing in here performs I/O.

pub mod rsa2;
pub mod tc3;

// crates.io
use base64::{Engine, engine::general_purpose::STANDARD};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
// self
use crate::{_prelude::*, error::ConfigError};

type HmacSha256 = Hmac<Sha256>;

/// Computes `HMAC-SHA256(data, key)`.
pub fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>, ConfigError> {
	let mut mac = HmacSha256::new_from_slice(key)
		.map_err(|e| ConfigError::Signing { reason: e.to_string() })?;

	mac.update(data);

	Ok(mac.finalize().into_bytes().to_vec())
}

/// Computes the base64-encoded `HMAC-SHA256(data, secret)`.
pub fn hmac_base64(data: &str, secret: &str) -> Result<String, ConfigError> {
	Ok(STANDARD.encode(hmac_sha256(secret.as_bytes(), data.as_bytes())?))
}

/// Lowercase hex SHA-256 digest.
pub fn sha256_hex(data: &[u8]) -> String {
	hex::encode(Sha256::digest(data))
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn hmac_base64_matches_known_vector() {
		assert_eq!(
			hmac_base64("1700000000000", "ding-secret").expect("HMAC should accept any key."),
			"ucN9yayZNGEqZwtUXwZgAROAAu37j6OvkljpXJTopZM="
		);
	}

	#[test]
	fn sha256_hex_of_empty_payload() {
		assert_eq!(
			sha256_hex(b""),
			"e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
		);
	}
}
