//! Result of a code exchange, carried explicitly into the user-lookup step.

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, TokenResponse, field_str},
};

/// Provider-side identifiers learned during the code exchange.
///
/// Tencent Cloud reports `UserOpenId`/`UserUnionId` with the token; other providers leave both
/// empty and learn the identity from the profile call instead.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderIdentity {
	/// Per-application user identifier.
	pub open_id: Option<String>,
	/// Cross-application user identifier.
	pub union_id: Option<String>,
}
impl ProviderIdentity {
	/// Builds an identity from an already-known open id.
	pub fn with_open_id(open_id: impl Into<String>) -> Self {
		Self { open_id: Some(open_id.into()), union_id: None }
	}

	/// Reads both identifiers out of a raw payload.
	pub fn from_raw(raw: &Map<String, Value>, open_id_key: &str, union_id_key: &str) -> Self {
		Self { open_id: field_str(raw, open_id_key), union_id: field_str(raw, union_id_key) }
	}
}

/// Token response plus the identity it was issued for.
///
/// Tencent Cloud may vouch for the open id without issuing an access token; such a grant carries
/// the identity alone.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TokenGrant {
	/// Normalized token response, absent for identity-only grants.
	pub response: Option<TokenResponse>,
	/// Identifiers reported alongside the token.
	pub identity: ProviderIdentity,
}
impl TokenGrant {
	/// Wraps a response with an empty identity.
	pub fn new(response: TokenResponse) -> Self {
		Self { response: Some(response), identity: ProviderIdentity::default() }
	}

	/// Builds a grant that carries an identity but no token.
	pub fn identity_only(identity: ProviderIdentity) -> Self {
		Self { response: None, identity }
	}

	/// Attaches the identity reported with the token.
	pub fn with_identity(mut self, identity: ProviderIdentity) -> Self {
		self.identity = identity;

		self
	}

	/// Returns the access token, if one was issued.
	pub fn access_token(&self) -> Option<&AccessToken> {
		self.response.as_ref().map(TokenResponse::access_token)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn identity_only_grants_have_no_token() {
		let grant = TokenGrant::identity_only(ProviderIdentity::with_open_id("o1"));

		assert_eq!(grant.access_token(), None);
		assert_eq!(grant.identity.open_id.as_deref(), Some("o1"));

		let token = AccessToken::new("T").expect("Token is valid.");
		let grant = TokenGrant::new(TokenResponse::new(token)).with_identity(grant.identity);

		assert_eq!(grant.access_token().map(AccessToken::as_str), Some("T"));
	}
}
