//! Values handed back to callers.

// self
use crate::{
	_prelude::*,
	auth::{Account, IdTokenClaims},
	cache::RESOURCE_DELIM,
};

/// Authorization code extracted from a redirect fragment.
#[derive(Clone, PartialEq, Eq)]
pub struct CodeResponse {
	/// Authorization code; `None` when the fragment carried none.
	pub code: Option<String>,
	/// Full echoed state, `{guid}` or `{guid}|{caller state}`.
	pub user_request_state: String,
}
impl CodeResponse {
	/// Caller portion of the state, empty when the caller supplied none.
	pub fn caller_state(&self) -> &str {
		split_request_state(&self.user_request_state).1
	}
}
impl Debug for CodeResponse {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CodeResponse")
			.field("code", &self.code.as_ref().map(|_| "<redacted>"))
			.field("user_request_state", &self.user_request_state)
			.finish()
	}
}

/// Tokens returned from a code exchange or a cache hit.
#[derive(Clone, PartialEq)]
pub struct TokenResponse {
	/// `oid` claim of the ID token, empty without one.
	pub unique_id: String,
	/// `tid` claim of the ID token, empty without one.
	pub tenant_id: String,
	/// Token type, usually `Bearer`.
	pub token_type: String,
	/// Raw ID token, empty without one.
	pub id_token: String,
	/// Decoded ID token claims.
	pub id_token_claims: Option<IdTokenClaims>,
	/// Access token.
	pub access_token: String,
	/// Refresh token, empty without one.
	pub refresh_token: String,
	/// Scopes the access token was granted for.
	pub scopes: Vec<String>,
	/// Expiry instant.
	pub expires_on: OffsetDateTime,
	/// Account built from the ID token.
	pub account: Option<Account>,
	/// Caller state with the GUID prefix removed.
	pub user_request_state: String,
}
impl Debug for TokenResponse {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenResponse")
			.field("unique_id", &self.unique_id)
			.field("tenant_id", &self.tenant_id)
			.field("token_type", &self.token_type)
			.field("id_token", &"<redacted>")
			.field("access_token", &"<redacted>")
			.field("refresh_token", &"<redacted>")
			.field("scopes", &self.scopes)
			.field("expires_on", &self.expires_on)
			.field("account", &self.account.as_ref().map(|a| &a.home_account_identifier))
			.field("user_request_state", &self.user_request_state)
			.finish()
	}
}

/// Splits `{guid}|{caller state}` at the first delimiter.
pub fn split_request_state(state: &str) -> (&str, &str) {
	state.split_once(RESOURCE_DELIM).unwrap_or((state, ""))
}
