//! Signed-in account derived from an ID token and client info.

// self
use crate::{
	_prelude::*,
	auth::{ClientInfo, IdToken, IdTokenClaims, client_info},
	crypto::Crypto,
};

/// Immutable account value cached between requests.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
	/// `oid` claim, falling back to `sub`.
	pub account_identifier: String,
	/// `base64(uid).base64(utid)`, empty without client info.
	pub home_account_identifier: String,
	/// `preferred_username` claim.
	#[serde(default)]
	pub user_name: Option<String>,
	/// `name` claim.
	#[serde(default)]
	pub name: Option<String>,
	/// Raw ID token the account was built from.
	pub id_token: String,
	/// Decoded claims of [`id_token`](Self::id_token).
	pub id_token_claims: IdTokenClaims,
	/// `sid` claim.
	#[serde(default)]
	pub sid: Option<String>,
	/// Issuer of the ID token.
	#[serde(default)]
	pub environment: Option<String>,
}
impl Account {
	/// Builds an account from a decoded ID token and optional client info.
	pub fn create_account(
		id_token: &IdToken,
		client_info: Option<&ClientInfo>,
		crypto: &dyn Crypto,
	) -> Self {
		let claims = &id_token.claims;
		let home_account_identifier = client_info
			.map(|info| client_info::home_account_identifier(&info.uid, &info.utid, crypto))
			.unwrap_or_default();

		Self {
			account_identifier: claims.oid.clone().or_else(|| claims.sub.clone()).unwrap_or_default(),
			home_account_identifier,
			user_name: claims.preferred_username.clone(),
			name: claims.name.clone(),
			id_token: id_token.raw.clone(),
			id_token_claims: claims.clone(),
			sid: claims.sid.clone(),
			environment: claims.iss.clone(),
		}
	}

	/// Returns true when both accounts exist and share a non-empty home account id.
	pub fn compare_accounts(a: Option<&Account>, b: Option<&Account>) -> bool {
		match (a, b) {
			(Some(a), Some(b)) =>
				!a.home_account_identifier.is_empty()
					&& a.home_account_identifier == b.home_account_identifier,
			_ => false,
		}
	}
}
