//! Client info blob appended by the server to authorization responses.

// self
use crate::{_prelude::*, crypto::Crypto};

/// Decoded `client_info` payload identifying the home account.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
	/// Object id of the user in the home tenant.
	#[serde(default)]
	pub uid: String,
	/// Home tenant id.
	#[serde(default)]
	pub utid: String,
}
impl ClientInfo {
	/// Decodes a base64url JSON blob into a [`ClientInfo`].
	pub fn parse(raw: &str, crypto: &dyn Crypto) -> Result<Self> {
		build_client_info(raw, crypto)
	}

	/// Home account identifier, empty unless both ids are present.
	pub fn home_account_identifier(&self, crypto: &dyn Crypto) -> String {
		home_account_identifier(&self.uid, &self.utid, crypto)
	}
}

/// Decodes a raw `client_info` value.
///
/// Empty input fails with [`ErrorKind::ClientInfoEmpty`]; anything that does not decode to
/// a JSON object fails with [`ErrorKind::ClientInfoDecoding`].
pub fn build_client_info(raw: &str, crypto: &dyn Crypto) -> Result<ClientInfo> {
	if raw.trim().is_empty() {
		return Err(ErrorKind::ClientInfoEmpty.into());
	}

	let decoded = crypto
		.base64_decode(raw)
		.map_err(|e| Error::with_detail(ErrorKind::ClientInfoDecoding, e.to_string()))?;

	serde_json::from_str(&decoded)
		.map_err(|e| Error::with_detail(ErrorKind::ClientInfoDecoding, e.to_string()).with_source(e))
}

/// Joins base64-encoded uid and utid, or returns an empty string when either is missing.
pub fn home_account_identifier(uid: &str, utid: &str, crypto: &dyn Crypto) -> String {
	if uid.is_empty() || utid.is_empty() {
		return String::new();
	}

	format!("{}.{}", crypto.base64_encode(uid), crypto.base64_encode(utid))
}
