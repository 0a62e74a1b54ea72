//! Compact ID token wrapper and decoded claims.
//!
//! Claims are decoded without signature verification; the token only feeds account
//! construction and nonce checks.

// crates.io
use serde::{Deserializer, de::Error as DeError};
// self
use crate::{_prelude::*, crypto::Crypto};

/// Claims decoded from an ID token payload.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct IdTokenClaims {
	/// Issuer.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub iss: Option<String>,
	/// Subject.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub sub: Option<String>,
	/// Object id of the user.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub oid: Option<String>,
	/// Tenant id.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub tid: Option<String>,
	/// Audience; the first entry when the token carries an array.
	#[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "de_opt_stringish")]
	pub aud: Option<String>,
	/// Expiry as Unix seconds, kept as a string.
	#[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "de_opt_stringish")]
	pub exp: Option<String>,
	/// Nonce echoed from the authorization request.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub nonce: Option<String>,
	/// Preferred username.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub preferred_username: Option<String>,
	/// Display name.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
	/// Session id.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub sid: Option<String>,
	/// User principal name issued by v1 endpoints.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub upn: Option<String>,
	/// Any claim not modeled above.
	#[serde(flatten)]
	pub extra: BTreeMap<String, serde_json::Value>,
}

/// Raw ID token plus its decoded claims.
#[derive(Clone, PartialEq)]
pub struct IdToken {
	/// Compact JWT as received.
	pub raw: String,
	/// Decoded payload.
	pub claims: IdTokenClaims,
}
impl IdToken {
	/// Decodes `raw`.
	///
	/// Empty input fails with [`ErrorKind::NullOrEmptyIdToken`]; a malformed token fails
	/// with [`ErrorKind::IdTokenParsing`].
	pub fn new(raw: &str, crypto: &dyn Crypto) -> Result<Self> {
		if raw.trim().is_empty() {
			return Err(Error::with_detail(ErrorKind::NullOrEmptyIdToken, "Raw ID token is empty."));
		}

		let claims = extract_id_token_claims(raw, crypto)?;

		Ok(Self { raw: raw.to_owned(), claims })
	}
}
impl Debug for IdToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("IdToken")
			.field("raw", &"<redacted>")
			.field("claims", &self.claims)
			.finish()
	}
}

/// Splits a compact JWT and decodes its payload into claims.
pub fn extract_id_token_claims(raw: &str, crypto: &dyn Crypto) -> Result<IdTokenClaims> {
	let payload = jwt_payload(raw).ok_or_else(|| {
		Error::with_detail(ErrorKind::IdTokenParsing, "Token is not a compact JWT.")
	})?;
	let decoded = crypto
		.base64_decode(payload)
		.map_err(|e| Error::with_detail(ErrorKind::IdTokenParsing, e.to_string()))?;

	serde_json::from_str(&decoded)
		.map_err(|e| Error::with_detail(ErrorKind::IdTokenParsing, e.to_string()).with_source(e))
}

// Header and signature may be empty (unsecured tokens); the payload may not.
fn jwt_payload(raw: &str) -> Option<&str> {
	let mut parts = raw.split('.');
	let (_header, payload, _signature) = (parts.next()?, parts.next()?, parts.next()?);

	if parts.next().is_some() || payload.is_empty() || raw.chars().any(char::is_whitespace) {
		return None;
	}

	Some(payload)
}

fn de_opt_stringish<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
	D: Deserializer<'de>,
{
	let value = <Option<serde_json::Value>>::deserialize(deserializer)?;

	match value {
		None | Some(serde_json::Value::Null) => Ok(None),
		Some(serde_json::Value::String(s)) => Ok(Some(s)),
		Some(serde_json::Value::Number(n)) => Ok(Some(n.to_string())),
		Some(serde_json::Value::Array(items)) => Ok(items.into_iter().find_map(|item| match item {
			serde_json::Value::String(s) => Some(s),
			_ => None,
		})),
		Some(other) => Err(DeError::custom(format!("Unexpected claim value: {other}."))),
	}
}
