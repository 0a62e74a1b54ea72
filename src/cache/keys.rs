//! Cache key names and the access-token key/value records.

// self
use crate::{
	_prelude::*,
	auth::client_info,
	cache::RESOURCE_DELIM,
	crypto::Crypto,
	uri::UrlString,
};

/// Keys scoped to a single in-flight authorization request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TemporaryCacheKey {
	/// Canonical authority, suffixed with the request state.
	Authority,
	/// Account the request was started for, suffixed with its home account id.
	AcquireTokenAccount,
	/// State of the request in flight.
	RequestState,
	/// Nonce, suffixed with the request state.
	NonceIdToken,
	/// Page the request started from.
	OriginUri,
	/// Serialized token exchange parameters.
	RequestParams,
	/// Marker set while a popup or iframe interaction runs.
	InteractionStatus,
}
impl TemporaryCacheKey {
	/// Every temporary key.
	pub const ALL: [Self; 7] = [
		Self::Authority,
		Self::AcquireTokenAccount,
		Self::RequestState,
		Self::NonceIdToken,
		Self::OriginUri,
		Self::RequestParams,
		Self::InteractionStatus,
	];

	/// Storage key name.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Authority => "authority",
			Self::AcquireTokenAccount => "acquireToken.account",
			Self::RequestState => "request.state",
			Self::NonceIdToken => "nonce.idtoken",
			Self::OriginUri => "request.origin",
			Self::RequestParams => "request.params",
			Self::InteractionStatus => "interaction.status",
		}
	}

	/// Key name suffixed with `id`, e.g. `nonce.idtoken|{state}`.
	pub fn scoped(self, id: &str) -> String {
		format!("{}{RESOURCE_DELIM}{id}", self.as_str())
	}
}
impl Display for TemporaryCacheKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Single-slot keys that outlive one request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PersistentCacheKey {
	/// Last raw ID token.
	IdToken,
	/// Last raw client info blob.
	ClientInfo,
	/// ID token left behind by the legacy ADAL library.
	AdalIdToken,
	/// Last server error code.
	Error,
	/// Last server error description.
	ErrorDescription,
}
impl PersistentCacheKey {
	/// Every persistent key.
	pub const ALL: [Self; 5] =
		[Self::IdToken, Self::ClientInfo, Self::AdalIdToken, Self::Error, Self::ErrorDescription];

	/// Storage key name.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::IdToken => "idtoken",
			Self::ClientInfo => "client.info",
			Self::AdalIdToken => "adal.idtoken",
			Self::Error => "error",
			Self::ErrorDescription => "error.description",
		}
	}
}
impl Display for PersistentCacheKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Identity of a cached access token, stored as its JSON serialization.
///
/// Field order is part of the storage format.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessTokenKey {
	/// Canonical authority ending in `/`.
	pub authority: String,
	/// Client the token was issued to.
	pub client_id: String,
	/// Space-delimited scopes.
	pub scopes: String,
	/// Legacy resource the token targets.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub resource: Option<String>,
	/// Home account identifier of the owner.
	pub home_account_identifier: String,
}
impl AccessTokenKey {
	/// Builds a key, canonicalizing the authority and deriving the home account id.
	pub fn new(
		authority: &str,
		client_id: &str,
		scopes: &str,
		resource: Option<&str>,
		uid: &str,
		utid: &str,
		crypto: &dyn Crypto,
	) -> Result<Self> {
		Ok(Self {
			authority: UrlString::new(authority)?.as_str().to_owned(),
			client_id: client_id.to_owned(),
			scopes: scopes.to_owned(),
			resource: resource.map(str::to_owned),
			home_account_identifier: client_info::home_account_identifier(uid, utid, crypto),
		})
	}

	/// JSON string used as the storage key.
	pub fn to_cache_key(&self) -> Result<String> {
		serde_json::to_string(self)
			.map_err(|e| Error::with_detail(ErrorKind::CacheParse, e.to_string()).with_source(e))
	}

	/// Parses a storage key, returning `None` for keys of other families.
	pub fn from_cache_key(key: &str) -> Option<Self> {
		if !key.starts_with('{') {
			return None;
		}

		serde_json::from_str(key).ok()
	}
}

/// Token material cached under an [`AccessTokenKey`].
///
/// Expiry fields hold Unix seconds as strings, matching the storage format.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessTokenValue {
	/// Token type, usually `Bearer`.
	pub token_type: String,
	/// Access token.
	pub access_token: String,
	/// Raw ID token issued alongside.
	#[serde(default)]
	pub id_token: String,
	/// Refresh token.
	#[serde(default)]
	pub refresh_token: String,
	/// Expiry in Unix seconds.
	pub expires_on_sec: String,
	/// Extended expiry in Unix seconds.
	#[serde(default)]
	pub ext_expires_on_sec: String,
}
impl AccessTokenValue {
	/// Parsed expiry, `None` when the stored value is not a number.
	pub fn expires_on(&self) -> Option<i64> {
		self.expires_on_sec.trim().parse().ok()
	}
}
impl Debug for AccessTokenValue {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AccessTokenValue")
			.field("token_type", &self.token_type)
			.field("access_token", &"<redacted>")
			.field("id_token", &"<redacted>")
			.field("refresh_token", &"<redacted>")
			.field("expires_on_sec", &self.expires_on_sec)
			.field("ext_expires_on_sec", &self.ext_expires_on_sec)
			.finish()
	}
}

/// Key and value pair read back from the cache.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccessTokenCacheItem {
	/// Parsed key.
	pub key: AccessTokenKey,
	/// Parsed value.
	pub value: AccessTokenValue,
}
