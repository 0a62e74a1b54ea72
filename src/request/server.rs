//! Wire-facing authorization request and server payloads.

// crates.io
use serde::{Deserializer, de::Error as DeError};
// self
use crate::{
	_prelude::*,
	auth::{Account, IdToken, ScopeSet},
	authority::Authority,
	request::{AuthenticationParameters, Prompt},
	uri::UrlString,
};

/// `response_type` sent on every authorization request.
pub const CODE_RESPONSE_TYPE: &str = "code";
/// PKCE challenge method.
pub const S256_CODE_CHALLENGE_METHOD: &str = "S256";

const SID: &str = "sid";
const LOGIN_HINT: &str = "login_hint";
const DOMAIN_HINT: &str = "domain_hint";

/// Authorization request for one state, serialized into the navigation URL.
#[derive(Clone, Debug)]
pub struct ServerCodeRequestParameters {
	/// Authority whose authorization endpoint receives the request.
	pub authority: Arc<Authority>,
	/// Client identifier.
	pub client_id: String,
	/// Redirect URI.
	pub redirect_uri: String,
	/// Scopes sent on the wire.
	pub scopes: ScopeSet,
	/// Full request state.
	pub state: String,
	/// Nonce echoed in the ID token.
	pub nonce: String,
	/// Correlation id sent as `client-request-id`.
	pub correlation_id: String,
	/// PKCE challenge.
	pub code_challenge: String,
	/// Prompt behavior.
	pub prompt: Option<Prompt>,
	/// Claims request JSON.
	pub claims_request: Option<String>,
	/// SSO hint parameters (`sid`, `login_hint`).
	pub query_parameters: BTreeMap<String, String>,
	/// Caller-supplied parameters, after hint filtering.
	pub extra_query_parameters: BTreeMap<String, String>,
}
impl ServerCodeRequestParameters {
	/// Fills prompt, claims, SSO hints, and extra parameters.
	///
	/// Hints come from the caller's SSO fields when any is present. A cached ADAL ID token
	/// replaces them with its `upn`, if any. The account then fills `sid` or `login_hint` if
	/// still unset. `domain_hint` is dropped from the extra parameters on silent calls or
	/// when those extra parameters carry their own `sid`.
	pub fn populate_query_params(
		&mut self,
		account: Option<&Account>,
		request: Option<&AuthenticationParameters>,
		adal_id_token: Option<&IdToken>,
		silent: bool,
	) {
		let mut query_parameters = BTreeMap::new();

		if let Some(request) = request {
			if request.prompt.is_some() {
				self.prompt = request.prompt;
			}
			if request.claims_request.is_some() {
				self.claims_request.clone_from(&request.claims_request);
			}
			if request.is_sso_param() {
				query_parameters = sso_parameters_from_request(request);
			}
		}
		// A cached ADAL token replaces the request hints, with or without a `upn`.
		if let Some(id_token) = adal_id_token {
			query_parameters = BTreeMap::new();

			if let Some(upn) = id_token.claims.upn.as_deref() {
				add_sso_parameter(&mut query_parameters, LOGIN_HINT, upn);
			}
		}

		self.add_hint_parameters(account, &mut query_parameters);
		self.extra_query_parameters = request
			.map(|request| filter_extra_query_parameters(&request.extra_query_parameters, silent))
			.unwrap_or_default();
		self.query_parameters = query_parameters;
	}

	/// Builds the authorization endpoint URL carrying every request parameter.
	///
	/// Discovery must have completed on [`authority`](Self::authority).
	pub fn create_navigation_url(&self) -> Result<String> {
		let endpoint = self.authority.authorization_endpoint()?;
		let mut pairs = vec![
			("response_type", CODE_RESPONSE_TYPE.to_owned()),
			("scope", self.scopes.print_scopes()),
			("client_id", self.client_id.clone()),
			("redirect_uri", self.redirect_uri.clone()),
			("state", self.state.clone()),
			("nonce", self.nonce.clone()),
			("client_info", "1".to_owned()),
			("code_challenge", self.code_challenge.clone()),
			("code_challenge_method", S256_CODE_CHALLENGE_METHOD.to_owned()),
		];

		if let Some(prompt) = self.prompt {
			pairs.push(("prompt", prompt.as_str().to_owned()));
		}
		if let Some(claims) = &self.claims_request {
			pairs.push(("claims", claims.clone()));
		}

		let mut query = pairs
			.into_iter()
			.map(|(key, value)| format!("{key}={}", encode_component(&value)))
			.collect::<Vec<_>>();

		query.extend(
			self.query_parameters
				.iter()
				.chain(&self.extra_query_parameters)
				.map(|(key, value)| format!("{key}={}", encode_component(value))),
		);
		query.push(format!("client-request-id={}", encode_component(&self.correlation_id)));

		let separator = if endpoint.contains('?') { '&' } else { '?' };

		Ok(format!("{endpoint}{separator}{}", query.join("&")))
	}

	fn add_hint_parameters(&self, account: Option<&Account>, params: &mut BTreeMap<String, String>) {
		let Some(account) = account else {
			return;
		};

		if params.contains_key(SID) || params.contains_key(LOGIN_HINT) {
			return;
		}

		match (account.sid.as_deref(), account.user_name.as_deref()) {
			(Some(sid), _) if !sid.is_empty() && self.prompt == Some(Prompt::None) =>
				add_sso_parameter(params, SID, sid),
			(_, Some(user_name)) => add_sso_parameter(params, LOGIN_HINT, user_name),
			_ => {},
		}
	}
}

/// Parameters carried by an authorization redirect fragment.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ServerAuthorizationCodeResponse {
	/// Authorization code.
	pub code: Option<String>,
	/// Raw client info blob.
	pub client_info: Option<String>,
	/// Echoed state.
	pub state: Option<String>,
	/// Server error code.
	pub error: Option<String>,
	/// Server error description.
	pub error_description: Option<String>,
}
impl ServerAuthorizationCodeResponse {
	/// Parses a `#k=v&k=v` fragment or a full `href`.
	pub fn from_hash(hash: &str) -> Result<Self> {
		let mut params = UrlString::get_deserialized_hash(hash)?;

		Ok(Self {
			code: params.remove("code"),
			client_info: params.remove("client_info"),
			state: params.remove("state"),
			error: params.remove("error"),
			error_description: params.remove("error_description"),
		})
	}
}
impl Debug for ServerAuthorizationCodeResponse {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ServerAuthorizationCodeResponse")
			.field("code", &self.code.as_ref().map(|_| "<redacted>"))
			.field("client_info_present", &self.client_info.is_some())
			.field("state", &self.state)
			.field("error", &self.error)
			.field("error_description", &self.error_description)
			.finish()
	}
}

/// JSON body returned by the token endpoint.
#[derive(Clone, Deserialize)]
pub struct ServerAuthorizationTokenResponse {
	/// Token type.
	pub token_type: String,
	/// Space-delimited granted scopes.
	#[serde(default)]
	pub scope: Option<String>,
	/// Lifetime in seconds.
	#[serde(deserialize_with = "de_seconds")]
	pub expires_in: i64,
	/// Extended lifetime in seconds.
	#[serde(default, deserialize_with = "de_opt_seconds")]
	pub ext_expires_in: Option<i64>,
	/// Access token.
	pub access_token: String,
	/// Refresh token.
	#[serde(default)]
	pub refresh_token: Option<String>,
	/// ID token.
	#[serde(default)]
	pub id_token: Option<String>,
	/// Client info blob, when the endpoint returns one.
	#[serde(default)]
	pub client_info: Option<String>,
}
impl Debug for ServerAuthorizationTokenResponse {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ServerAuthorizationTokenResponse")
			.field("token_type", &self.token_type)
			.field("scope", &self.scope)
			.field("expires_in", &self.expires_in)
			.field("ext_expires_in", &self.ext_expires_in)
			.field("refresh_token_present", &self.refresh_token.is_some())
			.field("id_token_present", &self.id_token.is_some())
			.finish()
	}
}

/// Percent-encodes a query component the way `encodeURIComponent` does for the characters
/// an authorization request carries; spaces become `%20`.
pub fn encode_component(value: &str) -> String {
	url::form_urlencoded::byte_serialize(value.as_bytes()).collect::<String>().replace('+', "%20")
}

fn sso_parameters_from_request(request: &AuthenticationParameters) -> BTreeMap<String, String> {
	let mut params = BTreeMap::new();

	match &request.account {
		Some(account) =>
			if let Some(sid) = account.sid.as_deref().filter(|s| !s.is_empty()) {
				add_sso_parameter(&mut params, SID, sid);
			} else if let Some(user_name) = account.user_name.as_deref() {
				add_sso_parameter(&mut params, LOGIN_HINT, user_name);
			},
		None =>
			if let Some(sid) = request.sid.as_deref() {
				add_sso_parameter(&mut params, SID, sid);
			} else if let Some(login_hint) = request.login_hint.as_deref() {
				add_sso_parameter(&mut params, LOGIN_HINT, login_hint);
			},
	}

	params
}

fn add_sso_parameter(params: &mut BTreeMap<String, String>, key: &str, value: &str) {
	if !value.is_empty() {
		params.insert(key.to_owned(), value.to_owned());
	}
}

// `sid` cannot travel with `domain_hint`, and silent requests never carry one.
fn filter_extra_query_parameters(
	extra: &BTreeMap<String, String>,
	silent: bool,
) -> BTreeMap<String, String> {
	let has_sid = extra.contains_key(SID);

	extra
		.iter()
		.filter(|(key, _)| !(key.as_str() == DOMAIN_HINT && (silent || has_sid)))
		.map(|(key, value)| (key.clone(), value.clone()))
		.collect()
}

fn de_seconds<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
	D: Deserializer<'de>,
{
	de_opt_seconds(deserializer)?.ok_or_else(|| DeError::custom("Lifetime is missing."))
}

fn de_opt_seconds<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
	D: Deserializer<'de>,
{
	match <Option<serde_json::Value>>::deserialize(deserializer)? {
		None | Some(serde_json::Value::Null) => Ok(None),
		Some(serde_json::Value::Number(n)) =>
			n.as_i64().map(Some).ok_or_else(|| DeError::custom(format!("Invalid lifetime: {n}."))),
		Some(serde_json::Value::String(s)) =>
			s.trim().parse().map(Some).map_err(|_| DeError::custom(format!("Invalid lifetime: {s}."))),
		Some(other) => Err(DeError::custom(format!("Invalid lifetime: {other}."))),
	}
}
