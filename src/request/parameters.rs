//! Request parameters supplied by callers.

// self
use crate::{_prelude::*, auth::Account};

/// `prompt` values accepted by the authorization endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Prompt {
	/// Forces credential entry.
	Login,
	/// Shows the account picker.
	SelectAccount,
	/// Forces the consent screen.
	Consent,
	/// Fails instead of showing UI.
	None,
}
impl Prompt {
	/// Wire value.
	pub const fn as_str(self) -> &'static str {
		match self {
			Prompt::Login => "login",
			Prompt::SelectAccount => "select_account",
			Prompt::Consent => "consent",
			Prompt::None => "none",
		}
	}
}
impl Display for Prompt {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for Prompt {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self> {
		match s {
			"login" => Ok(Prompt::Login),
			"select_account" => Ok(Prompt::SelectAccount),
			"consent" => Ok(Prompt::Consent),
			"none" => Ok(Prompt::None),
			other => Err(Error::with_detail(ErrorKind::InvalidPrompt, format!("Given value: {other}"))),
		}
	}
}

/// Parameters for [`create_login_url`](crate::flows::AuthorizationCodeModule::create_login_url)
/// and [`create_acquire_token_url`](crate::flows::AuthorizationCodeModule::create_acquire_token_url).
#[derive(Clone, Debug, Default)]
pub struct AuthenticationParameters {
	/// Requested scopes.
	pub scopes: Option<Vec<String>>,
	/// Legacy resource the token should target.
	pub resource: Option<String>,
	/// Authority overriding the configured one.
	pub authority: Option<String>,
	/// Caller state echoed back after the redirect.
	pub state: Option<String>,
	/// Correlation id; a GUID is generated when absent.
	pub correlation_id: Option<String>,
	/// Account the request is made for.
	pub account: Option<Account>,
	/// Session id hint.
	pub sid: Option<String>,
	/// Username hint.
	pub login_hint: Option<String>,
	/// Prompt behavior.
	pub prompt: Option<Prompt>,
	/// Claims request as a JSON string.
	pub claims_request: Option<String>,
	/// Extra query parameters appended verbatim.
	pub extra_query_parameters: BTreeMap<String, String>,
}
impl AuthenticationParameters {
	/// Creates an empty request.
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the requested scopes.
	pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.scopes = Some(scopes.into_iter().map(Into::into).collect());

		self
	}

	/// Sets the legacy resource.
	pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
		self.resource = Some(resource.into());

		self
	}

	/// Overrides the authority.
	pub fn with_authority(mut self, authority: impl Into<String>) -> Self {
		self.authority = Some(authority.into());

		self
	}

	/// Sets the caller state.
	pub fn with_state(mut self, state: impl Into<String>) -> Self {
		self.state = Some(state.into());

		self
	}

	/// Sets the correlation id.
	pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
		self.correlation_id = Some(correlation_id.into());

		self
	}

	/// Sets the account.
	pub fn with_account(mut self, account: Account) -> Self {
		self.account = Some(account);

		self
	}

	/// Sets the session id hint.
	pub fn with_sid(mut self, sid: impl Into<String>) -> Self {
		self.sid = Some(sid.into());

		self
	}

	/// Sets the username hint.
	pub fn with_login_hint(mut self, login_hint: impl Into<String>) -> Self {
		self.login_hint = Some(login_hint.into());

		self
	}

	/// Sets the prompt behavior.
	pub fn with_prompt(mut self, prompt: Prompt) -> Self {
		self.prompt = Some(prompt);

		self
	}

	/// Sets the claims request.
	pub fn with_claims_request(mut self, claims: impl Into<String>) -> Self {
		self.claims_request = Some(claims.into());

		self
	}

	/// Adds one extra query parameter.
	pub fn with_extra_query_parameter(
		mut self,
		key: impl Into<String>,
		value: impl Into<String>,
	) -> Self {
		self.extra_query_parameters.insert(key.into(), value.into());

		self
	}

	/// Returns true when the caller supplied an account, `sid`, or `login_hint`.
	pub fn is_sso_param(&self) -> bool {
		self.account.is_some() || self.sid.is_some() || self.login_hint.is_some()
	}

	/// Rejects a claims request that is not valid JSON.
	pub fn validate_claims_request(&self) -> Result<()> {
		let Some(claims) = self.claims_request.as_deref() else {
			return Ok(());
		};

		serde_json::from_str::<serde_json::Value>(claims).map(|_| ()).map_err(|e| {
			Error::with_detail(ErrorKind::ClaimsRequestParsing, e.to_string()).with_source(e)
		})
	}
}

/// Parameters for [`get_valid_token`](crate::flows::AuthorizationCodeModule::get_valid_token).
#[derive(Clone, Debug, Default)]
pub struct TokenRenewParameters {
	/// Requested scopes.
	pub scopes: Option<Vec<String>>,
	/// Legacy resource filter.
	pub resource: Option<String>,
	/// Authority overriding the configured one.
	pub authority: Option<String>,
	/// Account whose tokens are looked up.
	pub account: Option<Account>,
	/// Correlation id.
	pub correlation_id: Option<String>,
}
impl TokenRenewParameters {
	/// Creates a request for `scopes`.
	pub fn new<I, S>(scopes: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self { scopes: Some(scopes.into_iter().map(Into::into).collect()), ..Default::default() }
	}

	/// Sets the resource filter.
	pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
		self.resource = Some(resource.into());

		self
	}

	/// Overrides the authority.
	pub fn with_authority(mut self, authority: impl Into<String>) -> Self {
		self.authority = Some(authority.into());

		self
	}

	/// Sets the account filter.
	pub fn with_account(mut self, account: Account) -> Self {
		self.account = Some(account);

		self
	}
}

/// Token exchange inputs cached between the authorization request and the code exchange.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenExchangeParameters {
	/// Scopes as the caller requested them.
	pub scopes: Vec<String>,
	/// PKCE verifier.
	pub code_verifier: String,
	/// Canonical authority the code was requested from.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub authority: Option<String>,
	/// Correlation id of the request.
	pub correlation_id: String,
	/// Legacy resource.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub resource: Option<String>,
	/// Extra query parameters of the request.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub extra_query_parameters: Option<BTreeMap<String, String>>,
}
impl TokenExchangeParameters {
	/// Parses the cached JSON form.
	///
	/// Failures map to [`ErrorKind::TokenRequestCache`] naming the offending path.
	pub fn from_cache_value(raw: &str) -> Result<Self> {
		let mut deserializer = serde_json::Deserializer::from_str(raw);

		serde_path_to_error::deserialize(&mut deserializer).map_err(|e| {
			Error::with_detail(
				ErrorKind::TokenRequestCache,
				format!("Cached request is invalid at {}: {}.", e.path(), e.inner()),
			)
			.with_source(e)
		})
	}

	/// JSON form stored in the cache.
	pub fn to_cache_value(&self) -> Result<String> {
		serde_json::to_string(self).map_err(|e| {
			Error::with_detail(ErrorKind::TokenRequestCache, e.to_string()).with_source(e)
		})
	}
}
impl Debug for TokenExchangeParameters {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenExchangeParameters")
			.field("scopes", &self.scopes)
			.field("code_verifier", &"<redacted>")
			.field("authority", &self.authority)
			.field("correlation_id", &self.correlation_id)
			.field("resource", &self.resource)
			.field("extra_query_parameters", &self.extra_query_parameters)
			.finish()
	}
}
