//! Authorization code redemption at the token endpoint.

// crates.io
use oauth2::{AuthorizationCode, PkceCodeVerifier};
// self
use crate::{
	_prelude::*,
	auth::{Account, ClientInfo, IdToken, ScopeSet},
	cache::{
		AccessTokenCacheItem, AccessTokenKey, AccessTokenValue, PersistentCacheKey,
		TemporaryCacheKey,
	},
	flows::{AuthorizationCodeModule, common},
	http::NetworkRequestOptions,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	request::{
		CodeResponse, ServerAuthorizationTokenResponse, TokenExchangeParameters, TokenResponse,
		split_request_state,
	},
};

const AUTHORIZATION_CODE_GRANT: &str = "authorization_code";
const CLIENT_REQUEST_ID_HEADER: &str = "client-request-id";

impl AuthorizationCodeModule {
	/// Redeems the code of a validated fragment for tokens.
	///
	/// The pending request of the code's state is cleared on every outcome once a code is
	/// present. Tokens are cached under the granted scopes before returning.
	pub async fn acquire_token(&self, code_response: Option<&CodeResponse>) -> Result<TokenResponse> {
		const KIND: FlowKind = FlowKind::CodeExchange;

		let span = FlowSpan::new(KIND, "acquire_token");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let (code, state) = match code_response {
					Some(CodeResponse { code: Some(code), user_request_state }) if !code.is_empty() =>
						(code, user_request_state.as_str()),
					_ => return Err(ErrorKind::TokenRequestCannotBeMade.into()),
				};
				let result = self.exchange_code(code, state).await;

				self.cache.reset_temp_cache_items(state);

				result
			})
			.await;

		obs::record_flow_result(KIND, &result);

		result
	}

	async fn exchange_code(&self, code: &str, state: &str) -> Result<TokenResponse> {
		let raw_request = self.cache.get_temporary(TemporaryCacheKey::RequestParams).ok_or_else(|| {
			Error::with_detail(ErrorKind::TokenRequestCache, "No pending request is cached.")
		})?;
		let request = TokenExchangeParameters::from_cache_value(&raw_request)?;

		obs::record_correlation_id(&request.correlation_id);

		let authority_url = request
			.authority
			.clone()
			.or_else(|| self.cache.get_authority(state));
		let authority = self.resolve_authority(authority_url.as_deref()).await?;

		obs::record_authority(authority.canonical_authority());

		let token_endpoint = authority.token_endpoint()?;
		let requested = ScopeSet::for_acquire_token(Some(&request.scopes), self.config.client_id())?;
		let body = self.token_request_body(code, &request, &requested)?;
		let mut options = NetworkRequestOptions::form(body);

		options.headers.insert(CLIENT_REQUEST_ID_HEADER.into(), request.correlation_id.clone());

		#[cfg(feature = "tracing")]
		tracing::debug!(authority = authority.canonical_authority(), "Redeeming authorization code.");

		let response = match self.network.send_post_request(&token_endpoint, Some(options)).await {
			Ok(body) => serde_json::from_value::<ServerAuthorizationTokenResponse>(body).map_err(|e| {
				Error::with_detail(ErrorKind::Unexpected, format!("Token response is invalid: {e}."))
					.with_source(e)
			})?,
			Err(e) => {
				let err = common::map_token_endpoint_error(e);

				if let ErrorKind::Server { error, error_description } = &err.kind {
					self.cache.set_persistent(PersistentCacheKey::Error, error);
					self.cache.set_persistent(PersistentCacheKey::ErrorDescription, error_description);
				}

				return Err(err);
			},
		};

		self.save_token_response(response, &request, &requested, authority.canonical_authority(), state)
	}

	fn token_request_body(
		&self,
		code: &str,
		request: &TokenExchangeParameters,
		requested: &ScopeSet,
	) -> Result<String> {
		let code = AuthorizationCode::new(code.to_owned());
		let verifier = PkceCodeVerifier::new(request.code_verifier.clone());
		let redirect_uri = self.get_redirect_uri()?;
		let mut form = url::form_urlencoded::Serializer::new(String::new());

		form.append_pair("grant_type", AUTHORIZATION_CODE_GRANT)
			.append_pair("code", code.secret())
			.append_pair("code_verifier", verifier.secret())
			.append_pair("redirect_uri", &redirect_uri)
			.append_pair("client_id", self.config.client_id())
			.append_pair("scope", &requested.print_scopes());

		if let Some(extra) = &request.extra_query_parameters {
			form.extend_pairs(extra);
		}

		Ok(form.finish())
	}

	fn save_token_response(
		&self,
		response: ServerAuthorizationTokenResponse,
		request: &TokenExchangeParameters,
		requested: &ScopeSet,
		authority: &str,
		state: &str,
	) -> Result<TokenResponse> {
		let crypto = self.crypto.as_ref();
		let id_token = match response.id_token.as_deref().filter(|raw| !raw.is_empty()) {
			Some(raw) => Some(IdToken::new(raw, crypto)?),
			None => None,
		};

		if let Some(id_token) = &id_token {
			let cached_nonce = self.cache.get_nonce(state);

			if cached_nonce.is_none() || cached_nonce != id_token.claims.nonce {
				return Err(Error::with_detail(
					ErrorKind::NonceMismatch,
					format!(
						"Cached nonce: {}, token nonce: {}",
						cached_nonce.unwrap_or_default(),
						id_token.claims.nonce.as_deref().unwrap_or_default()
					),
				));
			}
		}

		let raw_client_info = response
			.client_info
			.clone()
			.or_else(|| self.cache.get_persistent(PersistentCacheKey::ClientInfo));
		let client_info = match raw_client_info.as_deref() {
			Some(raw) => Some(ClientInfo::parse(raw, crypto)?),
			None => None,
		};
		let account =
			id_token.as_ref().map(|token| Account::create_account(token, client_info.as_ref(), crypto));
		let granted = response
			.scope
			.as_deref()
			.map(ScopeSet::from_scope_string)
			.filter(|scopes| !scopes.is_empty())
			.unwrap_or_else(|| requested.clone());
		let now = self.clock.now();
		let expires_on = now + Duration::seconds(response.expires_in);
		let ext_expires_on = now + Duration::seconds(response.ext_expires_in.unwrap_or(response.expires_in));
		let (uid, utid) = client_info
			.as_ref()
			.map(|info| (info.uid.as_str(), info.utid.as_str()))
			.unwrap_or_default();
		let key = AccessTokenKey::new(
			authority,
			self.config.client_id(),
			&granted.normalized(),
			request.resource.as_deref(),
			uid,
			utid,
			crypto,
		)?;
		let value = AccessTokenValue {
			token_type: response.token_type.clone(),
			access_token: response.access_token.clone(),
			id_token: response.id_token.clone().unwrap_or_default(),
			refresh_token: response.refresh_token.clone().unwrap_or_default(),
			expires_on_sec: expires_on.unix_timestamp().to_string(),
			ext_expires_on_sec: ext_expires_on.unix_timestamp().to_string(),
		};

		self.cache.set_access_token(&AccessTokenCacheItem { key, value })?;

		if let Some(id_token) = &id_token {
			self.cache.set_persistent(PersistentCacheKey::IdToken, &id_token.raw);
		}
		if let Some(raw) = raw_client_info.as_deref() {
			self.cache.set_persistent(PersistentCacheKey::ClientInfo, raw);
		}
		if account.is_some() {
			self.set_account(account.clone());
		}

		let claims = id_token.as_ref().map(|token| token.claims.clone());

		Ok(TokenResponse {
			unique_id: claims.as_ref().and_then(|c| c.oid.clone()).unwrap_or_default(),
			tenant_id: claims.as_ref().and_then(|c| c.tid.clone()).unwrap_or_default(),
			token_type: response.token_type,
			id_token: response.id_token.unwrap_or_default(),
			id_token_claims: claims,
			access_token: response.access_token,
			refresh_token: response.refresh_token.unwrap_or_default(),
			scopes: granted.into_vec(),
			expires_on,
			account,
			user_request_state: split_request_state(state).1.to_owned(),
		})
	}
}
