//! Navigation URL construction for login, token acquisition, and logout.

// self
use crate::{
	_prelude::*,
	auth::{IdToken, ScopeSet},
	authority::Authority,
	cache::{CacheHelpers, PersistentCacheKey, TemporaryCacheKey},
	flows::{
		AuthorizationCodeModule,
		common::{self, JournaledCache},
	},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	request::{
		AuthenticationParameters, ServerCodeRequestParameters, TokenExchangeParameters,
		encode_component,
	},
};

impl AuthorizationCodeModule {
	/// Builds the authorization URL for an interactive login.
	///
	/// `openid profile offline_access` is always requested. The pending request is written
	/// to storage before the URL is returned and rolled back if any step fails.
	pub async fn create_login_url(&self, request: &AuthenticationParameters) -> Result<String> {
		const KIND: FlowKind = FlowKind::LoginUrl;

		let span = FlowSpan::new(KIND, "create_login_url");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let client_id = self.config.client_id();
				let scopes = ScopeSet::for_login(request.scopes.as_deref(), client_id)?;
				let cached_scopes = match request.scopes.as_deref() {
					Some(scopes) if !scopes.is_empty() => scopes.to_vec(),
					_ => vec![client_id.to_owned()],
				};

				self.build_navigate_url(request, scopes, cached_scopes).await
			})
			.await;

		obs::record_flow_result(KIND, &result);

		result
	}

	/// Builds the authorization URL for acquiring an access token.
	///
	/// Scopes are required; a sole client id scope requests `openid profile`.
	pub async fn create_acquire_token_url(
		&self,
		request: &AuthenticationParameters,
	) -> Result<String> {
		const KIND: FlowKind = FlowKind::AcquireTokenUrl;

		let span = FlowSpan::new(KIND, "create_acquire_token_url");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let scopes =
					ScopeSet::for_acquire_token(request.scopes.as_deref(), self.config.client_id())?;
				let cached_scopes = request.scopes.clone().unwrap_or_default();

				self.build_navigate_url(request, scopes, cached_scopes).await
			})
			.await;

		obs::record_flow_result(KIND, &result);

		result
	}

	/// Signs the account out locally and returns the end-session URL.
	///
	/// Access tokens of the account are removed along with the persisted ID token and client
	/// info, whether or not the caller navigates to the returned URL.
	pub async fn logout_url(&self, request: &AuthenticationParameters) -> Result<String> {
		let authority = self.resolve_authority(request.authority.as_deref()).await?;
		let post_logout_redirect_uri = self.get_post_logout_redirect_uri()?;
		let end_session_endpoint = authority.end_session_endpoint()?;
		let correlation_id = match request.correlation_id.as_deref() {
			Some(id) if !id.is_empty() => id.to_owned(),
			_ => common::new_guid(self.crypto.as_ref())?,
		};
		let account = request.account.clone().or_else(|| self.get_account());
		let home_account_identifier = account
			.as_ref()
			.map(|account| account.home_account_identifier.as_str())
			.filter(|home| !home.is_empty());
		let removed = self.cache.remove_all_access_tokens(
			self.config.client_id(),
			authority.canonical_authority(),
			None,
			home_account_identifier,
		);

		#[cfg(feature = "tracing")]
		tracing::debug!(removed, "Removed cached access tokens on logout.");
		#[cfg(not(feature = "tracing"))]
		let _ = removed;

		self.cache.remove_persistent(PersistentCacheKey::IdToken);
		self.cache.remove_persistent(PersistentCacheKey::ClientInfo);
		self.set_account(None);

		let separator = if end_session_endpoint.contains('?') { '&' } else { '?' };

		Ok(format!(
			"{end_session_endpoint}{separator}post_logout_redirect_uri={}&client-request-id={}",
			encode_component(&post_logout_redirect_uri),
			encode_component(&correlation_id)
		))
	}

	async fn build_navigate_url(
		&self,
		request: &AuthenticationParameters,
		scopes: ScopeSet,
		cached_scopes: Vec<String>,
	) -> Result<String> {
		request.validate_claims_request()?;

		let redirect_uri = self.get_redirect_uri()?;
		let authority = self.resolve_authority(request.authority.as_deref()).await?;

		obs::record_authority(authority.canonical_authority());

		let journaled = JournaledCache::new(self.storage.clone());
		let result = self
			.write_pending_request(
				journaled.helpers(),
				request,
				scopes,
				cached_scopes,
				redirect_uri,
				authority,
			)
			.await;

		journaled.finish(result)
	}

	async fn write_pending_request(
		&self,
		cache: &CacheHelpers,
		request: &AuthenticationParameters,
		scopes: ScopeSet,
		cached_scopes: Vec<String>,
		redirect_uri: String,
		authority: Arc<Authority>,
	) -> Result<String> {
		let crypto = self.crypto.as_ref();
		let state = common::build_request_state(&common::new_guid(crypto)?, request.state.as_deref());
		let nonce = common::new_guid(crypto)?;
		let correlation_id = match request.correlation_id.as_deref() {
			Some(id) if !id.is_empty() => id.to_owned(),
			_ => common::new_guid(crypto)?,
		};

		obs::record_correlation_id(&correlation_id);

		let account = request.account.clone().or_else(|| self.get_account());
		// A cached ADAL token only seeds hints when the caller supplied none.
		let adal_id_token = if request.is_sso_param() {
			None
		} else {
			cache
				.get_persistent(PersistentCacheKey::AdalIdToken)
				.and_then(|raw| IdToken::new(&raw, crypto).ok())
		};
		let mut params = ServerCodeRequestParameters {
			authority: authority.clone(),
			client_id: self.config.client_id().to_owned(),
			redirect_uri,
			scopes,
			state,
			nonce,
			correlation_id,
			code_challenge: String::new(),
			prompt: None,
			claims_request: None,
			query_parameters: BTreeMap::new(),
			extra_query_parameters: BTreeMap::new(),
		};

		params.populate_query_params(account.as_ref(), Some(request), adal_id_token.as_ref(), false);
		cache.update_cache_entries(&params, account.as_ref())?;

		let pkce = self.crypto.generate_pkce_codes().await?;

		params.code_challenge = pkce.challenge;

		let pending = TokenExchangeParameters {
			scopes: cached_scopes,
			code_verifier: pkce.verifier,
			authority: Some(authority.canonical_authority().to_owned()),
			correlation_id: params.correlation_id.clone(),
			resource: request.resource.clone(),
			extra_query_parameters: (!request.extra_query_parameters.is_empty())
				.then(|| request.extra_query_parameters.clone()),
		};

		cache.set_temporary(TemporaryCacheKey::RequestParams, &pending.to_cache_value()?);

		let url = params.create_navigation_url()?;

		#[cfg(feature = "tracing")]
		tracing::debug!(
			authority = authority.canonical_authority(),
			url = self.config.system.pii_logging_enabled.then_some(url.as_str()),
			"Built authorization navigation URL."
		);

		Ok(url)
	}
}
