//! Cache-first token lookup.

// self
use crate::{
	_prelude::*,
	auth::{
		Account, ClientInfo, IdToken, OFFLINE_ACCESS_SCOPE, ScopeSet, is_client_id_only,
		validate_input_scopes,
	},
	cache::{AccessTokenCacheItem, AccessTokenKey, PersistentCacheKey},
	flows::AuthorizationCodeModule,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	request::{TokenRenewParameters, TokenResponse},
};

impl AuthorizationCodeModule {
	/// Returns a cached access token covering the requested scopes.
	///
	/// Never touches the token endpoint: only discovery may hit the network, once per
	/// authority. A single expired match is evicted and reported as
	/// [`ErrorKind::NoTokensFound`] so the caller starts a fresh exchange.
	pub async fn get_valid_token(
		&self,
		request: Option<&TokenRenewParameters>,
	) -> Result<TokenResponse> {
		const KIND: FlowKind = FlowKind::SilentToken;

		let span = FlowSpan::new(KIND, "get_valid_token");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let request = request.ok_or(ErrorKind::TokenRequestEmpty)?;

				self.lookup_cached_token(request).await
			})
			.await;

		obs::record_flow_result(KIND, &result);

		result
	}

	async fn lookup_cached_token(&self, request: &TokenRenewParameters) -> Result<TokenResponse> {
		let client_id = self.config.client_id();
		let scopes = validate_input_scopes(request.scopes.as_deref())?;

		if is_client_id_only(scopes, client_id)
			&& request.account.is_none()
			&& self.get_account().is_none()
		{
			return Err(ErrorKind::UserLoginRequired.into());
		}

		let authority = self.resolve_authority(request.authority.as_deref()).await?;

		obs::record_authority(authority.canonical_authority());

		let requested = ScopeSet::for_cache_lookup(scopes, client_id);
		let home_account_identifier = request
			.account
			.as_ref()
			.map(|account| account.home_account_identifier.as_str())
			.filter(|home| !home.is_empty());
		let mut matches = self
			.cache
			.get_all_access_tokens(
				client_id,
				authority.canonical_authority(),
				request.resource.as_deref(),
				home_account_identifier,
			)
			.into_iter()
			.map(|item| (cached_scope_set(&item.key), item))
			.filter(|(cached, _)| cached.contains_scope_set(&requested))
			.collect::<Vec<_>>();
		let (cached_scopes, item) = match matches.len() {
			0 => return Err(ErrorKind::NoTokensFound.into()),
			1 => matches.remove(0),
			_ =>
				return Err(Error::with_detail(
					ErrorKind::MultipleMatchingTokens,
					requested.print_scopes(),
				)),
		};
		let renew_at = self.clock.now() + self.config.system.token_renewal_offset();

		match item.value.expires_on() {
			Some(expires_on) if expires_on > renew_at.unix_timestamp() =>
				self.cached_token_response(item, cached_scopes, expires_on),
			_ => {
				#[cfg(feature = "tracing")]
				tracing::debug!("Evicting expired access token.");

				self.cache.remove_access_token(&item.key)?;

				Err(ErrorKind::NoTokensFound.into())
			},
		}
	}

	fn cached_token_response(
		&self,
		item: AccessTokenCacheItem,
		cached_scopes: ScopeSet,
		expires_on: i64,
	) -> Result<TokenResponse> {
		let crypto = self.crypto.as_ref();
		let AccessTokenCacheItem { value, .. } = item;
		let id_token = match value.id_token.as_str() {
			"" => None,
			raw => Some(IdToken::new(raw, crypto)?),
		};
		let client_info = self
			.cache
			.get_persistent(PersistentCacheKey::ClientInfo)
			.and_then(|raw| ClientInfo::parse(&raw, crypto).ok());
		let account =
			id_token.as_ref().map(|token| Account::create_account(token, client_info.as_ref(), crypto));
		let claims = id_token.map(|token| token.claims);
		let expires_on = OffsetDateTime::from_unix_timestamp(expires_on).map_err(|e| {
			Error::with_detail(ErrorKind::CacheParse, e.to_string()).with_source(e)
		})?;

		Ok(TokenResponse {
			unique_id: claims.as_ref().and_then(|c| c.oid.clone()).unwrap_or_default(),
			tenant_id: claims.as_ref().and_then(|c| c.tid.clone()).unwrap_or_default(),
			token_type: value.token_type,
			id_token: value.id_token,
			id_token_claims: claims,
			access_token: value.access_token,
			refresh_token: value.refresh_token,
			scopes: cached_scopes.into_vec(),
			expires_on,
			account,
			user_request_state: String::new(),
		})
	}
}

// `offline_access` is granted implicitly and never stored in the key.
fn cached_scope_set(key: &AccessTokenKey) -> ScopeSet {
	ScopeSet::new(key.scopes.split_whitespace().chain([OFFLINE_ACCESS_SCOPE]))
}

#[cfg(all(test, feature = "reqwest"))]
mod tests {
	// crates.io
	use httpmock::prelude::*;
	use time::macros::datetime;
	// self
	use super::*;
	use crate::{
		_preludet::*,
		cache::AccessTokenValue,
		clock::FixedClock,
		config::ClientConfiguration,
		crypto::DefaultCrypto,
		storage::{CacheStorage, MemoryStorage},
	};

	const RESOURCE: &str = "https://graph.microsoft.com";
	// 2025-01-01 00:00 UTC.
	const NOW: i64 = 1_735_689_600;

	struct Fixture {
		server: MockServer,
		module: AuthorizationCodeModule,
		storage: Arc<MemoryStorage>,
	}
	impl Fixture {
		async fn new() -> Self {
			let server = MockServer::start_async().await;

			server
				.mock_async(|when, then| {
					when.method(GET).path("/common/v2.0/.well-known/openid-configuration");
					then.status(200).json_body(serde_json::json!({
						"authorization_endpoint": "https://login.microsoftonline.com/{tenant}/oauth2/v2.0/authorize",
						"token_endpoint": "https://login.microsoftonline.com/{tenant}/oauth2/v2.0/token",
						"issuer": "https://login.microsoftonline.com/{tenant}/v2.0"
					}));
				})
				.await;

			let (module, storage) = build_reqwest_test_module(
				ClientConfiguration::builder(TEST_CLIENT_ID)
					.authority(server.url("/common"))
					.redirect_uri("https://localhost:8081/index.html")
					.build()
					.expect("Configuration should validate."),
			);
			let module =
				module.with_clock(Arc::new(FixedClock::new(datetime!(2025-01-01 00:00 UTC))));

			Self { server, module, storage }
		}

		fn authority(&self) -> String {
			format!("{}/", self.server.url("/common"))
		}

		fn seed(&self, scopes: &str, resource: Option<&str>, expires_on: i64, id_token: &str) {
			let key = AccessTokenKey::new(
				&self.authority(),
				TEST_CLIENT_ID,
				scopes,
				resource,
				"123-test-uid",
				"456-test-utid",
				&DefaultCrypto,
			)
			.expect("Key should build.");
			let value = AccessTokenValue {
				token_type: "Bearer".into(),
				access_token: format!("access-{}", resource.unwrap_or("none")),
				id_token: id_token.into(),
				refresh_token: String::new(),
				expires_on_sec: expires_on.to_string(),
				ext_expires_on_sec: expires_on.to_string(),
			};

			self.module
				.cache
				.set_access_token(&AccessTokenCacheItem { key, value })
				.expect("Seeding should succeed.");
		}
	}

	#[tokio::test]
	async fn request_shape_is_validated_first() {
		let fixture = Fixture::new().await;
		let module = &fixture.module;
		let kind = |result: Result<TokenResponse>| result.expect_err("Request must fail.").kind;

		assert_eq!(kind(module.get_valid_token(None).await), ErrorKind::TokenRequestEmpty);
		assert_eq!(
			kind(module.get_valid_token(Some(&TokenRenewParameters::default())).await),
			ErrorKind::EmptyInputScopes
		);
		assert_eq!(
			kind(module.get_valid_token(Some(&TokenRenewParameters::new(Vec::<String>::new()))).await),
			ErrorKind::EmptyInputScopes
		);
		assert_eq!(
			kind(module.get_valid_token(Some(&TokenRenewParameters::new([TEST_CLIENT_ID]))).await),
			ErrorKind::UserLoginRequired
		);
	}

	#[tokio::test]
	async fn superset_match_is_served_from_cache() {
		let fixture = Fixture::new().await;
		let id_token =
			encode_test_id_token(&serde_json::json!({ "oid": "object", "tid": "tenant" }));

		fixture.storage.set_item("client.info", TEST_RAW_CLIENT_INFO);
		fixture.seed("scope1 openid profile", None, NOW + 3600, &id_token);

		let response = fixture
			.module
			.get_valid_token(Some(&TokenRenewParameters::new(["SCOPE1"])))
			.await
			.expect("Cached token should be returned.");

		assert_eq!(response.access_token, "access-none");
		assert_eq!(response.scopes, vec!["scope1", "openid", "profile", "offline_access"]);
		assert_eq!(response.unique_id, "object");
		assert_eq!(response.tenant_id, "tenant");
		assert_eq!(response.expires_on, datetime!(2025-01-01 01:00 UTC));
		assert_eq!(
			response.account.map(|a| a.home_account_identifier),
			Some(TEST_HOME_ACCOUNT_ID.to_owned())
		);

		let err = fixture
			.module
			.get_valid_token(Some(&TokenRenewParameters::new(["scope2"])))
			.await
			.expect_err("Uncovered scope must miss.");

		assert_eq!(err.kind, ErrorKind::NoTokensFound);
	}

	#[tokio::test]
	async fn ambiguous_matches_need_a_resource() {
		let fixture = Fixture::new().await;

		fixture.seed("scope1", Some(RESOURCE), NOW + 3600, "");
		fixture.seed("scope1", Some("https://other.contoso.com"), NOW + 3600, "");

		let err = fixture
			.module
			.get_valid_token(Some(&TokenRenewParameters::new(["scope1"])))
			.await
			.expect_err("Ambiguous lookup must fail.");

		assert_eq!(err.kind, ErrorKind::MultipleMatchingTokens);
		assert!(err.to_string().starts_with("Cache error for scope scope1: "));

		let response = fixture
			.module
			.get_valid_token(Some(&TokenRenewParameters::new(["scope1"]).with_resource(RESOURCE)))
			.await
			.expect("Resource should disambiguate.");

		assert_eq!(response.access_token, format!("access-{RESOURCE}"));
	}

	#[tokio::test]
	async fn expired_and_renewing_tokens_are_evicted() {
		let fixture = Fixture::new().await;

		fixture.seed("scope1", None, NOW - 1, "");

		let err = fixture
			.module
			.get_valid_token(Some(&TokenRenewParameters::new(["scope1"])))
			.await
			.expect_err("Expired token must not be served.");

		assert_eq!(err.kind, ErrorKind::NoTokensFound);
		assert!(fixture.storage.is_empty());

		// Inside the default five minute renewal window.
		fixture.seed("scope1", None, NOW + 120, "");

		let err = fixture
			.module
			.get_valid_token(Some(&TokenRenewParameters::new(["scope1"])))
			.await
			.expect_err("Token inside the renewal window must not be served.");

		assert_eq!(err.kind, ErrorKind::NoTokensFound);
		assert!(fixture.storage.is_empty());
	}

	#[tokio::test]
	async fn account_filter_selects_home_tokens() {
		let fixture = Fixture::new().await;

		fixture.seed("scope1", None, NOW + 3600, "");

		let stranger =
			Account { home_account_identifier: "someone.else".into(), ..Default::default() };

		let err = fixture
			.module
			.get_valid_token(Some(&TokenRenewParameters::new(["scope1"]).with_account(stranger)))
			.await
			.expect_err("Other account must miss.");

		assert_eq!(err.kind, ErrorKind::NoTokensFound);

		let owner =
			Account { home_account_identifier: TEST_HOME_ACCOUNT_ID.into(), ..Default::default() };

		fixture
			.module
			.get_valid_token(Some(&TokenRenewParameters::new(["scope1"]).with_account(owner)))
			.await
			.expect("Owner should be served.");
	}
}
