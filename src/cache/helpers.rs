//! Typed reads and writes over the raw key-value store.

// self
use crate::{
	_prelude::*,
	auth::Account,
	authority::Authority,
	cache::{
		AccessTokenCacheItem, AccessTokenKey, AccessTokenValue, NO_ACCOUNT, PersistentCacheKey,
		TemporaryCacheKey,
	},
	request::ServerCodeRequestParameters,
	storage::CacheStorage,
};

/// Cache operations shared by the orchestrator and the interaction handlers.
#[derive(Clone)]
pub struct CacheHelpers {
	storage: Arc<dyn CacheStorage>,
}
impl CacheHelpers {
	/// Wraps a storage capability.
	pub fn new(storage: Arc<dyn CacheStorage>) -> Self {
		Self { storage }
	}

	/// Underlying storage.
	pub fn storage(&self) -> &Arc<dyn CacheStorage> {
		&self.storage
	}

	/// `acquireToken.account|{account_id}`.
	pub fn generate_acquire_token_account_key(&self, account_id: &str) -> String {
		TemporaryCacheKey::AcquireTokenAccount.scoped(account_id)
	}

	/// `authority|{state}`.
	pub fn generate_authority_key(&self, state: &str) -> String {
		TemporaryCacheKey::Authority.scoped(state)
	}

	/// `nonce.idtoken|{state}`.
	pub fn generate_nonce_key(&self, state: &str) -> String {
		TemporaryCacheKey::NonceIdToken.scoped(state)
	}

	/// Nonce cached for `state`.
	pub fn get_nonce(&self, state: &str) -> Option<String> {
		self.storage.get_item(&self.generate_nonce_key(state))
	}

	/// Canonical authority cached for `state`.
	pub fn get_authority(&self, state: &str) -> Option<String> {
		self.storage.get_item(&self.generate_authority_key(state))
	}

	/// Reads a temporary entry that is not scoped to a state.
	pub fn get_temporary(&self, key: TemporaryCacheKey) -> Option<String> {
		self.storage.get_item(key.as_str())
	}

	/// Writes a temporary entry that is not scoped to a state.
	pub fn set_temporary(&self, key: TemporaryCacheKey, value: &str) {
		self.storage.set_item(key.as_str(), value);
	}

	/// Reads a persistent entry.
	pub fn get_persistent(&self, key: PersistentCacheKey) -> Option<String> {
		self.storage.get_item(key.as_str())
	}

	/// Writes a persistent entry.
	pub fn set_persistent(&self, key: PersistentCacheKey, value: &str) {
		self.storage.set_item(key.as_str(), value);
	}

	/// Removes a persistent entry.
	pub fn remove_persistent(&self, key: PersistentCacheKey) {
		self.storage.remove_item(key.as_str());
	}

	/// Stores the account under its home account id, or [`NO_ACCOUNT`] when it has none.
	pub fn set_account_cache(&self, account: &Account) -> Result<()> {
		let account_id = if account.home_account_identifier.is_empty() {
			NO_ACCOUNT
		} else {
			account.home_account_identifier.as_str()
		};
		let value = serde_json::to_string(account)
			.map_err(|e| Error::with_detail(ErrorKind::CacheParse, e.to_string()).with_source(e))?;

		self.storage.set_item(&self.generate_acquire_token_account_key(account_id), &value);

		Ok(())
	}

	/// Reads back an account stored by [`set_account_cache`](Self::set_account_cache).
	pub fn get_account_cache(&self, account_id: &str) -> Option<Account> {
		let raw = self.storage.get_item(&self.generate_acquire_token_account_key(account_id))?;

		serde_json::from_str(&raw).ok()
	}

	/// Stores the canonical authority for `state`.
	pub fn set_authority_cache(&self, authority: &Authority, state: &str) {
		self.storage.set_item(&self.generate_authority_key(state), authority.canonical_authority());
	}

	/// Writes the request state, nonce, authority, and optional account for one request.
	pub fn update_cache_entries(
		&self,
		request: &ServerCodeRequestParameters,
		account: Option<&Account>,
	) -> Result<()> {
		if let Some(account) = account {
			self.set_account_cache(account)?;
		}

		self.set_authority_cache(&request.authority, &request.state);
		self.storage.set_item(TemporaryCacheKey::RequestState.as_str(), &request.state);
		self.storage.set_item(&self.generate_nonce_key(&request.state), &request.nonce);

		Ok(())
	}

	/// Deletes every temporary entry of `state`; the account entry is kept.
	pub fn reset_temp_cache_items(&self, state: &str) {
		self.storage.remove_item(&self.generate_nonce_key(state));
		self.storage.remove_item(&self.generate_authority_key(state));

		for key in [
			TemporaryCacheKey::RequestState,
			TemporaryCacheKey::RequestParams,
			TemporaryCacheKey::OriginUri,
		] {
			self.storage.remove_item(key.as_str());
		}
	}

	/// Writes an access-token entry.
	pub fn set_access_token(&self, item: &AccessTokenCacheItem) -> Result<()> {
		let value = serde_json::to_string(&item.value)
			.map_err(|e| Error::with_detail(ErrorKind::CacheParse, e.to_string()).with_source(e))?;

		self.storage.set_item(&item.key.to_cache_key()?, &value);

		Ok(())
	}

	/// Removes one access-token entry.
	pub fn remove_access_token(&self, key: &AccessTokenKey) -> Result<()> {
		self.storage.remove_item(&key.to_cache_key()?);

		Ok(())
	}

	/// Access-token entries whose key fields equal every supplied filter.
	///
	/// Entries whose value no longer parses are skipped.
	pub fn get_all_access_tokens(
		&self,
		client_id: &str,
		authority: &str,
		resource: Option<&str>,
		home_account_identifier: Option<&str>,
	) -> Vec<AccessTokenCacheItem> {
		self.matching_keys(client_id, authority, resource, home_account_identifier)
			.into_iter()
			.filter_map(|(raw, key)| {
				let value = self.storage.get_item(&raw)?;
				let value = serde_json::from_str::<AccessTokenValue>(&value).ok()?;

				Some(AccessTokenCacheItem { key, value })
			})
			.collect()
	}

	/// Removes every access-token entry matching the filters, returning how many were removed.
	pub fn remove_all_access_tokens(
		&self,
		client_id: &str,
		authority: &str,
		resource: Option<&str>,
		home_account_identifier: Option<&str>,
	) -> usize {
		let keys = self.matching_keys(client_id, authority, resource, home_account_identifier);

		for (raw, _) in &keys {
			self.storage.remove_item(raw);
		}

		keys.len()
	}

	fn matching_keys(
		&self,
		client_id: &str,
		authority: &str,
		resource: Option<&str>,
		home_account_identifier: Option<&str>,
	) -> Vec<(String, AccessTokenKey)> {
		self.storage
			.get_keys()
			.into_iter()
			.filter_map(|raw| AccessTokenKey::from_cache_key(&raw).map(|key| (raw, key)))
			.filter(|(_, key)| {
				key.client_id == client_id
					&& key.authority == authority
					&& resource.is_none_or(|r| key.resource.as_deref() == Some(r))
					&& home_account_identifier.is_none_or(|h| key.home_account_identifier == h)
			})
			.collect()
	}
}
impl Debug for CacheHelpers {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("CacheHelpers(..)")
	}
}

#[cfg(all(test, feature = "reqwest"))]
mod tests {
	// self
	use super::*;
	use crate::{
		_preludet::*,
		auth::{ClientInfo, IdToken},
		authority::AuthorityFactory,
		config::DEFAULT_AUTHORITY,
		crypto::DefaultCrypto,
		storage::MemoryStorage,
	};

	const RESOURCE: &str = "https://login.contoso.com/endpt";
	const RESOURCE_2: &str = "https://login.contoso.com/endpt2";
	const ALTERNATE_AUTHORITY: &str = "https://login.windows.net/common/";
	const SCOPES: &str = "openid profile offline_access";

	fn helpers() -> (CacheHelpers, Arc<MemoryStorage>) {
		let storage = Arc::new(MemoryStorage::default());

		(CacheHelpers::new(storage.clone()), storage)
	}

	fn value(expires_on_sec: &str) -> AccessTokenValue {
		AccessTokenValue {
			token_type: "Bearer".into(),
			access_token: "access".into(),
			id_token: "id".into(),
			refresh_token: "refresh".into(),
			expires_on_sec: expires_on_sec.into(),
			ext_expires_on_sec: expires_on_sec.into(),
		}
	}

	fn raw_key(authority: &str, client_id: &str, resource: &str, home: &str) -> AccessTokenKey {
		AccessTokenKey {
			authority: authority.into(),
			client_id: client_id.into(),
			scopes: SCOPES.into(),
			resource: Some(resource.into()),
			home_account_identifier: home.into(),
		}
	}

	fn seed_tokens(helpers: &CacheHelpers) {
		let keys = [
			AccessTokenKey::new(
				DEFAULT_AUTHORITY,
				TEST_CLIENT_ID,
				SCOPES,
				Some(RESOURCE),
				"123-test-uid",
				"456-test-utid",
				&DefaultCrypto,
			)
			.expect("First key should build."),
			AccessTokenKey::new(
				DEFAULT_AUTHORITY,
				TEST_CLIENT_ID,
				SCOPES,
				Some(RESOURCE_2),
				"123-test-uid",
				"456-test-utid",
				&DefaultCrypto,
			)
			.expect("Second key should build."),
			raw_key("https://login.microsoftonline.com/common/", TEST_CLIENT_ID, RESOURCE, "testHomeAccountId"),
			raw_key(ALTERNATE_AUTHORITY, TEST_CLIENT_ID, RESOURCE, TEST_HOME_ACCOUNT_ID),
			raw_key(ALTERNATE_AUTHORITY, TEST_GUID, "testResourceUri", TEST_HOME_ACCOUNT_ID),
		];

		for key in keys {
			helpers
				.set_access_token(&AccessTokenCacheItem { key, value: value("1536361411") })
				.expect("Seeding should succeed.");
		}
	}

	fn test_account() -> Account {
		let id_token = IdToken::new(
			&encode_test_id_token(&serde_json::json!({
				"oid": "00000000-0000-0000-66f3-3332eca7ea81",
				"preferred_username": "AbeLi@microsoft.com",
				"name": "Abe Lincoln",
				"sid": "test_session_id",
				"nonce": "123523"
			})),
			&DefaultCrypto,
		)
		.expect("ID token should decode.");
		let client_info = ClientInfo { uid: "123-test-uid".into(), utid: "456-test-utid".into() };

		Account::create_account(&id_token, Some(&client_info), &DefaultCrypto)
	}

	fn request() -> ServerCodeRequestParameters {
		let authority = AuthorityFactory::default()
			.create_instance(DEFAULT_AUTHORITY, Arc::new(test_reqwest_network_client()))
			.expect("Authority should build.");

		ServerCodeRequestParameters {
			authority: Arc::new(authority),
			client_id: TEST_CLIENT_ID.into(),
			redirect_uri: "https://localhost:8081/index.html".into(),
			scopes: crate::auth::ScopeSet::new(["openid"]),
			state: TEST_GUID.into(),
			nonce: TEST_GUID.into(),
			correlation_id: TEST_GUID.into(),
			code_challenge: TEST_CHALLENGE.into(),
			prompt: None,
			claims_request: None,
			query_parameters: BTreeMap::new(),
			extra_query_parameters: BTreeMap::new(),
		}
	}

	#[test]
	fn generated_keys_use_delimiter() {
		let (helpers, _) = helpers();

		assert_eq!(
			helpers.generate_acquire_token_account_key(TEST_HOME_ACCOUNT_ID),
			format!("acquireToken.account|{TEST_HOME_ACCOUNT_ID}")
		);
		assert_eq!(helpers.generate_authority_key(TEST_GUID), format!("authority|{TEST_GUID}"));
		assert_eq!(helpers.generate_nonce_key(TEST_GUID), format!("nonce.idtoken|{TEST_GUID}"));
	}

	#[test]
	fn account_cache_round_trips_and_uses_no_account_placeholder() {
		let (helpers, storage) = helpers();
		let account = test_account();

		helpers.set_account_cache(&account).expect("Account should cache.");

		assert_eq!(helpers.get_account_cache(TEST_HOME_ACCOUNT_ID), Some(account.clone()));

		let mut anonymous = account;

		anonymous.home_account_identifier.clear();
		helpers.set_account_cache(&anonymous).expect("Account should cache.");

		assert!(storage.contains_key("acquireToken.account|NO_ACCOUNT"));
	}

	#[test]
	fn update_cache_entries_writes_request_state() {
		let (helpers, storage) = helpers();
		let account = test_account();

		helpers.update_cache_entries(&request(), Some(&account)).expect("Update should succeed.");

		assert_eq!(storage.get_item("request.state").as_deref(), Some(TEST_GUID));
		assert_eq!(storage.get_item(&helpers.generate_nonce_key(TEST_GUID)).as_deref(), Some(TEST_GUID));
		assert_eq!(
			storage.get_item(&helpers.generate_authority_key(TEST_GUID)).as_deref(),
			Some("https://login.microsoftonline.com/common/")
		);
		assert!(storage.contains_key(&helpers.generate_acquire_token_account_key(TEST_HOME_ACCOUNT_ID)));

		let (helpers, storage) = self::helpers();

		helpers.update_cache_entries(&request(), None).expect("Update should succeed.");

		assert_eq!(storage.len(), 3);
	}

	#[test]
	fn reset_temp_cache_items_keeps_account_and_is_idempotent() {
		let (helpers, storage) = helpers();

		helpers.update_cache_entries(&request(), Some(&test_account())).expect("Update should succeed.");
		storage.set_item("request.params", "TestRequestParams");
		storage.set_item("request.origin", "https://localhost:8081/index.html");
		helpers.reset_temp_cache_items(TEST_GUID);

		let after_first = storage.snapshot();

		assert_eq!(after_first.len(), 1);
		assert!(after_first.contains_key(&helpers.generate_acquire_token_account_key(TEST_HOME_ACCOUNT_ID)));

		helpers.reset_temp_cache_items(TEST_GUID);

		assert_eq!(storage.snapshot(), after_first);
	}

	#[test]
	fn get_all_access_tokens_filters_exact_fields() {
		let (helpers, _) = helpers();
		let default = "https://login.microsoftonline.com/common/";

		seed_tokens(&helpers);

		let count = |client: &str, authority: &str, resource: Option<&str>, home: Option<&str>| {
			helpers.get_all_access_tokens(client, authority, resource, home).len()
		};

		assert_eq!(count(TEST_CLIENT_ID, default, None, None), 3);
		assert_eq!(count(TEST_GUID, default, None, None), 0);
		assert_eq!(count(TEST_GUID, ALTERNATE_AUTHORITY, None, None), 1);
		assert_eq!(count(TEST_CLIENT_ID, ALTERNATE_AUTHORITY, None, None), 1);
		assert_eq!(count(TEST_CLIENT_ID, default, Some(RESOURCE), None), 2);
		assert_eq!(count(TEST_CLIENT_ID, default, Some(RESOURCE_2), None), 1);
		assert_eq!(count(TEST_CLIENT_ID, default, Some(RESOURCE), Some(TEST_HOME_ACCOUNT_ID)), 1);
		assert_eq!(count(TEST_CLIENT_ID, default, Some(RESOURCE), Some("testHomeAccountId")), 1);
	}

	#[test]
	fn remove_all_access_tokens_deletes_matches_only() {
		let default = "https://login.microsoftonline.com/common/";
		let (helpers, storage) = helpers();

		seed_tokens(&helpers);

		assert_eq!(helpers.remove_all_access_tokens(TEST_CLIENT_ID, default, None, None), 3);
		assert_eq!(storage.len(), 2);

		let (helpers, storage) = self::helpers();

		seed_tokens(&helpers);
		helpers.remove_all_access_tokens(TEST_CLIENT_ID, default, Some(RESOURCE), None);

		assert_eq!(storage.len(), 3);

		let (helpers, storage) = self::helpers();

		seed_tokens(&helpers);
		helpers.remove_all_access_tokens(TEST_CLIENT_ID, default, Some(RESOURCE), Some(TEST_HOME_ACCOUNT_ID));

		assert_eq!(storage.len(), 4);
	}

	#[test]
	fn unparsable_values_are_skipped() {
		let (helpers, storage) = helpers();
		let key = raw_key(ALTERNATE_AUTHORITY, TEST_CLIENT_ID, RESOURCE, TEST_HOME_ACCOUNT_ID);

		storage.set_item(&key.to_cache_key().expect("Key should serialize."), "not json");

		assert!(helpers.get_all_access_tokens(TEST_CLIENT_ID, ALTERNATE_AUTHORITY, None, None).is_empty());
	}
}
