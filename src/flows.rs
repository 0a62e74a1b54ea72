//! Authorization Code + PKCE orchestrator.
//!
//! [`AuthorizationCodeModule`] owns the injected capabilities and splits its operations by
//! stage: `authorize` builds navigation URLs, `fragment` validates the redirect, `exchange`
//! redeems the code, and `silent` serves cached tokens.

pub mod authorize;
mod common;
pub mod exchange;
pub mod fragment;
pub mod silent;

// self
use crate::{
	_prelude::*,
	auth::{Account, ClientInfo, IdToken},
	authority::{Authority, AuthorityFactory},
	cache::{CacheHelpers, PersistentCacheKey, TemporaryCacheKey},
	clock::{Clock, SystemClock},
	config::ClientConfiguration,
	crypto::Crypto,
	http::NetworkClient,
	storage::CacheStorage,
	uri::UrlString,
};

/// Browser-side authorization code client.
///
/// Every request is correlated through a state GUID written to storage before the
/// navigation URL is returned; the redirect fragment and code exchange are validated
/// against that state. Authorities are cached per canonical URL so discovery runs once
/// per authority for the lifetime of the module.
pub struct AuthorizationCodeModule {
	config: ClientConfiguration,
	storage: Arc<dyn CacheStorage>,
	cache: CacheHelpers,
	network: Arc<dyn NetworkClient>,
	crypto: Arc<dyn Crypto>,
	clock: Arc<dyn Clock>,
	authority_factory: AuthorityFactory,
	authorities: Mutex<HashMap<String, Arc<Authority>>>,
	account: RwLock<Option<Account>>,
}
impl AuthorizationCodeModule {
	/// Wires the module to its capabilities using the system clock.
	pub fn new(
		config: ClientConfiguration,
		storage: Arc<dyn CacheStorage>,
		network: Arc<dyn NetworkClient>,
		crypto: Arc<dyn Crypto>,
	) -> Self {
		let authority_factory = AuthorityFactory::new(config.auth.known_authorities.iter());

		Self {
			config,
			cache: CacheHelpers::new(storage.clone()),
			storage,
			network,
			crypto,
			clock: Arc::new(SystemClock),
			authority_factory,
			authorities: Default::default(),
			account: Default::default(),
		}
	}

	/// Overrides the clock used for expiry computations.
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;

		self
	}

	/// Client configuration.
	pub fn config(&self) -> &ClientConfiguration {
		&self.config
	}

	/// Storage capability the module writes through.
	pub fn storage(&self) -> &Arc<dyn CacheStorage> {
		&self.storage
	}

	/// Resolves the configured redirect URI.
	pub fn get_redirect_uri(&self) -> Result<String> {
		self.config
			.auth
			.redirect_uri
			.as_ref()
			.map(|uri| uri.resolve())
			.filter(|uri| !uri.is_empty())
			.ok_or_else(|| ErrorKind::RedirectUriEmpty.into())
	}

	/// Resolves the configured post-logout redirect URI.
	pub fn get_post_logout_redirect_uri(&self) -> Result<String> {
		self.config
			.auth
			.post_logout_redirect_uri
			.as_ref()
			.map(|uri| uri.resolve())
			.filter(|uri| !uri.is_empty())
			.ok_or_else(|| ErrorKind::PostLogoutUriEmpty.into())
	}

	/// Signed-in account.
	///
	/// Falls back to the persisted ID token and client info when no exchange happened in
	/// this module's lifetime, e.g. after a page reload.
	pub fn get_account(&self) -> Option<Account> {
		if let Some(account) = self.account.read().clone() {
			return Some(account);
		}

		let raw_id_token = self.cache.get_persistent(PersistentCacheKey::IdToken)?;
		let id_token = IdToken::new(&raw_id_token, self.crypto.as_ref()).ok()?;
		let client_info = self
			.cache
			.get_persistent(PersistentCacheKey::ClientInfo)
			.and_then(|raw| ClientInfo::parse(&raw, self.crypto.as_ref()).ok());
		let account = Account::create_account(&id_token, client_info.as_ref(), self.crypto.as_ref());

		*self.account.write() = Some(account.clone());

		Some(account)
	}

	/// Drops the temporary entries of the request in flight and the interaction marker.
	pub fn cancel_request(&self) {
		if let Some(state) = self.cache.get_temporary(TemporaryCacheKey::RequestState) {
			#[cfg(feature = "tracing")]
			tracing::debug!("Cancelling the pending authorization request.");

			self.cache.reset_temp_cache_items(&state);
		}

		self.storage.remove_item(TemporaryCacheKey::InteractionStatus.as_str());
	}

	/// Returns the cached authority for `authority` (or the configured one), running
	/// discovery if it has not completed yet.
	pub async fn resolve_authority(&self, authority: Option<&str>) -> Result<Arc<Authority>> {
		let authority = self.authority_instance(authority.unwrap_or(&self.config.auth.authority))?;

		authority.resolve_endpoints().await?;

		Ok(authority)
	}

	fn authority_instance(&self, authority: &str) -> Result<Arc<Authority>> {
		let canonical = UrlString::new(authority)?;
		let mut authorities = self.authorities.lock();

		if let Some(existing) = authorities.get(canonical.as_str()) {
			return Ok(existing.clone());
		}

		let created =
			Arc::new(self.authority_factory.create_instance(canonical.as_str(), self.network.clone())?);

		authorities.insert(canonical.as_str().to_owned(), created.clone());

		Ok(created)
	}

	fn set_account(&self, account: Option<Account>) {
		*self.account.write() = account;
	}
}
impl Debug for AuthorizationCodeModule {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthorizationCodeModule")
			.field("client_id", &self.config.client_id())
			.field("authority", &self.config.auth.authority)
			.field("cached_authorities", &self.authorities.lock().len())
			.field("signed_in", &self.account.read().is_some())
			.finish()
	}
}
