//! Browser storage adapter: client-scoped keys over a session or local storage area, with
//! optional cookie mirroring of temporary request state.

// self
use crate::{
	_prelude::*,
	cache::{CACHE_PREFIX, PersistentCacheKey, RESOURCE_DELIM, TemporaryCacheKey},
	config::{CacheLocation, CacheOptions},
	storage::CacheStorage,
};

/// Cookie capability used to mirror temporary request state.
pub trait CookieJar
where
	Self: Send + Sync,
{
	/// Stores a cookie; `expires` of `None` creates a session cookie.
	fn set_cookie(&self, name: &str, value: &str, expires: Option<OffsetDateTime>);

	/// Reads a cookie value.
	fn get_cookie(&self, name: &str) -> Option<String>;

	/// Expires a cookie immediately.
	fn clear_cookie(&self, name: &str);
}

/// Host-provided storage areas; unavailable areas are left as `None`.
#[derive(Clone, Default)]
pub struct StorageAreas {
	/// `window.sessionStorage` equivalent.
	pub session: Option<Arc<dyn CacheStorage>>,
	/// `window.localStorage` equivalent.
	pub local: Option<Arc<dyn CacheStorage>>,
	/// `document.cookie` equivalent.
	pub cookies: Option<Arc<dyn CookieJar>>,
}
impl Debug for StorageAreas {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("StorageAreas")
			.field("session", &self.session.is_some())
			.field("local", &self.local.is_some())
			.field("cookies", &self.cookies.is_some())
			.finish()
	}
}

/// In-process [`CookieJar`] that records expirations.
#[derive(Clone, Debug, Default)]
pub struct MemoryCookieJar(Arc<RwLock<BTreeMap<String, (String, Option<OffsetDateTime>)>>>);
impl MemoryCookieJar {
	/// Expiration recorded for a cookie.
	pub fn expiration(&self, name: &str) -> Option<OffsetDateTime> {
		self.0.read().get(name).and_then(|(_, expires)| *expires)
	}

	/// Returns true when no cookie is stored.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}
}
impl CookieJar for MemoryCookieJar {
	fn set_cookie(&self, name: &str, value: &str, expires: Option<OffsetDateTime>) {
		self.0.write().insert(name.to_owned(), (value.to_owned(), expires));
	}

	fn get_cookie(&self, name: &str) -> Option<String> {
		self.0.read().get(name).map(|(value, _)| value.clone())
	}

	fn clear_cookie(&self, name: &str) {
		self.0.write().remove(name);
	}
}

/// [`CacheStorage`] adapter scoping keys to one client id inside a browser storage area.
///
/// Plain keys are stored as `msal.{client_id}.{key}`. Access-token keys are JSON documents
/// that already carry the client id, so they are stored verbatim and only surfaced by
/// [`get_keys`](CacheStorage::get_keys) when their `clientId` matches.
#[derive(Clone)]
pub struct BrowserStorage {
	client_id: String,
	prefix: String,
	location: CacheLocation,
	area: Arc<dyn CacheStorage>,
	cookies: Option<Arc<dyn CookieJar>>,
}
impl BrowserStorage {
	/// Number of days a cookie written with [`Self::set_item_cookie`] stays valid.
	pub const COOKIE_LIFE_DAYS: i64 = 1;

	/// Selects the configured area, failing with [`ErrorKind::StorageNotSupported`] when the
	/// host does not provide it, then migrates legacy persistent entries.
	pub fn new(client_id: impl Into<String>, options: &CacheOptions, areas: StorageAreas) -> Result<Self> {
		let client_id = client_id.into();
		let area = match options.cache_location {
			CacheLocation::SessionStorage => areas.session,
			CacheLocation::LocalStorage => areas.local,
		}
		.ok_or_else(|| {
			Error::with_detail(ErrorKind::StorageNotSupported, options.cache_location.as_str())
		})?;
		let cookies = if options.store_auth_state_in_cookie {
			Some(areas.cookies.ok_or_else(|| Error::with_detail(ErrorKind::StorageNotSupported, "cookies"))?)
		} else {
			None
		};
		let storage = Self {
			prefix: format!("{CACHE_PREFIX}.{client_id}."),
			client_id,
			location: options.cache_location,
			area,
			cookies,
		};

		storage.migrate_legacy_entries();

		Ok(storage)
	}

	/// Storage area backing this adapter.
	pub fn location(&self) -> CacheLocation {
		self.location
	}

	/// Maps a logical key onto the key used in the underlying area.
	pub fn generate_cache_key(&self, key: &str) -> String {
		if is_json_key(key) || key.starts_with(&self.prefix) {
			key.to_owned()
		} else {
			format!("{}{key}", self.prefix)
		}
	}

	/// Writes a cookie valid for `life_days` days, or a session cookie when `None`.
	pub fn set_item_cookie(&self, name: &str, value: &str, life_days: Option<i64>) {
		if let Some(cookies) = &self.cookies {
			cookies.set_cookie(name, value, life_days.map(Self::cookie_expiration_time));
		}
	}

	/// Reads a mirrored cookie.
	pub fn get_item_cookie(&self, name: &str) -> Option<String> {
		self.cookies.as_ref().and_then(|cookies| cookies.get_cookie(name))
	}

	/// Expires a mirrored cookie.
	pub fn clear_item_cookie(&self, name: &str) {
		if let Some(cookies) = &self.cookies {
			cookies.clear_cookie(name);
		}
	}

	/// Expires the nonce, request-state, and origin cookies written for `state`.
	pub fn clear_msal_cookie(&self, state: &str) {
		let nonce = format!("{}{RESOURCE_DELIM}{state}", TemporaryCacheKey::NonceIdToken.as_str());

		for key in [
			nonce.as_str(),
			TemporaryCacheKey::RequestState.as_str(),
			TemporaryCacheKey::OriginUri.as_str(),
		] {
			self.clear_item_cookie(&self.generate_cache_key(key));
		}
	}

	/// Absolute expiration for a cookie living `life_days` days from now.
	pub fn cookie_expiration_time(life_days: i64) -> OffsetDateTime {
		OffsetDateTime::now_utc() + Duration::days(life_days)
	}

	fn migrate_legacy_entries(&self) {
		for key in PersistentCacheKey::ALL {
			let legacy = format!("{CACHE_PREFIX}.{}", key.as_str());
			let current = self.generate_cache_key(key.as_str());

			if let Some(value) = self.area.get_item(&legacy)
				&& !self.area.contains_key(&current)
			{
				self.area.set_item(&current, &value);
			}
		}
	}

	fn owns_raw_key(&self, raw: &str) -> Option<String> {
		if let Some(stripped) = raw.strip_prefix(&self.prefix) {
			return Some(stripped.to_owned());
		}
		if is_json_key(raw) {
			let value = serde_json::from_str::<serde_json::Value>(raw).ok()?;

			if value.get("clientId").and_then(|v| v.as_str()) == Some(self.client_id.as_str()) {
				return Some(raw.to_owned());
			}
		}

		None
	}
}
impl CacheStorage for BrowserStorage {
	fn get_item(&self, key: &str) -> Option<String> {
		let cache_key = self.generate_cache_key(key);

		if is_temporary_key(key)
			&& let Some(value) = self.get_item_cookie(&cache_key)
		{
			return Some(value);
		}

		self.area.get_item(&cache_key)
	}

	fn set_item(&self, key: &str, value: &str) {
		let cache_key = self.generate_cache_key(key);

		self.area.set_item(&cache_key, value);

		if is_temporary_key(key) {
			self.set_item_cookie(&cache_key, value, None);
		}
	}

	fn remove_item(&self, key: &str) {
		let cache_key = self.generate_cache_key(key);

		self.area.remove_item(&cache_key);

		if is_temporary_key(key) {
			self.clear_item_cookie(&cache_key);
		}
	}

	fn contains_key(&self, key: &str) -> bool {
		self.area.contains_key(&self.generate_cache_key(key))
	}

	fn get_keys(&self) -> Vec<String> {
		self.area.get_keys().iter().filter_map(|raw| self.owns_raw_key(raw)).collect()
	}

	fn clear(&self) {
		for key in self.get_keys() {
			self.remove_item(&key);
		}
	}
}
impl Debug for BrowserStorage {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("BrowserStorage")
			.field("client_id", &self.client_id)
			.field("location", &self.location)
			.field("cookies", &self.cookies.is_some())
			.finish()
	}
}

fn is_json_key(key: &str) -> bool {
	key.starts_with('{') && key.ends_with('}')
}

fn is_temporary_key(key: &str) -> bool {
	TemporaryCacheKey::ALL.iter().any(|k| {
		key == k.as_str()
			|| key.strip_prefix(k.as_str()).is_some_and(|rest| rest.starts_with(RESOURCE_DELIM))
	})
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::storage::MemoryStorage;

	const CLIENT_ID: &str = "0813e1d1-ad72-46a9-8665-399bba48c201";

	fn areas() -> (StorageAreas, Arc<MemoryStorage>, Arc<MemoryStorage>, Arc<MemoryCookieJar>) {
		let session = Arc::new(MemoryStorage::default());
		let local = Arc::new(MemoryStorage::default());
		let cookies = Arc::new(MemoryCookieJar::default());
		let areas = StorageAreas {
			session: Some(session.clone()),
			local: Some(local.clone()),
			cookies: Some(cookies.clone()),
		};

		(areas, session, local, cookies)
	}

	#[test]
	fn missing_area_is_not_supported() {
		let err = BrowserStorage::new(CLIENT_ID, &CacheOptions::default(), StorageAreas::default())
			.expect_err("Missing session storage must fail.");

		assert_eq!(err.kind, ErrorKind::StorageNotSupported);
	}

	#[test]
	fn keys_are_prefixed_per_client() {
		let (areas, session, local, _) = areas();
		let storage = BrowserStorage::new(CLIENT_ID, &CacheOptions::default(), areas)
			.expect("Session storage should be available.");

		storage.set_item("cacheKey", "cacheVal");

		let raw_key = format!("msal.{CLIENT_ID}.cacheKey");

		assert_eq!(session.get_item(&raw_key).as_deref(), Some("cacheVal"));
		assert!(local.is_empty());
		assert_eq!(storage.get_item("cacheKey").as_deref(), Some("cacheVal"));
		assert!(storage.contains_key("cacheKey"));
		assert_eq!(storage.get_keys(), vec!["cacheKey"]);

		storage.clear();

		assert!(session.is_empty());
	}

	#[test]
	fn local_location_selects_local_area() {
		let (areas, session, local, _) = areas();
		let options = CacheOptions { cache_location: CacheLocation::LocalStorage, ..Default::default() };
		let storage = BrowserStorage::new(CLIENT_ID, &options, areas).expect("Local storage should be available.");

		storage.set_item("cacheKey", "cacheVal");

		assert!(session.is_empty());
		assert_eq!(local.len(), 1);
		assert_eq!(storage.location(), CacheLocation::LocalStorage);
	}

	#[test]
	fn json_keys_are_stored_verbatim_and_filtered_by_client() {
		let (areas, session, _, _) = areas();
		let storage = BrowserStorage::new(CLIENT_ID, &CacheOptions::default(), areas)
			.expect("Session storage should be available.");
		let own = format!(r#"{{"authority":"https://login.microsoftonline.com/common/","clientId":"{CLIENT_ID}"}}"#);
		let other = r#"{"authority":"https://login.microsoftonline.com/common/","clientId":"other"}"#;

		storage.set_item(&own, "value");
		session.set_item(other, "value");

		assert!(session.contains_key(&own));
		assert_eq!(storage.get_keys(), vec![own]);
	}

	#[test]
	fn legacy_entries_are_migrated() {
		let (areas, session, _, _) = areas();

		session.set_item("msal.idtoken", "legacy-id-token");
		session.set_item("msal.error", "error_code");

		let storage = BrowserStorage::new(CLIENT_ID, &CacheOptions::default(), areas)
			.expect("Session storage should be available.");

		assert_eq!(session.get_item("msal.idtoken").as_deref(), Some("legacy-id-token"));
		assert_eq!(storage.get_item(PersistentCacheKey::IdToken.as_str()).as_deref(), Some("legacy-id-token"));
		assert_eq!(storage.get_item(PersistentCacheKey::Error.as_str()).as_deref(), Some("error_code"));
	}

	#[test]
	fn temporary_keys_are_mirrored_to_cookies() {
		let (areas, _, _, cookies) = areas();
		let options = CacheOptions { store_auth_state_in_cookie: true, ..Default::default() };
		let storage = BrowserStorage::new(CLIENT_ID, &options, areas).expect("Storage should be available.");
		let state = "11553a9b-7116-48b1-9d48-f6d4a8ff8371";
		let nonce_key = format!("nonce.idtoken|{state}");

		storage.set_item("request.state", state);
		storage.set_item(&nonce_key, "nonce");
		storage.set_item("request.origin", "https://contoso.com");
		storage.set_item("idtoken", "not-mirrored");

		assert_eq!(cookies.get_cookie(&format!("msal.{CLIENT_ID}.request.state")).as_deref(), Some(state));
		assert!(cookies.get_cookie(&format!("msal.{CLIENT_ID}.idtoken")).is_none());

		storage.clear_msal_cookie(state);

		assert!(cookies.is_empty());
	}

	#[test]
	fn cookies_take_precedence_for_temporary_reads() {
		let (areas, session, _, _) = areas();
		let options = CacheOptions { store_auth_state_in_cookie: true, ..Default::default() };
		let storage = BrowserStorage::new(CLIENT_ID, &options, areas).expect("Storage should be available.");
		let cache_key = format!("msal.{CLIENT_ID}.request.state");

		session.set_item(&cache_key, "from-session");
		storage.set_item_cookie(&cache_key, "from-cookie", Some(BrowserStorage::COOKIE_LIFE_DAYS));

		assert_eq!(storage.get_item("request.state").as_deref(), Some("from-cookie"));

		storage.remove_item("request.state");

		assert!(storage.get_item("request.state").is_none());
	}

	#[test]
	fn cookie_expiration_is_days_ahead() {
		let before = OffsetDateTime::now_utc();
		let expires = BrowserStorage::cookie_expiration_time(1);

		assert!(expires - before >= Duration::days(1));
		assert!(expires - before < Duration::days(1) + Duration::minutes(1));
	}
}
