//! Client configuration: identity, redirect targets, cache placement, and timing knobs.

// std
use std::time::Duration as StdDuration;
// self
use crate::{_prelude::*, uri::UrlString};

/// Authority used when neither the configuration nor a request names one.
pub const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com/common";

/// Redirect target resolved each time a request is built.
#[derive(Clone)]
pub enum RedirectUri {
	/// Fixed URI.
	Static(String),
	/// URI computed at call time, e.g. from the current page location.
	Dynamic(Arc<dyn Fn() -> String + Send + Sync>),
}
impl RedirectUri {
	/// Wraps a closure returning the redirect URI.
	pub fn dynamic(f: impl 'static + Fn() -> String + Send + Sync) -> Self {
		Self::Dynamic(Arc::new(f))
	}

	/// Resolves the current value.
	pub fn resolve(&self) -> String {
		match self {
			Self::Static(uri) => uri.clone(),
			Self::Dynamic(f) => f(),
		}
	}
}
impl Debug for RedirectUri {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::Static(uri) => f.debug_tuple("Static").field(uri).finish(),
			Self::Dynamic(_) => f.write_str("Dynamic(..)"),
		}
	}
}
impl From<&str> for RedirectUri {
	fn from(value: &str) -> Self {
		Self::Static(value.to_owned())
	}
}
impl From<String> for RedirectUri {
	fn from(value: String) -> Self {
		Self::Static(value)
	}
}
impl From<Url> for RedirectUri {
	fn from(value: Url) -> Self {
		Self::Static(value.into())
	}
}

/// Identity settings for the client application.
#[derive(Clone, Debug)]
pub struct AuthOptions {
	/// Application (client) identifier.
	pub client_id: String,
	/// Default authority URL.
	pub authority: String,
	/// Hosts trusted as B2C authorities.
	pub known_authorities: Vec<String>,
	/// Redirect URI registered for the application.
	pub redirect_uri: Option<RedirectUri>,
	/// Where the server sends the user after logout.
	pub post_logout_redirect_uri: Option<RedirectUri>,
}

/// Browser storage area used for the cache.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CacheLocation {
	/// Per-tab storage cleared when the tab closes.
	#[default]
	SessionStorage,
	/// Origin-wide storage shared across tabs.
	LocalStorage,
}
impl CacheLocation {
	/// Returns the browser API name.
	pub const fn as_str(self) -> &'static str {
		match self {
			CacheLocation::SessionStorage => "sessionStorage",
			CacheLocation::LocalStorage => "localStorage",
		}
	}
}
impl Display for CacheLocation {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Cache placement settings.
#[derive(Clone, Debug, Default)]
pub struct CacheOptions {
	/// Storage area holding cache entries.
	pub cache_location: CacheLocation,
	/// Mirrors temporary request state into cookies for browsers that drop storage across
	/// redirects.
	pub store_auth_state_in_cookie: bool,
}

/// Timing and logging knobs.
#[derive(Clone, Debug)]
pub struct SystemOptions {
	/// Seconds before expiry at which a cached token is treated as expired.
	pub token_renewal_offset_seconds: i64,
	/// Popup monitoring timeout.
	pub window_hash_timeout: StdDuration,
	/// Hidden iframe monitoring timeout.
	pub iframe_hash_timeout: StdDuration,
	/// Delay before loading the hidden iframe; zero loads it synchronously.
	pub load_frame_timeout: StdDuration,
	/// Allows navigation URLs and account names in debug events.
	pub pii_logging_enabled: bool,
}
impl SystemOptions {
	/// Renewal buffer as a signed duration.
	pub fn token_renewal_offset(&self) -> Duration {
		Duration::seconds(self.token_renewal_offset_seconds)
	}
}
impl Default for SystemOptions {
	fn default() -> Self {
		Self {
			token_renewal_offset_seconds: 300,
			window_hash_timeout: StdDuration::from_secs(60),
			iframe_hash_timeout: StdDuration::from_secs(6),
			load_frame_timeout: StdDuration::ZERO,
			pii_logging_enabled: false,
		}
	}
}

/// Complete client configuration.
#[derive(Clone, Debug)]
pub struct ClientConfiguration {
	/// Identity settings.
	pub auth: AuthOptions,
	/// Cache placement.
	pub cache: CacheOptions,
	/// Timing and logging knobs.
	pub system: SystemOptions,
}
impl ClientConfiguration {
	/// Starts a builder for the provided client id.
	pub fn builder(client_id: impl Into<String>) -> ClientConfigurationBuilder {
		ClientConfigurationBuilder::new(client_id)
	}

	/// Configured client id.
	pub fn client_id(&self) -> &str {
		&self.auth.client_id
	}
}

/// Builder for [`ClientConfiguration`] values.
#[derive(Debug)]
pub struct ClientConfigurationBuilder {
	auth: AuthOptions,
	cache: CacheOptions,
	system: SystemOptions,
}
impl ClientConfigurationBuilder {
	/// Creates a builder seeded with defaults.
	pub fn new(client_id: impl Into<String>) -> Self {
		Self {
			auth: AuthOptions {
				client_id: client_id.into(),
				authority: DEFAULT_AUTHORITY.into(),
				known_authorities: Vec::new(),
				redirect_uri: None,
				post_logout_redirect_uri: None,
			},
			cache: CacheOptions::default(),
			system: SystemOptions::default(),
		}
	}

	/// Overrides the default authority.
	pub fn authority(mut self, authority: impl Into<String>) -> Self {
		self.auth.authority = authority.into();

		self
	}

	/// Sets the redirect URI.
	pub fn redirect_uri(mut self, uri: impl Into<RedirectUri>) -> Self {
		self.auth.redirect_uri = Some(uri.into());

		self
	}

	/// Sets the post-logout redirect URI.
	pub fn post_logout_redirect_uri(mut self, uri: impl Into<RedirectUri>) -> Self {
		self.auth.post_logout_redirect_uri = Some(uri.into());

		self
	}

	/// Adds hosts trusted as B2C authorities.
	pub fn known_authorities<I, S>(mut self, hosts: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.auth.known_authorities.extend(hosts.into_iter().map(Into::into));

		self
	}

	/// Overrides the cache placement.
	pub fn cache(mut self, cache: CacheOptions) -> Self {
		self.cache = cache;

		self
	}

	/// Overrides the timing and logging knobs.
	pub fn system(mut self, system: SystemOptions) -> Self {
		self.system = system;

		self
	}

	/// Validates the authority and returns the configuration.
	pub fn build(self) -> Result<ClientConfiguration> {
		UrlString::new(&self.auth.authority)?.validate_as_uri()?;

		Ok(ClientConfiguration { auth: self.auth, cache: self.cache, system: self.system })
	}
}
