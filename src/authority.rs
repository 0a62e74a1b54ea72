//! Authorities: canonical trust-boundary URLs and their discovered OAuth endpoints.
//!
//! `factory` decides the [`AuthorityKind`] for a URL from an explicit B2C allow-list.
//! `discovery` models the OpenID configuration document. [`Authority`] memoizes the
//! document after the first successful fetch; endpoint getters fail until then.

pub mod discovery;
pub mod factory;

pub use discovery::*;
pub use factory::*;

// self
use crate::{
	_prelude::*,
	http::NetworkClient,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	uri::{UrlComponents, UrlString},
};

/// Supported authority families.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AuthorityKind {
	/// Azure AD style authority (default).
	Aad,
	/// B2C authority whose host is on the trusted list.
	B2c,
}
impl AuthorityKind {
	/// Returns a stable label.
	pub const fn as_str(self) -> &'static str {
		match self {
			AuthorityKind::Aad => "aad",
			AuthorityKind::B2c => "b2c",
		}
	}
}
impl Display for AuthorityKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Validated authority with lazily discovered endpoints.
pub struct Authority {
	kind: AuthorityKind,
	canonical: UrlString,
	components: UrlComponents,
	network: Arc<dyn NetworkClient>,
	discovery: OnceCell<OpenIdConfiguration>,
}
impl Authority {
	/// Validates `authority` as an https URL with at least one path segment.
	pub fn new(
		authority: &str,
		kind: AuthorityKind,
		network: Arc<dyn NetworkClient>,
	) -> Result<Self> {
		let canonical = UrlString::new(authority)?;

		canonical.validate_as_uri()?;

		let components = canonical.components()?;

		Ok(Self { kind, canonical, components, network, discovery: OnceCell::new() })
	}

	/// Authority family.
	pub fn kind(&self) -> AuthorityKind {
		self.kind
	}

	/// Canonical URL, always ending in `/`.
	pub fn canonical_authority(&self) -> &str {
		self.canonical.as_str()
	}

	/// Parsed components of the canonical URL.
	pub fn canonical_authority_url_components(&self) -> &UrlComponents {
		&self.components
	}

	/// First path segment.
	pub fn tenant(&self) -> &str {
		self.components.path_segments.first().map(String::as_str).unwrap_or_default()
	}

	/// OpenID configuration URL for this authority.
	pub fn openid_configuration_endpoint(&self) -> String {
		format!("{}v2.0/.well-known/openid-configuration", self.canonical.as_str())
	}

	/// Returns true once discovery has completed.
	pub fn is_discovery_complete(&self) -> bool {
		self.discovery.get().is_some()
	}

	/// Fetches and memoizes the OpenID configuration.
	///
	/// Concurrent callers share one fetch. A failed fetch is not memoized, so a later call
	/// retries; the caller decides whether to.
	pub async fn resolve_endpoints(&self) -> Result<()> {
		if self.is_discovery_complete() {
			return Ok(());
		}

		let span = FlowSpan::new(FlowKind::Discovery, "resolve_endpoints");

		obs::record_flow_outcome(FlowKind::Discovery, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				obs::record_authority(self.canonical_authority());

				self.discovery.get_or_try_init(|| self.discover_endpoints()).await.map(|_| ())
			})
			.await;

		obs::record_flow_result(FlowKind::Discovery, &result);

		result
	}

	/// Authorization endpoint with `{tenant}` replaced.
	pub fn authorization_endpoint(&self) -> Result<String> {
		Ok(self.replace_tenant(&self.discovered()?.authorization_endpoint))
	}

	/// Token endpoint with `{tenant}` replaced.
	pub fn token_endpoint(&self) -> Result<String> {
		Ok(self.replace_tenant(&self.discovered()?.token_endpoint))
	}

	/// End-session endpoint with `{tenant}` replaced.
	pub fn end_session_endpoint(&self) -> Result<String> {
		let endpoint = self.discovered()?.end_session_endpoint.as_deref().ok_or_else(|| {
			Error::with_detail(ErrorKind::EndpointResolution, "No end_session_endpoint advertised.")
		})?;

		Ok(self.replace_tenant(endpoint))
	}

	/// Issuer with `{tenant}` replaced.
	pub fn self_signed_jwt_audience(&self) -> Result<String> {
		Ok(self.replace_tenant(&self.discovered()?.issuer))
	}

	fn discovered(&self) -> Result<&OpenIdConfiguration> {
		self.discovery
			.get()
			.ok_or_else(|| Error::with_detail(ErrorKind::EndpointResolution, "Discovery incomplete."))
	}

	fn replace_tenant(&self, endpoint: &str) -> String {
		endpoint.replacen("{tenant}", self.tenant(), 1)
	}

	async fn discover_endpoints(&self) -> Result<OpenIdConfiguration> {
		let endpoint = self.openid_configuration_endpoint();

		#[cfg(feature = "tracing")]
		tracing::debug!(authority = self.canonical_authority(), "Resolving authority endpoints.");

		let body = self.network.send_get_request(&endpoint, None).await.map_err(|e| {
			Error::with_detail(ErrorKind::EndpointResolution, e.to_string()).with_source(e)
		})?;

		OpenIdConfiguration::from_json(body)
	}
}
impl Debug for Authority {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Authority")
			.field("kind", &self.kind)
			.field("canonical", &self.canonical.as_str())
			.field("discovered", &self.is_discovery_complete())
			.finish()
	}
}
