//! Authority construction from a URL and the trusted B2C host list.

// self
use crate::{
	_prelude::*,
	authority::{Authority, AuthorityKind},
	http::NetworkClient,
	uri::UrlString,
};

/// Creates [`Authority`] values, classifying them against an explicit B2C host list.
#[derive(Clone, Debug, Default)]
pub struct AuthorityFactory {
	known_authorities: Vec<String>,
}
impl AuthorityFactory {
	/// Creates a factory trusting `known_authorities` as B2C hosts.
	pub fn new<I, S>(known_authorities: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self {
			known_authorities: known_authorities
				.into_iter()
				.map(|host| host.into().to_ascii_lowercase())
				.collect(),
		}
	}

	/// Trusted B2C hosts.
	pub fn known_authorities(&self) -> &[String] {
		&self.known_authorities
	}

	/// Classifies `authority`; ADFS-shaped URLs fail with [`ErrorKind::InvalidAuthorityType`].
	pub fn detect_authority_kind(&self, authority: &str) -> Result<AuthorityKind> {
		let components = UrlString::new(authority)?.components()?;

		if self.known_authorities.iter().any(|host| *host == components.host_name_and_port) {
			return Ok(AuthorityKind::B2c);
		}
		if components.path_segments.first().is_some_and(|segment| segment == "adfs") {
			return Err(Error::with_detail(ErrorKind::InvalidAuthorityType, authority.to_owned()));
		}

		Ok(AuthorityKind::Aad)
	}

	/// Validates and classifies `authority`.
	pub fn create_instance(
		&self,
		authority: &str,
		network: Arc<dyn NetworkClient>,
	) -> Result<Authority> {
		let canonical = UrlString::new(authority)?;

		canonical.validate_as_uri()?;

		let kind = self.detect_authority_kind(canonical.as_str())?;

		Authority::new(canonical.as_str(), kind, network)
	}
}

#[cfg(all(test, feature = "reqwest"))]
mod tests {
	// self
	use super::*;
	use crate::{_preludet::*, config::DEFAULT_AUTHORITY};

	fn network() -> Arc<dyn NetworkClient> {
		Arc::new(test_reqwest_network_client())
	}

	#[test]
	fn aad_is_the_default_kind() {
		let authority = AuthorityFactory::default()
			.create_instance(DEFAULT_AUTHORITY, network())
			.expect("AAD authority should build.");

		assert_eq!(authority.kind(), AuthorityKind::Aad);
	}

	#[test]
	fn known_hosts_are_b2c() {
		let factory = AuthorityFactory::new(["fabrikamb2c.b2clogin.com"]);
		let authority = factory
			.create_instance(
				"https://fabrikamb2c.b2clogin.com/fabrikamb2c.onmicrosoft.com/b2c_1_susi",
				network(),
			)
			.expect("B2C authority should build.");

		assert_eq!(authority.kind(), AuthorityKind::B2c);
		assert_eq!(authority.tenant(), "fabrikamb2c.onmicrosoft.com");
		assert_eq!(factory.known_authorities(), ["fabrikamb2c.b2clogin.com".to_string()].as_slice());
		assert_eq!(
			AuthorityFactory::default()
				.create_instance(
					"https://fabrikamb2c.b2clogin.com/fabrikamb2c.onmicrosoft.com/b2c_1_susi",
					network(),
				)
				.expect("Untrusted host falls back to AAD.")
				.kind(),
			AuthorityKind::Aad
		);
	}

	#[test]
	fn adfs_and_empty_urls_are_rejected() {
		let err = AuthorityFactory::default()
			.create_instance("https://testendpoint.domain.com/adfs", network())
			.expect_err("ADFS must be rejected.");

		assert_eq!(err.kind, ErrorKind::InvalidAuthorityType);

		let err = AuthorityFactory::default()
			.create_instance("", network())
			.expect_err("Empty authority must be rejected.");

		assert_eq!(err.kind, ErrorKind::UrlEmpty);
	}
}
