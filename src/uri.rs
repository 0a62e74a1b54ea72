//! URL canonicalization, component extraction, and fragment helpers.
//!
//! [`UrlString`] wraps authority and endpoint URLs in their canonical form: lowercase
//! before any query or fragment, with a trailing `/` on the path. Fragment helpers work
//! on raw `href`/hash strings because authorization codes and states are case sensitive.

// self
use crate::_prelude::*;

/// Tenant path segments that may be replaced with a concrete tenant identifier.
const REPLACEABLE_TENANTS: [&str; 2] = ["common", "organizations"];
/// Fragment parameters that mark a server response.
const KNOWN_HASH_PROPERTIES: [&str; 4] = ["code", "token", "id_token", "error"];

/// Canonicalized URL string.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct UrlString(String);
impl UrlString {
	/// Canonicalizes the provided URL; fails with [`ErrorKind::UrlEmpty`] on empty input.
	pub fn new(raw: impl AsRef<str>) -> Result<Self> {
		let raw = raw.as_ref().trim();

		if raw.is_empty() {
			return Err(ErrorKind::UrlEmpty.into());
		}

		Ok(Self(canonicalize(raw)))
	}

	/// Canonical string form.
	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// Ensures the URL is an https URI with at least one non-empty path segment.
	pub fn validate_as_uri(&self) -> Result<()> {
		let components = self.components()?;

		if components.path_segments.is_empty() {
			return Err(Error::with_detail(
				ErrorKind::UrlParse,
				format!("Given url string: {}", self.0),
			));
		}
		if components.protocol != "https:" {
			return Err(Error::with_detail(
				ErrorKind::AuthorityUriInsecure,
				format!("Given URI: {}", self.0),
			));
		}

		Ok(())
	}

	/// Splits the URL into its components.
	pub fn components(&self) -> Result<UrlComponents> {
		let url = Url::parse(&self.0).map_err(|e| {
			Error::with_detail(ErrorKind::UrlParse, format!("Given url string: {}", self.0))
				.with_source(e)
		})?;
		let host = url.host_str().unwrap_or_default();

		if host.is_empty() {
			return Err(Error::with_detail(
				ErrorKind::UrlParse,
				format!("Given url string: {}", self.0),
			));
		}

		let host_name_and_port = match url.port() {
			Some(port) => format!("{host}:{port}"),
			None => host.to_owned(),
		};
		let path_segments = url
			.path_segments()
			.map(|segments| {
				segments.filter(|s| !s.is_empty()).map(ToOwned::to_owned).collect::<Vec<_>>()
			})
			.unwrap_or_default();

		Ok(UrlComponents {
			protocol: format!("{}:", url.scheme()),
			host_name_and_port,
			absolute_path: url.path().to_owned(),
			path_segments,
			search: url.query().map(|q| format!("?{q}")),
			hash: url.fragment().map(|f| format!("#{f}")),
		})
	}

	/// Replaces a `common` or `organizations` first path segment with `tenant_id`.
	pub fn replace_tenant_path(&self, tenant_id: &str) -> Result<Self> {
		let mut components = self.components()?;

		match components.path_segments.first_mut() {
			Some(first) if !tenant_id.is_empty() && REPLACEABLE_TENANTS.contains(&first.as_str()) => {
				*first = tenant_id.to_lowercase();
			},
			_ => return Ok(self.clone()),
		}

		Self::new(Self::construct_authority_uri_from_components(&components))
	}

	/// Removes every occurrence of the named query parameter.
	pub fn remove_query_string_parameter(&self, name: &str) -> Self {
		let Ok(mut url) = Url::parse(&self.0) else {
			return self.clone();
		};
		let retained = url
			.query_pairs()
			.filter(|(key, _)| key != name)
			.map(|(key, value)| (key.into_owned(), value.into_owned()))
			.collect::<Vec<_>>();

		if retained.is_empty() {
			url.set_query(None);
		} else {
			url.query_pairs_mut().clear().extend_pairs(retained);
		}

		Self(url.to_string())
	}

	/// Builds `{protocol}//{host}/{segments}/` from parsed components.
	pub fn construct_authority_uri_from_components(components: &UrlComponents) -> String {
		format!(
			"{}//{}/{}",
			components.protocol,
			components.host_name_and_port,
			components.path_segments.join("/")
		)
	}

	/// Returns the fragment of `href` without its leading `#` or `#/`.
	pub fn get_hash(href: &str) -> &str {
		let Some(index) = href.find('#') else {
			return "";
		};
		let hash = &href[index + 1..];

		hash.strip_prefix('/').unwrap_or(hash)
	}

	/// Parses a `#k=v&k=v` fragment (or a full `href`) into decoded parameters.
	pub fn get_deserialized_hash(hash: &str) -> Result<BTreeMap<String, String>> {
		let raw = if hash.contains('#') { Self::get_hash(hash) } else { hash };
		let params = url::form_urlencoded::parse(raw.as_bytes())
			.filter(|(key, _)| !key.is_empty())
			.map(|(key, value)| (key.into_owned(), value.into_owned()))
			.collect::<BTreeMap<_, _>>();

		if params.is_empty() {
			return Err(Error::with_detail(ErrorKind::HashNotDeserialized, format!("Given hash: {hash}")));
		}

		Ok(params)
	}

	/// Returns true when the fragment carries at least one server response parameter.
	pub fn hash_contains_known_properties(href: &str) -> bool {
		Self::get_deserialized_hash(href)
			.map(|params| KNOWN_HASH_PROPERTIES.iter().any(|key| params.contains_key(*key)))
			.unwrap_or(false)
	}
}
impl AsRef<str> for UrlString {
	fn as_ref(&self) -> &str {
		&self.0
	}
}
impl Display for UrlString {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}
impl FromStr for UrlString {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self> {
		Self::new(s)
	}
}

/// Parsed URL components.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UrlComponents {
	/// Scheme including the trailing colon, e.g. `https:`.
	pub protocol: String,
	/// Host with an explicit port when one is present.
	pub host_name_and_port: String,
	/// Path as it appears in the URL.
	pub absolute_path: String,
	/// Non-empty path segments in order.
	pub path_segments: Vec<String>,
	/// Query string including `?`, when present.
	pub search: Option<String>,
	/// Fragment including `#`, when present.
	pub hash: Option<String>,
}

fn canonicalize(raw: &str) -> String {
	let split = raw.find(['?', '#']).unwrap_or(raw.len());
	let (base, rest) = raw.split_at(split);
	let mut canonical = base.to_lowercase();

	if !canonical.ends_with('/') {
		canonical.push('/');
	}

	canonical.push_str(rest);

	canonical
}
