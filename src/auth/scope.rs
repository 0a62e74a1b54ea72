//! Scope modeling shared by URL construction, token exchange, and cache matching.

// std
use std::slice::Iter;
// crates.io
use serde::{Deserializer, Serializer, de::Error as DeError, ser::SerializeSeq};
// self
use crate::_prelude::*;

/// OpenID Connect scope requesting an ID token.
pub const OPENID_SCOPE: &str = "openid";
/// Scope requesting basic profile claims.
pub const PROFILE_SCOPE: &str = "profile";
/// Scope requesting a refresh token.
pub const OFFLINE_ACCESS_SCOPE: &str = "offline_access";

/// Scopes always sent on a login request.
pub const LOGIN_SCOPES: [&str; 3] = [OPENID_SCOPE, PROFILE_SCOPE, OFFLINE_ACCESS_SCOPE];

/// Ordered, case-insensitive set of OAuth scopes.
///
/// Entries are trimmed and deduplicated on insertion while the first spelling and the
/// insertion order are kept, so [`print_scopes`](Self::print_scopes) reproduces what the
/// caller asked for. Comparisons ignore ASCII case. [`normalized`](Self::normalized)
/// yields the sorted, lower-cased form used inside cache keys so lookups do not depend on
/// request ordering.
#[derive(Clone, Default)]
pub struct ScopeSet {
	scopes: Vec<String>,
}
impl ScopeSet {
	/// Builds a set from arbitrary scopes, skipping blank entries.
	pub fn new<I, S>(scopes: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		let mut set = Self::default();

		for scope in scopes {
			set.insert(scope.as_ref());
		}

		set
	}

	/// Parses a space-delimited scope string such as a token response `scope` field.
	pub fn from_scope_string(scopes: &str) -> Self {
		Self::new(scopes.split_whitespace())
	}

	/// Builds the scope set sent on a login request.
	///
	/// Requested scopes come first, followed by `openid profile offline_access`. A scope
	/// equal to the client id is dropped because the login defaults already cover it.
	pub fn for_login(scopes: Option<&[String]>, client_id: &str) -> Result<Self> {
		let requested = scopes.unwrap_or_default();

		validate_client_id_usage(requested, client_id)?;

		let mut set = Self::new(requested.iter().filter(|s| !s.trim().eq_ignore_ascii_case(client_id)));

		set.append_scopes(LOGIN_SCOPES)?;

		Ok(set)
	}

	/// Builds the scope set sent when acquiring an access token.
	///
	/// Missing or empty input fails with [`ErrorKind::EmptyInputScopes`]. A sole client id
	/// scope is replaced by `openid profile`; `offline_access` is always appended.
	pub fn for_acquire_token(scopes: Option<&[String]>, client_id: &str) -> Result<Self> {
		let requested = validate_input_scopes(scopes)?;

		validate_client_id_usage(requested, client_id)?;

		let mut set = Self::for_cache_lookup(requested, client_id);

		set.append_scope(OFFLINE_ACCESS_SCOPE)?;

		Ok(set)
	}

	/// Builds the scope set compared against cached entries for a silent request.
	///
	/// Mirrors [`for_acquire_token`](Self::for_acquire_token) without `offline_access`, which
	/// is a grant-side scope and never restricts the match.
	pub fn for_cache_lookup(scopes: &[String], client_id: &str) -> Self {
		if is_client_id_only(scopes, client_id) {
			Self::new([OPENID_SCOPE, PROFILE_SCOPE])
		} else {
			Self::new(scopes)
		}
	}

	/// Number of distinct scopes.
	pub fn len(&self) -> usize {
		self.scopes.len()
	}

	/// Returns true if no scopes are present.
	pub fn is_empty(&self) -> bool {
		self.scopes.is_empty()
	}

	/// Case-insensitive membership test.
	pub fn contains_scope(&self, scope: &str) -> bool {
		let scope = scope.trim();

		!scope.is_empty() && self.scopes.iter().any(|s| s.eq_ignore_ascii_case(scope))
	}

	/// Returns true if every scope of `other` is present here.
	pub fn contains_scope_set(&self, other: &ScopeSet) -> bool {
		other.scopes.iter().all(|s| self.contains_scope(s))
	}

	/// Returns true if the two sets share at least one scope.
	pub fn intersecting_scope_sets(&self, other: &ScopeSet) -> bool {
		other.scopes.iter().any(|s| self.contains_scope(s))
	}

	/// Appends one scope unless it is already present.
	pub fn append_scope(&mut self, scope: &str) -> Result<()> {
		if scope.trim().is_empty() {
			return Err(Error::with_detail(ErrorKind::CannotAppendEmptyScope, format!("'{scope}'")));
		}

		self.insert(scope);

		Ok(())
	}

	/// Appends every scope, failing on the first blank entry.
	pub fn append_scopes<I, S>(&mut self, scopes: I) -> Result<()>
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		for scope in scopes {
			self.append_scope(scope.as_ref())?;
		}

		Ok(())
	}

	/// Removes a scope, ignoring case.
	pub fn remove_scope(&mut self, scope: &str) -> Result<()> {
		let scope = scope.trim();

		if scope.is_empty() {
			return Err(Error::with_detail(ErrorKind::CannotRemoveEmptyScope, format!("'{scope}'")));
		}

		self.scopes.retain(|s| !s.eq_ignore_ascii_case(scope));

		Ok(())
	}

	/// Space-joined scopes in insertion order, as sent on the wire.
	pub fn print_scopes(&self) -> String {
		self.scopes.join(" ")
	}

	/// Sorted, lower-cased, space-joined form used for cache keys.
	pub fn normalized(&self) -> String {
		let mut lowered = self.scopes.iter().map(|s| s.to_ascii_lowercase()).collect::<Vec<_>>();

		lowered.sort();
		lowered.join(" ")
	}

	/// Iterator over scopes in insertion order.
	pub fn iter(&self) -> impl Iterator<Item = &str> {
		self.scopes.iter().map(String::as_str)
	}

	/// Returns the underlying slice.
	pub fn as_slice(&self) -> &[String] {
		&self.scopes
	}

	/// Consumes the set, returning the scopes in insertion order.
	pub fn into_vec(self) -> Vec<String> {
		self.scopes
	}

	fn insert(&mut self, scope: &str) {
		let scope = scope.trim();

		if !scope.is_empty() && !self.contains_scope(scope) {
			self.scopes.push(scope.to_owned());
		}
	}
}
impl PartialEq for ScopeSet {
	fn eq(&self, other: &Self) -> bool {
		self.len() == other.len() && self.contains_scope_set(other)
	}
}
impl Eq for ScopeSet {}
impl Debug for ScopeSet {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("ScopeSet").field(&self.scopes).finish()
	}
}
impl Display for ScopeSet {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.print_scopes())
	}
}

/// Iterator over scope strings.
pub struct ScopeIter<'a> {
	inner: Iter<'a, String>,
}
impl<'a> Iterator for ScopeIter<'a> {
	type Item = &'a str;

	fn next(&mut self) -> Option<Self::Item> {
		self.inner.next().map(|s| s.as_str())
	}
}
impl<'a> IntoIterator for &'a ScopeSet {
	type IntoIter = ScopeIter<'a>;
	type Item = &'a str;

	fn into_iter(self) -> Self::IntoIter {
		ScopeIter { inner: self.scopes.iter() }
	}
}
impl FromStr for ScopeSet {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let set = Self::from_scope_string(s);

		if set.is_empty() {
			return Err(ErrorKind::EmptyInputScopeSet.into());
		}

		Ok(set)
	}
}
impl Serialize for ScopeSet {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		let mut seq = serializer.serialize_seq(Some(self.scopes.len()))?;

		for scope in self.scopes.iter() {
			seq.serialize_element(scope)?;
		}

		seq.end()
	}
}
impl<'de> Deserialize<'de> for ScopeSet {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		let values = <Vec<String>>::deserialize(deserializer)?;

		if values.iter().any(|s| s.trim().is_empty()) {
			return Err(DeError::custom("Scope entries cannot be empty."));
		}

		Ok(ScopeSet::new(values))
	}
}

/// Rejects missing or empty scope input.
pub fn validate_input_scopes(scopes: Option<&[String]>) -> Result<&[String]> {
	match scopes {
		None => Err(Error::with_detail(ErrorKind::EmptyInputScopes, "Scopes are required.")),
		Some([]) => Err(Error::with_detail(ErrorKind::EmptyInputScopes, "Scopes cannot be empty.")),
		Some(scopes) => Ok(scopes),
	}
}

/// Returns true when the only requested scope is the client id.
pub fn is_client_id_only(scopes: &[String], client_id: &str) -> bool {
	matches!(scopes, [only] if only.trim().eq_ignore_ascii_case(client_id))
}

fn validate_client_id_usage(scopes: &[String], client_id: &str) -> Result<()> {
	if scopes.len() > 1 && scopes.iter().any(|s| s.trim().eq_ignore_ascii_case(client_id)) {
		return Err(Error::with_detail(ErrorKind::ClientIdInputScopes, scopes.join(" ")));
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	const CLIENT_ID: &str = "0813e1d1-ad72-46a9-8665-399bba48c201";

	fn owned(scopes: &[&str]) -> Vec<String> {
		scopes.iter().map(|s| s.to_string()).collect()
	}

	#[test]
	fn scopes_dedupe_case_insensitively_and_keep_order() {
		let set = ScopeSet::new(["User.Read", " mail.read ", "user.read", ""]);

		assert_eq!(set.print_scopes(), "User.Read mail.read");
		assert_eq!(set.normalized(), "mail.read user.read");
		assert!(set.contains_scope("USER.READ"));
		assert!(!set.contains_scope(""));
	}

	#[test]
	fn login_scopes_append_defaults() {
		let requested = owned(&["testscope1", "testscope2"]);
		let set = ScopeSet::for_login(Some(requested.as_slice()), CLIENT_ID).expect("Login scopes should build.");

		assert_eq!(set.print_scopes(), "testscope1 testscope2 openid profile offline_access");

		let defaults = ScopeSet::for_login(None, CLIENT_ID).expect("Default login scopes should build.");

		assert_eq!(defaults.print_scopes(), "openid profile offline_access");

		let client_only = owned(&[CLIENT_ID]);
		let set = ScopeSet::for_login(Some(client_only.as_slice()), CLIENT_ID)
			.expect("Client id login scopes should build.");

		assert_eq!(set.print_scopes(), "openid profile offline_access");
	}

	#[test]
	fn acquire_token_scopes_substitute_client_id() {
		let requested = owned(&["s1", "s2"]);
		let set = ScopeSet::for_acquire_token(Some(requested.as_slice()), CLIENT_ID)
			.expect("Acquire token scopes should build.");

		assert_eq!(set.print_scopes(), "s1 s2 offline_access");

		let client_only = owned(&[CLIENT_ID]);
		let set = ScopeSet::for_acquire_token(Some(client_only.as_slice()), CLIENT_ID)
			.expect("Client id scope should build.");

		assert_eq!(set.print_scopes(), "openid profile offline_access");
	}

	#[test]
	fn acquire_token_scopes_reject_invalid_input() {
		let err = ScopeSet::for_acquire_token(None, CLIENT_ID).expect_err("Missing scopes must fail.");

		assert_eq!(err.kind, ErrorKind::EmptyInputScopes);

		let err =
			ScopeSet::for_acquire_token(Some([].as_slice()), CLIENT_ID).expect_err("Empty scopes must fail.");

		assert_eq!(err.kind, ErrorKind::EmptyInputScopes);

		let mixed = owned(&[CLIENT_ID, "User.Read"]);
		let err = ScopeSet::for_acquire_token(Some(mixed.as_slice()), CLIENT_ID)
			.expect_err("Client id mixed with scopes must fail.");

		assert_eq!(err.kind, ErrorKind::ClientIdInputScopes);
	}

	#[test]
	fn superset_and_intersection_ignore_case_and_order() {
		let cached = ScopeSet::from_scope_string("scope1 openid profile offline_access");
		let requested = ScopeSet::new(["SCOPE1"]);
		let unrelated = ScopeSet::new(["scope2"]);

		assert!(cached.contains_scope_set(&requested));
		assert!(cached.intersecting_scope_sets(&requested));
		assert!(!cached.contains_scope_set(&unrelated));
		assert!(!cached.intersecting_scope_sets(&unrelated));
		assert_eq!(
			ScopeSet::from_scope_string("b a"),
			ScopeSet::from_scope_string("A B"),
			"Equality ignores order and case."
		);
	}

	#[test]
	fn append_and_remove_reject_blank_scopes() {
		let mut set = ScopeSet::new(["openid"]);

		assert_eq!(
			set.append_scope(" ").expect_err("Blank append must fail.").kind,
			ErrorKind::CannotAppendEmptyScope
		);
		assert_eq!(
			set.remove_scope("").expect_err("Blank removal must fail.").kind,
			ErrorKind::CannotRemoveEmptyScope
		);

		set.append_scopes(["profile", "OPENID"]).expect("Append should succeed.");

		assert_eq!(set.print_scopes(), "openid profile");

		set.remove_scope("Profile").expect("Removal should succeed.");

		assert_eq!(set.as_slice(), ["openid".to_string()].as_slice());
		assert!(ScopeSet::from_str("   ").is_err());
	}

	#[test]
	fn serde_uses_plain_arrays() {
		let set = ScopeSet::new(["b", "a"]);
		let json = serde_json::to_string(&set).expect("Scope set should serialize.");

		assert_eq!(json, r#"["b","a"]"#);

		let parsed: ScopeSet = serde_json::from_str(&json).expect("Scope set should deserialize.");

		assert_eq!(parsed.print_scopes(), "b a");
		assert!(serde_json::from_str::<ScopeSet>(r#"["", "a"]"#).is_err());
	}
}
