//! OpenID configuration document returned by authority discovery.

// self
use crate::_prelude::*;

/// Endpoint templates advertised by an authority; `{tenant}` is resolved at read time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenIdConfiguration {
	/// Authorization endpoint template.
	pub authorization_endpoint: String,
	/// Token endpoint template.
	pub token_endpoint: String,
	/// End-session endpoint template, when advertised.
	#[serde(default)]
	pub end_session_endpoint: Option<String>,
	/// Issuer template.
	pub issuer: String,
}
impl OpenIdConfiguration {
	/// Decodes a discovery response, naming the offending field on failure.
	pub fn from_json(body: serde_json::Value) -> Result<Self> {
		serde_path_to_error::deserialize(body).map_err(|e| {
			let detail = format!("Invalid discovery document at {}: {}.", e.path(), e.inner());

			Error::with_detail(ErrorKind::EndpointResolution, detail).with_source(e)
		})
	}
}
