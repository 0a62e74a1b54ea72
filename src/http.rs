//! Network capability consumed for discovery and token exchanges.
//!
//! The client's only dependency on an HTTP stack is [`NetworkClient`]. Implementations
//! return the decoded JSON body for 2xx responses and surface everything else as a
//! [`NetworkError`]; non-2xx bodies are kept verbatim so the caller can map OAuth error
//! payloads. The optional `reqwest` feature ships [`ReqwestNetworkClient`].

// std
#[cfg(feature = "reqwest")] use std::ops::Deref;
// self
use crate::{_prelude::*, error::BoxError};

/// Boxed future returned by [`NetworkClient`] requests.
pub type NetworkFuture<'a> =
	Pin<Box<dyn Future<Output = Result<serde_json::Value, NetworkError>> + 'a + Send>>;

/// Headers and optional body for a request; serialization is the caller's job.
#[derive(Clone, Debug, Default)]
pub struct NetworkRequestOptions {
	/// Request headers.
	pub headers: BTreeMap<String, String>,
	/// Pre-serialized request body.
	pub body: Option<String>,
}
impl NetworkRequestOptions {
	/// Builds options carrying a form-encoded body.
	pub fn form(body: impl Into<String>) -> Self {
		let mut headers = BTreeMap::new();

		headers.insert("Content-Type".into(), "application/x-www-form-urlencoded;charset=utf-8".into());

		Self { headers, body: Some(body.into()) }
	}
}

/// Failures surfaced by [`NetworkClient`] implementations.
#[derive(Debug, ThisError)]
pub enum NetworkError {
	/// The request never produced a response.
	#[error("Network transport failed: {source}.")]
	Transport {
		/// Underlying transport failure.
		#[source]
		source: BoxError,
	},
	/// The server answered with a non-success status.
	#[error("Server responded with HTTP {status}.")]
	Status {
		/// HTTP status code.
		status: u16,
		/// Raw response body.
		body: String,
	},
	/// The response body was not valid JSON.
	#[error("Response body could not be decoded: {source}.")]
	Decode {
		/// JSON decoding failure.
		#[source]
		source: serde_json::Error,
	},
}
impl NetworkError {
	/// Wraps an arbitrary transport failure.
	pub fn transport(source: impl 'static + Send + Sync + StdError) -> Self {
		Self::Transport { source: Box::new(source) }
	}
}

/// Asynchronous HTTP capability.
pub trait NetworkClient
where
	Self: 'static + Send + Sync,
{
	/// Issues a GET request and decodes the JSON response.
	fn send_get_request<'a>(
		&'a self,
		url: &'a str,
		options: Option<NetworkRequestOptions>,
	) -> NetworkFuture<'a>;

	/// Issues a POST request and decodes the JSON response.
	fn send_post_request<'a>(
		&'a self,
		url: &'a str,
		options: Option<NetworkRequestOptions>,
	) -> NetworkFuture<'a>;
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[cfg(feature = "reqwest")]
#[derive(Clone, Default)]
pub struct ReqwestNetworkClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestNetworkClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	async fn execute(
		request: reqwest::RequestBuilder,
		options: Option<NetworkRequestOptions>,
	) -> Result<serde_json::Value, NetworkError> {
		let mut request = request;

		if let Some(options) = options {
			for (name, value) in &options.headers {
				request = request.header(name, value);
			}
			if let Some(body) = options.body {
				request = request.body(body);
			}
		}

		let response = request.send().await.map_err(NetworkError::transport)?;
		let status = response.status();
		let body = response.text().await.map_err(NetworkError::transport)?;

		if !status.is_success() {
			return Err(NetworkError::Status { status: status.as_u16(), body });
		}

		serde_json::from_str(&body).map_err(|source| NetworkError::Decode { source })
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestNetworkClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestNetworkClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl NetworkClient for ReqwestNetworkClient {
	fn send_get_request<'a>(
		&'a self,
		url: &'a str,
		options: Option<NetworkRequestOptions>,
	) -> NetworkFuture<'a> {
		Box::pin(Self::execute(self.0.get(url), options))
	}

	fn send_post_request<'a>(
		&'a self,
		url: &'a str,
		options: Option<NetworkRequestOptions>,
	) -> NetworkFuture<'a> {
		Box::pin(Self::execute(self.0.post(url), options))
	}
}
