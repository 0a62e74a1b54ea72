//! Authorization Code + PKCE client core for single-page apps: correlated authorization
//! requests, authority discovery, fragment validation, and a scope-aware token cache.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod authority;
pub mod cache;
pub mod clock;
pub mod config;
pub mod crypto;
pub mod error;
pub mod flows;
pub mod http;
pub mod interaction;
pub mod obs;
pub mod request;
pub mod storage;
pub mod uri;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// crates.io
	use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
	// self
	use crate::{
		config::ClientConfiguration,
		crypto::{Crypto, CryptoFuture, DefaultCrypto, PkceCodes},
		flows::AuthorizationCodeModule,
		http::ReqwestNetworkClient,
		storage::{CacheStorage, MemoryStorage},
	};

	/// Client identifier shared by fixtures.
	pub const TEST_CLIENT_ID: &str = "0813e1d1-ad72-46a9-8665-399bba48c201";
	/// GUID returned by [`StaticCrypto`].
	pub const TEST_GUID: &str = "11553a9b-7116-48b1-9d48-f6d4a8ff8371";
	/// PKCE verifier returned by [`StaticCrypto`].
	pub const TEST_VERIFIER: &str = "Y5LnOOlAWK0kt370Bjm0ZcrW9Sc2pMXR1slip9TFZXoyUV8Y8lCn0WHu_YCZ0dJ";
	/// PKCE challenge returned by [`StaticCrypto`].
	pub const TEST_CHALLENGE: &str = "JsjesZmxJwehdhNY9kvyr0QOeSMEvryY_EHZo3BKrqg";
	/// Raw client info blob encoding `{"uid":"123-test-uid","utid":"456-test-utid"}`.
	pub const TEST_RAW_CLIENT_INFO: &str =
		"eyJ1aWQiOiIxMjMtdGVzdC11aWQiLCJ1dGlkIjoiNDU2LXRlc3QtdXRpZCJ9";
	/// Home account identifier derived from [`TEST_RAW_CLIENT_INFO`].
	pub const TEST_HOME_ACCOUNT_ID: &str = "MTIzLXRlc3QtdWlk.NDU2LXRlc3QtdXRpZA==";

	/// Deterministic crypto capability: fixed GUID and PKCE pair, real base64.
	#[derive(Clone, Debug)]
	pub struct StaticCrypto {
		/// GUID returned from every [`Crypto::create_new_guid`] call.
		pub guid: String,
		/// PKCE pair returned from every [`Crypto::generate_pkce_codes`] call.
		pub pkce: PkceCodes,
	}
	impl Default for StaticCrypto {
		fn default() -> Self {
			Self {
				guid: TEST_GUID.into(),
				pkce: PkceCodes { verifier: TEST_VERIFIER.into(), challenge: TEST_CHALLENGE.into() },
			}
		}
	}
	impl Crypto for StaticCrypto {
		fn create_new_guid(&self) -> Result<String> {
			Ok(self.guid.clone())
		}

		fn base64_encode(&self, input: &str) -> String {
			DefaultCrypto.base64_encode(input)
		}

		fn base64_decode(&self, input: &str) -> Result<String> {
			DefaultCrypto.base64_decode(input)
		}

		fn generate_pkce_codes(&self) -> CryptoFuture<'_, PkceCodes> {
			let pkce = self.pkce.clone();

			Box::pin(async move { Ok(pkce) })
		}
	}

	/// Builds a reqwest network client that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	pub fn test_reqwest_network_client() -> ReqwestNetworkClient {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestNetworkClient::with_client(client)
	}

	/// Constructs an [`AuthorizationCodeModule`] backed by in-memory storage, [`StaticCrypto`],
	/// and the reqwest transport used across integration tests.
	pub fn build_reqwest_test_module(
		config: ClientConfiguration,
	) -> (AuthorizationCodeModule, Arc<MemoryStorage>) {
		let storage_backend = Arc::new(MemoryStorage::default());
		let storage: Arc<dyn CacheStorage> = storage_backend.clone();
		let module = AuthorizationCodeModule::new(
			config,
			storage,
			Arc::new(test_reqwest_network_client()),
			Arc::new(StaticCrypto::default()),
		);

		(module, storage_backend)
	}

	/// Encodes unsigned compact JWT with the provided claims as its payload.
	pub fn encode_test_id_token(claims: &serde_json::Value) -> String {
		let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
		let payload = URL_SAFE_NO_PAD.encode(claims.to_string());

		format!("{header}.{payload}.signature")
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::{Mutex as AsyncMutex, OnceCell};
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, ErrorCategory, ErrorKind, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(all(test, feature = "reqwest"))] use {color_eyre as _, httpmock as _};
