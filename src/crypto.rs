//! Crypto capability consumed by the client: GUIDs, base64, and PKCE pairs.

// crates.io
use base64::{
	Engine as _,
	engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE_NO_PAD},
};
use rand::{Rng, distr::Alphanumeric};
use sha2::{Digest, Sha256};
// self
use crate::_prelude::*;

const PKCE_VERIFIER_LEN: usize = 64;

/// Boxed future returned by [`Crypto`] async operations.
pub type CryptoFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// PKCE verifier/challenge pair.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PkceCodes {
	/// Secret verifier cached until the code exchange.
	pub verifier: String,
	/// S256 challenge sent on the authorization request.
	pub challenge: String,
}
impl Debug for PkceCodes {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("PkceCodes")
			.field("verifier", &"<redacted>")
			.field("challenge", &self.challenge)
			.finish()
	}
}

/// Pluggable crypto capability.
pub trait Crypto
where
	Self: Send + Sync,
{
	/// Creates a new random GUID string.
	fn create_new_guid(&self) -> Result<String>;

	/// Base64-encodes a UTF-8 string.
	fn base64_encode(&self, input: &str) -> String;

	/// Decodes a base64 or base64url string into UTF-8.
	fn base64_decode(&self, input: &str) -> Result<String>;

	/// Generates a PKCE verifier and its S256 challenge.
	fn generate_pkce_codes(&self) -> CryptoFuture<'_, PkceCodes>;
}

/// Default [`Crypto`] implementation backed by `rand`, `sha2`, and `base64`.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultCrypto;
impl Crypto for DefaultCrypto {
	fn create_new_guid(&self) -> Result<String> {
		let mut bytes: [u8; 16] = rand::random();

		// RFC 4122 version 4, variant 1.
		bytes[6] = (bytes[6] & 0x0f) | 0x40;
		bytes[8] = (bytes[8] & 0x3f) | 0x80;

		let hex = bytes.iter().map(|b| format!("{b:02x}")).collect::<String>();

		Ok(format!(
			"{}-{}-{}-{}-{}",
			&hex[0..8],
			&hex[8..12],
			&hex[12..16],
			&hex[16..20],
			&hex[20..32]
		))
	}

	fn base64_encode(&self, input: &str) -> String {
		STANDARD.encode(input)
	}

	fn base64_decode(&self, input: &str) -> Result<String> {
		let normalized = input
			.trim()
			.trim_end_matches('=')
			.chars()
			.map(|c| match c {
				'-' => '+',
				'_' => '/',
				c => c,
			})
			.collect::<String>();
		let bytes = STANDARD_NO_PAD
			.decode(normalized)
			.map_err(|e| Error::with_detail(ErrorKind::Unexpected, e.to_string()).with_source(e))?;

		String::from_utf8(bytes)
			.map_err(|e| Error::with_detail(ErrorKind::Unexpected, e.to_string()).with_source(e))
	}

	fn generate_pkce_codes(&self) -> CryptoFuture<'_, PkceCodes> {
		Box::pin(async move {
			let verifier = random_string(PKCE_VERIFIER_LEN);
			let challenge = compute_pkce_challenge(&verifier);

			Ok(PkceCodes { verifier, challenge })
		})
	}
}

fn random_string(len: usize) -> String {
	rand::rng().sample_iter(Alphanumeric).take(len).map(char::from).collect()
}

fn compute_pkce_challenge(verifier: &str) -> String {
	let mut hasher = Sha256::new();

	hasher.update(verifier.as_bytes());

	URL_SAFE_NO_PAD.encode(hasher.finalize())
}
