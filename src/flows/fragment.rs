//! Redirect fragment validation.

// self
use crate::{
	_prelude::*,
	auth::ClientInfo,
	cache::{PersistentCacheKey, TemporaryCacheKey},
	flows::AuthorizationCodeModule,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	request::{CodeResponse, ServerAuthorizationCodeResponse},
};

impl AuthorizationCodeModule {
	/// Validates the redirect fragment against the pending request.
	///
	/// A state mismatch leaves storage untouched since the fragment may belong to another
	/// request in flight. A server error clears the pending request of that state.
	pub fn handle_fragment_response(&self, hash: &str) -> Result<CodeResponse> {
		const KIND: FlowKind = FlowKind::FragmentResponse;

		let _guard = FlowSpan::new(KIND, "handle_fragment_response").entered();

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = self.validate_fragment(hash);

		obs::record_flow_result(KIND, &result);

		result
	}

	fn validate_fragment(&self, hash: &str) -> Result<CodeResponse> {
		if hash.trim().is_empty() {
			return Err(ErrorKind::HashEmpty.into());
		}

		let response = ServerAuthorizationCodeResponse::from_hash(hash)?;
		let cached_state = self.cache.get_temporary(TemporaryCacheKey::RequestState);
		let state = match (response.state.as_deref(), cached_state.as_deref()) {
			(Some(returned), Some(cached)) if returned == cached => returned.to_owned(),
			(returned, cached) => {
				#[cfg(feature = "tracing")]
				tracing::warn!(
					returned_state = returned,
					cached_state = cached,
					"Fragment state does not match the pending request."
				);

				return Err(Error::with_detail(
					ErrorKind::StateMismatch,
					format!(
						"Cached state: {}, state: {}",
						cached.unwrap_or_default(),
						returned.unwrap_or_default()
					),
				));
			},
		};

		if let Some(error) = response.error {
			self.cache.reset_temp_cache_items(&state);

			return Err(Error::server(error, response.error_description.unwrap_or_default()));
		}
		if let Some(raw) = response.client_info.as_deref() {
			ClientInfo::parse(raw, self.crypto.as_ref())?;
			self.cache.set_persistent(PersistentCacheKey::ClientInfo, raw);
		}

		Ok(CodeResponse { code: response.code, user_request_state: state })
	}
}
