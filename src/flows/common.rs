//! Shared helpers for flow implementations (GUIDs, request state, journaled writes, error
//! mapping).

// crates.io
use oauth2::basic::BasicErrorResponse;
// self
use crate::{
	_prelude::*,
	cache::{CacheHelpers, CacheJournal, RESOURCE_DELIM},
	crypto::Crypto,
	http::NetworkError,
	storage::CacheStorage,
};

/// Cache view whose writes are undone unless the surrounding step succeeds.
///
/// Dropping the view without [`finish`](Self::finish) rolls back as well.
pub(crate) struct JournaledCache {
	journal: Arc<CacheJournal>,
	helpers: CacheHelpers,
}
impl JournaledCache {
	pub(crate) fn new(storage: Arc<dyn CacheStorage>) -> Self {
		let journal = Arc::new(CacheJournal::new(storage));
		let helpers = CacheHelpers::new(journal.clone());

		Self { journal, helpers }
	}

	pub(crate) fn helpers(&self) -> &CacheHelpers {
		&self.helpers
	}

	/// Commits on success and rolls every journaled write back on failure.
	pub(crate) fn finish<T>(self, result: Result<T>) -> Result<T> {
		match &result {
			Ok(_) => self.journal.commit(),
			Err(_) => self.journal.rollback(),
		}

		result
	}
}
impl Drop for JournaledCache {
	// `commit` empties the journal, so this only undoes writes of an unfinished step, such as
	// a build whose future was dropped at an await point.
	fn drop(&mut self) {
		self.journal.rollback();
	}
}

/// Creates a GUID, rejecting blank values from the crypto capability.
pub(crate) fn new_guid(crypto: &dyn Crypto) -> Result<String> {
	let guid = crypto.create_new_guid()?;

	if guid.trim().is_empty() {
		return Err(ErrorKind::BlankGuidGenerated.into());
	}

	Ok(guid)
}

/// `{guid}` or `{guid}|{user_state}`.
pub(crate) fn build_request_state(guid: &str, user_state: Option<&str>) -> String {
	match user_state {
		Some(state) if !state.is_empty() => format!("{guid}{RESOURCE_DELIM}{state}"),
		_ => guid.to_owned(),
	}
}

/// Maps a token endpoint failure.
///
/// Non-2xx bodies carrying an OAuth error payload become [`ErrorKind::Server`]; everything
/// else is a [`ErrorKind::Network`] failure with the transport error attached.
pub(crate) fn map_token_endpoint_error(err: NetworkError) -> Error {
	if let NetworkError::Status { body, .. } = &err
		&& let Ok(response) = serde_json::from_str::<BasicErrorResponse>(body)
	{
		return Error::server(
			response.error().as_ref(),
			response.error_description().cloned().unwrap_or_default(),
		);
	}

	Error::with_detail(ErrorKind::Network, err.to_string()).with_source(err)
}
