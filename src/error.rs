//! Client-wide error types shared across the orchestrator, cache, authority, and handlers.
//!
//! Every failure is an [`Error`] carrying a closed [`ErrorKind`], an optional detail string
//! appended to the kind's fixed description, and (when available) the underlying source.
//! Callers branch on [`Error::kind`] or the stable [`Error::code`]; nothing here is retried
//! automatically.

// self
use crate::_prelude::*;

/// Client-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical client error exposed by public APIs.
#[derive(Debug, ThisError)]
#[error("{}", render(.kind, .detail))]
pub struct Error {
	/// Closed classification of the failure.
	pub kind: ErrorKind,
	/// Extra context appended to the kind's fixed description.
	pub detail: Option<String>,
	#[source]
	source: Option<BoxError>,
}
impl Error {
	/// Creates an error of the provided kind without detail.
	pub fn new(kind: ErrorKind) -> Self {
		Self { kind, detail: None, source: None }
	}

	/// Creates an error of the provided kind with a detail string.
	pub fn with_detail(kind: ErrorKind, detail: impl Into<String>) -> Self {
		Self { kind, detail: Some(detail.into()), source: None }
	}

	/// Creates a server error carrying the provider's code and description verbatim.
	pub fn server(error: impl Into<String>, error_description: impl Into<String>) -> Self {
		Self::new(ErrorKind::Server {
			error: error.into(),
			error_description: error_description.into(),
		})
	}

	/// Attaches the underlying failure as the error source.
	pub fn with_source(mut self, source: impl 'static + Send + Sync + std::error::Error) -> Self {
		self.source = Some(Box::new(source));

		self
	}

	/// Stable wire code for the failure.
	pub fn code(&self) -> &str {
		self.kind.code()
	}

	/// Fixed human-readable description for the failure kind.
	pub fn description(&self) -> &str {
		self.kind.description()
	}

	/// Category the failure belongs to.
	pub fn category(&self) -> ErrorCategory {
		self.kind.category()
	}

	/// Returns true when the failure stems from caller-supplied configuration or input.
	pub fn is_configuration(&self) -> bool {
		matches!(self.category(), ErrorCategory::Configuration)
	}
}
impl From<ErrorKind> for Error {
	fn from(kind: ErrorKind) -> Self {
		Self::new(kind)
	}
}

/// Broad grouping used to decide who must act on a failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
	/// Invalid caller input or configuration; fix the call site, never retry.
	Configuration,
	/// Runtime failure inside the client (cache, discovery, validation).
	Client,
	/// Failure while driving a popup, iframe, or redirect interaction.
	Browser,
	/// Error returned by the authorization server.
	Server,
}
impl ErrorCategory {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			ErrorCategory::Configuration => "configuration",
			ErrorCategory::Client => "client",
			ErrorCategory::Browser => "browser",
			ErrorCategory::Server => "server",
		}
	}
}

/// Closed set of failure kinds surfaced by the client.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
	/// Client info blob could not be decoded.
	ClientInfoDecoding,
	/// Client info blob was empty.
	ClientInfoEmpty,
	/// ID token could not be split or decoded.
	IdTokenParsing,
	/// ID token was empty.
	NullOrEmptyIdToken,
	/// Pending token request missing or unreadable in the cache.
	TokenRequestCache,
	/// Authority endpoints could not be resolved.
	EndpointResolution,
	/// Authority URL does not map to a supported authority type.
	InvalidAuthorityType,
	/// Fragment parameters could not be deserialized.
	HashNotDeserialized,
	/// GUID generation returned an empty value.
	BlankGuidGenerated,
	/// Returned state does not match the cached request state.
	StateMismatch,
	/// ID token nonce does not match the cached nonce.
	NonceMismatch,
	/// Cached account differs from the account that made the request.
	AccountMismatch,
	/// ID token has an invalid format.
	InvalidIdToken,
	/// No cached token satisfies the request.
	NoTokensFound,
	/// A cache key could not be parsed.
	CacheParse,
	/// The operation requires a signed-in account.
	UserLoginRequired,
	/// More than one cached token satisfies the request.
	MultipleMatchingTokens,
	/// Neither an authorization code nor a refresh token is available.
	TokenRequestCannotBeMade,
	/// An empty scope was appended to a scope set.
	CannotAppendEmptyScope,
	/// An empty scope was removed from a scope set.
	CannotRemoveEmptyScope,
	/// An empty scope set was used where one is required.
	EmptyInputScopeSet,
	/// Network capability reported a failure.
	Network,
	/// Unexpected failure from an injected capability.
	Unexpected,
	/// Redirect URI is not configured.
	RedirectUriEmpty,
	/// Post-logout redirect URI is not configured.
	PostLogoutUriEmpty,
	/// Claims request is not valid JSON.
	ClaimsRequestParsing,
	/// Authority URL is not https.
	AuthorityUriInsecure,
	/// URL could not be split into components.
	UrlParse,
	/// URL was empty.
	UrlEmpty,
	/// Scopes were missing or empty.
	EmptyInputScopes,
	/// Client id was mixed with other scopes.
	ClientIdInputScopes,
	/// Prompt value is not supported.
	InvalidPrompt,
	/// Token request was empty.
	TokenRequestEmpty,
	/// Selected storage area is unavailable.
	StorageNotSupported,
	/// Fragment to process was empty.
	HashEmpty,
	/// Navigation URL was empty.
	EmptyNavigateUri,
	/// User closed the popup before completion.
	UserCancelled,
	/// Monitored window did not complete in time.
	MonitorWindowTimeout,
	/// Hidden iframe closed before completion.
	IframeClosedPrematurely,
	/// Popup window could not be opened.
	PopupWindow,
	/// Host returned no window when opening a popup.
	EmptyWindowCreated,
	/// Another interactive request is already running.
	InteractionInProgress,
	/// Hidden iframe could not be created or loaded.
	UnableToLoadFrame,
	/// Authorization server returned an error.
	Server {
		/// Server-supplied error code.
		error: String,
		/// Server-supplied error description.
		error_description: String,
	},
}
impl ErrorKind {
	/// Stable snake_case code.
	pub fn code(&self) -> &str {
		match self {
			Self::ClientInfoDecoding => "client_info_decoding_error",
			Self::ClientInfoEmpty => "client_info_empty_error",
			Self::IdTokenParsing => "id_token_parsing_error",
			Self::NullOrEmptyIdToken => "null_or_empty_id_token",
			Self::TokenRequestCache => "token_request_cache_error",
			Self::EndpointResolution => "endpoints_resolution_error",
			Self::InvalidAuthorityType => "invalid_authority_type",
			Self::HashNotDeserialized => "hash_not_deserialized",
			Self::BlankGuidGenerated => "blank_guid_generated",
			Self::StateMismatch => "state_mismatch",
			Self::NonceMismatch => "nonce_mismatch",
			Self::AccountMismatch => "account_mismatch",
			Self::InvalidIdToken => "invalid_id_token",
			Self::NoTokensFound => "no_tokens_found",
			Self::CacheParse => "cache_parse_error",
			Self::UserLoginRequired => "user_login_error",
			Self::MultipleMatchingTokens => "multiple_matching_tokens",
			Self::TokenRequestCannotBeMade => "request_cannot_be_made",
			Self::CannotAppendEmptyScope => "cannot_append_empty_scope",
			Self::CannotRemoveEmptyScope => "cannot_remove_empty_scope",
			Self::EmptyInputScopeSet => "empty_input_scopeset",
			Self::Network => "network_error",
			Self::Unexpected => "unexpected_error",
			Self::RedirectUriEmpty => "redirect_uri_empty",
			Self::PostLogoutUriEmpty => "post_logout_uri_empty",
			Self::ClaimsRequestParsing => "claims_request_parsing_error",
			Self::AuthorityUriInsecure => "authority_uri_insecure",
			Self::UrlParse => "url_parse_error",
			Self::UrlEmpty => "empty_url_error",
			Self::EmptyInputScopes => "empty_input_scopes_error",
			Self::ClientIdInputScopes => "clientid_input_scopes_error",
			Self::InvalidPrompt => "invalid_prompt_value",
			Self::TokenRequestEmpty => "token_request_empty",
			Self::StorageNotSupported => "storage_not_supported",
			Self::HashEmpty => "hash_empty_error",
			Self::EmptyNavigateUri => "empty_navigate_uri",
			Self::UserCancelled => "user_cancelled",
			Self::MonitorWindowTimeout => "monitor_window_timeout",
			Self::IframeClosedPrematurely => "iframe_closed_prematurely",
			Self::PopupWindow => "popup_window_error",
			Self::EmptyWindowCreated => "empty_window_error",
			Self::InteractionInProgress => "interaction_in_progress",
			Self::UnableToLoadFrame => "unable_to_load_frame",
			Self::Server { error, .. } => error,
		}
	}

	/// Fixed human-readable description.
	pub fn description(&self) -> &str {
		match self {
			Self::ClientInfoDecoding =>
				"The client info could not be parsed/decoded correctly. Please review the trace to determine the root cause.",
			Self::ClientInfoEmpty =>
				"The client info was empty. Please review the trace to determine the root cause.",
			Self::IdTokenParsing =>
				"ID token cannot be parsed. Please review stack trace to determine root cause.",
			Self::NullOrEmptyIdToken =>
				"The idToken is null or empty. Please review the trace to determine the root cause.",
			Self::TokenRequestCache =>
				"The token request could not be fetched from the cache correctly.",
			Self::EndpointResolution =>
				"Error: could not resolve endpoints. Please check network and try again.",
			Self::InvalidAuthorityType =>
				"The given authority is not a valid type of authority supported by this client.",
			Self::HashNotDeserialized =>
				"The hash parameters could not be deserialized. Please review the trace to determine the root cause.",
			Self::BlankGuidGenerated =>
				"The guid generated was blank. Please review the trace to determine the root cause.",
			Self::StateMismatch =>
				"State mismatch error. Please check your network. Continued requests may cause cache overflow.",
			Self::NonceMismatch =>
				"Nonce mismatch error. This may be caused by a race condition in concurrent requests.",
			Self::AccountMismatch =>
				"The cached account and account which made the token request do not match.",
			Self::InvalidIdToken => "Invalid ID token format.",
			Self::NoTokensFound =>
				"No tokens were found for the given scopes, and no authorization code was passed to acquire_token. You must retrieve an authorization code before making a call to acquire_token.",
			Self::CacheParse => "Could not parse cache key.",
			Self::UserLoginRequired => "User login is required.",
			Self::MultipleMatchingTokens =>
				"The cache contains multiple tokens satisfying the requirements. Call acquire_token again providing more requirements such as authority, resource, or account.",
			Self::TokenRequestCannotBeMade =>
				"Token request cannot be made without authorization code or refresh token.",
			Self::CannotAppendEmptyScope =>
				"Cannot append null or empty scope to ScopeSet. Please check the stack trace for more info.",
			Self::CannotRemoveEmptyScope =>
				"Cannot remove null or empty scope from ScopeSet. Please check the stack trace for more info.",
			Self::EmptyInputScopeSet => "Empty input ScopeSet cannot be processed.",
			Self::Network => "Network request failed.",
			Self::Unexpected => "Unexpected error in authentication.",
			Self::RedirectUriEmpty =>
				"A redirect URI is required for all calls, and none has been set.",
			Self::PostLogoutUriEmpty => "A post logout redirect has not been set.",
			Self::ClaimsRequestParsing => "Could not parse the given claims request object.",
			Self::AuthorityUriInsecure => "Authority URIs must use https.",
			Self::UrlParse => "URL could not be parsed into appropriate segments.",
			Self::UrlEmpty => "URL was empty or null.",
			Self::EmptyInputScopes =>
				"Scopes cannot be passed as null, undefined or empty array because they are required to obtain an access token.",
			Self::ClientIdInputScopes => "Client ID can only be provided as a single scope.",
			Self::InvalidPrompt =>
				"Supported prompt values are 'login', 'select_account', 'consent' and 'none'.",
			Self::TokenRequestEmpty => "Token request was empty and not found in cache.",
			Self::StorageNotSupported => "Given storage configuration option was not supported.",
			Self::HashEmpty => "Hash value cannot be processed because it is empty.",
			Self::EmptyNavigateUri => "Navigation URI is empty. Please check stack trace for more info.",
			Self::UserCancelled => "User cancelled the flow.",
			Self::MonitorWindowTimeout => "Token acquisition in popup failed due to timeout.",
			Self::IframeClosedPrematurely =>
				"The iframe being monitored was closed prematurely.",
			Self::PopupWindow =>
				"Error opening popup window. This can happen if you are using IE or if popups are blocked in the browser.",
			Self::EmptyWindowCreated => "window.open returned null or undefined window object.",
			Self::InteractionInProgress =>
				"Interaction is currently in progress. Please ensure that this interaction has been completed before calling an interactive API.",
			Self::UnableToLoadFrame => "Unable to load the hidden iframe.",
			Self::Server { error_description, .. } => error_description,
		}
	}

	/// Category the kind belongs to.
	pub fn category(&self) -> ErrorCategory {
		match self {
			Self::RedirectUriEmpty
			| Self::PostLogoutUriEmpty
			| Self::ClaimsRequestParsing
			| Self::AuthorityUriInsecure
			| Self::UrlParse
			| Self::UrlEmpty
			| Self::EmptyInputScopes
			| Self::ClientIdInputScopes
			| Self::InvalidPrompt
			| Self::TokenRequestEmpty
			| Self::StorageNotSupported => ErrorCategory::Configuration,
			Self::HashEmpty
			| Self::EmptyNavigateUri
			| Self::UserCancelled
			| Self::MonitorWindowTimeout
			| Self::IframeClosedPrematurely
			| Self::PopupWindow
			| Self::EmptyWindowCreated
			| Self::InteractionInProgress
			| Self::UnableToLoadFrame => ErrorCategory::Browser,
			Self::Server { .. } => ErrorCategory::Server,
			_ => ErrorCategory::Client,
		}
	}
}
impl Display for ErrorKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.code())
	}
}

fn render(kind: &ErrorKind, detail: &Option<String>) -> String {
	match (kind, detail) {
		(ErrorKind::Server { error, error_description }, _) =>
			format!("{error}: {error_description}"),
		(ErrorKind::MultipleMatchingTokens, Some(scopes)) =>
			format!("Cache error for scope {scopes}: {}", kind.description()),
		(_, Some(detail)) => format!("{} Detail: {detail}", kind.description()),
		(_, None) => kind.description().to_owned(),
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::error::Error as StdError;
	// self
	use super::*;

	#[test]
	fn detail_is_appended_to_description() {
		let err = Error::with_detail(ErrorKind::EndpointResolution, "Could not make a network request.");

		assert_eq!(err.code(), "endpoints_resolution_error");
		assert_eq!(
			err.to_string(),
			"Error: could not resolve endpoints. Please check network and try again. Detail: Could not make a network request."
		);
	}

	#[test]
	fn server_errors_keep_provider_fields_verbatim() {
		let err = Error::server("error_code", "msal error description");

		assert_eq!(err.code(), "error_code");
		assert_eq!(err.description(), "msal error description");
		assert_eq!(err.category(), ErrorCategory::Server);
		assert!(err.to_string().contains("msal error description"));
	}

	#[test]
	fn multiple_match_errors_name_the_scopes() {
		let err = Error::with_detail(ErrorKind::MultipleMatchingTokens, "scope1");

		assert!(err.to_string().starts_with("Cache error for scope scope1: "));
	}

	#[test]
	fn configuration_kinds_are_flagged() {
		assert!(Error::new(ErrorKind::EmptyInputScopes).is_configuration());
		assert!(Error::new(ErrorKind::AuthorityUriInsecure).is_configuration());
		assert!(!Error::new(ErrorKind::NoTokensFound).is_configuration());
		assert_eq!(ErrorKind::UserCancelled.category(), ErrorCategory::Browser);
	}

	#[test]
	fn source_is_exposed() {
		let parse = serde_json::from_str::<serde_json::Value>("{").expect_err("Input is malformed.");
		let err = Error::new(ErrorKind::TokenRequestCache).with_source(parse);

		assert!(StdError::source(&err).is_some());
	}
}
