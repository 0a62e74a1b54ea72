#![cfg(feature = "reqwest")]

// crates.io
use httpmock::prelude::*;
// self
use oauth2_spa::{
	_preludet::*,
	config::ClientConfiguration,
	flows::AuthorizationCodeModule,
	request::{AuthenticationParameters, TokenRenewParameters},
	storage::{CacheStorage, MemoryStorage},
};

const REDIRECT_URI: &str = "https://localhost:8081/index.html";
const POST_LOGOUT_URI: &str = "https://localhost:8081/signed-out";

async fn mock_discovery(server: &MockServer) {
	let token_endpoint = server.url("/{tenant}/oauth2/v2.0/token");
	let end_session_endpoint = server.url("/{tenant}/oauth2/v2.0/logout");

	server
		.mock_async(move |when, then| {
			when.method(GET).path("/common/v2.0/.well-known/openid-configuration");
			then.status(200).json_body(serde_json::json!({
				"authorization_endpoint": "https://login.microsoftonline.com/{tenant}/oauth2/v2.0/authorize",
				"token_endpoint": token_endpoint,
				"end_session_endpoint": end_session_endpoint,
				"issuer": "https://login.microsoftonline.com/{tenant}/v2.0"
			}));
		})
		.await;
}

fn build_module(server: &MockServer) -> (AuthorizationCodeModule, Arc<MemoryStorage>) {
	build_reqwest_test_module(
		ClientConfiguration::builder(TEST_CLIENT_ID)
			.authority(server.url("/common"))
			.redirect_uri(REDIRECT_URI)
			.post_logout_redirect_uri(POST_LOGOUT_URI)
			.build()
			.expect("Configuration should validate for auth code test."),
	)
}

fn query_value(url: &str, key: &str) -> Option<String> {
	Url::parse(url)
		.expect("Navigation URL should parse.")
		.query_pairs()
		.find(|(k, _)| k == key)
		.map(|(_, v)| v.into_owned())
}

#[tokio::test]
async fn redirect_round_trip_caches_and_serves_tokens() {
	let server = MockServer::start_async().await;

	mock_discovery(&server).await;

	let (module, storage) = build_module(&server);
	let login_url = module
		.create_login_url(
			&AuthenticationParameters::new().with_scopes(["user.read"]).with_state("resume"),
		)
		.await
		.expect("Login URL should build.");
	let state = query_value(&login_url, "state").expect("Login URL should carry a state.");

	assert_eq!(state, format!("{TEST_GUID}|resume"));
	assert_eq!(query_value(&login_url, "nonce").as_deref(), Some(TEST_GUID));
	assert_eq!(
		query_value(&login_url, "scope").as_deref(),
		Some("user.read openid profile offline_access")
	);
	assert_eq!(query_value(&login_url, "code_challenge").as_deref(), Some(TEST_CHALLENGE));

	let code_response = module
		.handle_fragment_response(&format!(
			"#code=auth-code&client_info={TEST_RAW_CLIENT_INFO}&state={TEST_GUID}%7Cresume"
		))
		.expect("Fragment should validate.");

	assert_eq!(code_response.caller_state(), "resume");

	let id_token = encode_test_id_token(&serde_json::json!({
		"oid": "object-it",
		"tid": "tenant-it",
		"nonce": TEST_GUID,
		"preferred_username": "user@contoso.com"
	}));
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/common/oauth2/v2.0/token")
				.form_urlencoded_tuple("code", "auth-code")
				.form_urlencoded_tuple("code_verifier", TEST_VERIFIER)
				.form_urlencoded_tuple("scope", "user.read offline_access");
			then.status(200).json_body(serde_json::json!({
				"token_type": "Bearer",
				"scope": "user.read openid profile",
				"expires_in": 3599,
				"access_token": "access-it",
				"id_token": id_token,
				"client_info": TEST_RAW_CLIENT_INFO
			}));
		})
		.await;
	let token = module
		.acquire_token(Some(&code_response))
		.await
		.expect("Code exchange should succeed.");

	assert_eq!(token.access_token, "access-it");
	assert_eq!(token.user_request_state, "resume");
	assert_eq!(token.unique_id, "object-it");
	assert!(!storage.contains_key("request.state"));
	assert!(!storage.contains_key("request.params"));
	assert_eq!(
		module.get_account().map(|account| account.home_account_identifier),
		Some(TEST_HOME_ACCOUNT_ID.to_owned())
	);

	let cached = module
		.get_valid_token(Some(&TokenRenewParameters::new(["USER.READ"])))
		.await
		.expect("Cached token should be served.");

	assert_eq!(cached.access_token, "access-it");
	assert_eq!(cached.account.and_then(|a| a.user_name).as_deref(), Some("user@contoso.com"));

	token_mock.assert_calls_async(1).await;

	let logout_url = module
		.logout_url(&AuthenticationParameters::new())
		.await
		.expect("Logout URL should build.");

	assert!(logout_url.starts_with(&server.url("/common/oauth2/v2.0/logout?")));
	assert_eq!(query_value(&logout_url, "post_logout_redirect_uri").as_deref(), Some(POST_LOGOUT_URI));
	assert!(module.get_account().is_none());
	assert_eq!(
		module
			.get_valid_token(Some(&TokenRenewParameters::new(["user.read"])))
			.await
			.expect_err("Logged out cache must miss.")
			.kind,
		ErrorKind::NoTokensFound
	);
}

#[tokio::test]
async fn token_endpoint_errors_clear_the_pending_request() {
	let server = MockServer::start_async().await;

	mock_discovery(&server).await;

	let (module, storage) = build_module(&server);

	module
		.create_acquire_token_url(&AuthenticationParameters::new().with_scopes(["user.read"]))
		.await
		.expect("Acquire token URL should build.");

	let code_response = module
		.handle_fragment_response(&format!("#code=stale-code&state={TEST_GUID}"))
		.expect("Fragment should validate.");
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/common/oauth2/v2.0/token");
			then.status(400).json_body(serde_json::json!({
				"error": "invalid_grant",
				"error_description": "AADSTS70008: The provided authorization code has expired."
			}));
		})
		.await;
	let err = module
		.acquire_token(Some(&code_response))
		.await
		.expect_err("Expired code must fail.");

	token_mock.assert_async().await;

	assert_eq!(err.kind.code(), "invalid_grant");
	assert!(!storage.contains_key("request.state"));
	assert!(!storage.contains_key(&format!("nonce.idtoken|{TEST_GUID}")));
	assert_eq!(storage.get_item("error").as_deref(), Some("invalid_grant"));
}

#[tokio::test]
async fn foreign_fragments_do_not_disturb_the_pending_request() {
	let server = MockServer::start_async().await;

	mock_discovery(&server).await;

	let (module, storage) = build_module(&server);

	module
		.create_login_url(&AuthenticationParameters::new())
		.await
		.expect("Login URL should build.");

	let before = storage.snapshot();
	let err = module
		.handle_fragment_response("#code=auth-code&state=another-tab")
		.expect_err("Foreign state must fail.");

	assert_eq!(err.kind, ErrorKind::StateMismatch);
	assert_eq!(storage.snapshot(), before);
}
