#![cfg(feature = "reqwest")]

// std
use std::sync::atomic::{AtomicBool, Ordering};
// crates.io
use httpmock::prelude::*;
// self
use oauth2_spa::{
	_preludet::*,
	config::ClientConfiguration,
	flows::AuthorizationCodeModule,
	interaction::{
		FrameHost, HiddenFrame, MonitoredWindow, PopupHandler, PopupHost, ScreenGeometry,
		SilentHandler,
	},
	request::{AuthenticationParameters, Prompt, TokenRenewParameters},
	storage::{CacheStorage, MemoryStorage},
};

const REDIRECT_URI: &str = "https://localhost:8081/index.html";

/// Window that lands on the redirect URI with `fragment` as soon as it is navigated.
#[derive(Default)]
struct RedirectingWindow {
	fragment: String,
	href: RwLock<Option<String>>,
	src: RwLock<String>,
	closed: AtomicBool,
}
impl RedirectingWindow {
	fn new(fragment: String) -> Arc<Self> {
		Arc::new(Self { fragment, ..Default::default() })
	}

	fn redirect(&self) {
		*self.href.write() = Some(format!("{REDIRECT_URI}{}", self.fragment));
	}
}
impl MonitoredWindow for RedirectingWindow {
	fn is_closed(&self) -> bool {
		self.closed.load(Ordering::SeqCst)
	}

	fn location_href(&self) -> Option<String> {
		self.href.read().clone()
	}

	fn close(&self) {
		self.closed.store(true, Ordering::SeqCst);
	}
}
impl HiddenFrame for RedirectingWindow {
	fn src(&self) -> String {
		self.src.read().clone()
	}

	fn set_src(&self, url: &str) {
		*self.src.write() = url.to_owned();

		self.redirect();
	}
}

struct Browser {
	window: Arc<RedirectingWindow>,
	opened_urls: Mutex<Vec<String>>,
	removed_frames: Mutex<usize>,
}
impl Browser {
	fn new(fragment: String) -> Arc<Self> {
		Arc::new(Self {
			window: RedirectingWindow::new(fragment),
			opened_urls: Mutex::new(Vec::new()),
			removed_frames: Mutex::new(0),
		})
	}
}
impl PopupHost for Browser {
	fn screen_geometry(&self) -> ScreenGeometry {
		ScreenGeometry { left: 0, top: 0, width: 1920, height: 1080 }
	}

	fn open_window(
		&self,
		url: &str,
		_: &str,
		_: &str,
	) -> Result<Option<Arc<dyn MonitoredWindow>>> {
		let window: Arc<dyn MonitoredWindow> = self.window.clone();

		self.opened_urls.lock().push(url.to_owned());
		self.window.redirect();

		Ok(Some(window))
	}
}
impl FrameHost for Browser {
	fn load_frame(&self, _: &str) -> Option<Arc<dyn HiddenFrame>> {
		let frame: Arc<dyn HiddenFrame> = self.window.clone();

		Some(frame)
	}

	fn remove_frame(&self, _: &dyn HiddenFrame) {
		*self.removed_frames.lock() += 1;
	}
}

async fn mock_endpoints<'a>(server: &'a MockServer, access_token: &str) -> httpmock::Mock<'a> {
	let token_endpoint = server.url("/{tenant}/oauth2/v2.0/token");

	server
		.mock_async(move |when, then| {
			when.method(GET).path("/common/v2.0/.well-known/openid-configuration");
			then.status(200).json_body(serde_json::json!({
				"authorization_endpoint": "https://login.microsoftonline.com/{tenant}/oauth2/v2.0/authorize",
				"token_endpoint": token_endpoint,
				"issuer": "https://login.microsoftonline.com/{tenant}/v2.0"
			}));
		})
		.await;

	let id_token = encode_test_id_token(&serde_json::json!({ "oid": "object", "nonce": TEST_GUID }));
	let access_token = access_token.to_owned();

	server
		.mock_async(move |when, then| {
			when.method(POST).path("/common/oauth2/v2.0/token");
			then.status(200).json_body(serde_json::json!({
				"token_type": "Bearer",
				"scope": "mail.read",
				"expires_in": 3599,
				"access_token": access_token,
				"id_token": id_token,
				"client_info": TEST_RAW_CLIENT_INFO
			}));
		})
		.await
}

fn build_module(server: &MockServer) -> (Arc<AuthorizationCodeModule>, Arc<MemoryStorage>) {
	let (module, storage) = build_reqwest_test_module(
		ClientConfiguration::builder(TEST_CLIENT_ID)
			.authority(server.url("/common"))
			.redirect_uri(REDIRECT_URI)
			.build()
			.expect("Configuration should validate for interaction test."),
	);

	(Arc::new(module), storage)
}

#[tokio::test]
async fn popup_round_trip_redeems_the_code() {
	let server = MockServer::start_async().await;
	let token_mock = mock_endpoints(&server, "popup-access").await;
	let (module, storage) = build_module(&server);
	let browser = Browser::new(format!("#code=popup-code&state={TEST_GUID}"));
	let popup = PopupHandler::new(module.clone(), browser.clone());
	let url = module
		.create_acquire_token_url(&AuthenticationParameters::new().with_scopes(["mail.read"]))
		.await
		.expect("Acquire token URL should build.");
	let token = popup.acquire_token(&url).await.expect("Popup flow should succeed.");

	token_mock.assert_async().await;

	assert_eq!(token.access_token, "popup-access");
	assert_eq!(browser.opened_urls.lock().as_slice(), [url]);
	assert!(browser.window.is_closed());
	assert!(!storage.contains_key("interaction.status"));
	assert!(!storage.contains_key("request.state"));

	let cached = module
		.get_valid_token(Some(&TokenRenewParameters::new(["mail.read"])))
		.await
		.expect("Popup token should be cached.");

	assert_eq!(cached.access_token, "popup-access");
}

#[tokio::test]
async fn hidden_frame_round_trip_redeems_the_code() {
	let server = MockServer::start_async().await;
	let token_mock = mock_endpoints(&server, "frame-access").await;
	let (module, storage) = build_module(&server);
	let browser = Browser::new(format!("#code=frame-code&state={TEST_GUID}"));
	let silent = SilentHandler::new(module.clone(), browser.clone());

	storage.set_item("interaction.status", "interaction_in_progress");

	let url = module
		.create_acquire_token_url(
			&AuthenticationParameters::new()
				.with_scopes(["mail.read"])
				.with_prompt(Prompt::None),
		)
		.await
		.expect("Acquire token URL should build.");
	let token = silent
		.acquire_token(&url, Some("mail.read"))
		.await
		.expect("Hidden frame flow should succeed.");

	token_mock.assert_async().await;

	assert_eq!(token.access_token, "frame-access");
	assert_eq!(browser.window.src(), url);
	assert_eq!(*browser.removed_frames.lock(), 1);
	assert_eq!(storage.get_item("interaction.status").as_deref(), Some("interaction_in_progress"));
}
