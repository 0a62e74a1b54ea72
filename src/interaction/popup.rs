//! Popup window interaction.

// self
use crate::{
	_prelude::*,
	cache::{INTERACTION_IN_PROGRESS, TemporaryCacheKey},
	flows::AuthorizationCodeModule,
	interaction::{
		InteractionHandler, LIBRARY_NAME, MonitorMode, MonitorState, MonitoredWindow, PopupHost,
		ScreenGeometry, WindowMonitor,
	},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	request::TokenResponse,
	storage::CacheStorage,
};

/// Popup width in CSS pixels.
pub const POPUP_WIDTH: i32 = 483;
/// Popup height in CSS pixels.
pub const POPUP_HEIGHT: i32 = 600;

/// Runs the authorization request in a centered popup.
///
/// While a popup is open the `interaction.status` marker is set so a second interactive
/// request fails fast with [`ErrorKind::InteractionInProgress`]. Every terminal transition
/// releases it.
pub struct PopupHandler {
	handler: InteractionHandler,
	host: Arc<dyn PopupHost>,
	current_window: Mutex<Option<Arc<dyn MonitoredWindow>>>,
}
impl PopupHandler {
	/// Creates a handler opening windows through `host`.
	pub fn new(module: Arc<AuthorizationCodeModule>, host: Arc<dyn PopupHost>) -> Self {
		Self { handler: InteractionHandler::new(module), host, current_window: Mutex::new(None) }
	}

	/// Shared fragment handling.
	pub fn handler(&self) -> &InteractionHandler {
		&self.handler
	}

	/// Opens the popup on `request_url` and claims the interaction marker.
	pub fn initiate_auth_request(&self, request_url: &str) -> Result<Arc<dyn MonitoredWindow>> {
		if request_url.trim().is_empty() {
			#[cfg(feature = "tracing")]
			tracing::error!("Navigate url is empty.");

			return Err(ErrorKind::EmptyNavigateUri.into());
		}

		let storage = self.storage();

		if storage.get_item(TemporaryCacheKey::InteractionStatus.as_str()).as_deref()
			== Some(INTERACTION_IN_PROGRESS)
		{
			return Err(ErrorKind::InteractionInProgress.into());
		}

		storage.set_item(TemporaryCacheKey::InteractionStatus.as_str(), INTERACTION_IN_PROGRESS);

		#[cfg(feature = "tracing")]
		tracing::debug!(
			url = self.handler.module().config().system.pii_logging_enabled.then_some(request_url),
			"Opening popup."
		);

		self.open_popup(request_url)
	}

	/// Polls `window` until it lands on a response fragment, then closes it.
	///
	/// Closing the popup maps to [`ErrorKind::UserCancelled`]. Exceeding
	/// `system.window_hash_timeout` of same-origin time maps to
	/// [`ErrorKind::MonitorWindowTimeout`]. The marker is released on every outcome,
	/// including when the returned future is dropped before it completes.
	pub async fn monitor_window_for_hash(&self, window: &dyn MonitoredWindow) -> Result<String> {
		const KIND: FlowKind = FlowKind::Interaction;

		let span = FlowSpan::new(KIND, "monitor_popup");
		let timeout = self.handler.module().config().system.window_hash_timeout;

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let mut cleanup = PopupCleanup { handler: self, window: Some(window) };
				let state = WindowMonitor::new(MonitorMode::Popup, timeout).run(window).await;

				match state {
					MonitorState::Cancelled => {
						cleanup.window = None;

						Err(ErrorKind::UserCancelled.into())
					},
					MonitorState::Resolved(hash) => Ok(hash),
					_ => {
						#[cfg(feature = "tracing")]
						tracing::warn!(?timeout, "Popup did not return a response in time.");

						Err(ErrorKind::MonitorWindowTimeout.into())
					},
				}
			})
			.await;

		obs::record_flow_result(KIND, &result);

		result
	}

	/// Opens, monitors and redeems one popup round trip.
	pub async fn acquire_token(&self, request_url: &str) -> Result<TokenResponse> {
		let window = self.initiate_auth_request(request_url)?;
		let hash = self.monitor_window_for_hash(window.as_ref()).await?;

		self.handler.handle_code_response(&hash).await
	}

	/// Opener unload: cancels the pending request and closes the popup.
	pub fn unload_window(&self) {
		self.handler.module().cancel_request();

		if let Some(window) = self.current_window.lock().take() {
			window.close();
		}
	}

	fn open_popup(&self, url: &str) -> Result<Arc<dyn MonitoredWindow>> {
		let features = popup_features(self.host.screen_geometry());
		let opened = self.host.open_window(url, LIBRARY_NAME, &features).and_then(|window| {
			window.ok_or_else(|| Error::from(ErrorKind::EmptyWindowCreated))
		});

		match opened {
			Ok(window) => {
				*self.current_window.lock() = Some(window.clone());

				Ok(window)
			},
			Err(e) => {
				#[cfg(feature = "tracing")]
				tracing::error!(error = %e, "Error opening popup.");

				self.storage().remove_item(TemporaryCacheKey::InteractionStatus.as_str());

				if e.kind == ErrorKind::EmptyWindowCreated {
					return Err(e);
				}

				Err(Error::with_detail(ErrorKind::PopupWindow, e.to_string()).with_source(e))
			},
		}
	}

	fn clean_popup(&self, window: Option<&dyn MonitoredWindow>) {
		if let Some(window) = window {
			window.close();
		}

		self.current_window.lock().take();
		self.storage().remove_item(TemporaryCacheKey::InteractionStatus.as_str());
	}

	fn storage(&self) -> &Arc<dyn CacheStorage> {
		self.handler.module().storage()
	}
}
impl Debug for PopupHandler {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("PopupHandler")
			.field("handler", &self.handler)
			.field("has_window", &self.current_window.lock().is_some())
			.finish()
	}
}

/// Releases the interaction marker on drop and closes `window` when still set.
struct PopupCleanup<'a> {
	handler: &'a PopupHandler,
	window: Option<&'a dyn MonitoredWindow>,
}
impl Drop for PopupCleanup<'_> {
	fn drop(&mut self) {
		self.handler.clean_popup(self.window);
	}
}

/// `window.open` features centering a [`POPUP_WIDTH`]x[`POPUP_HEIGHT`] popup over the opener.
pub fn popup_features(geometry: ScreenGeometry) -> String {
	let left = geometry.width / 2 - POPUP_WIDTH / 2 + geometry.left;
	let top = geometry.height / 2 - POPUP_HEIGHT / 2 + geometry.top;

	format!("width={POPUP_WIDTH}, height={POPUP_HEIGHT}, top={top}, left={left}")
}
