//! Hidden iframe interaction for silent renewals.

// std
use std::time::Duration as StdDuration;
// self
use crate::{
	_prelude::*,
	flows::AuthorizationCodeModule,
	interaction::{
		FrameHost, HiddenFrame, InteractionHandler, MonitorMode, MonitorState, WindowMonitor,
	},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	request::TokenResponse,
};

/// Frame id prefix; the requested scopes are appended when known.
pub const TOKEN_FRAME_PREFIX: &str = "msalTokenFrame";

/// Runs the authorization request in a hidden iframe.
///
/// Never reads or writes the interaction marker, so a background renewal cannot release
/// the marker of a popup that is still open.
pub struct SilentHandler {
	handler: InteractionHandler,
	host: Arc<dyn FrameHost>,
	load_frame_timeout: StdDuration,
}
impl SilentHandler {
	/// Creates a handler using `system.load_frame_timeout` from the module configuration.
	pub fn new(module: Arc<AuthorizationCodeModule>, host: Arc<dyn FrameHost>) -> Self {
		let load_frame_timeout = module.config().system.load_frame_timeout;

		Self { handler: InteractionHandler::new(module), host, load_frame_timeout }
	}

	/// Shared fragment handling.
	pub fn handler(&self) -> &InteractionHandler {
		&self.handler
	}

	/// Loads `request_url` into the frame for `user_request_scopes`.
	///
	/// With a zero load timeout the frame is navigated immediately; otherwise the load is
	/// deferred by that delay.
	pub async fn initiate_auth_request(
		&self,
		request_url: &str,
		user_request_scopes: Option<&str>,
	) -> Result<Arc<dyn HiddenFrame>> {
		if request_url.trim().is_empty() {
			#[cfg(feature = "tracing")]
			tracing::info!("Navigate url is empty.");

			return Err(ErrorKind::EmptyNavigateUri.into());
		}

		let frame_name = match user_request_scopes {
			Some(scopes) if !scopes.is_empty() => format!("{TOKEN_FRAME_PREFIX}{scopes}"),
			_ => TOKEN_FRAME_PREFIX.to_owned(),
		};

		if !self.load_frame_timeout.is_zero() {
			tokio::time::sleep(self.load_frame_timeout).await;
		}

		self.load_frame_sync(request_url, &frame_name).ok_or_else(|| {
			Error::with_detail(
				ErrorKind::UnableToLoadFrame,
				format!("Unable to load iframe with name: {frame_name}"),
			)
		})
	}

	/// Polls the frame until it lands on a response fragment, then removes it.
	///
	/// The clock always runs, bounding the call by `system.iframe_hash_timeout`.
	pub async fn monitor_frame_for_hash(&self, frame: &dyn HiddenFrame) -> Result<String> {
		const KIND: FlowKind = FlowKind::Interaction;

		let span = FlowSpan::new(KIND, "monitor_iframe");
		let timeout = self.handler.module().config().system.iframe_hash_timeout;

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let state = WindowMonitor::new(MonitorMode::Silent, timeout).run(frame).await;

				self.host.remove_frame(frame);

				match state {
					MonitorState::Resolved(hash) => Ok(hash),
					MonitorState::Cancelled => Err(ErrorKind::IframeClosedPrematurely.into()),
					_ => {
						#[cfg(feature = "tracing")]
						tracing::warn!(?timeout, "Hidden iframe did not return a response in time.");

						Err(ErrorKind::MonitorWindowTimeout.into())
					},
				}
			})
			.await;

		obs::record_flow_result(KIND, &result);

		result
	}

	/// Loads, monitors and redeems one hidden-frame round trip.
	pub async fn acquire_token(
		&self,
		request_url: &str,
		user_request_scopes: Option<&str>,
	) -> Result<TokenResponse> {
		let frame = self.initiate_auth_request(request_url, user_request_scopes).await?;
		let hash = self.monitor_frame_for_hash(frame.as_ref()).await?;

		self.handler.handle_code_response(&hash).await
	}

	fn load_frame_sync(&self, url: &str, frame_name: &str) -> Option<Arc<dyn HiddenFrame>> {
		let frame = self.host.load_frame(frame_name)?;
		let src = frame.src();

		if src.is_empty() || src == "about:blank" {
			frame.set_src(url);
		}

		Some(frame)
	}
}
impl Debug for SilentHandler {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SilentHandler")
			.field("handler", &self.handler)
			.field("load_frame_timeout", &self.load_frame_timeout)
			.finish()
	}
}
