//! Browser interaction seams: popup windows and hidden iframes that carry the authorization
//! request and hand the redirect fragment back to [`AuthorizationCodeModule`].
//!
//! The DOM is reached only through the [`PopupHost`], [`FrameHost`] and [`MonitoredWindow`]
//! capabilities so the state machine runs the same against a real page or a test double.

pub mod monitor;
pub mod popup;
pub mod silent;

pub use monitor::*;
pub use popup::*;
pub use silent::*;

// self
use crate::{_prelude::*, flows::AuthorizationCodeModule, request::TokenResponse};

/// Window title used when opening the popup.
pub const LIBRARY_NAME: &str = "MSAL.JS";

/// A browsing context whose location can be polled.
pub trait MonitoredWindow
where
	Self: Send + Sync,
{
	/// Returns true once the user or script closed the window.
	fn is_closed(&self) -> bool;

	/// Current `location.href`, or `None` while the window shows a cross-origin page.
	fn location_href(&self) -> Option<String>;

	/// Current `location.hash` including the leading `#`.
	fn location_hash(&self) -> Option<String> {
		self.location_href().and_then(|href| href.find('#').map(|i| href[i..].to_owned()))
	}

	/// Closes the window.
	fn close(&self);
}

/// Outer window geometry used to center the popup.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScreenGeometry {
	/// `screenLeft`/`screenX` of the opener.
	pub left: i32,
	/// `screenTop`/`screenY` of the opener.
	pub top: i32,
	/// Inner width of the opener.
	pub width: i32,
	/// Inner height of the opener.
	pub height: i32,
}

/// Opens popup windows.
pub trait PopupHost
where
	Self: Send + Sync,
{
	/// Geometry of the opener window.
	fn screen_geometry(&self) -> ScreenGeometry;

	/// Calls `window.open`. `Ok(None)` mirrors a blocked popup returning `null`.
	fn open_window(
		&self,
		url: &str,
		title: &str,
		features: &str,
	) -> Result<Option<Arc<dyn MonitoredWindow>>>;
}

/// Hidden iframe used for silent renewals.
pub trait HiddenFrame
where
	Self: MonitoredWindow,
{
	/// Current `src` attribute.
	fn src(&self) -> String;

	/// Navigates the frame.
	fn set_src(&self, url: &str);
}

/// Creates and removes hidden iframes.
pub trait FrameHost
where
	Self: Send + Sync,
{
	/// Returns the frame with id `name`, creating it if needed. `None` if the document cannot
	/// host one.
	fn load_frame(&self, name: &str) -> Option<Arc<dyn HiddenFrame>>;

	/// Detaches the frame from the document.
	fn remove_frame(&self, frame: &dyn HiddenFrame);
}

/// Shared tail of every interaction: turns a redirect fragment into tokens.
#[derive(Clone, Debug)]
pub struct InteractionHandler {
	module: Arc<AuthorizationCodeModule>,
}
impl InteractionHandler {
	/// Wraps the orchestrator.
	pub fn new(module: Arc<AuthorizationCodeModule>) -> Self {
		Self { module }
	}

	/// Orchestrator driving the flow.
	pub fn module(&self) -> &AuthorizationCodeModule {
		&self.module
	}

	/// Validates the fragment and exchanges its code at the token endpoint.
	pub async fn handle_code_response(&self, hash: &str) -> Result<TokenResponse> {
		if hash.trim().is_empty() {
			return Err(ErrorKind::HashEmpty.into());
		}

		let code_response = self.module.handle_fragment_response(hash)?;

		self.module.acquire_token(Some(&code_response)).await
	}
}

#[cfg(test)]
pub(crate) mod testing {
	//! Scriptable window doubles.

	// std
	use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
	// self
	use super::*;

	// Lets tests call `expect_err` on results carrying window/frame handles.
	impl Debug for dyn MonitoredWindow {
		fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
			f.write_str("dyn MonitoredWindow")
		}
	}
	impl Debug for dyn HiddenFrame {
		fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
			f.write_str("dyn HiddenFrame")
		}
	}

	/// Window whose location and closed flag are set by the test.
	#[derive(Debug, Default)]
	pub(crate) struct FakeWindow {
		href: RwLock<Option<String>>,
		src: RwLock<String>,
		closed: AtomicBool,
		pub(crate) close_calls: AtomicUsize,
	}
	impl FakeWindow {
		pub(crate) fn at(href: &str) -> Arc<Self> {
			let window = Arc::new(Self::default());

			window.navigate(href);

			window
		}

		pub(crate) fn cross_origin() -> Arc<Self> {
			Arc::new(Self::default())
		}

		pub(crate) fn navigate(&self, href: &str) {
			*self.href.write() = Some(href.to_owned());
		}

		pub(crate) fn user_close(&self) {
			self.closed.store(true, Ordering::SeqCst);
		}

		pub(crate) fn closes(&self) -> usize {
			self.close_calls.load(Ordering::SeqCst)
		}
	}
	impl MonitoredWindow for FakeWindow {
		fn is_closed(&self) -> bool {
			self.closed.load(Ordering::SeqCst)
		}

		fn location_href(&self) -> Option<String> {
			self.href.read().clone()
		}

		fn close(&self) {
			self.close_calls.fetch_add(1, Ordering::SeqCst);
			self.closed.store(true, Ordering::SeqCst);
		}
	}
	impl HiddenFrame for FakeWindow {
		fn src(&self) -> String {
			self.src.read().clone()
		}

		fn set_src(&self, url: &str) {
			*self.src.write() = url.to_owned();
		}
	}
}
