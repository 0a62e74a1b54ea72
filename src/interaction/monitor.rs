//! Location polling shared by popup and iframe interactions.

// std
use std::time::Duration as StdDuration;
// self
use crate::{interaction::MonitoredWindow, uri::UrlString};

/// Delay between two location checks.
pub const POLL_INTERVAL: StdDuration = StdDuration::from_millis(50);

/// Which tick rules apply.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MonitorMode {
	/// Interactive popup: the clock only runs while the window is back on a same-origin page.
	Popup,
	/// Hidden iframe: the clock always runs so a silent call fails in bounded time.
	Silent,
}

/// Result of a single poll.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MonitorState {
	/// Keep polling.
	Running,
	/// The window landed on a fragment carrying response properties.
	Resolved(String),
	/// More ticks than the timeout allows.
	TimedOut,
	/// The window was closed before a response arrived.
	Cancelled,
}
impl MonitorState {
	/// Returns true for every state except [`MonitorState::Running`].
	pub fn is_terminal(&self) -> bool {
		!matches!(self, Self::Running)
	}
}

/// Tick-counting poller for one window.
///
/// The timeout is measured in ticks of [`POLL_INTERVAL`], so a popup left on the identity
/// provider's origin never times out while the user is still signing in.
#[derive(Clone, Debug)]
pub struct WindowMonitor {
	mode: MonitorMode,
	max_ticks: u128,
	ticks: u128,
}
impl WindowMonitor {
	/// Creates a monitor allowing `timeout / POLL_INTERVAL` ticks.
	pub fn new(mode: MonitorMode, timeout: StdDuration) -> Self {
		Self { mode, max_ticks: timeout.as_millis() / POLL_INTERVAL.as_millis(), ticks: 0 }
	}

	/// Ticks counted so far.
	pub fn ticks(&self) -> u128 {
		self.ticks
	}

	/// Inspects the window once.
	pub fn poll<W>(&mut self, window: &W) -> MonitorState
	where
		W: ?Sized + MonitoredWindow,
	{
		if window.is_closed() {
			return MonitorState::Cancelled;
		}

		let href = window.location_href();

		if self.mode == MonitorMode::Popup
			&& href.as_deref().is_none_or(|href| href.is_empty() || href == "about:blank")
		{
			return MonitorState::Running;
		}

		self.ticks += 1;

		if href.as_deref().is_some_and(UrlString::hash_contains_known_properties) {
			return MonitorState::Resolved(window.location_hash().unwrap_or_default());
		}
		if self.ticks > self.max_ticks {
			return MonitorState::TimedOut;
		}

		MonitorState::Running
	}

	/// Polls every [`POLL_INTERVAL`] until a terminal state.
	pub async fn run<W>(mut self, window: &W) -> MonitorState
	where
		W: ?Sized + MonitoredWindow,
	{
		loop {
			tokio::time::sleep(POLL_INTERVAL).await;

			let state = self.poll(window);

			if state.is_terminal() {
				#[cfg(feature = "tracing")]
				tracing::debug!(mode = ?self.mode, ticks = self.ticks, ?state, "Window monitor finished.");

				return state;
			}
		}
	}
}
