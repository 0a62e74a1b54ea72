//! Optional observability helpers for client operations.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `oauth2_spa.flow` with the `flow`
//!   (operation) and `stage` (call site) fields. `authority` and `correlation_id` are filled
//!   in once the operation resolves them, and failures log their error code.
//! - Enable `metrics` to increment `oauth2_spa_flow_total{flow, outcome}` for every
//!   attempt/success/failure and `oauth2_spa_flow_failure_total{flow, category}` for every
//!   failure.

// self
use crate::{_prelude::*, error::ErrorCategory};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedFlow<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedFlow<F> = F;

/// Client operations observed by spans and counters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// Building a login navigation URL.
	LoginUrl,
	/// Building an acquire-token navigation URL.
	AcquireTokenUrl,
	/// Validating a redirect fragment.
	FragmentResponse,
	/// Exchanging an authorization code at the token endpoint.
	CodeExchange,
	/// Serving a token from the cache.
	SilentToken,
	/// Fetching an authority's OpenID configuration.
	Discovery,
	/// Monitoring a popup or hidden iframe.
	Interaction,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::LoginUrl => "login_url",
			FlowKind::AcquireTokenUrl => "acquire_token_url",
			FlowKind::FragmentResponse => "fragment_response",
			FlowKind::CodeExchange => "code_exchange",
			FlowKind::SilentToken => "silent_token",
			FlowKind::Discovery => "discovery",
			FlowKind::Interaction => "interaction",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to a client operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Span covering one client operation.
#[derive(Clone, Debug)]
pub struct FlowSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl FlowSpan {
	/// Opens a span for `kind` at `stage`.
	///
	/// `authority` and `correlation_id` start empty; see [`record_authority`] and
	/// [`record_correlation_id`].
	pub fn new(kind: FlowKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!(
				"oauth2_spa.flow",
				flow = kind.as_str(),
				stage,
				authority = tracing::field::Empty,
				correlation_id = tracing::field::Empty,
			);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Enters the span for synchronous operations such as fragment validation.
	pub fn entered(self) -> FlowSpanGuard {
		#[cfg(feature = "tracing")]
		{
			FlowSpanGuard { _guard: self.span.entered() }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = self;

			FlowSpanGuard {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedFlow<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Guard returned by [`FlowSpan::entered`].
pub struct FlowSpanGuard {
	#[cfg(feature = "tracing")]
	_guard: tracing::span::EnteredSpan,
}
impl Debug for FlowSpanGuard {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("FlowSpanGuard(..)")
	}
}

/// Tags the current flow span with the canonical authority being used.
pub fn record_authority(authority: &str) {
	#[cfg(feature = "tracing")]
	tracing::Span::current().record("authority", authority);
	#[cfg(not(feature = "tracing"))]
	let _ = authority;
}

/// Tags the current flow span with the request correlation id (`client-request-id`).
pub fn record_correlation_id(correlation_id: &str) {
	#[cfg(feature = "tracing")]
	tracing::Span::current().record("correlation_id", correlation_id);
	#[cfg(not(feature = "tracing"))]
	let _ = correlation_id;
}

/// Records a flow outcome via the global metrics recorder (when enabled).
pub fn record_flow_outcome(kind: FlowKind, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	metrics::counter!(
		"oauth2_spa_flow_total",
		"flow" => kind.as_str(),
		"outcome" => outcome.as_str()
	)
	.increment(1);
	#[cfg(not(feature = "metrics"))]
	let _ = (kind, outcome);
}

/// Records the terminal outcome of `result`.
///
/// Failures are additionally counted per [`ErrorCategory`] and logged with their error code.
pub fn record_flow_result<T>(kind: FlowKind, result: &Result<T>) {
	match result {
		Ok(_) => record_flow_outcome(kind, FlowOutcome::Success),
		Err(e) => {
			record_flow_outcome(kind, FlowOutcome::Failure);
			record_flow_failure(kind, e.category());

			#[cfg(feature = "tracing")]
			tracing::debug!(
				flow = kind.as_str(),
				code = e.code(),
				category = e.category().as_str(),
				"Client operation failed."
			);
		},
	}
}

fn record_flow_failure(kind: FlowKind, category: ErrorCategory) {
	#[cfg(feature = "metrics")]
	metrics::counter!(
		"oauth2_spa_flow_failure_total",
		"flow" => kind.as_str(),
		"category" => category.as_str()
	)
	.increment(1);
	#[cfg(not(feature = "metrics"))]
	let _ = (kind, category);
}
