//! Clock capability used for expiry computations.

// self
use crate::_prelude::*;

/// Source of the current wall-clock time.
pub trait Clock
where
	Self: Send + Sync,
{
	/// Current UTC instant.
	fn now(&self) -> OffsetDateTime;

	/// Current time as Unix seconds.
	fn now_seconds(&self) -> i64 {
		self.now().unix_timestamp()
	}
}

/// [`Clock`] reading the system time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;
impl Clock for SystemClock {
	fn now(&self) -> OffsetDateTime {
		OffsetDateTime::now_utc()
	}
}

/// [`Clock`] frozen at a settable instant.
#[derive(Clone, Debug)]
pub struct FixedClock(Arc<RwLock<OffsetDateTime>>);
impl FixedClock {
	/// Creates a clock frozen at `now`.
	pub fn new(now: OffsetDateTime) -> Self {
		Self(Arc::new(RwLock::new(now)))
	}

	/// Moves the clock by `delta`.
	pub fn advance(&self, delta: Duration) {
		*self.0.write() += delta;
	}
}
impl Clock for FixedClock {
	fn now(&self) -> OffsetDateTime {
		*self.0.read()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros::datetime;
	// self
	use super::*;

	#[test]
	fn fixed_clock_advances() {
		let clock = FixedClock::new(datetime!(2025-01-01 00:00 UTC));

		assert_eq!(clock.now_seconds(), 1_735_689_600);

		clock.advance(Duration::seconds(90));

		assert_eq!(clock.now(), datetime!(2025-01-01 00:01:30 UTC));
	}

	#[test]
	fn system_clock_is_close_to_now() {
		let delta = SystemClock.now() - OffsetDateTime::now_utc();

		assert!(delta.abs() < Duration::seconds(5));
	}
}
