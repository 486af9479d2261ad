use chrono::{DateTime, Utc};
use parking_lot::Mutex;

/// Wall-clock source for timestamps and autosave ageing.
pub trait Clock: Send + Sync {
	fn now(&self) -> DateTime<Utc>;

	fn now_epoch_ms(&self) -> i64 {
		self.now().timestamp_millis()
	}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
	fn now(&self) -> DateTime<Utc> {
		Utc::now()
	}
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
	now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
	pub fn new(start: DateTime<Utc>) -> Self {
		Self { now: Mutex::new(start) }
	}

	pub fn set(&self, at: DateTime<Utc>) {
		*self.now.lock() = at;
	}

	pub fn advance(&self, by: chrono::Duration) {
		let mut now = self.now.lock();
		*now += by;
	}
}

impl Clock for ManualClock {
	fn now(&self) -> DateTime<Utc> {
		*self.now.lock()
	}
}
