use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::{TaskClass, spawn};

/// Outcome of a delayed task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delayed<T> {
	/// The delay elapsed and the work ran to completion.
	Ran(T),
	/// The token was cancelled before or during the work.
	Cancelled,
}

/// Runtime entrypoint shared by every console component that spawns work.
#[derive(Debug, Clone, Default)]
pub struct WorkerRuntime {
	_private: (),
}

impl WorkerRuntime {
	pub fn new() -> Self {
		Self::default()
	}

	/// Spawns an async task.
	pub fn spawn<F>(&self, class: TaskClass, fut: F) -> JoinHandle<F::Output>
	where
		F: Future + Send + 'static,
		F::Output: Send + 'static,
	{
		spawn(class, fut)
	}

	/// Spawns `make()` after `delay`, abandoning it if `cancel` fires first.
	///
	/// A zero delay skips the timer but still honours a token that was
	/// cancelled before the task was polled. Once started, the work runs to
	/// completion; it observes `cancel` only if it was handed a clone.
	pub fn spawn_after<F, Fut>(&self, class: TaskClass, delay: Duration, cancel: CancellationToken, make: F) -> JoinHandle<Delayed<Fut::Output>>
	where
		F: FnOnce() -> Fut + Send + 'static,
		Fut: Future + Send + 'static,
		Fut::Output: Send + 'static,
	{
		spawn(class, async move {
			if delay > Duration::ZERO {
				tokio::select! {
					_ = cancel.cancelled() => return Delayed::Cancelled,
					_ = sleep(delay) => {}
				}
			} else if cancel.is_cancelled() {
				return Delayed::Cancelled;
			}

			Delayed::Ran(make().await)
		})
	}
}
