//! User-facing notification channel.
//!
//! Messages are announced through an assistive-technology-safe channel, so
//! each carries an [`Urgency`]: polite announcements wait for the reader to
//! go idle, assertive ones interrupt.
//!
//! [`NotificationCenter`] queues notifications for a presentation layer to
//! take; rendering and dismissal belong to that layer.

use std::collections::VecDeque;

use parking_lot::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Urgency {
	Polite,
	Assertive,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
	pub message: String,
	pub urgency: Urgency,
}

/// Sink for user-facing success and error feedback.
pub trait Notifier: Send + Sync {
	fn notify(&self, message: String, urgency: Urgency);
}

#[derive(Debug, Default)]
pub struct NotificationCenter {
	pending: Mutex<VecDeque<Notification>>,
}

impl NotificationCenter {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn is_empty(&self) -> bool {
		self.pending.lock().is_empty()
	}

	/// Drains queued notifications, oldest first.
	pub fn take_pending(&self) -> Vec<Notification> {
		self.pending.lock().drain(..).collect()
	}
}

impl Notifier for NotificationCenter {
	fn notify(&self, message: String, urgency: Urgency) {
		tracing::debug!(?urgency, message = %message, "notification.push");
		self.pending.lock().push_back(Notification { message, urgency });
	}
}
