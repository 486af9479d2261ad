//! Debounced remote search over one query stream.
//!
//! [`DebouncedQuery`] coalesces bursts of input into a single search once the
//! input has been quiet for the configured delay. Each input issues a new
//! [`QueryToken`], which cancels the timer (or the request) started by the
//! previous input, so a burst of M keystrokes sends one request carrying
//! the final text. Clearing the input bypasses the delay so the option list
//! resets immediately.
//!
//! Resolutions arrive over an internal channel and are filtered through the
//! [`RequestSequencer`]: [`DebouncedQuery::try_resolve`] and
//! [`DebouncedQuery::resolved`] only ever yield the current stream's result.

use std::sync::Arc;
use std::time::Duration;

use brandline_config::SearchConfig;
use brandline_primitives::SearchableEntity;
use brandline_worker::{TaskClass, WorkerRuntime};
use tokio::sync::mpsc;

use crate::collab::{CollaboratorError, EntitySearch, OwnerScope};
use crate::sequencer::{QueryToken, RequestSequencer};

/// Raw search completion as delivered by a worker task.
#[derive(Debug, Clone)]
pub struct SearchEvent {
	pub token: QueryToken,
	pub query: String,
	pub outcome: Result<Vec<SearchableEntity>, CollaboratorError>,
}

pub struct DebouncedQuery {
	sequencer: RequestSequencer,
	search: Arc<dyn EntitySearch>,
	scope: OwnerScope,
	limit: usize,
	debounce: Duration,
	runtime: WorkerRuntime,
	last_query: String,
	awaiting: Option<QueryToken>,
	event_tx: mpsc::UnboundedSender<SearchEvent>,
	event_rx: mpsc::UnboundedReceiver<SearchEvent>,
}

impl DebouncedQuery {
	pub fn new(search: Arc<dyn EntitySearch>, scope: OwnerScope, config: &SearchConfig, runtime: WorkerRuntime) -> Self {
		let (event_tx, event_rx) = mpsc::unbounded_channel();
		Self {
			sequencer: RequestSequencer::new(),
			search,
			scope,
			limit: config.page_limit,
			debounce: config.debounce(),
			runtime,
			last_query: String::new(),
			awaiting: None,
			event_tx,
			event_rx,
		}
	}

	/// Records new input text. Empty text searches immediately.
	pub fn on_input(&mut self, text: &str) -> QueryToken {
		let delay = if text.is_empty() { Duration::ZERO } else { self.debounce };
		self.dispatch(text, delay)
	}

	/// Searches for `text` without waiting for a quiet period.
	pub fn search_now(&mut self, text: &str) -> QueryToken {
		self.dispatch(text, Duration::ZERO)
	}

	/// Aborts the pending or in-flight search; its result will be dropped.
	pub fn cancel(&mut self) {
		self.sequencer.cancel_previous();
		self.awaiting = None;
	}

	/// Text of the most recently issued query.
	pub fn last_query(&self) -> &str {
		&self.last_query
	}

	/// True while the latest issued query has not resolved.
	pub fn is_pending(&self) -> bool {
		self.awaiting.is_some_and(|token| self.sequencer.is_current(token))
	}

	/// Feeds a delivered event through the staleness check.
	pub fn accept(&mut self, event: SearchEvent) -> Option<SearchEvent> {
		if !self.sequencer.accept(event.token) {
			if let Err(error) = &event.outcome {
				tracing::trace!(token = %event.token, %error, "search.stale_error_dropped");
			}
			return None;
		}
		if self.awaiting == Some(event.token) {
			self.awaiting = None;
		}
		Some(event)
	}

	/// Returns the next current resolution already delivered, if any.
	/// Stale deliveries are discarded along the way.
	pub fn try_resolve(&mut self) -> Option<SearchEvent> {
		while let Ok(event) = self.event_rx.try_recv() {
			if let Some(event) = self.accept(event) {
				return Some(event);
			}
		}
		None
	}

	/// Waits for the next current resolution. Pends forever when nothing is
	/// in flight; use inside `select!` alongside other event sources.
	pub async fn resolved(&mut self) -> SearchEvent {
		loop {
			let Some(event) = self.event_rx.recv().await else {
				std::future::pending::<()>().await;
				continue;
			};
			if let Some(event) = self.accept(event) {
				return event;
			}
		}
	}

	fn dispatch(&mut self, text: &str, delay: Duration) -> QueryToken {
		let ticket = self.sequencer.issue();
		let token = ticket.token;
		self.last_query = text.to_string();
		self.awaiting = Some(token);
		tracing::trace!(%token, query = text, delay_ms = delay.as_millis() as u64, "search.issue");

		let search = Arc::clone(&self.search);
		let scope = self.scope.clone();
		let limit = self.limit;
		let query = text.to_string();
		let event_tx = self.event_tx.clone();
		let cancel = ticket.cancel.clone();
		self.runtime.spawn_after(TaskClass::Interactive, delay, ticket.cancel, move || async move {
			let outcome = search.search(&scope, &query, limit, cancel).await;
			let _ = event_tx.send(SearchEvent { token, query, outcome });
		});
		token
	}
}
