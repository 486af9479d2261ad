//! Last-issued-wins sequencing for one logical query stream.
//!
//! Every request is stamped with a [`QueryToken`] from a per-stream counter.
//! Issuing a new token cancels the previous request's [`CancellationToken`]
//! and makes its token stale; responses are applied only while their token
//! is still current, whatever order the network resolves them in.

use std::fmt;

use tokio_util::sync::CancellationToken;

/// Monotonic request stamp, unique within one [`RequestSequencer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QueryToken(u64);

impl QueryToken {
	pub const fn get(self) -> u64 {
		self.0
	}
}

impl fmt::Display for QueryToken {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "#{}", self.0)
	}
}

/// A freshly issued token plus the abort signal handed to the request.
#[derive(Debug, Clone)]
pub struct QueryTicket {
	pub token: QueryToken,
	pub cancel: CancellationToken,
}

#[derive(Debug, Default)]
pub struct RequestSequencer {
	latest: u64,
	current: bool,
	in_flight: Option<CancellationToken>,
}

impl RequestSequencer {
	pub fn new() -> Self {
		Self::default()
	}

	/// Issues the next token and invalidates every earlier one.
	pub fn issue(&mut self) -> QueryTicket {
		self.abort_in_flight();
		self.latest = self.latest.wrapping_add(1);
		self.current = true;

		let cancel = CancellationToken::new();
		self.in_flight = Some(cancel.clone());
		QueryTicket {
			token: QueryToken(self.latest),
			cancel,
		}
	}

	/// Returns true iff `token` is the latest issued and not cancelled.
	pub fn is_current(&self, token: QueryToken) -> bool {
		self.current && token.0 == self.latest
	}

	/// Signals the in-flight request to abort and makes its token stale.
	pub fn cancel_previous(&mut self) {
		self.abort_in_flight();
		self.current = false;
	}

	/// Consumes a resolution: true if it may touch state.
	///
	/// A current token releases its abort signal; the token stays current so
	/// repeated delivery is still recognised.
	pub fn accept(&mut self, token: QueryToken) -> bool {
		if !self.is_current(token) {
			tracing::trace!(%token, latest = self.latest, "sequencer.stale");
			return false;
		}
		self.in_flight = None;
		true
	}

	/// True between issuing a token and accepting its resolution.
	pub fn is_in_flight(&self) -> bool {
		self.current && self.in_flight.is_some()
	}

	/// Latest token issued, if any is still current.
	pub fn latest(&self) -> Option<QueryToken> {
		self.current.then_some(QueryToken(self.latest))
	}

	fn abort_in_flight(&mut self) {
		if let Some(cancel) = self.in_flight.take() {
			cancel.cancel();
		}
	}
}
