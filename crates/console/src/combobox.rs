//! Searchable picker state machine.
//!
//! The controller follows the combobox pattern: a text input paired with a
//! keyboard-navigable option list fed by a [`DebouncedQuery`]. It owns the
//! committed [`Selection`] separately from the transient query and result
//! page, so closing the list never loses what was chosen.
//!
//! State only changes in response to caller input or to resolutions drained
//! by [`AsyncComboboxController::pump`] / [`AsyncComboboxController::next_event`];
//! superseded search and lookup resolutions are dropped before they reach
//! the state.

use std::sync::Arc;

use brandline_config::SearchConfig;
use brandline_primitives::{EntityId, SearchableEntity};
use brandline_worker::{TaskClass, WorkerRuntime};
use tokio::sync::mpsc;

use crate::collab::{CollaboratorError, EntitySearch, OwnerScope};
use crate::query::{DebouncedQuery, SearchEvent};
use crate::sequencer::{QueryToken, RequestSequencer};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ComboboxState {
	#[default]
	Closed,
	OpenLoading,
	OpenReady,
	/// The current search failed; [`AsyncComboboxController::retry`] re-issues it.
	OpenError(String),
}

impl ComboboxState {
	pub fn is_open(&self) -> bool {
		!matches!(self, Self::Closed)
	}
}

/// Keys the picker reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComboKey {
	ArrowDown,
	ArrowUp,
	Enter,
	Escape,
}

/// The committed choice, independent of the open list.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
	#[default]
	None,
	Resolved(SearchableEntity),
	/// Chosen id whose entity is being looked up.
	Unresolved(EntityId),
}

impl Selection {
	pub fn id(&self) -> Option<&EntityId> {
		match self {
			Self::None => None,
			Self::Resolved(entity) => Some(&entity.id),
			Self::Unresolved(id) => Some(id),
		}
	}
}

/// A state change applied from a drained resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComboboxEvent {
	ResultsReady { query: String, count: usize },
	SearchFailed { query: String, error: CollaboratorError },
	SelectionResolved(EntityId),
	SelectionMissing(EntityId),
	LookupFailed { id: EntityId, error: CollaboratorError },
}

#[derive(Debug)]
struct LookupEvent {
	token: QueryToken,
	id: EntityId,
	outcome: Result<Option<SearchableEntity>, CollaboratorError>,
}

pub struct AsyncComboboxController {
	state: ComboboxState,
	query: String,
	results: Vec<SearchableEntity>,
	active_index: Option<usize>,
	selection: Selection,
	source: DebouncedQuery,
	search: Arc<dyn EntitySearch>,
	runtime: WorkerRuntime,
	lookups: RequestSequencer,
	lookup_tx: mpsc::UnboundedSender<LookupEvent>,
	lookup_rx: mpsc::UnboundedReceiver<LookupEvent>,
}

impl AsyncComboboxController {
	pub fn new(search: Arc<dyn EntitySearch>, scope: OwnerScope, config: &SearchConfig, runtime: WorkerRuntime) -> Self {
		let (lookup_tx, lookup_rx) = mpsc::unbounded_channel();
		Self {
			state: ComboboxState::Closed,
			query: String::new(),
			results: Vec::new(),
			active_index: None,
			selection: Selection::None,
			source: DebouncedQuery::new(Arc::clone(&search), scope, config, runtime.clone()),
			search,
			runtime,
			lookups: RequestSequencer::new(),
			lookup_tx,
			lookup_rx,
		}
	}

	pub fn state(&self) -> &ComboboxState {
		&self.state
	}

	pub fn query(&self) -> &str {
		&self.query
	}

	pub fn results(&self) -> &[SearchableEntity] {
		&self.results
	}

	/// Highlighted option; `None` is the "-1" position before the first row.
	pub fn active_index(&self) -> Option<usize> {
		self.active_index
	}

	pub fn active_option(&self) -> Option<&SearchableEntity> {
		self.active_index.and_then(|idx| self.results.get(idx))
	}

	pub fn selection(&self) -> &Selection {
		&self.selection
	}

	/// Opens the list when focused while closed.
	pub fn focus(&mut self) {
		if !self.state.is_open() {
			self.open();
		}
	}

	/// Handles a navigation key. Returns true if the key was consumed.
	pub fn on_key(&mut self, key: ComboKey) -> bool {
		if !self.state.is_open() {
			return match key {
				ComboKey::ArrowDown | ComboKey::Enter => {
					self.open();
					true
				}
				ComboKey::ArrowUp | ComboKey::Escape => false,
			};
		}

		match key {
			ComboKey::ArrowDown => {
				self.move_active(1);
				true
			}
			ComboKey::ArrowUp => {
				self.move_active(-1);
				true
			}
			ComboKey::Enter => match self.active_index {
				Some(idx) => self.select_index(idx),
				None => false,
			},
			ComboKey::Escape => {
				self.close();
				true
			}
		}
	}

	/// Updates the query text; opens the list if it was closed.
	pub fn on_input(&mut self, text: &str) {
		self.query = text.to_string();
		self.state = ComboboxState::OpenLoading;
		self.source.on_input(text);
	}

	/// Pointer interaction outside the control; same as Escape.
	pub fn click_outside(&mut self) {
		if self.state.is_open() {
			self.close();
		}
	}

	/// Commits the option at `idx` of the current page and closes the list.
	pub fn select_index(&mut self, idx: usize) -> bool {
		let Some(entity) = self.results.get(idx).cloned() else {
			return false;
		};
		tracing::debug!(id = %entity.id, "combobox.commit");
		self.lookups.cancel_previous();
		self.selection = Selection::Resolved(entity);
		self.close();
		true
	}

	/// Restores a previously committed id, e.g. when reopening a saved form.
	///
	/// Ids missing from the current page are resolved with a point lookup;
	/// the selection stays [`Selection::Unresolved`] until it settles.
	pub fn restore_selection(&mut self, id: EntityId) {
		if self.selection.id() == Some(&id) && matches!(self.selection, Selection::Resolved(_)) {
			return;
		}
		if let Some(entity) = self.results.iter().find(|entity| entity.id == id) {
			self.lookups.cancel_previous();
			self.selection = Selection::Resolved(entity.clone());
			return;
		}

		let ticket = self.lookups.issue();
		tracing::debug!(%id, token = %ticket.token, "combobox.lookup");
		self.selection = Selection::Unresolved(id.clone());

		let search = Arc::clone(&self.search);
		let lookup_tx = self.lookup_tx.clone();
		let token = ticket.token;
		self.runtime.spawn(TaskClass::Interactive, async move {
			let outcome = search.get_by_id(&id).await;
			let _ = lookup_tx.send(LookupEvent { token, id, outcome });
		});
	}

	/// Clears the committed selection and resets an open list immediately.
	pub fn clear(&mut self) {
		self.lookups.cancel_previous();
		self.selection = Selection::None;
		self.query.clear();
		if self.state.is_open() {
			self.state = ComboboxState::OpenLoading;
			self.source.on_input("");
		}
	}

	/// Re-issues the failed query without waiting for the debounce.
	pub fn retry(&mut self) {
		if !matches!(self.state, ComboboxState::OpenError(_)) {
			return;
		}
		self.state = ComboboxState::OpenLoading;
		let query = self.query.clone();
		self.source.search_now(&query);
	}

	/// Applies every resolution delivered so far.
	pub fn pump(&mut self) -> Vec<ComboboxEvent> {
		let mut events = Vec::new();
		while let Some(event) = self.source.try_resolve() {
			events.extend(self.apply_search(event));
		}
		while let Ok(event) = self.lookup_rx.try_recv() {
			events.extend(self.apply_lookup(event));
		}
		events
	}

	/// Waits for the next current resolution and applies it.
	pub async fn next_event(&mut self) -> ComboboxEvent {
		loop {
			let applied = tokio::select! {
				event = self.source.resolved() => self.apply_search(event),
				Some(event) = self.lookup_rx.recv() => self.apply_lookup(event),
			};
			if let Some(event) = applied {
				return event;
			}
		}
	}

	fn open(&mut self) {
		tracing::debug!("combobox.open");
		self.state = ComboboxState::OpenLoading;
		self.query.clear();
		self.results.clear();
		self.active_index = None;
		self.source.search_now("");
	}

	fn close(&mut self) {
		tracing::debug!("combobox.close");
		self.source.cancel();
		self.state = ComboboxState::Closed;
		self.query.clear();
		self.results.clear();
		self.active_index = None;
	}

	fn move_active(&mut self, delta: isize) {
		let last = self.results.len() as isize - 1;
		let current = self.active_index.map_or(-1, |idx| idx as isize);
		let next = (current + delta).clamp(-1, last.max(-1));
		self.active_index = usize::try_from(next).ok();
	}

	fn apply_search(&mut self, event: SearchEvent) -> Option<ComboboxEvent> {
		if !self.state.is_open() {
			return None;
		}
		match event.outcome {
			Ok(results) => {
				let count = results.len();
				self.active_index = (count > 0).then_some(0);
				self.results = results;
				self.state = ComboboxState::OpenReady;
				Some(ComboboxEvent::ResultsReady { query: event.query, count })
			}
			Err(error) => {
				tracing::debug!(query = %event.query, %error, "combobox.search_failed");
				self.results.clear();
				self.active_index = None;
				self.state = ComboboxState::OpenError(error.to_string());
				Some(ComboboxEvent::SearchFailed { query: event.query, error })
			}
		}
	}

	fn apply_lookup(&mut self, event: LookupEvent) -> Option<ComboboxEvent> {
		if !self.lookups.accept(event.token) {
			return None;
		}
		if self.selection != Selection::Unresolved(event.id.clone()) {
			return None;
		}
		match event.outcome {
			Ok(Some(entity)) => {
				self.selection = Selection::Resolved(entity);
				Some(ComboboxEvent::SelectionResolved(event.id))
			}
			Ok(None) => {
				tracing::warn!(id = %event.id, "combobox.selection_missing");
				self.selection = Selection::None;
				Some(ComboboxEvent::SelectionMissing(event.id))
			}
			Err(error) => {
				tracing::warn!(id = %event.id, %error, "combobox.lookup_failed");
				Some(ComboboxEvent::LookupFailed { id: event.id, error })
			}
		}
	}
}
