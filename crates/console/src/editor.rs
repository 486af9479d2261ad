//! Two-pane post editor session.
//!
//! [`PostEditor`] owns the live post list (through the [`OptimisticMutator`]),
//! the open form, its autosave slot and the training picker. Saving runs
//! the form through moderation first; the verdict decides whether the post
//! is persisted, demoted to a draft for review, or held back as a local
//! [`DraftPreview`].
//!
//! Like the components it wires together, the session only changes state
//! when its owner calls a method or drains events with [`PostEditor::pump`]
//! or [`PostEditor::next_event`].

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use brandline_config::ConsoleConfig;
use brandline_primitives::{AutosaveKey, AutosaveRecord, CommunityId, EditableEntity, EntityId, EntityPatch, EntityStatus, FilterCriteria, FormData, ModerationVerdict, OwnerId, ValidationError};
use brandline_worker::{TaskClass, WorkerRuntime};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::autosave::AutosaveManager;
use crate::clock::Clock;
use crate::collab::{CollaboratorError, Collaborators, Moderator, OwnerScope};
use crate::combobox::{AsyncComboboxController, ComboboxEvent};
use crate::filter::{FilterEngine, available_tags};
use crate::mutator::{MutationHandle, OpId, OptimisticMutator, Settlement};
use crate::notifications::{Notifier, Urgency};
use crate::sequencer::{QueryToken, RequestSequencer};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditorError {
	#[error("no post is open")]
	NothingOpen,
	#[error(transparent)]
	Validation(#[from] ValidationError),
}

/// Who is editing, where, and which trainings the picker may offer.
#[derive(Debug, Clone)]
pub struct SessionIdentity {
	pub owner_id: OwnerId,
	pub community_id: CommunityId,
	pub search_scope: OwnerScope,
}

/// An autosaved form found when the post was opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreOffer {
	pub record: AutosaveRecord,
}

/// A form moderation refused to publish, kept locally for revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftPreview {
	pub entity_id: EntityId,
	pub form: FormData,
	pub flags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorEvent {
	Picker(ComboboxEvent),
	Settled(Settlement),
	/// Moderation passed and the write was issued.
	Submitted { handle: MutationHandle, held_for_review: bool },
	/// Moderation passed but the form matched the stored post.
	Unchanged(EntityId),
	Blocked(DraftPreview),
	SaveFailed { entity_id: EntityId, reason: String },
}

#[derive(Debug, Clone)]
struct OpenForm {
	/// Distinguishes successive forms that share the sentinel id.
	session: u64,
	entity_id: EntityId,
	baseline: FormData,
	form: FormData,
	/// The create this form submitted, while it is in flight.
	create_op: Option<OpId>,
}

/// Combined moderation result for one form.
#[derive(Debug)]
struct FormVerdict {
	title: String,
	body: String,
	blocked: bool,
	needs_review: bool,
	flags: Vec<String>,
}

#[derive(Debug)]
struct ModerationEvent {
	token: QueryToken,
	session: u64,
	entity_id: EntityId,
	form: FormData,
	outcome: Result<FormVerdict, CollaboratorError>,
}

pub struct PostEditor {
	identity: SessionIdentity,
	mutator: OptimisticMutator,
	autosave: AutosaveManager,
	picker: AsyncComboboxController,
	moderator: Arc<dyn Moderator>,
	notifier: Arc<dyn Notifier>,
	clock: Arc<dyn Clock>,
	runtime: WorkerRuntime,
	max_title_len: usize,
	criteria: FilterCriteria,
	open: Option<OpenForm>,
	next_session: u64,
	restore_offer: Option<RestoreOffer>,
	preview: Option<DraftPreview>,
	moderation: RequestSequencer,
	moderation_tx: mpsc::UnboundedSender<ModerationEvent>,
	moderation_rx: mpsc::UnboundedReceiver<ModerationEvent>,
	/// Writes whose success clears an autosave slot.
	saves: HashMap<OpId, AutosaveKey>,
}

impl PostEditor {
	pub fn new(collab: Collaborators, identity: SessionIdentity, config: &ConsoleConfig, runtime: WorkerRuntime) -> Self {
		let (moderation_tx, moderation_rx) = mpsc::unbounded_channel();
		Self {
			mutator: OptimisticMutator::new(collab.store, Arc::clone(&collab.notifier), Arc::clone(&collab.clock), &config.editor, runtime.clone()),
			autosave: AutosaveManager::new(collab.local, Arc::clone(&collab.clock), &config.autosave, runtime.clone()),
			picker: AsyncComboboxController::new(collab.search, identity.search_scope.clone(), &config.search, runtime.clone()),
			identity,
			moderator: collab.moderator,
			notifier: collab.notifier,
			clock: collab.clock,
			runtime,
			max_title_len: config.editor.max_title_len,
			criteria: FilterCriteria::default(),
			open: None,
			next_session: 0,
			restore_offer: None,
			preview: None,
			moderation: RequestSequencer::new(),
			moderation_tx,
			moderation_rx,
			saves: HashMap::new(),
		}
	}

	/// Replaces the post list, e.g. with the result of the initial fetch.
	pub fn load(&mut self, posts: Vec<EditableEntity>) {
		self.mutator.load(posts);
		if let Some(open) = &self.open
			&& !open.entity_id.is_sentinel()
			&& self.mutator.get(&open.entity_id).is_none()
		{
			self.close_form();
		}
	}

	pub fn entities(&self) -> &[EditableEntity] {
		self.mutator.entities()
	}

	pub fn selection(&self) -> Option<&EntityId> {
		self.mutator.selection()
	}

	pub fn mutator(&self) -> &OptimisticMutator {
		&self.mutator
	}

	pub fn picker(&self) -> &AsyncComboboxController {
		&self.picker
	}

	pub fn picker_mut(&mut self) -> &mut AsyncComboboxController {
		&mut self.picker
	}

	/// Id of the open form's post; the sentinel for an unsaved draft.
	pub fn open_entity_id(&self) -> Option<&EntityId> {
		self.open.as_ref().map(|open| &open.entity_id)
	}

	pub fn form(&self) -> Option<&FormData> {
		self.open.as_ref().map(|open| &open.form)
	}

	pub fn is_dirty(&self) -> bool {
		self.open.as_ref().is_some_and(|open| open.form != open.baseline)
	}

	pub fn restore_offer(&self) -> Option<&RestoreOffer> {
		self.restore_offer.as_ref()
	}

	pub fn draft_preview(&self) -> Option<&DraftPreview> {
		self.preview.as_ref()
	}

	/// True while a save is being moderated or persisted.
	pub fn is_saving(&self) -> bool {
		self.moderation.is_in_flight() || !self.saves.is_empty()
	}

	/// Selects a listed post and loads it into the form.
	///
	/// A usable autosave record becomes a [`RestoreOffer`]; the form keeps
	/// the stored values until the offer is accepted.
	pub fn open(&mut self, id: &EntityId) -> Result<(), EditorError> {
		let entity = self.mutator.get(id).ok_or_else(|| ValidationError::UnknownEntity(id.to_string()))?;
		let baseline = entity.form_data();
		self.mutator.select(Some(id.clone()));
		tracing::debug!(%id, "editor.open");
		self.load_form(id.clone(), baseline, true);
		Ok(())
	}

	/// Opens an empty form for a post that does not exist yet.
	///
	/// While an earlier new post is still being created, the sentinel
	/// autosave slot belongs to that post and is not offered.
	pub fn new_draft(&mut self) {
		let create_in_flight = self.mutator.get(&EntityId::sentinel()).is_some();
		tracing::debug!(create_in_flight, "editor.new_draft");
		self.load_form(EntityId::sentinel(), FormData::default(), !create_in_flight);
	}

	/// Replaces the working form and schedules an autosave while it differs
	/// from the stored post.
	pub fn edit(&mut self, form: FormData) -> Result<(), EditorError> {
		let open = self.open.as_mut().ok_or(EditorError::NothingOpen)?;
		open.form = form;
		let key = AutosaveKey::new(open.entity_id.clone(), self.identity.owner_id.clone());
		if open.form != open.baseline {
			self.autosave.touch(&key, open.form.clone());
		} else if self.restore_offer.is_none() {
			self.autosave.clear(&key);
		}
		Ok(())
	}

	/// Copies the picker's committed training into the form.
	pub fn attach_picked(&mut self) -> Result<(), EditorError> {
		let mut form = self.form().cloned().ok_or(EditorError::NothingOpen)?;
		form.attached_ref_id = self.picker.selection().id().cloned();
		self.edit(form)
	}

	/// Loads the offered record into the form. Returns false without an offer.
	pub fn accept_restore(&mut self) -> bool {
		let Some(offer) = self.restore_offer.take() else {
			return false;
		};
		let Some(open) = self.open.as_mut() else {
			return false;
		};
		tracing::debug!(entity = %offer.record.entity_id, "editor.restore_accepted");
		open.form = offer.record.form_data;
		match open.form.attached_ref_id.clone() {
			Some(ref_id) => self.picker.restore_selection(ref_id),
			None => self.picker.clear(),
		}
		true
	}

	/// Discards the offered record.
	pub fn decline_restore(&mut self) -> bool {
		let Some(offer) = self.restore_offer.take() else {
			return false;
		};
		self.autosave.decline(&offer.record.key());
		true
	}

	/// Validates the form and submits it to moderation.
	///
	/// Validation failures return immediately without any network call.
	/// The verdict is applied when it is drained; a newer save supersedes
	/// a verdict still in flight.
	pub fn save(&mut self) -> Result<QueryToken, EditorError> {
		let open = self.open.as_ref().ok_or(EditorError::NothingOpen)?;
		open.form.validate(self.max_title_len)?;

		let ticket = self.moderation.issue();
		let token = ticket.token;
		let session = open.session;
		let entity_id = open.entity_id.clone();
		let form = open.form.clone();
		self.preview = None;
		tracing::debug!(%entity_id, %token, "editor.save");

		let moderator = Arc::clone(&self.moderator);
		let moderation_tx = self.moderation_tx.clone();
		self.runtime.spawn(TaskClass::Interactive, async move {
			let outcome = moderate_form(moderator.as_ref(), &form).await;
			let _ = moderation_tx.send(ModerationEvent {
				token,
				session,
				entity_id,
				form,
				outcome,
			});
		});
		Ok(token)
	}

	/// Optimistically removes a post; an open form for it is closed.
	pub fn delete(&mut self, id: &EntityId) -> Result<MutationHandle, EditorError> {
		let handle = self.mutator.remove(id)?;
		let key = self.autosave_key(id);
		self.saves.insert(handle.op, key);
		if self.open_entity_id() == Some(id) {
			self.close_form();
		}
		Ok(handle)
	}

	pub fn criteria(&self) -> &FilterCriteria {
		&self.criteria
	}

	pub fn set_criteria(&mut self, criteria: FilterCriteria) {
		self.criteria = criteria;
	}

	/// Posts passing the current criteria, in list order.
	pub fn visible(&self) -> Vec<&EditableEntity> {
		FilterEngine::new(&self.criteria, self.clock.now()).apply(self.mutator.entities())
	}

	/// Tags in use across the live list, for the tag filter options.
	pub fn available_tags(&self) -> BTreeSet<String> {
		available_tags(self.mutator.entities())
	}

	/// Applies every event delivered so far.
	pub fn pump(&mut self) -> Vec<EditorEvent> {
		let mut events: Vec<EditorEvent> = self.picker.pump().into_iter().map(EditorEvent::Picker).collect();
		while let Ok(event) = self.moderation_rx.try_recv() {
			events.extend(self.apply_moderation(event));
		}
		for settlement in self.mutator.pump() {
			events.push(self.apply_settlement(settlement));
		}
		events
	}

	/// Waits for the next event and applies it.
	pub async fn next_event(&mut self) -> EditorEvent {
		loop {
			let applied = tokio::select! {
				event = self.picker.next_event() => Some(EditorEvent::Picker(event)),
				Some(event) = self.moderation_rx.recv() => self.apply_moderation(event),
				settlement = self.mutator.settled() => Some(self.apply_settlement(settlement)),
			};
			if let Some(event) = applied {
				return event;
			}
		}
	}

	fn load_form(&mut self, entity_id: EntityId, baseline: FormData, offer_restore: bool) {
		let key = self.autosave_key(&entity_id);
		self.restore_offer = if offer_restore { self.autosave.try_restore(&key, &baseline).map(|record| RestoreOffer { record }) } else { None };
		self.preview = None;
		match baseline.attached_ref_id.clone() {
			Some(ref_id) => self.picker.restore_selection(ref_id),
			None => self.picker.clear(),
		}
		self.next_session += 1;
		self.open = Some(OpenForm {
			session: self.next_session,
			entity_id,
			form: baseline.clone(),
			baseline,
			create_op: None,
		});
	}

	fn autosave_key(&self, entity_id: &EntityId) -> AutosaveKey {
		AutosaveKey::new(entity_id.clone(), self.identity.owner_id.clone())
	}

	/// Clears `key` after a successful write, then re-arms autosave for the
	/// open form if it still holds edits the write did not carry.
	fn release_autosave(&mut self, key: &AutosaveKey, renamed: bool) {
		self.autosave.clear(key);
		let Some(open) = self.open.as_ref().filter(|open| open.form != open.baseline) else {
			return;
		};
		let open_key = self.autosave_key(&open.entity_id);
		if renamed || open_key == *key {
			tracing::debug!(entity = %open.entity_id, "editor.autosave_rearmed");
			self.autosave.touch(&open_key, open.form.clone());
		}
	}

	fn close_form(&mut self) {
		self.open = None;
		self.restore_offer = None;
		self.preview = None;
	}

	fn apply_moderation(&mut self, event: ModerationEvent) -> Option<EditorEvent> {
		if !self.moderation.accept(event.token) {
			return None;
		}
		let ModerationEvent {
			session,
			entity_id,
			form,
			outcome,
			..
		} = event;

		let verdict = match outcome {
			Ok(verdict) => verdict,
			Err(error) => {
				tracing::warn!(%entity_id, %error, "editor.moderation_failed");
				self.notifier.notify(format!("Could not check \"{}\": {error}", form.title), Urgency::Assertive);
				return Some(EditorEvent::SaveFailed {
					entity_id,
					reason: error.to_string(),
				});
			}
		};

		if verdict.blocked {
			tracing::debug!(%entity_id, flags = ?verdict.flags, "editor.moderation_blocked");
			self.notifier.notify("Moderation held this post back; it was kept as a local preview".to_string(), Urgency::Polite);
			let preview = DraftPreview {
				entity_id,
				form,
				flags: verdict.flags,
			};
			self.preview = Some(preview.clone());
			return Some(EditorEvent::Blocked(preview));
		}

		let (moderated, held_for_review) = apply_verdict(&form, verdict);
		if held_for_review {
			self.notifier.notify("Saved as a draft until it has been reviewed".to_string(), Urgency::Polite);
		}

		let result = if entity_id.is_sentinel() {
			let draft = EditableEntity::draft(self.identity.owner_id.clone(), self.identity.community_id.clone(), moderated.clone(), self.clock.now());
			self.mutator.create(draft).map(Some)
		} else {
			match self.mutator.get(&entity_id) {
				None => Err(ValidationError::UnknownEntity(entity_id.to_string())),
				Some(entity) => {
					let patch = EntityPatch::diff(entity, &moderated);
					if patch.is_empty() { Ok(None) } else { self.mutator.update(&entity_id, patch).map(Some) }
				}
			}
		};

		let key = self.autosave_key(&entity_id);
		match result {
			Ok(Some(handle)) => {
				self.saves.insert(handle.op, key);
				if let Some(open) = self.open.as_mut().filter(|open| open.session == session && handle.id.is_sentinel()) {
					open.create_op = Some(handle.op);
				}
				self.rebase_open_form(session, &form, moderated);
				Some(EditorEvent::Submitted { handle, held_for_review })
			}
			Ok(None) => {
				self.rebase_open_form(session, &form, moderated);
				self.release_autosave(&key, false);
				Some(EditorEvent::Unchanged(entity_id))
			}
			Err(error) => {
				tracing::debug!(%entity_id, %error, "editor.save_rejected");
				self.notifier.notify(format!("Could not save \"{}\": {error}", form.title), Urgency::Assertive);
				Some(EditorEvent::SaveFailed {
					entity_id,
					reason: error.to_string(),
				})
			}
		}
	}

	/// Makes the submitted values the open form's new baseline, keeping any
	/// edits made while moderation was running.
	fn rebase_open_form(&mut self, session: u64, submitted: &FormData, moderated: FormData) {
		let Some(open) = self.open.as_mut().filter(|open| open.session == session) else {
			return;
		};
		if open.form == *submitted {
			open.form = moderated.clone();
		}
		open.baseline = moderated;
	}

	fn apply_settlement(&mut self, settlement: Settlement) -> EditorEvent {
		let key = self.saves.remove(&settlement.op());
		match &settlement {
			Settlement::Created { op, id } => {
				// Only the form that submitted this create takes the real id;
				// a newer draft keeps the sentinel.
				let renamed = match self.open.as_mut().filter(|open| open.create_op == Some(*op)) {
					Some(open) => {
						open.entity_id = id.clone();
						open.create_op = None;
						true
					}
					None => false,
				};
				if let Some(key) = &key {
					self.release_autosave(key, renamed);
				}
			}
			Settlement::Updated { .. } | Settlement::Removed { .. } => {
				if let Some(key) = &key {
					self.release_autosave(key, false);
				}
			}
			Settlement::RolledBack { op, id, .. } => {
				if let Some(open) = self.open.as_mut().filter(|open| open.create_op == Some(*op)) {
					open.create_op = None;
				}
				// The form keeps the user's values; only the baseline reverts.
				if let Some(entity) = self.mutator.get(id)
					&& let Some(open) = self.open.as_mut().filter(|open| &open.entity_id == id)
				{
					open.baseline = entity.form_data();
				}
			}
			Settlement::Ignored { .. } => {}
		}
		EditorEvent::Settled(settlement)
	}
}

/// Moderates the title and body concurrently and combines the verdicts.
async fn moderate_form(moderator: &dyn Moderator, form: &FormData) -> Result<FormVerdict, CollaboratorError> {
	let body = async {
		if form.body.trim().is_empty() {
			Ok(ModerationVerdict::allow(form.body.clone()))
		} else {
			moderator.moderate_text(&form.body).await
		}
	};
	let (title, body) = tokio::join!(moderator.moderate_text(&form.title), body);
	let (title, body) = (title?, body?);
	let flags: BTreeSet<String> = title.flags.into_iter().chain(body.flags).collect();
	Ok(FormVerdict {
		blocked: title.blocked || body.blocked,
		needs_review: title.needs_review || body.needs_review,
		flags: flags.into_iter().collect(),
		title: title.text,
		body: body.text,
	})
}

/// Returns the form to persist and whether it was demoted for review.
fn apply_verdict(form: &FormData, verdict: FormVerdict) -> (FormData, bool) {
	let mut moderated = form.clone();
	moderated.title = verdict.title;
	moderated.body = verdict.body;
	let held = verdict.needs_review && moderated.status == EntityStatus::Published;
	if held {
		moderated.status = EntityStatus::Draft;
	}
	(moderated, held)
}
