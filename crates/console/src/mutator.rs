//! Optimistic mutations over the editor's entity list.
//!
//! Every operation is applied to the local list (and selection) before its
//! remote write is issued, so the editor reflects the change immediately.
//! Each in-flight write keeps the state it replaced; when a write fails the
//! touched state is restored from it and the failure is announced once.
//!
//! # Ordering
//!
//! The visible value of an entity always reflects the most recently
//! initiated operation on it. Pending operations are kept in initiation
//! order, and a failed update that has already been superseded rebases the
//! later updates onto its snapshot instead of overwriting them.
//!
//! # Identity
//!
//! A created entity carries [`EntityId::SENTINEL`] until its persist
//! resolves; the swap to the real id touches the list and the selection in
//! one transition. Only one sentinel may exist at a time.
//!
//! Operations on different entities never interact. Persist calls are never
//! cancelled, but results for entities deleted locally in the meantime are
//! ignored.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use brandline_config::EditorConfig;
use brandline_primitives::{EditableEntity, EntityId, EntityPatch, ValidationError};
use brandline_worker::{TaskClass, WorkerRuntime};
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use crate::clock::Clock;
use crate::collab::{CollaboratorError, EntityStore};
use crate::notifications::{Notifier, Urgency};

/// Identifies one optimistic operation, ordered by initiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OpId(u64);

/// Returned by every accepted operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationHandle {
	pub op: OpId,
	/// Id the operation targets; the sentinel for creates.
	pub id: EntityId,
}

/// How an operation's remote write settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settlement {
	Created { op: OpId, id: EntityId },
	Updated { op: OpId, id: EntityId },
	Removed { op: OpId, id: EntityId },
	/// The write failed and local state was restored.
	RolledBack { op: OpId, id: EntityId, error: CollaboratorError },
	/// The entity was deleted locally before the write settled.
	Ignored { op: OpId, id: EntityId },
}

impl Settlement {
	pub fn op(&self) -> OpId {
		match self {
			Self::Created { op, .. } | Self::Updated { op, .. } | Self::Removed { op, .. } | Self::RolledBack { op, .. } | Self::Ignored { op, .. } => *op,
		}
	}

	pub fn is_success(&self) -> bool {
		matches!(self, Self::Created { .. } | Self::Updated { .. } | Self::Removed { .. })
	}
}

#[derive(Debug)]
enum Pending {
	Create {
		prior_selection: Option<EntityId>,
	},
	/// Settled updates stay here while an earlier update on the same entity
	/// is unsettled, so a rollback of that earlier update can replay them.
	Update {
		id: EntityId,
		snapshot: EditableEntity,
		patch: EntityPatch,
		applied_at: DateTime<Utc>,
		settled: bool,
	},
	Remove {
		snapshot: EditableEntity,
		index: usize,
	},
}

#[derive(Debug)]
enum Persisted {
	Created(EntityId),
	Updated,
	Removed,
}

#[derive(Debug)]
struct MutationEvent {
	op: OpId,
	outcome: Result<Persisted, CollaboratorError>,
}

pub struct OptimisticMutator {
	entities: Vec<EditableEntity>,
	selection: Option<EntityId>,
	pending: BTreeMap<OpId, Pending>,
	next_op: u64,
	max_title_len: usize,
	store: Arc<dyn EntityStore>,
	notifier: Arc<dyn Notifier>,
	clock: Arc<dyn Clock>,
	runtime: WorkerRuntime,
	event_tx: mpsc::UnboundedSender<MutationEvent>,
	event_rx: mpsc::UnboundedReceiver<MutationEvent>,
}

impl OptimisticMutator {
	pub fn new(store: Arc<dyn EntityStore>, notifier: Arc<dyn Notifier>, clock: Arc<dyn Clock>, config: &EditorConfig, runtime: WorkerRuntime) -> Self {
		let (event_tx, event_rx) = mpsc::unbounded_channel();
		Self {
			entities: Vec::new(),
			selection: None,
			pending: BTreeMap::new(),
			next_op: 0,
			max_title_len: config.max_title_len,
			store,
			notifier,
			clock,
			runtime,
			event_tx,
			event_rx,
		}
	}

	/// Replaces the list wholesale, e.g. after the initial fetch.
	pub fn load(&mut self, entities: Vec<EditableEntity>) {
		self.entities = entities;
		if self.selection.as_ref().is_some_and(|id| self.index_of(id).is_none()) {
			self.selection = None;
		}
	}

	pub fn entities(&self) -> &[EditableEntity] {
		&self.entities
	}

	pub fn get(&self, id: &EntityId) -> Option<&EditableEntity> {
		self.index_of(id).map(|idx| &self.entities[idx])
	}

	pub fn selection(&self) -> Option<&EntityId> {
		self.selection.as_ref()
	}

	pub fn selected_entity(&self) -> Option<&EditableEntity> {
		self.selection.as_ref().and_then(|id| self.get(id))
	}

	/// Selects a listed entity, or clears the selection with `None`.
	/// Returns false (and changes nothing) for ids not in the list.
	pub fn select(&mut self, id: Option<EntityId>) -> bool {
		match id {
			Some(id) if self.index_of(&id).is_none() => false,
			id => {
				self.selection = id;
				true
			}
		}
	}

	/// Number of writes that have not settled yet.
	pub fn pending_count(&self) -> usize {
		self.pending.values().filter(|pending| !matches!(pending, Pending::Update { settled: true, .. })).count()
	}

	/// Inserts `draft` under the sentinel id, selects it and persists it.
	pub fn create(&mut self, mut draft: EditableEntity) -> Result<MutationHandle, ValidationError> {
		draft.form_data().validate(self.max_title_len)?;
		let sentinel = EntityId::sentinel();
		if self.index_of(&sentinel).is_some() {
			return Err(ValidationError::CreatePending);
		}

		draft.id = sentinel.clone();
		let op = self.next_op();
		let prior_selection = self.selection.replace(sentinel.clone());
		self.entities.insert(0, draft.clone());
		self.pending.insert(op, Pending::Create { prior_selection });
		tracing::debug!(?op, "mutator.create");

		self.spawn_persist(op, move |store| async move { store.persist_create(&draft).await.map(Persisted::Created) });
		Ok(MutationHandle { op, id: sentinel })
	}

	/// Applies `patch` locally and persists it.
	pub fn update(&mut self, id: &EntityId, patch: EntityPatch) -> Result<MutationHandle, ValidationError> {
		if id.is_sentinel() {
			return Err(ValidationError::NotPersisted(id.to_string()));
		}
		let idx = self.index_of(id).ok_or_else(|| ValidationError::UnknownEntity(id.to_string()))?;

		let snapshot = self.entities[idx].clone();
		let applied_at = self.clock.now();
		let mut next = snapshot.clone();
		next.apply_patch(&patch, applied_at);
		next.form_data().validate(self.max_title_len)?;

		let op = self.next_op();
		self.entities[idx] = next;
		self.pending.insert(
			op,
			Pending::Update {
				id: id.clone(),
				snapshot,
				patch: patch.clone(),
				applied_at,
				settled: false,
			},
		);
		tracing::debug!(?op, %id, "mutator.update");

		let target = id.clone();
		self.spawn_persist(op, move |store| async move { store.persist_update(&target, &patch).await.map(|()| Persisted::Updated) });
		Ok(MutationHandle { op, id: id.clone() })
	}

	/// Removes an entity locally (clearing a selection on it) and deletes it remotely.
	pub fn remove(&mut self, id: &EntityId) -> Result<MutationHandle, ValidationError> {
		if id.is_sentinel() {
			return Err(ValidationError::NotPersisted(id.to_string()));
		}
		let index = self.index_of(id).ok_or_else(|| ValidationError::UnknownEntity(id.to_string()))?;

		let op = self.next_op();
		let snapshot = self.entities.remove(index);
		if self.selection.as_ref() == Some(id) {
			self.selection = None;
		}
		self.pending.insert(op, Pending::Remove { snapshot, index });
		tracing::debug!(?op, %id, "mutator.remove");

		let target = id.clone();
		self.spawn_persist(op, move |store| async move { store.persist_delete(&target).await.map(|()| Persisted::Removed) });
		Ok(MutationHandle { op, id: id.clone() })
	}

	/// Applies every settlement delivered so far.
	pub fn pump(&mut self) -> Vec<Settlement> {
		let mut settled = Vec::new();
		while let Some(settlement) = self.try_settle() {
			settled.push(settlement);
		}
		settled
	}

	/// Applies the next delivered settlement, if any.
	pub fn try_settle(&mut self) -> Option<Settlement> {
		loop {
			let event = self.event_rx.try_recv().ok()?;
			if let Some(settlement) = self.apply(event) {
				return Some(settlement);
			}
		}
	}

	/// Waits for the next settlement and applies it. Pends forever when no
	/// write is in flight.
	pub async fn settled(&mut self) -> Settlement {
		loop {
			let Some(event) = self.event_rx.recv().await else {
				std::future::pending::<()>().await;
				continue;
			};
			if let Some(settlement) = self.apply(event) {
				return settlement;
			}
		}
	}

	fn apply(&mut self, event: MutationEvent) -> Option<Settlement> {
		let MutationEvent { op, outcome } = event;
		let Some(pending) = self.pending.remove(&op) else {
			tracing::warn!(?op, "mutator.unknown_settlement");
			return None;
		};

		let settlement = match (pending, outcome) {
			(Pending::Create { .. }, Ok(Persisted::Created(real_id))) => self.settle_created(op, real_id),
			(Pending::Create { prior_selection }, Err(error)) => self.rollback_create(op, prior_selection, error),
			(Pending::Update { id, snapshot, patch, applied_at, .. }, Ok(_)) => {
				self.pending.insert(
					op,
					Pending::Update {
						id: id.clone(),
						snapshot,
						patch,
						applied_at,
						settled: true,
					},
				);
				self.prune_settled(&id);
				self.settle_updated(op, id)
			}
			(Pending::Update { id, snapshot, .. }, Err(error)) => {
				let settlement = self.rollback_update(op, id.clone(), snapshot, error);
				self.prune_settled(&id);
				settlement
			}
			(Pending::Remove { snapshot, .. }, Ok(_)) => {
				self.notifier.notify(format!("Deleted \"{}\"", snapshot.title), Urgency::Polite);
				Settlement::Removed { op, id: snapshot.id }
			}
			(Pending::Remove { snapshot, index }, Err(error)) => self.rollback_remove(op, snapshot, index, error),
			(pending, Ok(persisted)) => {
				tracing::warn!(?op, ?pending, ?persisted, "mutator.mismatched_settlement");
				return None;
			}
		};
		debug_assert!(self.selection_is_listed());
		Some(settlement)
	}

	fn settle_created(&mut self, op: OpId, real_id: EntityId) -> Settlement {
		let sentinel = EntityId::sentinel();
		let Some(idx) = self.index_of(&sentinel) else {
			return Settlement::Ignored { op, id: real_id };
		};

		self.entities[idx].id = real_id.clone();
		if self.selection.as_ref() == Some(&sentinel) {
			self.selection = Some(real_id.clone());
		}
		tracing::debug!(?op, id = %real_id, "mutator.created");
		self.notifier.notify(format!("Created \"{}\"", self.entities[idx].title), Urgency::Polite);
		Settlement::Created { op, id: real_id }
	}

	fn rollback_create(&mut self, op: OpId, prior_selection: Option<EntityId>, error: CollaboratorError) -> Settlement {
		let sentinel = EntityId::sentinel();
		let title = self.index_of(&sentinel).map(|idx| self.entities.remove(idx).title);
		if self.selection.as_ref() == Some(&sentinel) {
			self.selection = prior_selection.filter(|id| self.index_of(id).is_some());
		}

		tracing::warn!(?op, %error, "mutator.create_failed");
		self.notifier.notify(format!("Could not create \"{}\": {error}", title.unwrap_or_default()), Urgency::Assertive);
		Settlement::RolledBack { op, id: sentinel, error }
	}

	fn settle_updated(&mut self, op: OpId, id: EntityId) -> Settlement {
		let Some(entity) = self.get(&id) else {
			tracing::trace!(?op, %id, "mutator.settled_after_local_delete");
			return Settlement::Ignored { op, id };
		};
		self.notifier.notify(format!("Saved \"{}\"", entity.title), Urgency::Polite);
		Settlement::Updated { op, id }
	}

	fn rollback_update(&mut self, op: OpId, id: EntityId, snapshot: EditableEntity, error: CollaboratorError) -> Settlement {
		// Later operations on the entity captured state that included this
		// write; rebase them onto the snapshot. A pending remove ends the chain.
		let mut base = snapshot;
		for later in self.pending.range_mut(op..).map(|(_, pending)| pending) {
			match later {
				Pending::Update {
					id: later_id,
					snapshot: later_snapshot,
					patch,
					applied_at,
					..
				} if *later_id == id => {
					*later_snapshot = base.clone();
					base.apply_patch(patch, *applied_at);
				}
				Pending::Remove { snapshot: removed, .. } if removed.id == id => {
					*removed = base.clone();
					break;
				}
				_ => {}
			}
		}

		let Some(idx) = self.index_of(&id) else {
			tracing::trace!(?op, %id, %error, "mutator.failed_after_local_delete");
			return Settlement::Ignored { op, id };
		};
		let title = base.title.clone();
		self.entities[idx] = base;

		tracing::warn!(?op, %id, %error, "mutator.update_failed");
		self.notifier.notify(format!("Could not save \"{title}\": {error}"), Urgency::Assertive);
		Settlement::RolledBack { op, id, error }
	}

	fn rollback_remove(&mut self, op: OpId, snapshot: EditableEntity, index: usize, error: CollaboratorError) -> Settlement {
		let id = snapshot.id.clone();
		tracing::warn!(?op, %id, %error, "mutator.remove_failed");
		self.notifier.notify(format!("Could not delete \"{}\": {error}", snapshot.title), Urgency::Assertive);

		if self.index_of(&id).is_none() {
			let at = index.min(self.entities.len());
			self.entities.insert(at, snapshot);
		}
		Settlement::RolledBack { op, id, error }
	}

	/// Drops settled updates on `id` that no unsettled update precedes.
	fn prune_settled(&mut self, id: &EntityId) {
		let mut blocked = false;
		self.pending.retain(|_, pending| match pending {
			Pending::Update { id: pending_id, settled, .. } if pending_id == id => {
				if !*settled {
					blocked = true;
				}
				!*settled || blocked
			}
			_ => true,
		});
	}

	fn spawn_persist<F, Fut>(&self, op: OpId, make: F)
	where
		F: FnOnce(Arc<dyn EntityStore>) -> Fut + Send + 'static,
		Fut: Future<Output = Result<Persisted, CollaboratorError>> + Send + 'static,
	{
		let store = Arc::clone(&self.store);
		let event_tx = self.event_tx.clone();
		self.runtime.spawn(TaskClass::Background, async move {
			let outcome = make(store).await;
			let _ = event_tx.send(MutationEvent { op, outcome });
		});
	}

	fn next_op(&mut self) -> OpId {
		self.next_op += 1;
		OpId(self.next_op)
	}

	fn index_of(&self, id: &EntityId) -> Option<usize> {
		self.entities.iter().position(|entity| &entity.id == id)
	}

	fn selection_is_listed(&self) -> bool {
		self.selection.as_ref().is_none_or(|id| self.index_of(id).is_some())
	}
}

#[cfg(test)]
mod tests;
