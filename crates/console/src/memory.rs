//! In-memory collaborators for offline sessions and tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use brandline_primitives::{EditableEntity, EntityId, EntityPatch, ModerationVerdict, SearchableEntity};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::collab::{CollaboratorError, EntitySearch, EntityStore, LocalStore, Moderator, OwnerScope};

/// Session-local key-value store.
#[derive(Debug, Default)]
pub struct MemoryLocalStore {
	entries: Mutex<HashMap<String, String>>,
}

impl MemoryLocalStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn len(&self) -> usize {
		self.entries.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.lock().is_empty()
	}
}

impl LocalStore for MemoryLocalStore {
	fn get(&self, key: &str) -> Option<String> {
		self.entries.lock().get(key).cloned()
	}

	fn set(&self, key: &str, value: String) {
		self.entries.lock().insert(key.to_string(), value);
	}

	fn remove(&self, key: &str) {
		self.entries.lock().remove(key);
	}
}

/// Search over a fixed list of trainings.
///
/// Matches are case-insensitive substrings of the title; an empty query
/// returns the first page. Results keep fixture order.
#[derive(Debug, Default)]
pub struct FixtureCatalog {
	entries: Vec<SearchableEntity>,
}

impl FixtureCatalog {
	pub fn new(entries: Vec<SearchableEntity>) -> Self {
		Self { entries }
	}

	pub fn entries(&self) -> &[SearchableEntity] {
		&self.entries
	}
}

#[async_trait]
impl EntitySearch for FixtureCatalog {
	async fn search(&self, scope: &OwnerScope, query: &str, limit: usize, cancel: CancellationToken) -> Result<Vec<SearchableEntity>, CollaboratorError> {
		if cancel.is_cancelled() {
			return Err(CollaboratorError::Cancelled);
		}
		let needle = query.trim().to_lowercase();
		Ok(self
			.entries
			.iter()
			.filter(|entry| scope.admits(&entry.owner_id))
			.filter(|entry| needle.is_empty() || entry.title.to_lowercase().contains(&needle))
			.take(limit)
			.cloned()
			.collect())
	}

	async fn get_by_id(&self, id: &EntityId) -> Result<Option<SearchableEntity>, CollaboratorError> {
		Ok(self.entries.iter().find(|entry| &entry.id == id).cloned())
	}
}

/// Store that accepts every write and mints sequential ids.
#[derive(Debug, Default)]
pub struct MemoryEntityStore {
	next_id: AtomicU64,
	entities: Mutex<HashMap<EntityId, EditableEntity>>,
}

impl MemoryEntityStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn get(&self, id: &EntityId) -> Option<EditableEntity> {
		self.entities.lock().get(id).cloned()
	}

	pub fn len(&self) -> usize {
		self.entities.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.entities.lock().is_empty()
	}
}

#[async_trait]
impl EntityStore for MemoryEntityStore {
	async fn persist_create(&self, entity: &EditableEntity) -> Result<EntityId, CollaboratorError> {
		let n = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
		let id = EntityId::new(format!("post-{n}"));
		let mut stored = entity.clone();
		stored.id = id.clone();
		self.entities.lock().insert(id.clone(), stored);
		Ok(id)
	}

	async fn persist_update(&self, id: &EntityId, patch: &EntityPatch) -> Result<(), CollaboratorError> {
		let mut entities = self.entities.lock();
		let entity = entities.get_mut(id).ok_or_else(|| CollaboratorError::Rejected(format!("unknown entity {id}")))?;
		let at = entity.updated_at;
		entity.apply_patch(patch, at);
		Ok(())
	}

	async fn persist_delete(&self, id: &EntityId) -> Result<(), CollaboratorError> {
		self.entities.lock().remove(id);
		Ok(())
	}
}

/// Moderator that never blocks or flags anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughModerator;

#[async_trait]
impl Moderator for PassthroughModerator {
	async fn moderate_text(&self, text: &str) -> Result<ModerationVerdict, CollaboratorError> {
		Ok(ModerationVerdict::allow(text))
	}
}
