//! Collaborator seams consumed by the console core.
//!
//! Storage, search, moderation, local persistence and notification are all
//! external; the core only sees these traits. Every implementation must be
//! `Send + Sync` because calls are issued from spawned worker tasks.

use std::sync::Arc;

use async_trait::async_trait;
use brandline_primitives::{EditableEntity, EntityId, EntityPatch, ModerationVerdict, OwnerId, SearchableEntity};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::clock::Clock;
use crate::notifications::Notifier;

/// Failure reported by a remote collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollaboratorError {
	#[error("network failure: {0}")]
	Network(String),
	#[error("request rejected: {0}")]
	Rejected(String),
	#[error("request cancelled")]
	Cancelled,
}

/// Which owners' entities a search may return.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OwnerScope {
	#[default]
	All,
	Owned(OwnerId),
}

impl OwnerScope {
	pub fn admits(&self, owner: &OwnerId) -> bool {
		match self {
			Self::All => true,
			Self::Owned(id) => id == owner,
		}
	}
}

/// Remote search over searchable entities.
#[async_trait]
pub trait EntitySearch: Send + Sync {
	/// Searches by free text. Implementations should stop early once
	/// `cancel` fires; the caller discards superseded results regardless.
	async fn search(&self, scope: &OwnerScope, query: &str, limit: usize, cancel: CancellationToken) -> Result<Vec<SearchableEntity>, CollaboratorError>;

	/// Point lookup used when a selected id is missing from the result page.
	async fn get_by_id(&self, id: &EntityId) -> Result<Option<SearchableEntity>, CollaboratorError>;
}

/// Remote persistence of editable entities.
#[async_trait]
pub trait EntityStore: Send + Sync {
	/// Persists a new entity and returns its real id.
	async fn persist_create(&self, entity: &EditableEntity) -> Result<EntityId, CollaboratorError>;
	async fn persist_update(&self, id: &EntityId, patch: &EntityPatch) -> Result<(), CollaboratorError>;
	async fn persist_delete(&self, id: &EntityId) -> Result<(), CollaboratorError>;
}

/// Content moderation consulted before a create or update commit.
#[async_trait]
pub trait Moderator: Send + Sync {
	async fn moderate_text(&self, text: &str) -> Result<ModerationVerdict, CollaboratorError>;
}

/// Synchronous key-value persistence local to the session.
pub trait LocalStore: Send + Sync {
	fn get(&self, key: &str) -> Option<String>;
	fn set(&self, key: &str, value: String);
	fn remove(&self, key: &str);
}

/// The full set of collaborators a post editor session needs.
#[derive(Clone)]
pub struct Collaborators {
	pub search: Arc<dyn EntitySearch>,
	pub store: Arc<dyn EntityStore>,
	pub moderator: Arc<dyn Moderator>,
	pub local: Arc<dyn LocalStore>,
	pub notifier: Arc<dyn Notifier>,
	pub clock: Arc<dyn Clock>,
}
