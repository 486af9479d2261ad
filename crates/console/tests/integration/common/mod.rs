//! Shared fakes for console integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use brandline_console::{CollaboratorError, EntitySearch, EntityStore, OwnerScope};
use brandline_primitives::{CommunityId, EditableEntity, EntityId, EntityPatch, EntityStatus, OwnerId, SearchableEntity};
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

pub fn init_tracing() {
	let _ = tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).with_test_writer().try_init();
}

pub fn epoch() -> DateTime<Utc> {
	Utc.with_ymd_and_hms(2026, 7, 1, 12, 0, 0).unwrap()
}

pub fn training(id: &str, title: &str) -> SearchableEntity {
	SearchableEntity {
		id: EntityId::from(id),
		title: title.to_string(),
		status: EntityStatus::Published,
		updated_at: epoch(),
		owner_id: OwnerId::from("owner-1"),
	}
}

pub fn post(id: &str, title: &str) -> EditableEntity {
	EditableEntity {
		id: EntityId::from(id),
		title: title.to_string(),
		body: String::new(),
		tags: Default::default(),
		attached_ref_id: None,
		status: EntityStatus::Draft,
		owner_id: OwnerId::from("owner-1"),
		community_id: CommunityId::from("community-1"),
		created_at: epoch(),
		updated_at: epoch(),
	}
}

/// Catalog with per-query latency that ignores cancellation, so stale
/// responses really do arrive late.
pub struct LatencyCatalog {
	entries: Vec<SearchableEntity>,
	latency: HashMap<String, Duration>,
	pub calls: Mutex<Vec<String>>,
}

impl LatencyCatalog {
	pub fn new<S: Into<String>>(entries: Vec<SearchableEntity>, latency: impl IntoIterator<Item = (S, u64)>) -> Arc<Self> {
		Arc::new(Self {
			entries,
			latency: latency.into_iter().map(|(query, ms)| (query.into(), Duration::from_millis(ms))).collect(),
			calls: Mutex::new(Vec::new()),
		})
	}

	pub fn calls(&self) -> Vec<String> {
		self.calls.lock().clone()
	}
}

#[async_trait]
impl EntitySearch for LatencyCatalog {
	async fn search(&self, _scope: &OwnerScope, query: &str, limit: usize, _cancel: CancellationToken) -> Result<Vec<SearchableEntity>, CollaboratorError> {
		self.calls.lock().push(query.to_string());
		let delay = self.latency.get(query).copied().unwrap_or(Duration::from_millis(20));
		tokio::time::sleep(delay).await;
		Ok(self.entries.iter().filter(|entry| entry.title.contains(query)).take(limit).cloned().collect())
	}

	async fn get_by_id(&self, id: &EntityId) -> Result<Option<SearchableEntity>, CollaboratorError> {
		Ok(self.entries.iter().find(|entry| &entry.id == id).cloned())
	}
}

/// Store that fails writes whose target (entity id, or title for
/// creates) is listed, after a fixed latency.
#[derive(Default)]
pub struct FlakyStore {
	pub failing: Mutex<HashSet<String>>,
	pub latency_ms: HashMap<String, u64>,
	minted: Mutex<u32>,
}

impl FlakyStore {
	pub fn failing(targets: &[&str]) -> Arc<Self> {
		Arc::new(Self {
			failing: Mutex::new(targets.iter().map(|t| t.to_string()).collect()),
			..Self::default()
		})
	}

	pub fn with_latency(targets: &[&str], latency: &[(&str, u64)]) -> Arc<Self> {
		Arc::new(Self {
			failing: Mutex::new(targets.iter().map(|t| t.to_string()).collect()),
			latency_ms: latency.iter().map(|(t, ms)| (t.to_string(), *ms)).collect(),
			..Self::default()
		})
	}

	async fn gate(&self, target: &str) -> Result<(), CollaboratorError> {
		let ms = self.latency_ms.get(target).copied().unwrap_or(15);
		tokio::time::sleep(Duration::from_millis(ms)).await;
		if self.failing.lock().contains(target) {
			return Err(CollaboratorError::Rejected(format!("{target} refused")));
		}
		Ok(())
	}
}

#[async_trait]
impl EntityStore for FlakyStore {
	async fn persist_create(&self, entity: &EditableEntity) -> Result<EntityId, CollaboratorError> {
		self.gate(&entity.title).await?;
		let mut minted = self.minted.lock();
		*minted += 1;
		Ok(EntityId::new(format!("real-{minted}")))
	}

	async fn persist_update(&self, id: &EntityId, _patch: &EntityPatch) -> Result<(), CollaboratorError> {
		self.gate(id.as_str()).await
	}

	async fn persist_delete(&self, id: &EntityId) -> Result<(), CollaboratorError> {
		self.gate(id.as_str()).await
	}
}
