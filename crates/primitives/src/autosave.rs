use serde::{Deserialize, Serialize};

use crate::entity::FormData;
use crate::ids::{EntityId, OwnerId};

/// Identity of one autosave slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AutosaveKey {
	pub entity_id: EntityId,
	pub owner_id: OwnerId,
}

impl AutosaveKey {
	pub fn new(entity_id: EntityId, owner_id: OwnerId) -> Self {
		Self { entity_id, owner_id }
	}

	/// Stable local-store key under `prefix`, e.g. `autosave:owner-1:post-7`.
	pub fn storage_key(&self, prefix: &str) -> String {
		format!("{prefix}:{}:{}", self.owner_id, self.entity_id)
	}
}

/// Locally persisted snapshot of an in-progress edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutosaveRecord {
	pub entity_id: EntityId,
	pub owner_id: OwnerId,
	pub form_data: FormData,
	pub saved_at_epoch_ms: i64,
}

impl AutosaveRecord {
	pub fn key(&self) -> AutosaveKey {
		AutosaveKey::new(self.entity_id.clone(), self.owner_id.clone())
	}
}
