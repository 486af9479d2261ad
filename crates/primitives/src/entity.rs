use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::ids::{CommunityId, EntityId, OwnerId};

/// Publication status shared by trainings and posts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityStatus {
	#[default]
	Draft,
	Published,
}

impl EntityStatus {
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Draft => "draft",
			Self::Published => "published",
		}
	}
}

/// A remotely searchable entity (a training).
///
/// Values are never mutated after a fetch; each successful search replaces
/// the whole result page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchableEntity {
	pub id: EntityId,
	pub title: String,
	pub status: EntityStatus,
	pub updated_at: DateTime<Utc>,
	pub owner_id: OwnerId,
}

/// An entity edited in the two-pane editor (a community post).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditableEntity {
	pub id: EntityId,
	pub title: String,
	pub body: String,
	#[serde(default)]
	pub tags: BTreeSet<String>,
	#[serde(default)]
	pub attached_ref_id: Option<EntityId>,
	pub status: EntityStatus,
	pub owner_id: OwnerId,
	pub community_id: CommunityId,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl EditableEntity {
	/// Builds a tentative entity carrying the sentinel id.
	pub fn draft(owner_id: OwnerId, community_id: CommunityId, form: FormData, now: DateTime<Utc>) -> Self {
		Self {
			id: EntityId::sentinel(),
			title: form.title,
			body: form.body,
			tags: form.tags,
			attached_ref_id: form.attached_ref_id,
			status: form.status,
			owner_id,
			community_id,
			created_at: now,
			updated_at: now,
		}
	}

	/// Projects the user-editable fields.
	pub fn form_data(&self) -> FormData {
		FormData {
			title: self.title.clone(),
			body: self.body.clone(),
			tags: self.tags.clone(),
			attached_ref_id: self.attached_ref_id.clone(),
			status: self.status,
		}
	}

	/// Applies every field named by `patch` and stamps `updated_at`.
	pub fn apply_patch(&mut self, patch: &EntityPatch, at: DateTime<Utc>) {
		if let Some(title) = &patch.title {
			self.title.clone_from(title);
		}
		if let Some(body) = &patch.body {
			self.body.clone_from(body);
		}
		if let Some(tags) = &patch.tags {
			self.tags.clone_from(tags);
		}
		if let Some(attached) = &patch.attached_ref_id {
			self.attached_ref_id.clone_from(attached);
		}
		if let Some(status) = patch.status {
			self.status = status;
		}
		self.updated_at = at;
	}
}

/// The editable field subset of a post, as held by an open form.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormData {
	pub title: String,
	pub body: String,
	#[serde(default)]
	pub tags: BTreeSet<String>,
	#[serde(default)]
	pub attached_ref_id: Option<EntityId>,
	#[serde(default)]
	pub status: EntityStatus,
}

/// Partial update of an [`EditableEntity`]. `None` leaves a field untouched.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityPatch {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub title: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub body: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub tags: Option<BTreeSet<String>>,
	/// `Some(None)` detaches; serialized as an explicit `null`.
	#[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
	pub attached_ref_id: Option<Option<EntityId>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub status: Option<EntityStatus>,
}

impl EntityPatch {
	/// Builds the patch that turns `entity`'s fields into `form`.
	pub fn diff(entity: &EditableEntity, form: &FormData) -> Self {
		Self {
			title: (entity.title != form.title).then(|| form.title.clone()),
			body: (entity.body != form.body).then(|| form.body.clone()),
			tags: (entity.tags != form.tags).then(|| form.tags.clone()),
			attached_ref_id: (entity.attached_ref_id != form.attached_ref_id).then(|| form.attached_ref_id.clone()),
			status: (entity.status != form.status).then_some(form.status),
		}
	}

	pub fn is_empty(&self) -> bool {
		self.title.is_none() && self.body.is_none() && self.tags.is_none() && self.attached_ref_id.is_none() && self.status.is_none()
	}
}

/// Maps a present field, `null` included, to `Some`; absence stays `None`
/// through `#[serde(default)]`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
	D: Deserializer<'de>,
	T: Deserialize<'de>,
{
	T::deserialize(deserializer).map(Some)
}
