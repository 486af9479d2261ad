use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a searchable or editable entity.
///
/// Entities that have not been persisted yet carry [`EntityId::SENTINEL`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
	/// Placeholder id for a tentative entity awaiting its first persist.
	pub const SENTINEL: &'static str = "new";

	pub fn new(id: impl Into<String>) -> Self {
		Self(id.into())
	}

	/// Returns the sentinel id.
	pub fn sentinel() -> Self {
		Self(Self::SENTINEL.to_string())
	}

	/// Returns true for the not-yet-persisted placeholder.
	pub fn is_sentinel(&self) -> bool {
		self.0 == Self::SENTINEL
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for EntityId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for EntityId {
	fn from(value: &str) -> Self {
		Self::new(value)
	}
}

/// Identifier of the user owning an entity or an edit session.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
	pub fn new(id: impl Into<String>) -> Self {
		Self(id.into())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for OwnerId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for OwnerId {
	fn from(value: &str) -> Self {
		Self::new(value)
	}
}

/// Identifier of the community a post belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommunityId(String);

impl CommunityId {
	pub fn new(id: impl Into<String>) -> Self {
		Self(id.into())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl From<&str> for CommunityId {
	fn from(value: &str) -> Self {
		Self::new(value)
	}
}
