use thiserror::Error;

use crate::entity::FormData;

/// Longest title accepted when no configuration overrides it.
pub const DEFAULT_MAX_TITLE_LEN: usize = 200;

/// Local validation failures; raised before any network call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
	#[error("title is required")]
	MissingTitle,
	#[error("title exceeds {max} characters")]
	TitleTooLong { max: usize },
	#[error("entity {0} has not been saved yet")]
	NotPersisted(String),
	#[error("another new entity is still being saved")]
	CreatePending,
	#[error("entity {0} is not in the list")]
	UnknownEntity(String),
}

impl FormData {
	/// Checks the required-field rules for a create or update commit.
	pub fn validate(&self, max_title_len: usize) -> Result<(), ValidationError> {
		let title = self.title.trim();
		if title.is_empty() {
			return Err(ValidationError::MissingTitle);
		}
		if title.chars().count() > max_title_len {
			return Err(ValidationError::TitleTooLong { max: max_title_len });
		}
		Ok(())
	}
}
