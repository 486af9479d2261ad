use serde::{Deserialize, Serialize};

/// Result of submitting user text to the moderation collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModerationVerdict {
	/// Text to persist; may be a cleaned version of the input.
	pub text: String,
	pub blocked: bool,
	pub needs_review: bool,
	#[serde(default)]
	pub flags: Vec<String>,
}

impl ModerationVerdict {
	/// A verdict that lets `text` through unchanged.
	pub fn allow(text: impl Into<String>) -> Self {
		Self {
			text: text.into(),
			..Self::default()
		}
	}
}
