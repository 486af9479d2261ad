use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::entity::EntityStatus;
use crate::ids::EntityId;

/// Status stage of the filter pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
	#[default]
	All,
	Draft,
	Published,
}

impl StatusFilter {
	pub fn admits(self, status: EntityStatus) -> bool {
		match self {
			Self::All => true,
			Self::Draft => status == EntityStatus::Draft,
			Self::Published => status == EntityStatus::Published,
		}
	}
}

/// Recency window applied to `updated_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DateWindow {
	#[default]
	#[serde(rename = "all")]
	All,
	#[serde(rename = "7d")]
	LastWeek,
	#[serde(rename = "30d")]
	LastMonth,
}

impl DateWindow {
	/// Returns the window length, or `None` when unbounded.
	pub const fn span(self) -> Option<Duration> {
		const DAY: u64 = 24 * 60 * 60;
		match self {
			Self::All => None,
			Self::LastWeek => Some(Duration::from_secs(7 * DAY)),
			Self::LastMonth => Some(Duration::from_secs(30 * DAY)),
		}
	}
}

/// Attachment filter tying posts to a referenced training.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefFilter {
	pub enabled: bool,
	/// With no id, an enabled filter admits any entity with an attachment.
	#[serde(default)]
	pub ref_id: Option<EntityId>,
}

/// Layered filter criteria for the editor's entity list.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterCriteria {
	pub text: String,
	pub status: StatusFilter,
	pub tag: Option<String>,
	pub date_window: DateWindow,
	pub ref_filter: RefFilter,
}

impl FilterCriteria {
	/// Returns true when no stage narrows anything.
	pub fn is_unfiltered(&self) -> bool {
		!self.ref_filter.enabled
			&& self.text.trim().is_empty()
			&& self.status == StatusFilter::All
			&& self.tag.as_deref().is_none_or(|tag| tag.trim().is_empty())
			&& self.date_window == DateWindow::All
	}
}
