//! Derivation of the visible entity list from layered criteria.
//!
//! Filtering is pure: the same entities, criteria and `now` always yield the
//! same subset, in list order. Stages run in [`PIPELINE`] order, each
//! narrowing the survivors of the previous one. Every stage is a plain
//! predicate, so the result does not depend on that order; it is fixed only
//! so the cheapest and most selective stages run first.

use std::collections::BTreeSet;

use brandline_primitives::{EditableEntity, FilterCriteria};
use chrono::{DateTime, TimeDelta, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterStage {
	/// Attached reference (training) filter.
	Reference,
	/// Case-insensitive substring over title and body.
	Text,
	Status,
	/// Tag membership.
	Tag,
	/// Recency of `updated_at`.
	DateWindow,
}

pub const PIPELINE: [FilterStage; 5] = [FilterStage::Reference, FilterStage::Text, FilterStage::Status, FilterStage::Tag, FilterStage::DateWindow];

/// Criteria prepared for repeated evaluation against one instant.
#[derive(Debug, Clone)]
pub struct FilterEngine<'a> {
	criteria: &'a FilterCriteria,
	needle: String,
	tag: Option<&'a str>,
	cutoff: Option<DateTime<Utc>>,
}

impl<'a> FilterEngine<'a> {
	pub fn new(criteria: &'a FilterCriteria, now: DateTime<Utc>) -> Self {
		let cutoff = criteria
			.date_window
			.span()
			.map(|span| TimeDelta::from_std(span).ok().and_then(|span| now.checked_sub_signed(span)).unwrap_or(DateTime::<Utc>::MIN_UTC));
		Self {
			criteria,
			needle: criteria.text.trim().to_lowercase(),
			tag: criteria.tag.as_deref().map(str::trim).filter(|tag| !tag.is_empty()),
			cutoff,
		}
	}

	/// Returns true if `entity` passes `stage`.
	pub fn admits(&self, stage: FilterStage, entity: &EditableEntity) -> bool {
		match stage {
			FilterStage::Reference => {
				let filter = &self.criteria.ref_filter;
				if !filter.enabled {
					return true;
				}
				match &filter.ref_id {
					Some(ref_id) => entity.attached_ref_id.as_ref() == Some(ref_id),
					None => entity.attached_ref_id.is_some(),
				}
			}
			FilterStage::Text => self.needle.is_empty() || entity.title.to_lowercase().contains(&self.needle) || entity.body.to_lowercase().contains(&self.needle),
			FilterStage::Status => self.criteria.status.admits(entity.status),
			FilterStage::Tag => self.tag.is_none_or(|tag| entity.tags.contains(tag)),
			FilterStage::DateWindow => self.cutoff.is_none_or(|cutoff| entity.updated_at >= cutoff),
		}
	}

	/// Runs the full pipeline.
	pub fn apply<'e>(&self, entities: &'e [EditableEntity]) -> Vec<&'e EditableEntity> {
		self.apply_stages(entities, &PIPELINE)
	}

	/// Runs `stages` in the given order.
	pub fn apply_stages<'e>(&self, entities: &'e [EditableEntity], stages: &[FilterStage]) -> Vec<&'e EditableEntity> {
		let mut visible: Vec<&EditableEntity> = entities.iter().collect();
		for &stage in stages {
			visible.retain(|entity| self.admits(stage, entity));
		}
		visible
	}
}

/// Filters `entities` by `criteria` as of `now`.
pub fn filter_entities<'e>(entities: &'e [EditableEntity], criteria: &FilterCriteria, now: DateTime<Utc>) -> Vec<&'e EditableEntity> {
	FilterEngine::new(criteria, now).apply(entities)
}

/// Every tag used by at least one entity, sorted.
pub fn available_tags(entities: &[EditableEntity]) -> BTreeSet<String> {
	entities.iter().flat_map(|entity| entity.tags.iter().cloned()).collect()
}
