//! Core data model for the console: entity identities, searchable and
//! editable entities, patches, filter criteria and autosave records.

/// Autosave record and key types.
pub mod autosave;
/// Searchable and editable entity types.
pub mod entity;
/// Filter criteria consumed by the filter engine.
pub mod filter;
/// Identifier newtypes.
pub mod ids;
/// Moderation verdicts returned by the moderation collaborator.
pub mod moderation;
/// Form validation rules.
pub mod validation;

pub use autosave::{AutosaveKey, AutosaveRecord};
pub use entity::{EditableEntity, EntityPatch, EntityStatus, FormData, SearchableEntity};
pub use filter::{DateWindow, FilterCriteria, RefFilter, StatusFilter};
pub use ids::{CommunityId, EntityId, OwnerId};
pub use moderation::ModerationVerdict;
pub use validation::{DEFAULT_MAX_TITLE_LEN, ValidationError};
