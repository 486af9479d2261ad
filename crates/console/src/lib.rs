//! Concurrency-safe search/select and optimistic editing core.
//!
//! Components own their state and report background completions over
//! internal channels; nothing changes until the owner drains them with
//! `pump()` or `next_event()`. Collaborators (search, persistence,
//! moderation, local storage, notification) are injected as trait objects
//! through [`Collaborators`].

/// Per-key debounced local snapshots of in-progress edits.
pub mod autosave;
/// Wall-clock abstraction.
pub mod clock;
/// Collaborator traits and their error type.
pub mod collab;
/// Searchable picker state machine.
pub mod combobox;
/// Two-pane post editor session.
pub mod editor;
/// Layered filtering of the post list.
pub mod filter;
/// In-memory collaborators.
pub mod memory;
/// Optimistic create, update and remove with rollback.
pub mod mutator;
/// User-facing notifications.
pub mod notifications;
/// Debounced remote search.
pub mod query;
/// Last-issued-wins request sequencing.
pub mod sequencer;

pub use autosave::{AutosaveError, AutosaveManager};
pub use clock::{Clock, ManualClock, SystemClock};
pub use collab::{CollaboratorError, Collaborators, EntitySearch, EntityStore, LocalStore, Moderator, OwnerScope};
pub use combobox::{AsyncComboboxController, ComboKey, ComboboxEvent, ComboboxState, Selection};
pub use editor::{DraftPreview, EditorError, EditorEvent, PostEditor, RestoreOffer, SessionIdentity};
pub use filter::{FilterEngine, FilterStage, PIPELINE, available_tags, filter_entities};
pub use memory::{FixtureCatalog, MemoryEntityStore, MemoryLocalStore, PassthroughModerator};
pub use mutator::{MutationHandle, OpId, OptimisticMutator, Settlement};
pub use notifications::{Notification, NotificationCenter, Notifier, Urgency};
pub use query::{DebouncedQuery, SearchEvent};
pub use sequencer::{QueryTicket, QueryToken, RequestSequencer};
