use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use brandline_config::EditorConfig;
use brandline_primitives::{CommunityId, EditableEntity, EntityId, EntityPatch, EntityStatus, FormData, OwnerId, ValidationError};
use brandline_worker::WorkerRuntime;
use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;

use super::*;
use crate::clock::ManualClock;
use crate::collab::{CollaboratorError, EntityStore};
use crate::notifications::{NotificationCenter, Urgency};

/// Outcome of the next store call: latency and whether it fails.
#[derive(Debug, Clone, Copy)]
struct Step {
	delay_ms: u64,
	fail: bool,
}

const OK: Step = Step { delay_ms: 10, fail: false };
const FAIL: Step = Step { delay_ms: 10, fail: true };

#[derive(Default)]
struct ScriptedStore {
	script: Mutex<VecDeque<Step>>,
	created: Mutex<u32>,
	calls: Mutex<Vec<String>>,
}

impl ScriptedStore {
	fn with(steps: impl IntoIterator<Item = Step>) -> Arc<Self> {
		Arc::new(Self {
			script: Mutex::new(steps.into_iter().collect()),
			..Self::default()
		})
	}

	async fn step(&self, call: String) -> Result<(), CollaboratorError> {
		self.calls.lock().push(call);
		let step = self.script.lock().pop_front().unwrap_or(OK);
		tokio::time::sleep(Duration::from_millis(step.delay_ms)).await;
		if step.fail { Err(CollaboratorError::Network("503".into())) } else { Ok(()) }
	}
}

#[async_trait]
impl EntityStore for ScriptedStore {
	async fn persist_create(&self, entity: &EditableEntity) -> Result<EntityId, CollaboratorError> {
		self.step(format!("create {}", entity.title)).await?;
		let mut created = self.created.lock();
		*created += 1;
		Ok(EntityId::new(format!("p-new-{created}")))
	}

	async fn persist_update(&self, id: &EntityId, _patch: &EntityPatch) -> Result<(), CollaboratorError> {
		self.step(format!("update {id}")).await
	}

	async fn persist_delete(&self, id: &EntityId) -> Result<(), CollaboratorError> {
		self.step(format!("delete {id}")).await
	}
}

fn post(id: &str, title: &str) -> EditableEntity {
	let at = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
	EditableEntity {
		id: EntityId::from(id),
		title: title.to_string(),
		body: format!("{title} body"),
		tags: Default::default(),
		attached_ref_id: None,
		status: EntityStatus::Draft,
		owner_id: OwnerId::from("owner-1"),
		community_id: CommunityId::from("c-1"),
		created_at: at,
		updated_at: at,
	}
}

fn draft(title: &str) -> EditableEntity {
	let form = FormData {
		title: title.to_string(),
		..FormData::default()
	};
	EditableEntity::draft(OwnerId::from("owner-1"), CommunityId::from("c-1"), form, Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap())
}

fn title_patch(title: &str) -> EntityPatch {
	EntityPatch {
		title: Some(title.to_string()),
		..EntityPatch::default()
	}
}

struct Harness {
	mutator: OptimisticMutator,
	store: Arc<ScriptedStore>,
	notes: Arc<NotificationCenter>,
}

fn harness(store: Arc<ScriptedStore>) -> Harness {
	let notes = Arc::new(NotificationCenter::new());
	let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2026, 3, 5, 12, 0, 0).unwrap()));
	let mut mutator = OptimisticMutator::new(
		Arc::clone(&store) as Arc<dyn EntityStore>,
		Arc::clone(&notes) as Arc<dyn crate::notifications::Notifier>,
		clock,
		&EditorConfig::default(),
		WorkerRuntime::new(),
	);
	mutator.load(vec![post("p1", "alpha"), post("p2", "beta"), post("p3", "gamma")]);
	Harness { mutator, store, notes }
}

fn ids(mutator: &OptimisticMutator) -> Vec<&str> {
	mutator.entities().iter().map(|e| e.id.as_str()).collect()
}

#[tokio::test(start_paused = true)]
async fn create_swaps_sentinel_for_real_id_in_list_and_selection() {
	let mut h = harness(ScriptedStore::with([OK]));
	let handle = h.mutator.create(draft("fresh")).unwrap();

	assert!(handle.id.is_sentinel());
	assert_eq!(ids(&h.mutator), vec!["new", "p1", "p2", "p3"]);
	assert_eq!(h.mutator.selection(), Some(&EntityId::sentinel()));

	let settlement = h.mutator.settled().await;
	assert_eq!(
		settlement,
		Settlement::Created {
			op: handle.op,
			id: EntityId::from("p-new-1")
		}
	);
	assert_eq!(ids(&h.mutator), vec!["p-new-1", "p1", "p2", "p3"]);
	assert_eq!(h.mutator.selection(), Some(&EntityId::from("p-new-1")));
	assert_eq!(h.notes.take_pending()[0].urgency, Urgency::Polite);
}

#[tokio::test(start_paused = true)]
async fn failed_create_removes_sentinel_and_restores_prior_selection() {
	let mut h = harness(ScriptedStore::with([FAIL]));
	h.mutator.select(Some(EntityId::from("p2")));
	h.mutator.create(draft("doomed")).unwrap();

	let settlement = h.mutator.settled().await;
	assert!(matches!(settlement, Settlement::RolledBack { ref id, .. } if id.is_sentinel()));
	assert_eq!(ids(&h.mutator), vec!["p1", "p2", "p3"]);
	assert_eq!(h.mutator.selection(), Some(&EntityId::from("p2")));

	let notes = h.notes.take_pending();
	assert_eq!(notes.len(), 1);
	assert_eq!(notes[0].urgency, Urgency::Assertive);
}

#[tokio::test(start_paused = true)]
async fn failed_create_does_not_restore_a_since_deleted_selection() {
	let mut h = harness(ScriptedStore::with([Step { delay_ms: 100, fail: true }, OK]));
	h.mutator.select(Some(EntityId::from("p2")));
	h.mutator.create(draft("doomed")).unwrap();
	h.mutator.remove(&EntityId::from("p2")).unwrap();

	tokio::time::sleep(Duration::from_millis(200)).await;
	h.mutator.pump();
	assert_eq!(h.mutator.selection(), None);
	assert_eq!(ids(&h.mutator), vec!["p1", "p3"]);
}

#[tokio::test(start_paused = true)]
async fn only_one_create_may_be_pending() {
	let mut h = harness(ScriptedStore::with([OK]));
	h.mutator.create(draft("first")).unwrap();
	assert_eq!(h.mutator.create(draft("second")), Err(ValidationError::CreatePending));

	h.mutator.settled().await;
	assert!(h.mutator.create(draft("second")).is_ok());
}

#[tokio::test(start_paused = true)]
async fn invalid_input_never_reaches_the_store() {
	let mut h = harness(ScriptedStore::with([]));
	assert_eq!(h.mutator.create(draft("  ")), Err(ValidationError::MissingTitle));
	assert_eq!(h.mutator.update(&EntityId::from("p1"), title_patch("")), Err(ValidationError::MissingTitle));
	assert_eq!(h.mutator.update(&EntityId::from("zz"), title_patch("x")), Err(ValidationError::UnknownEntity("zz".into())));
	assert_eq!(h.mutator.remove(&EntityId::sentinel()), Err(ValidationError::NotPersisted("new".into())));

	assert_eq!(h.mutator.get(&EntityId::from("p1")).unwrap().title, "alpha");
	assert_eq!(h.mutator.pending_count(), 0);
	assert!(h.store.calls.lock().is_empty());
}

#[tokio::test(start_paused = true)]
async fn failed_update_restores_snapshot() {
	let mut h = harness(ScriptedStore::with([FAIL]));
	h.mutator.update(&EntityId::from("p1"), title_patch("renamed")).unwrap();
	assert_eq!(h.mutator.get(&EntityId::from("p1")).unwrap().title, "renamed");

	let settlement = h.mutator.settled().await;
	assert!(!settlement.is_success());
	assert_eq!(h.mutator.get(&EntityId::from("p1")).unwrap(), &post("p1", "alpha"));
	assert_eq!(h.notes.take_pending().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn superseded_failure_keeps_later_value() {
	let mut h = harness(ScriptedStore::with([Step { delay_ms: 100, fail: true }, OK]));
	let id = EntityId::from("p1");
	h.mutator.update(&id, title_patch("first")).unwrap();
	h.mutator.update(&id, title_patch("second")).unwrap();

	let first = h.mutator.settled().await;
	assert!(first.is_success(), "the later, faster update settles first");
	let second = h.mutator.settled().await;
	assert!(matches!(second, Settlement::RolledBack { .. }));

	assert_eq!(h.mutator.get(&id).unwrap().title, "second");
}

#[tokio::test(start_paused = true)]
async fn superseded_failure_reverts_only_its_own_fields() {
	let mut h = harness(ScriptedStore::with([Step { delay_ms: 10, fail: true }, Step { delay_ms: 100, fail: false }]));
	let id = EntityId::from("p1");
	h.mutator.update(&id, title_patch("renamed")).unwrap();
	h.mutator
		.update(
			&id,
			EntityPatch {
				body: Some("rewritten".into()),
				..EntityPatch::default()
			},
		)
		.unwrap();

	h.mutator.settled().await;
	let entity = h.mutator.get(&id).unwrap();
	assert_eq!(entity.title, "alpha");
	assert_eq!(entity.body, "rewritten");

	h.mutator.settled().await;
	assert_eq!(h.mutator.get(&id).unwrap().body, "rewritten");
}

#[tokio::test(start_paused = true)]
async fn failed_remove_reinserts_at_original_position() {
	let mut h = harness(ScriptedStore::with([FAIL]));
	let id = EntityId::from("p2");
	h.mutator.select(Some(id.clone()));
	h.mutator.remove(&id).unwrap();
	assert_eq!(ids(&h.mutator), vec!["p1", "p3"]);
	assert_eq!(h.mutator.selection(), None);

	h.mutator.settled().await;
	assert_eq!(ids(&h.mutator), vec!["p1", "p2", "p3"]);
	assert_eq!(h.mutator.selection(), None, "selection is not restored by a failed delete");
	assert_eq!(h.notes.take_pending()[0].urgency, Urgency::Assertive);
}

#[tokio::test(start_paused = true)]
async fn failed_remove_clamps_reinsertion_index() {
	let mut h = harness(ScriptedStore::with([Step { delay_ms: 100, fail: true }, OK, OK]));
	h.mutator.remove(&EntityId::from("p3")).unwrap();
	h.mutator.remove(&EntityId::from("p1")).unwrap();
	h.mutator.remove(&EntityId::from("p2")).unwrap();

	tokio::time::sleep(Duration::from_millis(200)).await;
	let settled = h.mutator.pump();
	assert_eq!(settled.len(), 3);
	assert_eq!(ids(&h.mutator), vec!["p3"]);
}

#[tokio::test(start_paused = true)]
async fn update_settling_after_local_delete_is_ignored() {
	let mut h = harness(ScriptedStore::with([Step { delay_ms: 100, fail: true }, OK]));
	let id = EntityId::from("p1");
	h.mutator.update(&id, title_patch("renamed")).unwrap();
	h.mutator.remove(&id).unwrap();

	tokio::time::sleep(Duration::from_millis(200)).await;
	let settled = h.mutator.pump();
	assert!(settled.iter().any(|s| matches!(s, Settlement::Ignored { .. })));
	assert!(h.mutator.get(&id).is_none());
	assert!(h.notes.take_pending().iter().all(|n| n.urgency == Urgency::Polite));
}

#[tokio::test(start_paused = true)]
async fn failed_remove_reinserts_without_a_rejected_update() {
	let mut h = harness(ScriptedStore::with([FAIL, Step { delay_ms: 50, fail: true }]));
	let id = EntityId::from("p1");
	h.mutator.update(&id, title_patch("renamed")).unwrap();
	h.mutator.remove(&id).unwrap();

	tokio::time::sleep(Duration::from_millis(100)).await;
	let settled = h.mutator.pump();
	assert!(matches!(settled[0], Settlement::Ignored { .. }));
	assert!(matches!(settled[1], Settlement::RolledBack { .. }));
	assert_eq!(ids(&h.mutator), vec!["p1", "p2", "p3"]);
	assert_eq!(h.mutator.get(&id).unwrap().title, "alpha");
}

#[tokio::test(start_paused = true)]
async fn operations_on_different_entities_do_not_interact() {
	let mut h = harness(ScriptedStore::with([FAIL, OK]));
	h.mutator.update(&EntityId::from("p1"), title_patch("one")).unwrap();
	h.mutator.update(&EntityId::from("p2"), title_patch("two")).unwrap();

	tokio::time::sleep(Duration::from_millis(50)).await;
	h.mutator.pump();
	assert_eq!(h.mutator.get(&EntityId::from("p1")).unwrap().title, "alpha");
	assert_eq!(h.mutator.get(&EntityId::from("p2")).unwrap().title, "two");
}

#[tokio::test]
async fn select_rejects_unknown_ids() {
	let mut h = harness(ScriptedStore::with([]));
	assert!(!h.mutator.select(Some(EntityId::from("nope"))));
	assert!(h.mutator.select(Some(EntityId::from("p1"))));
	assert_eq!(h.mutator.selected_entity().map(|e| e.title.as_str()), Some("alpha"));
	assert!(h.mutator.select(None));
	assert_eq!(h.mutator.selection(), None);
}
