use std::sync::Arc;
use std::time::Duration;

use brandline_config::EditorConfig;
use brandline_console::{EntityStore, ManualClock, NotificationCenter, Notifier, OptimisticMutator, Settlement, Urgency};
use brandline_primitives::{CommunityId, EditableEntity, EntityId, EntityPatch, FormData, OwnerId};
use brandline_worker::WorkerRuntime;
use pretty_assertions::assert_eq;

use crate::common::{FlakyStore, epoch, init_tracing, post};

fn mutator(store: Arc<FlakyStore>, notes: &Arc<NotificationCenter>) -> OptimisticMutator {
	let mut mutator = OptimisticMutator::new(
		store as Arc<dyn EntityStore>,
		Arc::clone(notes) as Arc<dyn Notifier>,
		Arc::new(ManualClock::new(epoch())),
		&EditorConfig::default(),
		WorkerRuntime::new(),
	);
	mutator.load(vec![post("a", "first"), post("b", "second"), post("c", "third")]);
	mutator
}

fn draft(title: &str) -> EditableEntity {
	let form = FormData {
		title: title.to_string(),
		..FormData::default()
	};
	EditableEntity::draft(OwnerId::from("owner-1"), CommunityId::from("community-1"), form, epoch())
}

#[tokio::test(start_paused = true)]
async fn rollback_leaves_a_concurrent_unrelated_update_intact() {
	init_tracing();
	let notes = Arc::new(NotificationCenter::new());
	let mut mutator = mutator(FlakyStore::with_latency(&["a"], &[("a", 40), ("b", 10)]), &notes);
	let patch = |title: &str| EntityPatch {
		title: Some(title.to_string()),
		..EntityPatch::default()
	};

	mutator.update(&EntityId::from("a"), patch("first, renamed")).unwrap();
	mutator.update(&EntityId::from("b"), patch("second, renamed")).unwrap();
	let after_updates = mutator.entities().to_vec();

	tokio::time::sleep(Duration::from_millis(100)).await;
	let settled = mutator.pump();
	assert_eq!(settled.len(), 2);
	assert!(matches!(settled[0], Settlement::Updated { .. }));
	assert!(matches!(settled[1], Settlement::RolledBack { .. }));

	let titles: Vec<_> = mutator.entities().iter().map(|e| e.title.as_str()).collect();
	assert_eq!(titles, vec!["first", "second, renamed", "third"]);
	assert_eq!(mutator.entities()[1], after_updates[1]);

	// A second drain is a no-op: each rollback applies exactly once.
	assert!(mutator.pump().is_empty());
	let assertive = notes.take_pending().into_iter().filter(|n| n.urgency == Urgency::Assertive).count();
	assert_eq!(assertive, 1);
}

#[tokio::test(start_paused = true)]
async fn successful_create_leaves_one_entity_with_the_real_id() {
	let notes = Arc::new(NotificationCenter::new());
	let mut mutator = mutator(FlakyStore::failing(&[]), &notes);
	mutator.select(Some(EntityId::from("b")));

	mutator.create(draft("launch plan")).unwrap();
	let settlement = mutator.settled().await;

	assert_eq!(settlement, Settlement::Created { op: settlement.op(), id: EntityId::from("real-1") });
	assert_eq!(mutator.entities().len(), 4);
	assert_eq!(mutator.entities().iter().filter(|e| e.title == "launch plan").count(), 1);
	assert!(mutator.entities().iter().all(|e| !e.id.is_sentinel()));
	assert_eq!(mutator.selection(), Some(&EntityId::from("real-1")));
}

#[tokio::test(start_paused = true)]
async fn rejected_create_restores_length_and_selection() {
	let notes = Arc::new(NotificationCenter::new());
	let mut mutator = mutator(FlakyStore::failing(&["doomed"]), &notes);
	mutator.select(Some(EntityId::from("c")));
	let before = mutator.entities().len();

	mutator.create(draft("doomed")).unwrap();
	assert_eq!(mutator.entities().len(), before + 1);
	let settlement = mutator.settled().await;

	assert!(!settlement.is_success());
	assert_eq!(mutator.entities().len(), before);
	assert_eq!(mutator.selection(), Some(&EntityId::from("c")));
	assert_eq!(notes.take_pending().iter().map(|n| n.urgency).collect::<Vec<_>>(), vec![Urgency::Assertive]);
}

#[tokio::test(start_paused = true)]
async fn interleaved_operations_keep_the_selection_listed() {
	let notes = Arc::new(NotificationCenter::new());
	let mut mutator = mutator(FlakyStore::with_latency(&["b", "late"], &[("late", 60)]), &notes);

	mutator.select(Some(EntityId::from("b")));
	mutator.create(draft("late")).unwrap();
	mutator.remove(&EntityId::from("b")).unwrap();
	mutator.update(&EntityId::from("c"), EntityPatch { body: Some("x".into()), ..EntityPatch::default() }).unwrap();

	for _ in 0..3 {
		mutator.settled().await;
		let selection = mutator.selection().cloned();
		assert!(selection.is_none_or(|id| mutator.get(&id).is_some()));
	}

	// The failed delete put "b" back, so the failed create can restore it.
	assert_eq!(mutator.entities().iter().map(|e| e.id.as_str()).collect::<Vec<_>>(), vec!["a", "b", "c"]);
	assert_eq!(mutator.selection(), Some(&EntityId::from("b")));
	assert_eq!(mutator.pending_count(), 0);
}
