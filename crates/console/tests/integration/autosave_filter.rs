use std::sync::Arc;
use std::time::Duration;

use brandline_config::ConsoleConfig;
use brandline_console::{AutosaveManager, Clock, FilterEngine, FilterStage, LocalStore, ManualClock, MemoryLocalStore, PIPELINE, filter_entities};
use brandline_primitives::{AutosaveKey, EntityId, EntityStatus, FilterCriteria, FormData, OwnerId, RefFilter, StatusFilter};
use brandline_worker::WorkerRuntime;
use chrono::TimeDelta;
use pretty_assertions::assert_eq;

use crate::common::{epoch, post};

#[tokio::test(start_paused = true)]
async fn record_written_yesterday_plus_an_hour_is_never_offered() {
	let config = ConsoleConfig::from_toml_str("[autosave]\ndebounce-ms = 500\n").unwrap();
	let local = Arc::new(MemoryLocalStore::new());
	let clock = Arc::new(ManualClock::new(epoch()));
	let mut autosave = AutosaveManager::new(Arc::clone(&local) as Arc<dyn LocalStore>, Arc::clone(&clock) as Arc<dyn Clock>, &config.autosave, WorkerRuntime::new());
	let key = AutosaveKey::new(EntityId::from("p1"), OwnerId::from("owner-1"));
	let form = FormData {
		title: "unsaved thoughts".into(),
		..FormData::default()
	};

	autosave.touch(&key, form.clone());
	tokio::time::sleep(Duration::from_secs(1)).await;
	assert_eq!(local.len(), 1);

	clock.advance(TimeDelta::hours(25));
	assert!(autosave.try_restore(&key, &FormData::default()).is_none());
	assert!(local.is_empty());
}

fn scenario() -> Vec<brandline_primitives::EditableEntity> {
	let rows: [(&str, Option<&str>, &str, EntityStatus); 10] = [
		("1", Some("t9"), "Quarterly brand review", EntityStatus::Published),
		("2", Some("t9"), "Brand refresh kickoff", EntityStatus::Draft),
		("3", Some("t9"), "Brand refresh retro", EntityStatus::Draft),
		("4", Some("t9"), "Hiring update", EntityStatus::Published),
		("5", None, "Brand refresh teaser", EntityStatus::Published),
		("6", Some("t2"), "Brand refresh assets", EntityStatus::Published),
		("7", None, "Offsite agenda", EntityStatus::Published),
		("8", Some("t2"), "Budget", EntityStatus::Draft),
		("9", None, "Brand refresh faq", EntityStatus::Draft),
		("10", Some("t3"), "Roadmap", EntityStatus::Published),
	];
	rows.into_iter()
		.map(|(id, reference, title, status)| {
			let mut entity = post(id, title);
			entity.attached_ref_id = reference.map(EntityId::from);
			entity.status = status;
			entity
		})
		.collect()
}

#[test]
fn composed_filters_narrow_to_one_in_any_stage_order() {
	let posts = scenario();
	let criteria = FilterCriteria {
		text: "brand".into(),
		status: StatusFilter::Published,
		ref_filter: RefFilter {
			enabled: true,
			ref_id: Some(EntityId::from("t9")),
		},
		..FilterCriteria::default()
	};
	let engine = FilterEngine::new(&criteria, epoch());

	assert_eq!(engine.apply_stages(&posts, &[FilterStage::Reference]).len(), 4);
	assert_eq!(engine.apply_stages(&posts, &[FilterStage::Reference, FilterStage::Text]).len(), 3);

	let expected = filter_entities(&posts, &criteria, epoch());
	assert_eq!(expected.iter().map(|e| e.id.as_str()).collect::<Vec<_>>(), vec!["1"]);

	let mut order = PIPELINE;
	for rotation in 0..PIPELINE.len() {
		order.rotate_left(1);
		assert_eq!(engine.apply_stages(&posts, &order), expected, "rotation {rotation}");
		let mut reversed = order;
		reversed.reverse();
		assert_eq!(engine.apply_stages(&posts, &reversed), expected, "reversed rotation {rotation}");
	}
}
