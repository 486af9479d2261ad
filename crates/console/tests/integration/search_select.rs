use std::time::Duration;

use brandline_config::SearchConfig;
use brandline_console::{AsyncComboboxController, ComboboxEvent, ComboboxState, DebouncedQuery, OwnerScope};
use brandline_worker::WorkerRuntime;
use proptest::prelude::*;

use crate::common::{LatencyCatalog, init_tracing, training};

fn catalog(latency: impl IntoIterator<Item = (&'static str, u64)>) -> std::sync::Arc<LatencyCatalog> {
	LatencyCatalog::new(vec![training("t1", "abc basics"), training("t2", "abacus"), training("t3", "a primer")], latency)
}

#[tokio::test(start_paused = true)]
async fn typing_within_the_window_sends_only_the_final_text() {
	init_tracing();
	let search = catalog([]);
	let mut combo = AsyncComboboxController::new(search.clone(), OwnerScope::All, &SearchConfig::default(), WorkerRuntime::new());
	combo.focus();
	combo.next_event().await;

	for text in ["a", "ab", "abc"] {
		combo.on_input(text);
		tokio::time::sleep(Duration::from_millis(20)).await;
	}
	let event = combo.next_event().await;

	assert_eq!(event, ComboboxEvent::ResultsReady { query: "abc".into(), count: 1 });
	assert_eq!(search.calls(), vec![String::new(), "abc".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn slow_response_for_an_earlier_query_never_replaces_newer_results() {
	init_tracing();
	let search = catalog([("a", 900)]);
	let mut combo = AsyncComboboxController::new(search.clone(), OwnerScope::All, &SearchConfig::default(), WorkerRuntime::new());
	combo.focus();
	combo.next_event().await;

	combo.on_input("a");
	tokio::time::sleep(Duration::from_millis(300)).await;
	combo.on_input("abc");
	combo.next_event().await;
	let shown: Vec<_> = combo.results().iter().map(|r| r.id.clone()).collect();

	tokio::time::sleep(Duration::from_secs(2)).await;
	assert!(combo.pump().is_empty());
	assert_eq!(combo.state(), &ComboboxState::OpenReady);
	assert_eq!(combo.results().iter().map(|r| r.id.clone()).collect::<Vec<_>>(), shown);
	assert_eq!(search.calls(), vec![String::new(), "a".to_string(), "abc".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn long_burst_coalesces_into_one_request() {
	let search = catalog([]);
	let mut query = DebouncedQuery::new(search.clone(), OwnerScope::All, &SearchConfig::default(), WorkerRuntime::new());
	let text = "abacus basics for onboarding";
	for end in 1..=text.len() {
		query.on_input(&text[..end]);
		tokio::time::sleep(Duration::from_millis(100)).await;
	}
	let resolved = query.resolved().await;

	assert_eq!(resolved.query, text);
	assert_eq!(search.calls(), vec![text.to_string()]);
}

proptest! {
	#![proptest_config(ProptestConfig::with_cases(48))]

	/// Issue a query per latency; whatever order they resolve in, only the
	/// last one issued is delivered.
	#[test]
	fn only_the_last_issued_query_is_delivered(latencies in prop::collection::vec(1u64..500, 1..8)) {
		let rt = tokio::runtime::Builder::new_current_thread().enable_time().start_paused(true).build().unwrap();
		let (delivered, last) = rt.block_on(async {
			let queries: Vec<String> = (0..latencies.len()).map(|i| format!("q{i}")).collect();
			let search = LatencyCatalog::new(Vec::new(), queries.iter().cloned().zip(latencies.iter().copied()));
			let mut query = DebouncedQuery::new(search, OwnerScope::All, &SearchConfig::default(), WorkerRuntime::new());
			for q in &queries {
				query.search_now(q);
				tokio::task::yield_now().await;
			}
			tokio::time::sleep(Duration::from_secs(1)).await;

			let mut delivered = Vec::new();
			while let Some(event) = query.try_resolve() {
				delivered.push(event.query);
			}
			(delivered, queries.last().cloned().unwrap())
		});
		prop_assert_eq!(delivered, vec![last]);
	}
}
