//! Subcommand bodies. Rendering is kept separate from I/O so it can be
//! checked without fixtures on disk.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, bail};
use brandline_config::ConsoleConfig;
use brandline_console::{AsyncComboboxController, Clock, ComboboxEvent, FixtureCatalog, OwnerScope, Selection, SystemClock, filter_entities};
use brandline_primitives::{EditableEntity, EntityId, FilterCriteria, OwnerId, RefFilter, SearchableEntity};
use brandline_worker::WorkerRuntime;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;

use crate::cli::{FilterArgs, SearchArgs};


fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
	let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
	serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

pub fn criteria(args: &FilterArgs) -> FilterCriteria {
	let ref_filter = match args.reference.as_deref() {
		None => RefFilter::default(),
		Some("any") => RefFilter { enabled: true, ref_id: None },
		Some(id) => RefFilter {
			enabled: true,
			ref_id: Some(EntityId::from(id)),
		},
	};
	FilterCriteria {
		text: args.text.clone(),
		status: args.status.into(),
		tag: args.tag.clone(),
		date_window: args.window.into(),
		ref_filter,
	}
}

fn evaluation_time(raw: Option<&str>) -> anyhow::Result<DateTime<Utc>> {
	match raw {
		Some(raw) => Ok(DateTime::parse_from_rfc3339(raw).with_context(|| format!("invalid --now value {raw:?}"))?.with_timezone(&Utc)),
		None => Ok(SystemClock.now()),
	}
}

pub fn post_line(post: &EditableEntity) -> String {
	let mut line = format!("{}\t{}\t{}", post.id, post.status.as_str(), post.title);
	if !post.tags.is_empty() {
		let tags: Vec<&str> = post.tags.iter().map(String::as_str).collect();
		line.push_str(&format!("\t[{}]", tags.join(", ")));
	}
	line
}

pub fn option_line(index: usize, option: &SearchableEntity, active: bool) -> String {
	let marker = if active { '>' } else { ' ' };
	format!("{marker} {index:>2}  {}\t{}\t{}", option.id, option.status.as_str(), option.title)
}

pub fn run_filter(args: &FilterArgs) -> anyhow::Result<()> {
	let posts: Vec<EditableEntity> = read_json(&args.posts)?;
	let criteria = criteria(args);
	let now = evaluation_time(args.now.as_deref())?;
	let visible = filter_entities(&posts, &criteria, now);
	tracing::info!(total = posts.len(), visible = visible.len(), "filter.done");

	let mut out = std::io::stdout().lock();
	if args.json {
		serde_json::to_writer_pretty(&mut out, &visible)?;
		writeln!(out)?;
	} else {
		for post in &visible {
			writeln!(out, "{}", post_line(post))?;
		}
	}
	Ok(())
}

pub async fn run_search(args: &SearchArgs, config: &ConsoleConfig) -> anyhow::Result<()> {
	let trainings: Vec<SearchableEntity> = read_json(&args.trainings)?;
	let mut search = config.search.clone();
	if let Some(limit) = args.limit {
		if limit == 0 {
			bail!("--limit must be at least 1");
		}
		search.page_limit = limit;
	}
	let scope = args.owner.as_deref().map_or(OwnerScope::All, |owner| OwnerScope::Owned(OwnerId::from(owner)));

	let mut combo = AsyncComboboxController::new(Arc::new(FixtureCatalog::new(trainings)), scope, &search, WorkerRuntime::new());
	combo.focus();
	combo.on_input(&args.query);
	loop {
		match combo.next_event().await {
			ComboboxEvent::ResultsReady { query, count } if query == args.query => {
				tracing::info!(%query, count, "search.done");
				break;
			}
			ComboboxEvent::SearchFailed { query, error } if query == args.query => {
				bail!("search for {query:?} failed: {error}");
			}
			event => tracing::debug!(?event, "search.skipped_event"),
		}
	}

	let mut out = std::io::stdout().lock();
	for (index, option) in combo.results().iter().enumerate() {
		writeln!(out, "{}", option_line(index, option, combo.active_index() == Some(index)))?;
	}

	if let Some(index) = args.pick {
		if !combo.select_index(index) {
			bail!("no option at index {index} ({} shown)", combo.results().len());
		}
		match combo.selection() {
			Selection::Resolved(entity) => writeln!(out, "selected {} ({})", entity.id, entity.title)?,
			Selection::Unresolved(id) => writeln!(out, "selected {id}")?,
			Selection::None => {}
		}
	}
	Ok(())
}
