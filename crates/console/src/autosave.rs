//! Local snapshots of in-progress edits.
//!
//! Each `(entity, owner)` key has its own debounce timer: [`AutosaveManager::touch`]
//! restarts it, and when it expires the latest form is written to the
//! [`LocalStore`] as an [`AutosaveRecord`]. Reopening the entity later offers
//! the record back through [`AutosaveManager::try_restore`].
//!
//! Timer writes and [`AutosaveManager::clear`] are serialized per key
//! through a generation map: a timer only writes while its generation is
//! still the key's latest, checked under the same lock `clear` takes, so a
//! timer firing concurrently with a clear never resurrects the record.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use brandline_config::AutosaveConfig;
use brandline_primitives::{AutosaveKey, AutosaveRecord, FormData};
use brandline_worker::{TaskClass, WorkerRuntime};
use parking_lot::Mutex;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::clock::Clock;
use crate::collab::LocalStore;

/// Reasons a stored record is discarded instead of offered.
#[derive(Debug, Error)]
pub enum AutosaveError {
	#[error("record is not valid JSON: {0}")]
	Corrupt(#[from] serde_json::Error),
	#[error("record belongs to {found}, not {expected}")]
	KeyMismatch { expected: String, found: String },
	#[error("record is {age_ms} ms old")]
	Stale { age_ms: i64 },
}

#[derive(Debug)]
struct TimerSlot {
	generation: u64,
	cancel: CancellationToken,
}

type TimerMap = Arc<Mutex<HashMap<AutosaveKey, TimerSlot>>>;

pub struct AutosaveManager {
	local: Arc<dyn LocalStore>,
	clock: Arc<dyn Clock>,
	runtime: WorkerRuntime,
	debounce: Duration,
	max_age: Duration,
	prefix: Arc<str>,
	timers: TimerMap,
	next_generation: u64,
}

impl AutosaveManager {
	pub fn new(local: Arc<dyn LocalStore>, clock: Arc<dyn Clock>, config: &AutosaveConfig, runtime: WorkerRuntime) -> Self {
		Self {
			local,
			clock,
			runtime,
			debounce: config.debounce(),
			max_age: config.max_age(),
			prefix: Arc::from(config.key_prefix.as_str()),
			timers: Arc::new(Mutex::new(HashMap::new())),
			next_generation: 0,
		}
	}

	/// Records that `form` changed; it is written once the key stays quiet
	/// for the debounce period.
	pub fn touch(&mut self, key: &AutosaveKey, form: FormData) {
		self.next_generation += 1;
		let generation = self.next_generation;
		let cancel = CancellationToken::new();

		if let Some(previous) = self.timers.lock().insert(key.clone(), TimerSlot { generation, cancel: cancel.clone() }) {
			previous.cancel.cancel();
		}
		tracing::trace!(entity = %key.entity_id, generation, "autosave.touch");

		let timers = Arc::clone(&self.timers);
		let local = Arc::clone(&self.local);
		let clock = Arc::clone(&self.clock);
		let prefix = Arc::clone(&self.prefix);
		let key = key.clone();
		self.runtime.spawn_after(TaskClass::Background, self.debounce, cancel, move || async move {
			let mut timers = timers.lock();
			if timers.get(&key).is_none_or(|slot| slot.generation != generation) {
				return;
			}
			timers.remove(&key);

			let record = AutosaveRecord {
				entity_id: key.entity_id.clone(),
				owner_id: key.owner_id.clone(),
				form_data: form,
				saved_at_epoch_ms: clock.now_epoch_ms(),
			};
			match serde_json::to_string(&record) {
				Ok(text) => {
					local.set(&key.storage_key(&prefix), text);
					tracing::debug!(entity = %key.entity_id, "autosave.write");
				}
				Err(error) => tracing::warn!(entity = %key.entity_id, %error, "autosave.encode_failed"),
			}
		});
	}

	/// True while a timer for `key` has not fired yet.
	pub fn is_pending(&self, key: &AutosaveKey) -> bool {
		self.timers.lock().contains_key(key)
	}

	/// Returns a record worth offering for `key`, if any.
	///
	/// Records that are unparseable, stored under the wrong identity or
	/// older than the configured maximum age are deleted. A record equal to
	/// `current` is deleted too, since restoring it would change nothing.
	pub fn try_restore(&self, key: &AutosaveKey, current: &FormData) -> Option<AutosaveRecord> {
		let storage_key = key.storage_key(&self.prefix);
		let text = self.local.get(&storage_key)?;

		let record = match self.check(key, &text) {
			Ok(record) => record,
			Err(error) => {
				tracing::debug!(entity = %key.entity_id, %error, "autosave.discard");
				self.local.remove(&storage_key);
				return None;
			}
		};
		if record.form_data == *current {
			self.local.remove(&storage_key);
			return None;
		}
		Some(record)
	}

	/// Cancels any pending write for `key` and deletes its record.
	pub fn clear(&self, key: &AutosaveKey) {
		let mut timers = self.timers.lock();
		if let Some(slot) = timers.remove(key) {
			slot.cancel.cancel();
		}
		self.local.remove(&key.storage_key(&self.prefix));
		tracing::debug!(entity = %key.entity_id, "autosave.clear");
	}

	/// The user chose not to restore; same effect as [`Self::clear`].
	pub fn decline(&self, key: &AutosaveKey) {
		tracing::debug!(entity = %key.entity_id, "autosave.decline");
		self.clear(key);
	}

	fn check(&self, key: &AutosaveKey, text: &str) -> Result<AutosaveRecord, AutosaveError> {
		let record: AutosaveRecord = serde_json::from_str(text)?;
		if record.key() != *key {
			return Err(AutosaveError::KeyMismatch {
				expected: key.storage_key(&self.prefix),
				found: record.key().storage_key(&self.prefix),
			});
		}
		let age_ms = self.clock.now_epoch_ms() - record.saved_at_epoch_ms;
		let max_age_ms = i64::try_from(self.max_age.as_millis()).unwrap_or(i64::MAX);
		if age_ms > max_age_ms {
			return Err(AutosaveError::Stale { age_ms });
		}
		Ok(record)
	}
}
