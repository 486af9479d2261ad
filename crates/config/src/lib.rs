//! Configuration for the console core.
//!
//! Configuration is written in TOML. Every field is optional and falls back
//! to the defaults below:
//!
//! ```toml
//! [search]
//! debounce-ms = 250
//! page-limit = 20
//!
//! [autosave]
//! debounce-ms = 10000
//! max-age-hours = 24
//! key-prefix = "autosave"
//!
//! [editor]
//! max-title-len = 200
//! ```

pub mod error;

use std::path::Path;
use std::time::Duration;

pub use error::{ConfigError, Result};
use serde::Deserialize;

/// Parsed console configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConsoleConfig {
	pub search: SearchConfig,
	pub autosave: AutosaveConfig,
	pub editor: EditorConfig,
}

/// Debounced remote search settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct SearchConfig {
	/// Quiet period after the last keystroke before a search is sent.
	pub debounce_ms: u64,
	/// Maximum results requested per search.
	pub page_limit: usize,
}

impl Default for SearchConfig {
	fn default() -> Self {
		Self {
			debounce_ms: 250,
			page_limit: 20,
		}
	}
}

impl SearchConfig {
	pub fn debounce(&self) -> Duration {
		Duration::from_millis(self.debounce_ms)
	}
}

/// Local autosave settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct AutosaveConfig {
	/// Inactivity period before a dirty form is written locally.
	pub debounce_ms: u64,
	/// Records older than this are discarded instead of offered.
	pub max_age_hours: u64,
	/// Prefix of every local-store key.
	pub key_prefix: String,
}

impl Default for AutosaveConfig {
	fn default() -> Self {
		Self {
			debounce_ms: 10_000,
			max_age_hours: 24,
			key_prefix: "autosave".to_string(),
		}
	}
}

impl AutosaveConfig {
	pub fn debounce(&self) -> Duration {
		Duration::from_millis(self.debounce_ms)
	}

	pub fn max_age(&self) -> Duration {
		Duration::from_secs(self.max_age_hours * 60 * 60)
	}
}

/// Post editor settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct EditorConfig {
	pub max_title_len: usize,
}

impl Default for EditorConfig {
	fn default() -> Self {
		Self { max_title_len: 200 }
	}
}

impl ConsoleConfig {
	/// Parses configuration from TOML text and validates it.
	pub fn from_toml_str(input: &str) -> Result<Self> {
		let config: Self = toml::from_str(input)?;
		config.validate()?;
		Ok(config)
	}

	/// Loads configuration from a file.
	pub fn load(path: impl AsRef<Path>) -> Result<Self> {
		let path = path.as_ref();
		let content = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
			path: path.to_path_buf(),
			error,
		})?;
		Self::from_toml_str(&content)
	}

	/// Rejects values that would disable a component outright.
	pub fn validate(&self) -> Result<()> {
		if self.search.page_limit == 0 {
			return Err(ConfigError::InvalidValue {
				field: "search.page-limit",
				reason: "must be at least 1",
			});
		}
		if self.autosave.max_age_hours == 0 {
			return Err(ConfigError::InvalidValue {
				field: "autosave.max-age-hours",
				reason: "must be at least 1",
			});
		}
		if self.autosave.key_prefix.is_empty() {
			return Err(ConfigError::InvalidValue {
				field: "autosave.key-prefix",
				reason: "must not be empty",
			});
		}
		if self.editor.max_title_len == 0 {
			return Err(ConfigError::InvalidValue {
				field: "editor.max-title-len",
				reason: "must be at least 1",
			});
		}
		Ok(())
	}
}
