//! Object model configuration.
//!
//! ```toml
//! duplicate_policy = "reject"   # or "first_wins", "last_wins"
//! static_registrations = true
//! warn_on_leaks = true
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::registry::DuplicatePolicy;

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("TOML parse error: {0}")]
	Toml(#[from] toml::de::Error),

	#[error("I/O error reading {path}: {error}")]
	Io {
		path: PathBuf,
		error: std::io::Error,
	},
}

/// Settings of one [`ObjectModel`](crate::ObjectModel) instance.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ObjectModelConfig {
	/// Resolution of non-override registrations for an occupied key.
	pub duplicate_policy: DuplicatePolicy,
	/// Load `register_interface!`/`register_boss!` entries and static plugins
	/// during initialisation.
	pub static_registrations: bool,
	/// Log every boss still alive at teardown.
	pub warn_on_leaks: bool,
}

impl Default for ObjectModelConfig {
	fn default() -> Self {
		Self {
			duplicate_policy: DuplicatePolicy::Reject,
			static_registrations: true,
			warn_on_leaks: true,
		}
	}
}

impl ObjectModelConfig {
	/// Configuration for an instance that starts with an empty registry.
	pub fn isolated() -> Self {
		Self {
			static_registrations: false,
			..Self::default()
		}
	}

	pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
		Ok(toml::from_str(input)?)
	}

	pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
		let input = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
			path: path.to_path_buf(),
			error,
		})?;
		Self::from_toml_str(&input)
	}
}
