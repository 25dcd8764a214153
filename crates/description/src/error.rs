//! Error types for description loading.

use std::path::PathBuf;

use thiserror::Error;
use whisper_object_model::ObjectModelError;

/// Errors that can occur when loading or applying boss descriptions.
#[derive(Debug, Error)]
pub enum DescriptionError {
	/// The document is not valid TOML or does not match the schema.
	#[error("parse error in {origin}: {error}")]
	Parse {
		/// File path, or `<inline>` for string input.
		origin: String,
		error: toml::de::Error,
	},

	#[error("I/O error reading {path}: {error}")]
	Io { path: PathBuf, error: std::io::Error },

	/// A `[[boss]]` table has an empty `name`.
	#[error("boss #{index} in {origin} has an empty name")]
	EmptyName { origin: String, index: usize },

	#[error("boss {boss} lists an empty capability name")]
	EmptyCapability { boss: String },

	/// Two descriptions share a boss name, in one document or across merged ones.
	#[error("boss {boss} is described more than once")]
	DuplicateBoss { boss: String },

	/// A capability appears twice in one description (eager and lazy lists combined).
	#[error("boss {boss} lists capability {capability} more than once")]
	DuplicateCapability { boss: String, capability: String },

	#[error("no description for boss {boss}")]
	UnknownBoss { boss: String },

	/// The object model rejected a registration or creation.
	#[error(transparent)]
	Model(#[from] ObjectModelError),
}

/// Result type for description operations.
pub type Result<T> = std::result::Result<T, DescriptionError>;
