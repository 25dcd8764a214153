#![cfg_attr(test, allow(unused_crate_dependencies))]
//! Declarative boss descriptions.
//!
//! A description names a boss kind and the capabilities it is built with.
//! Documents are TOML:
//!
//! ```toml
//! [[boss]]
//! name = "Widget"
//! capabilities = ["IText", "IGeometry"]
//! lazy = ["IDraw"]
//! ```
//!
//! `capabilities` are constructed in order when the boss is created; `lazy`
//! ones on first query. Loading validates names only: whether factories
//! exist for the listed capabilities is checked when a boss is created.

mod error;

use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;
use whisper_object_model::{
	BossDescription, BossName, BossRef, CapabilityId, InsertAction, ObjectModel,
};

pub use crate::error::{DescriptionError, Result};

const INLINE: &str = "<inline>";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Document {
	#[serde(default)]
	boss: Vec<RawBoss>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawBoss {
	name: String,
	#[serde(default)]
	capabilities: Vec<String>,
	#[serde(default)]
	lazy: Vec<String>,
}

/// Validated boss descriptions keyed by name, in document order.
#[derive(Debug, Clone, Default)]
pub struct DescriptionSet {
	bosses: IndexMap<BossName, BossDescription>,
}

impl DescriptionSet {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn from_toml_str(input: &str) -> Result<Self> {
		Self::parse(input, INLINE)
	}

	pub fn from_path(path: &Path) -> Result<Self> {
		let input = std::fs::read_to_string(path).map_err(|error| DescriptionError::Io {
			path: path.to_path_buf(),
			error,
		})?;
		Self::parse(&input, &path.display().to_string())
	}

	/// Loads every `*.toml` file in `dir`, in file-name order, into one set.
	pub fn from_dir(dir: &Path) -> Result<Self> {
		let io = |error: std::io::Error| DescriptionError::Io {
			path: dir.to_path_buf(),
			error,
		};
		let mut paths = Vec::new();
		for entry in std::fs::read_dir(dir).map_err(io)? {
			let path = entry.map_err(io)?.path();
			if path.extension().is_some_and(|ext| ext == "toml") {
				paths.push(path);
			}
		}
		paths.sort();

		let mut set = Self::new();
		for path in &paths {
			set.merge(Self::from_path(path)?)?;
		}
		tracing::debug!(
			dir = %dir.display(),
			files = paths.len(),
			bosses = set.len(),
			"loaded descriptions"
		);
		Ok(set)
	}

	fn parse(input: &str, origin: &str) -> Result<Self> {
		let document: Document = toml::from_str(input).map_err(|error| DescriptionError::Parse {
			origin: origin.to_owned(),
			error,
		})?;

		let mut set = Self::new();
		for (index, raw) in document.boss.into_iter().enumerate() {
			if raw.name.trim().is_empty() {
				return Err(DescriptionError::EmptyName {
					origin: origin.to_owned(),
					index,
				});
			}
			set.insert(validate(raw)?)?;
		}
		Ok(set)
	}

	/// Adds a description; its name must not be taken.
	pub fn insert(&mut self, description: BossDescription) -> Result<()> {
		if self.bosses.contains_key(&description.name) {
			return Err(DescriptionError::DuplicateBoss {
				boss: description.name.to_string(),
			});
		}
		self.bosses.insert(description.name.clone(), description);
		Ok(())
	}

	/// Moves every description of `other` into this set.
	pub fn merge(&mut self, other: DescriptionSet) -> Result<()> {
		for description in other.bosses.into_values() {
			self.insert(description)?;
		}
		Ok(())
	}

	pub fn get(&self, name: &str) -> Option<&BossDescription> {
		self.bosses.get(name)
	}

	pub fn iter(&self) -> impl Iterator<Item = &BossDescription> {
		self.bosses.values()
	}

	pub fn len(&self) -> usize {
		self.bosses.len()
	}

	pub fn is_empty(&self) -> bool {
		self.bosses.is_empty()
	}

	/// Registers every description with `model`, making them available to
	/// [`ObjectModel::create_boss`].
	///
	/// All or nothing: if one is rejected, the ones already registered by
	/// this call are unregistered again before the error is returned.
	pub fn register_all(&self, model: &ObjectModel) -> Result<usize> {
		let mut applied: Vec<&BossName> = Vec::with_capacity(self.len());
		for description in self.iter() {
			match model.register_boss(description.clone()) {
				Ok(InsertAction::KeptExisting) => {}
				Ok(_) => applied.push(&description.name),
				Err(err) => {
					for name in applied.iter().rev() {
						if let Err(rollback) = model.unregister_boss(name.as_str()) {
							tracing::warn!(boss = %name, error = %rollback, "rollback failed");
						}
					}
					tracing::debug!(
						boss = %description.name,
						rolled_back = applied.len(),
						error = %err,
						"boss descriptions rejected"
					);
					return Err(err.into());
				}
			}
		}
		tracing::debug!(bosses = self.len(), "registered boss descriptions");
		Ok(self.len())
	}

	/// Creates a boss from the named description without registering it.
	pub fn instantiate(&self, model: &ObjectModel, name: &str) -> Result<BossRef> {
		let description = self.get(name).ok_or_else(|| DescriptionError::UnknownBoss {
			boss: name.to_owned(),
		})?;
		Ok(model.create_from_description(description)?)
	}
}

impl<'a> IntoIterator for &'a DescriptionSet {
	type Item = &'a BossDescription;
	type IntoIter = indexmap::map::Values<'a, BossName, BossDescription>;

	fn into_iter(self) -> Self::IntoIter {
		self.bosses.values()
	}
}

fn validate(raw: RawBoss) -> Result<BossDescription> {
	let RawBoss {
		name,
		capabilities,
		lazy,
	} = raw;

	let mut seen: Vec<&str> = Vec::with_capacity(capabilities.len() + lazy.len());
	for capability in capabilities.iter().chain(&lazy) {
		if capability.trim().is_empty() {
			return Err(DescriptionError::EmptyCapability { boss: name });
		}
		if seen.contains(&capability.as_str()) {
			return Err(DescriptionError::DuplicateCapability {
				boss: name.clone(),
				capability: capability.clone(),
			});
		}
		seen.push(capability);
	}

	Ok(BossDescription {
		name: BossName::from(name),
		capabilities: capabilities.into_iter().map(CapabilityId::from).collect(),
		lazy: lazy.into_iter().map(CapabilityId::from).collect(),
	})
}
