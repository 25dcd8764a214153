//! Registration sources and duplicate-resolution rules.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Represents where a registration came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RegistrationSource {
	/// Registered by the framework itself.
	Builtin,
	/// Registered at static-initialisation time by a crate (`register_interface!`).
	Crate(&'static str),
	/// Contributed by a loaded plugin.
	Plugin(Arc<str>),
	/// Registered through the object model API at runtime.
	Runtime,
}

impl RegistrationSource {
	pub fn plugin(name: impl Into<Arc<str>>) -> Self {
		Self::Plugin(name.into())
	}

	pub fn is_plugin(&self, name: &str) -> bool {
		matches!(self, Self::Plugin(plugin) if &**plugin == name)
	}
}

impl fmt::Display for RegistrationSource {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Builtin => write!(f, "builtin"),
			Self::Crate(name) => write!(f, "crate:{name}"),
			Self::Plugin(name) => write!(f, "plugin:{name}"),
			Self::Runtime => write!(f, "runtime"),
		}
	}
}

/// How a non-override registration for an occupied key is resolved.
///
/// Registrations flagged `override_existing` always shadow the active entry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
	/// Fail with a duplicate-registration error.
	#[default]
	Reject,
	/// Keep the active entry and drop the incoming one.
	FirstWins,
	/// Shadow the active entry with the incoming one.
	LastWins,
}

/// Result of a successful registration.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum InsertAction {
	/// Key was new.
	InsertedNew,
	/// Key existed; the incoming registration was dropped.
	KeptExisting,
	/// Key existed; the incoming registration now shadows it.
	ShadowedExisting,
}

#[derive(Clone)]
pub(crate) struct Layer<T> {
	pub value: T,
	pub source: RegistrationSource,
	pub ordinal: u64,
}

/// Stack of registrations for one key. The last layer is the active one;
/// removing it re-exposes the layer underneath.
#[derive(Clone)]
pub(crate) struct Layered<T> {
	layers: Vec<Layer<T>>,
}

impl<T> Default for Layered<T> {
	fn default() -> Self {
		Self { layers: Vec::new() }
	}
}

impl<T> Layered<T> {
	pub fn active(&self) -> Option<&Layer<T>> {
		self.layers.last()
	}

	/// Inserts `layer` following `policy`; on rejection returns the active source.
	pub fn insert(
		&mut self,
		layer: Layer<T>,
		override_existing: bool,
		policy: DuplicatePolicy,
	) -> Result<InsertAction, RegistrationSource> {
		let Some(active) = self.layers.last() else {
			self.layers.push(layer);
			return Ok(InsertAction::InsertedNew);
		};

		if override_existing {
			self.layers.push(layer);
			return Ok(InsertAction::ShadowedExisting);
		}

		match policy {
			DuplicatePolicy::Reject => Err(active.source.clone()),
			DuplicatePolicy::FirstWins => Ok(InsertAction::KeptExisting),
			DuplicatePolicy::LastWins => {
				self.layers.push(layer);
				Ok(InsertAction::ShadowedExisting)
			}
		}
	}

	pub fn pop(&mut self) -> Option<Layer<T>> {
		self.layers.pop()
	}

	/// Removes every layer from `source`, returning how many were removed.
	pub fn remove_source(&mut self, source: &RegistrationSource) -> usize {
		let before = self.layers.len();
		self.layers.retain(|layer| &layer.source != source);
		before - self.layers.len()
	}

	pub fn is_empty(&self) -> bool {
		self.layers.is_empty()
	}

	pub fn depth(&self) -> usize {
		self.layers.len()
	}
}
