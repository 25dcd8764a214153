//! Process-wide table mapping (boss name, capability) to factories.
//!
//! # Mental model
//!
//! * Readers load the current [`Tables`] snapshot and resolve against it
//!   without taking the write lock.
//! * Writers serialize on a single mutex, clone the snapshot, mutate the
//!   clone and publish it. Factories are `Arc`s, so a clone copies pointers.
//! * Each key holds a [`Layered`] stack: override registrations shadow the
//!   active entry and unregistering them re-exposes the shadowed one.
//!
//! # Invariants
//!
//! * No lock is held while a factory runs; lookups hand out a cloned
//!   [`Factory`] and the caller invokes it.
//! * Values removed from the tables are dropped after the write lock is
//!   released.
//! * Once [`Registry::close`] runs, registrations fail with
//!   [`ObjectModelError::ObjectModelShutDown`] and the tables stay empty.

mod factory;
mod policy;

use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

pub use self::factory::{Factory, Registration};
pub(crate) use self::policy::{Layer, Layered};
pub use self::policy::{DuplicatePolicy, InsertAction, RegistrationSource};
use crate::class::BossDescription;
use crate::error::ObjectModelError;
use crate::name::{BossName, CapabilityId};

/// Active factory entry returned by [`Registry::resolve`].
#[derive(Debug, Clone)]
pub struct ResolvedFactory {
	pub factory: Factory,
	pub source: RegistrationSource,
}

#[derive(Clone, Default)]
struct Tables {
	factories: FxHashMap<BossName, FxHashMap<CapabilityId, Layered<Factory>>>,
	classes: FxHashMap<BossName, Layered<BossDescription>>,
	next_ordinal: u64,
	closed: bool,
}

impl Tables {
	fn ordinal(&mut self) -> u64 {
		let ordinal = self.next_ordinal;
		self.next_ordinal += 1;
		ordinal
	}
}

/// Registry of implementation factories and boss descriptions.
pub struct Registry {
	snap: ArcSwap<Tables>,
	write: Mutex<()>,
	policy: DuplicatePolicy,
}

impl Registry {
	pub fn new(policy: DuplicatePolicy) -> Self {
		Self {
			snap: ArcSwap::from_pointee(Tables::default()),
			write: Mutex::new(()),
			policy,
		}
	}

	pub fn policy(&self) -> DuplicatePolicy {
		self.policy
	}

	/// Applies `edit` to a private copy of the tables and publishes it.
	///
	/// Returns the edit's result along with the superseded snapshot, which the
	/// caller drops once the lock is released.
	fn edit<R>(&self, edit: impl FnOnce(&mut Tables) -> R) -> (R, Arc<Tables>) {
		let _guard = self.write.lock();
		let old = self.snap.load_full();
		let mut next = Tables::clone(&old);
		let result = edit(&mut next);
		self.snap.store(Arc::new(next));
		(result, old)
	}

	/// Registers a factory for `(registration.boss, factory capability)`.
	pub fn register(&self, registration: Registration) -> Result<InsertAction, ObjectModelError> {
		let Registration {
			boss,
			factory,
			source,
			override_existing,
		} = registration;
		let capability = factory.capability().clone();
		let policy = self.policy;

		let (result, _old) = self.edit(|tables| {
			if tables.closed {
				return None;
			}
			let layer = Layer {
				value: factory,
				source: source.clone(),
				ordinal: tables.ordinal(),
			};
			let stack = tables
				.factories
				.entry(boss.clone())
				.or_default()
				.entry(capability.clone())
				.or_default();
			Some(stack.insert(layer, override_existing, policy))
		});

		match result.ok_or(ObjectModelError::ObjectModelShutDown)? {
			Ok(action) => {
				tracing::debug!(
					boss = %boss,
					capability = %capability,
					source = %source,
					?action,
					"registered implementation"
				);
				Ok(action)
			}
			Err(existing) => Err(ObjectModelError::DuplicateRegistration {
				boss,
				capability,
				existing,
			}),
		}
	}

	/// Returns the active factory for the pair.
	pub fn lookup(&self, boss: &str, capability: &str) -> Result<Factory, ObjectModelError> {
		self.resolve(boss, capability).map(|resolved| resolved.factory)
	}

	/// Returns the active factory for the pair together with its source.
	pub fn resolve(&self, boss: &str, capability: &str) -> Result<ResolvedFactory, ObjectModelError> {
		let snap = self.snap.load();
		snap.factories
			.get(boss)
			.and_then(|caps| caps.get(capability))
			.and_then(Layered::active)
			.map(|layer| ResolvedFactory {
				factory: layer.value.clone(),
				source: layer.source.clone(),
			})
			.ok_or_else(|| ObjectModelError::UnknownCapability {
				boss: BossName::new(boss.to_owned()),
				capability: CapabilityId::new(capability.to_owned()),
			})
	}

	/// Returns true when a factory is registered for the pair.
	pub fn contains(&self, boss: &str, capability: &str) -> bool {
		self.resolve(boss, capability).is_ok()
	}

	/// Removes the active factory for the pair. Absent pairs are a no-op.
	pub fn unregister(&self, boss: &str, capability: &str) -> bool {
		let (removed, _old) = self.edit(|tables| {
			let Some(caps) = tables.factories.get_mut(boss) else {
				return None;
			};
			let removed = caps.get_mut(capability).and_then(Layered::pop);
			caps.retain(|_, stack| !stack.is_empty());
			if caps.is_empty() {
				tables.factories.remove(boss);
			}
			removed
		});

		if let Some(layer) = &removed {
			tracing::debug!(
				boss,
				capability,
				source = %layer.source,
				"unregistered implementation"
			);
		}
		removed.is_some()
	}

	/// Registers a boss description.
	pub fn register_class(
		&self,
		description: BossDescription,
		source: RegistrationSource,
		override_existing: bool,
	) -> Result<InsertAction, ObjectModelError> {
		let name = description.name.clone();
		let policy = self.policy;

		let (result, _old) = self.edit(|tables| {
			if tables.closed {
				return None;
			}
			let layer = Layer {
				value: description,
				source: source.clone(),
				ordinal: tables.ordinal(),
			};
			let stack = tables.classes.entry(name.clone()).or_default();
			Some(stack.insert(layer, override_existing, policy))
		});

		match result.ok_or(ObjectModelError::ObjectModelShutDown)? {
			Ok(action) => {
				tracing::debug!(boss = %name, source = %source, ?action, "registered boss");
				Ok(action)
			}
			Err(existing) => Err(ObjectModelError::DuplicateBoss {
				boss: name,
				existing,
			}),
		}
	}

	/// Returns the active description for a boss name.
	pub fn class(&self, boss: &str) -> Option<BossDescription> {
		let snap = self.snap.load();
		snap.classes
			.get(boss)
			.and_then(Layered::active)
			.map(|layer| layer.value.clone())
	}

	/// Removes the active description for a boss name.
	pub fn unregister_class(&self, boss: &str) -> bool {
		let (removed, _old) = self.edit(|tables| {
			let removed = tables.classes.get_mut(boss).and_then(Layered::pop);
			if tables.classes.get(boss).is_some_and(Layered::is_empty) {
				tables.classes.remove(boss);
			}
			removed
		});
		removed.is_some()
	}

	/// Removes every factory and description registered by `source`.
	pub fn unregister_source(&self, source: &RegistrationSource) -> usize {
		let (removed, _old) = self.edit(|tables| {
			let mut removed = 0;
			for caps in tables.factories.values_mut() {
				for stack in caps.values_mut() {
					removed += stack.remove_source(source);
				}
				caps.retain(|_, stack| !stack.is_empty());
			}
			tables.factories.retain(|_, caps| !caps.is_empty());

			for stack in tables.classes.values_mut() {
				removed += stack.remove_source(source);
			}
			tables.classes.retain(|_, stack| !stack.is_empty());
			removed
		});

		tracing::debug!(source = %source, removed, "unregistered source");
		removed
	}

	/// Capabilities with an active factory for `boss`, sorted by tag.
	pub fn capabilities(&self, boss: &str) -> Vec<CapabilityId> {
		let snap = self.snap.load();
		let mut caps: Vec<_> = snap
			.factories
			.get(boss)
			.map(|caps| caps.keys().cloned().collect())
			.unwrap_or_default();
		caps.sort();
		caps
	}

	/// Boss names with at least one factory or description, sorted.
	pub fn bosses(&self) -> Vec<BossName> {
		let snap = self.snap.load();
		let mut names: Vec<_> = snap
			.factories
			.keys()
			.chain(snap.classes.keys())
			.cloned()
			.collect();
		names.sort();
		names.dedup();
		names
	}

	/// Number of (boss, capability) pairs with an active factory.
	pub fn len(&self) -> usize {
		self.snap.load().factories.values().map(|caps| caps.len()).sum()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Drops every registration, shadowed layers included. Returns how
	/// many factory layers were dropped.
	pub fn clear(&self) -> usize {
		self.reset(false)
	}

	/// Drops every registration and refuses new ones from then on.
	pub(crate) fn close(&self) -> usize {
		self.reset(true)
	}

	pub fn is_closed(&self) -> bool {
		self.snap.load().closed
	}

	fn reset(&self, close: bool) -> usize {
		let (_, old) = self.edit(|tables| {
			*tables = Tables {
				next_ordinal: tables.next_ordinal,
				closed: tables.closed || close,
				..Tables::default()
			};
		});
		old.factories
			.values()
			.flat_map(|caps| caps.values())
			.map(Layered::depth)
			.sum()
	}
}
