//! The object model: registry, boss creation, live-boss bookkeeping, plugins.
//!
//! # Lifecycle
//!
//! `Uninitialized → Initializing → Active → ShuttingDown → Shutdown`
//!
//! * Initialisation runs once; it loads static registrations and static
//!   plugins when configured to. Callers arriving while it runs block on a
//!   condition variable until it finishes. An operation on an uninitialised
//!   model initialises it first.
//! * Boss creation, registration and plugin load/unload require `Active`
//!   and fail with [`ObjectModelError::ObjectModelShutDown`] afterwards.
//!   Bosses alive at teardown stay usable for queries on implementations
//!   they already hold; adding implementations to them fails.
//!
//! # Locks
//!
//! The registry and the live-boss set use separate locks, and the plugin
//! table a third. No lock is held across a factory call, a hook, plugin
//! `register` code or a [`LogSink`].

mod dump;
mod live;

use std::sync::{Arc, OnceLock};

use indexmap::IndexMap;
use parking_lot::{Condvar, Mutex};

pub use self::dump::{BossSummary, LogSink, TracingSink};
use self::live::LiveSet;
use crate::boss::{Boss, BossRef, ImplContext};
use crate::capability::{Capability, Implements};
use crate::class::BossDescription;
use crate::config::ObjectModelConfig;
use crate::error::ObjectModelError;
use crate::macros::{BossReg, InterfaceReg};
use crate::name::{BossName, CapabilityId};
use crate::plugin::{Plugin, PluginDef, PluginInfo, PluginOrigin, PluginRegistrar};
use crate::registry::{
	Factory, InsertAction, Registration, RegistrationSource, Registry, ResolvedFactory,
};

/// Lifecycle state of an [`ObjectModel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelState {
	Uninitialized,
	Initializing,
	Active,
	ShuttingDown,
	Shutdown,
}

struct LoadedPlugin {
	origin: PluginOrigin,
	registrations: usize,
}

pub(crate) struct ModelCore {
	config: ObjectModelConfig,
	state: Mutex<ModelState>,
	state_changed: Condvar,
	pub(crate) registry: Registry,
	pub(crate) live: LiveSet,
	plugins: Mutex<IndexMap<Arc<str>, LoadedPlugin>>,
}

/// Moves a model stuck in `Initializing` to `Shutdown` if initialisation
/// unwinds, so blocked callers wake up.
struct InitGuard<'a>(&'a ModelCore);

impl Drop for InitGuard<'_> {
	fn drop(&mut self) {
		let mut state = self.0.state.lock();
		if *state == ModelState::Initializing {
			*state = ModelState::Shutdown;
			self.0.state_changed.notify_all();
		}
	}
}

impl ModelCore {
	fn new(config: ObjectModelConfig) -> Self {
		Self {
			registry: Registry::new(config.duplicate_policy),
			config,
			state: Mutex::new(ModelState::Uninitialized),
			state_changed: Condvar::new(),
			live: LiveSet::default(),
			plugins: Mutex::new(IndexMap::new()),
		}
	}

	fn state(&self) -> ModelState {
		*self.state.lock()
	}

	fn set_state(&self, next: ModelState) {
		*self.state.lock() = next;
		self.state_changed.notify_all();
	}

	fn initialize(&self) -> Result<(), ObjectModelError> {
		{
			let mut state = self.state.lock();
			loop {
				match *state {
					ModelState::Uninitialized => {
						*state = ModelState::Initializing;
						break;
					}
					ModelState::Initializing => self.state_changed.wait(&mut state),
					ModelState::Active => return Ok(()),
					ModelState::ShuttingDown | ModelState::Shutdown => {
						return Err(ObjectModelError::ObjectModelShutDown);
					}
				}
			}
		}

		let guard = InitGuard(self);
		let outcome = if self.config.static_registrations {
			self.load_static()
		} else {
			Ok(())
		};

		match &outcome {
			Ok(()) => {
				self.set_state(ModelState::Active);
				tracing::debug!(registrations = self.registry.len(), "object model active");
			}
			Err(err) => {
				self.registry.close();
				self.plugins.lock().clear();
				tracing::error!(error = %err, "object model initialisation failed");
			}
		}
		drop(guard);
		outcome
	}

	fn load_static(&self) -> Result<(), ObjectModelError> {
		for reg in inventory::iter::<InterfaceReg> {
			self.registry.register(
				Registration::new(BossName::from_static(reg.boss), (reg.factory)())
					.source(RegistrationSource::Crate(reg.crate_name)),
			)?;
		}
		for reg in inventory::iter::<BossReg> {
			self.registry
				.register_class(reg.description(), RegistrationSource::Crate(reg.crate_name), false)?;
		}
		for def in inventory::iter::<PluginDef> {
			self.install_plugin(def, PluginOrigin::Static)?;
		}
		Ok(())
	}

	/// Waits out initialisation and fails unless the model is active.
	pub(crate) fn ensure_active(&self) -> Result<(), ObjectModelError> {
		let mut state = self.state.lock();
		loop {
			match *state {
				ModelState::Active => return Ok(()),
				ModelState::Initializing => self.state_changed.wait(&mut state),
				ModelState::Uninitialized => {
					drop(state);
					return self.initialize();
				}
				ModelState::ShuttingDown | ModelState::Shutdown => {
					return Err(ObjectModelError::ObjectModelShutDown);
				}
			}
		}
	}

	/// Factory lookup for boss construction.
	pub(crate) fn resolve(&self, boss: &str, capability: &str) -> Result<ResolvedFactory, ObjectModelError> {
		self.ensure_active()?;
		self.registry.resolve(boss, capability)
	}

	fn install_plugin(&self, plugin: &dyn Plugin, origin: PluginOrigin) -> Result<usize, ObjectModelError> {
		let name: Arc<str> = Arc::from(plugin.name());
		{
			let mut plugins = self.plugins.lock();
			if plugins.contains_key(&name) {
				return Err(ObjectModelError::PluginAlreadyLoaded {
					plugin: name.to_string(),
				});
			}
			plugins.insert(
				name.clone(),
				LoadedPlugin {
					origin,
					registrations: 0,
				},
			);
		}

		let source = RegistrationSource::Plugin(name.clone());
		let mut registrar = PluginRegistrar::new(&self.registry, source.clone());
		match plugin.register(&mut registrar) {
			Ok(()) => {
				let registrations = registrar.registered();
				if let Some(loaded) = self.plugins.lock().get_mut(&name) {
					loaded.registrations = registrations;
				}
				tracing::debug!(plugin = %name, ?origin, registrations, "plugin loaded");
				Ok(registrations)
			}
			Err(err) => {
				let rolled_back = self.registry.unregister_source(&source);
				self.plugins.lock().shift_remove(&name);
				tracing::warn!(plugin = %name, error = %err, rolled_back, "plugin load failed; rolled back");
				Err(err)
			}
		}
	}
}

/// Result of [`ObjectModel::unload_plugin`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginUnloadReport {
	pub plugin: String,
	/// Registrations removed from the registry.
	pub removed: usize,
	/// Bosses still holding implementations built by the plugin.
	pub live_bosses: Vec<BossSummary>,
}

/// Result of [`ObjectModel::teardown`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeardownReport {
	/// Registrations dropped from the registry.
	pub registrations: usize,
	/// Bosses still alive when the registry was released.
	pub leaked: Vec<BossSummary>,
}

/// Handle to one object model instance. Cloning shares the instance.
///
/// Subsystems should be handed an `ObjectModel`; [`ObjectModel::global`]
/// exists for code that cannot be.
#[derive(Clone)]
pub struct ObjectModel {
	core: Arc<ModelCore>,
}

static GLOBAL: OnceLock<Result<ObjectModel, ObjectModelError>> = OnceLock::new();

impl ObjectModel {
	/// Creates and initialises an instance.
	pub fn new(config: ObjectModelConfig) -> Result<Self, ObjectModelError> {
		let model = Self::uninitialized(config);
		model.initialize()?;
		Ok(model)
	}

	/// An active instance with an empty registry and no static registrations.
	pub fn isolated() -> Self {
		let model = Self::uninitialized(ObjectModelConfig::isolated());
		model.core.set_state(ModelState::Active);
		model
	}

	/// Creates an instance without initialising it. The first operation (or
	/// an explicit [`initialize`](Self::initialize)) does.
	pub fn uninitialized(config: ObjectModelConfig) -> Self {
		Self {
			core: Arc::new(ModelCore::new(config)),
		}
	}

	/// Runs initialisation once. Concurrent callers wait for the first.
	pub fn initialize(&self) -> Result<(), ObjectModelError> {
		self.core.initialize()
	}

	/// The process-wide instance, initialised with the default configuration
	/// on first use.
	pub fn global() -> Result<Self, ObjectModelError> {
		let model = GLOBAL
			.get_or_init(|| Self::new(ObjectModelConfig::default()))
			.clone()?;
		model.core.ensure_active()?;
		Ok(model)
	}

	/// Tears down the process-wide instance. Afterwards [`global`](Self::global)
	/// fails with [`ObjectModelError::ObjectModelShutDown`].
	pub fn teardown_global() -> TeardownReport {
		match GLOBAL.get_or_init(|| Err(ObjectModelError::ObjectModelShutDown)) {
			Ok(model) => model.teardown(),
			Err(_) => TeardownReport::default(),
		}
	}

	pub fn state(&self) -> ModelState {
		self.core.state()
	}

	pub fn config(&self) -> &ObjectModelConfig {
		&self.core.config
	}

	/// Direct registry access. It stops accepting registrations once the
	/// model has been torn down.
	pub fn registry(&self) -> &Registry {
		&self.core.registry
	}

	pub fn ptr_eq(a: &Self, b: &Self) -> bool {
		Arc::ptr_eq(&a.core, &b.core)
	}

	pub fn register(&self, registration: Registration) -> Result<InsertAction, ObjectModelError> {
		self.core.ensure_active()?;
		self.core.registry.register(registration)
	}

	/// Registers a typed factory for `(boss, C)`.
	pub fn register_implementation<C, I, F>(
		&self,
		boss: impl Into<BossName>,
		build: F,
	) -> Result<InsertAction, ObjectModelError>
	where
		C: Capability + ?Sized,
		I: Implements<C>,
		F: Fn(&ImplContext) -> Result<I, ObjectModelError> + Send + Sync + 'static,
	{
		self.register(Registration::new(boss, Factory::typed::<C, I, F>(build)))
	}

	/// Registers the description [`create_boss`](Self::create_boss) builds from.
	pub fn register_boss(&self, description: BossDescription) -> Result<InsertAction, ObjectModelError> {
		self.core.ensure_active()?;
		self.core
			.registry
			.register_class(description, RegistrationSource::Runtime, false)
	}

	pub fn unregister_implementation(&self, boss: &str, capability: &str) -> Result<bool, ObjectModelError> {
		self.core.ensure_active()?;
		Ok(self.core.registry.unregister(boss, capability))
	}

	pub fn unregister_boss(&self, boss: &str) -> Result<bool, ObjectModelError> {
		self.core.ensure_active()?;
		Ok(self.core.registry.unregister_class(boss))
	}

	pub fn lookup(&self, boss: &str, capability: &str) -> Result<Factory, ObjectModelError> {
		self.core.ensure_active()?;
		self.core.registry.lookup(boss, capability)
	}

	/// Creates a boss from its registered description.
	pub fn create_boss(&self, name: &str) -> Result<BossRef, ObjectModelError> {
		self.core.ensure_active()?;
		let description = self
			.core
			.registry
			.class(name)
			.ok_or_else(|| ObjectModelError::UnknownBoss {
				boss: BossName::new(name.to_owned()),
			})?;
		self.create_from_description(&description)
	}

	/// Creates a boss and adds `capabilities` in order.
	///
	/// The caller holds the only reference. If any capability fails, the
	/// ones already built are torn down before the error is returned.
	pub fn create_boss_with<N, I>(&self, name: N, capabilities: I) -> Result<BossRef, ObjectModelError>
	where
		N: Into<BossName>,
		I: IntoIterator,
		I::Item: Into<CapabilityId>,
	{
		let capabilities: Vec<CapabilityId> = capabilities.into_iter().map(Into::into).collect();
		self.build(name.into(), &capabilities, Vec::new())
	}

	pub fn create_from_description(&self, description: &BossDescription) -> Result<BossRef, ObjectModelError> {
		self.build(
			description.name.clone(),
			&description.capabilities,
			description.lazy.clone(),
		)
	}

	fn build(
		&self,
		name: BossName,
		capabilities: &[CapabilityId],
		lazy: Vec<CapabilityId>,
	) -> Result<BossRef, ObjectModelError> {
		self.core.ensure_active()?;
		let boss = Boss::new(self.core.clone(), name, lazy);
		self.core.live.insert(&boss);
		for capability in capabilities {
			if let Err(err) = boss.add_implementation(capability) {
				tracing::debug!(boss = %boss.name(), id = %boss.id(), error = %err, "boss creation failed");
				return Err(err);
			}
		}
		tracing::debug!(
			boss = %boss.name(),
			id = %boss.id(),
			capabilities = capabilities.len(),
			"boss created"
		);
		Ok(boss)
	}

	/// Number of bosses created through this model and not yet destroyed.
	pub fn live_count(&self) -> usize {
		self.core.live.len()
	}

	/// Summaries of every live boss, in creation order.
	pub fn live_bosses(&self) -> Vec<BossSummary> {
		self.core
			.live
			.upgrade_all()
			.iter()
			.map(BossSummary::of)
			.collect()
	}

	/// Writes one line per live boss to `sink`. Returns the number of bosses.
	pub fn dump_bosses(&self, sink: &mut dyn LogSink) -> usize {
		let bosses = self.live_bosses();
		sink.write_line(&format!("{} live boss(es)", bosses.len()));
		for summary in &bosses {
			sink.write_line(&format!("  {summary}"));
		}
		bosses.len()
	}

	/// Loads `plugin`'s registrations, rolling all of them back on failure.
	///
	/// Returns the number of registrations that took effect.
	pub fn load_plugin(&self, plugin: &dyn Plugin) -> Result<usize, ObjectModelError> {
		self.core.ensure_active()?;
		self.core.install_plugin(plugin, PluginOrigin::Dynamic)
	}

	/// Removes every registration `plugin` made and restores what it shadowed.
	pub fn unload_plugin(&self, plugin: &str) -> Result<PluginUnloadReport, ObjectModelError> {
		self.core.ensure_active()?;
		{
			let mut plugins = self.core.plugins.lock();
			match plugins.get(plugin).map(|loaded| loaded.origin) {
				None => {
					return Err(ObjectModelError::UnknownPlugin {
						plugin: plugin.to_owned(),
					});
				}
				Some(PluginOrigin::Static) => {
					return Err(ObjectModelError::StaticPlugin {
						plugin: plugin.to_owned(),
					});
				}
				Some(PluginOrigin::Dynamic) => {
					plugins.shift_remove(plugin);
				}
			}
		}

		let source = RegistrationSource::plugin(plugin);
		let removed = self.core.registry.unregister_source(&source);
		let live_bosses: Vec<BossSummary> = self
			.core
			.live
			.upgrade_all()
			.iter()
			.filter(|boss| boss.slots().iter().any(|slot| slot.header().source() == &source))
			.map(BossSummary::of)
			.collect();

		for summary in &live_bosses {
			tracing::warn!(
				plugin,
				boss = %summary.name,
				id = %summary.id,
				"boss still holds implementations from unloaded plugin"
			);
		}
		tracing::debug!(plugin, removed, "plugin unloaded");

		Ok(PluginUnloadReport {
			plugin: plugin.to_owned(),
			removed,
			live_bosses,
		})
	}

	/// Loaded plugins in load order.
	pub fn loaded_plugins(&self) -> Vec<PluginInfo> {
		self.core
			.plugins
			.lock()
			.iter()
			.map(|(name, loaded)| PluginInfo {
				name: name.to_string(),
				origin: loaded.origin,
				registrations: loaded.registrations,
			})
			.collect()
	}

	/// Shuts the model down and releases the registry.
	///
	/// Idempotent. Later boss creation and registration fail with
	/// [`ObjectModelError::ObjectModelShutDown`].
	pub fn teardown(&self) -> TeardownReport {
		{
			let mut state = self.core.state.lock();
			loop {
				match *state {
					ModelState::Initializing => self.core.state_changed.wait(&mut state),
					ModelState::ShuttingDown | ModelState::Shutdown => return TeardownReport::default(),
					ModelState::Uninitialized | ModelState::Active => {
						*state = ModelState::ShuttingDown;
						break;
					}
				}
			}
		}

		let plugins = std::mem::take(&mut *self.core.plugins.lock());
		let registrations = self.core.registry.close();
		let leaked = self.live_bosses();
		if self.core.config.warn_on_leaks {
			for summary in &leaked {
				tracing::warn!(boss = %summary.name, id = %summary.id, "boss still alive at teardown");
			}
		}
		drop(plugins);

		self.core.set_state(ModelState::Shutdown);
		tracing::debug!(registrations, leaked = leaked.len(), "object model shut down");
		TeardownReport {
			registrations,
			leaked,
		}
	}
}

impl std::fmt::Debug for ObjectModel {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ObjectModel")
			.field("state", &self.state())
			.field("registrations", &self.core.registry.len())
			.field("live", &self.core.live.len())
			.finish()
	}
}

#[cfg(test)]
mod tests;
