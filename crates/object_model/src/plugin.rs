//! Plugin-contributed registrations.
//!
//! A plugin registers implementations and boss descriptions through a
//! [`PluginRegistrar`], which stamps each one with
//! [`RegistrationSource::Plugin`]. Loading is all-or-nothing: when the
//! plugin's `register` fails, every registration it made so far is removed
//! again. Unloading removes every registration from that source and restores
//! whatever the plugin had overridden.
//!
//! Registrations must be unloaded before plugin code goes away. Bosses still
//! holding implementations built by the plugin are listed in the
//! [`PluginUnloadReport`](crate::PluginUnloadReport).

use crate::boss::ImplContext;
use crate::capability::{Capability, Implements};
use crate::class::BossDescription;
use crate::error::ObjectModelError;
use crate::name::BossName;
use crate::registry::{Factory, InsertAction, Registration, RegistrationSource, Registry};

/// A unit of registrations that can be loaded and unloaded as a whole.
pub trait Plugin: Send + Sync {
	fn name(&self) -> &str;

	fn register(&self, registrar: &mut PluginRegistrar<'_>) -> Result<(), ObjectModelError>;
}

/// A plugin descriptor submitted with [`register_plugin!`](crate::register_plugin).
///
/// Static plugins are loaded during initialisation and cannot be unloaded.
pub struct PluginDef {
	pub name: &'static str,
	pub register: fn(&mut PluginRegistrar<'_>) -> Result<(), ObjectModelError>,
}

inventory::collect!(PluginDef);

impl PluginDef {
	pub const fn new(
		name: &'static str,
		register: fn(&mut PluginRegistrar<'_>) -> Result<(), ObjectModelError>,
	) -> Self {
		Self { name, register }
	}
}

impl Plugin for PluginDef {
	fn name(&self) -> &str {
		self.name
	}

	fn register(&self, registrar: &mut PluginRegistrar<'_>) -> Result<(), ObjectModelError> {
		(self.register)(registrar)
	}
}

/// How a plugin came to be loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginOrigin {
	/// Collected from `register_plugin!` during initialisation.
	Static,
	/// Loaded at runtime through [`ObjectModel::load_plugin`](crate::ObjectModel::load_plugin).
	Dynamic,
}

/// A loaded plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginInfo {
	pub name: String,
	pub origin: PluginOrigin,
	/// Registrations that took effect (kept-existing duplicates excluded).
	pub registrations: usize,
}

/// Registration surface handed to [`Plugin::register`].
pub struct PluginRegistrar<'a> {
	registry: &'a Registry,
	source: RegistrationSource,
	registered: usize,
}

impl<'a> PluginRegistrar<'a> {
	pub(crate) fn new(registry: &'a Registry, source: RegistrationSource) -> Self {
		Self {
			registry,
			source,
			registered: 0,
		}
	}

	/// The source every registration made through this registrar carries.
	pub fn source(&self) -> &RegistrationSource {
		&self.source
	}

	/// Number of registrations that took effect so far.
	pub fn registered(&self) -> usize {
		self.registered
	}

	/// Registers a factory under the registry's duplicate policy.
	pub fn implementation<C, I, F>(
		&mut self,
		boss: impl Into<BossName>,
		build: F,
	) -> Result<InsertAction, ObjectModelError>
	where
		C: Capability + ?Sized,
		I: Implements<C>,
		F: Fn(&ImplContext) -> Result<I, ObjectModelError> + Send + Sync + 'static,
	{
		self.factory(boss, Factory::typed::<C, I, F>(build), false)
	}

	/// Registers a factory that shadows any existing one until this plugin unloads.
	pub fn override_implementation<C, I, F>(
		&mut self,
		boss: impl Into<BossName>,
		build: F,
	) -> Result<InsertAction, ObjectModelError>
	where
		C: Capability + ?Sized,
		I: Implements<C>,
		F: Fn(&ImplContext) -> Result<I, ObjectModelError> + Send + Sync + 'static,
	{
		self.factory(boss, Factory::typed::<C, I, F>(build), true)
	}

	pub fn factory(
		&mut self,
		boss: impl Into<BossName>,
		factory: Factory,
		override_existing: bool,
	) -> Result<InsertAction, ObjectModelError> {
		let mut registration = Registration::new(boss, factory).source(self.source.clone());
		registration.override_existing = override_existing;
		let action = self.registry.register(registration)?;
		self.count(action);
		Ok(action)
	}

	pub fn boss(&mut self, description: BossDescription) -> Result<InsertAction, ObjectModelError> {
		let action = self.registry.register_class(description, self.source.clone(), false)?;
		self.count(action);
		Ok(action)
	}

	pub fn override_boss(&mut self, description: BossDescription) -> Result<InsertAction, ObjectModelError> {
		let action = self.registry.register_class(description, self.source.clone(), true)?;
		self.count(action);
		Ok(action)
	}

	fn count(&mut self, action: InsertAction) {
		if action != InsertAction::KeptExisting {
			self.registered += 1;
		}
	}
}
