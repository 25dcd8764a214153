use std::fmt;
use std::sync::Arc;

use super::policy::RegistrationSource;
use crate::boss::ImplContext;
use crate::capability::{Capability, Implements};
use crate::error::ObjectModelError;
use crate::name::{BossName, CapabilityId};
use crate::slot::{ErasedSlot, TypedSlot};

type FactoryFn =
	dyn Fn(&ImplContext) -> Result<Arc<dyn ErasedSlot>, ObjectModelError> + Send + Sync;

/// Builds one implementation of one capability for a given boss.
///
/// Cloning is cheap; clones of the same registration are [`Factory::same`].
#[derive(Clone)]
pub struct Factory {
	capability: CapabilityId,
	build: Arc<FactoryFn>,
}

impl Factory {
	/// Wraps a constructor producing `I`, an implementation of capability `C`.
	pub fn typed<C, I, F>(build: F) -> Self
	where
		C: Capability + ?Sized,
		I: Implements<C>,
		F: Fn(&ImplContext) -> Result<I, ObjectModelError> + Send + Sync + 'static,
	{
		let erased = move |ctx: &ImplContext| -> Result<Arc<dyn ErasedSlot>, ObjectModelError> {
			let value = build(ctx)?;
			let slot = value.into_slot(ctx.header());
			Ok(Arc::new(TypedSlot::<C>(slot)))
		};
		Self {
			capability: C::id(),
			build: Arc::new(erased),
		}
	}

	/// Shorthand for factories that cannot fail.
	pub fn infallible<C, I, F>(build: F) -> Self
	where
		C: Capability + ?Sized,
		I: Implements<C>,
		F: Fn(&ImplContext) -> I + Send + Sync + 'static,
	{
		Self::typed::<C, I, _>(move |ctx| Ok(build(ctx)))
	}

	/// The capability this factory produces.
	pub fn capability(&self) -> &CapabilityId {
		&self.capability
	}

	/// Returns true when both values wrap the same registered callable.
	pub fn same(&self, other: &Factory) -> bool {
		Arc::ptr_eq(&self.build, &other.build)
	}

	pub(crate) fn invoke(&self, ctx: &ImplContext) -> Result<Arc<dyn ErasedSlot>, ObjectModelError> {
		(self.build)(ctx)
	}
}

impl fmt::Debug for Factory {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Factory")
			.field("capability", &self.capability)
			.finish_non_exhaustive()
	}
}

/// One factory registration request.
#[derive(Debug, Clone)]
pub struct Registration {
	pub boss: BossName,
	pub factory: Factory,
	pub source: RegistrationSource,
	/// Shadow an active registration instead of applying the duplicate policy.
	pub override_existing: bool,
}

impl Registration {
	pub fn new(boss: impl Into<BossName>, factory: Factory) -> Self {
		Self {
			boss: boss.into(),
			factory,
			source: RegistrationSource::Runtime,
			override_existing: false,
		}
	}

	pub fn source(mut self, source: RegistrationSource) -> Self {
		self.source = source;
		self
	}

	pub fn override_existing(mut self) -> Self {
		self.override_existing = true;
		self
	}

	pub fn capability(&self) -> &CapabilityId {
		self.factory.capability()
	}
}
