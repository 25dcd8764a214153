//! Storage cell for one implementation inside its boss.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::boss::{BossLink, BossRef};
use crate::capability::{Capability, Unknown};
use crate::name::{BossId, BossName, CapabilityId};
use crate::registry::RegistrationSource;

/// Identity of an implementation: what it satisfies and who owns it.
#[derive(Clone)]
pub struct SlotHeader {
	pub(crate) capability: CapabilityId,
	pub(crate) boss_id: BossId,
	pub(crate) boss_name: BossName,
	pub(crate) source: RegistrationSource,
	pub(crate) owner: BossLink,
}

impl SlotHeader {
	pub fn capability(&self) -> &CapabilityId {
		&self.capability
	}

	pub fn boss_id(&self) -> BossId {
		self.boss_id
	}

	pub fn boss_name(&self) -> &BossName {
		&self.boss_name
	}

	/// Where the factory that built this implementation was registered from.
	pub fn source(&self) -> &RegistrationSource {
		&self.source
	}
}

impl std::fmt::Debug for SlotHeader {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SlotHeader")
			.field("capability", &self.capability)
			.field("boss", &self.boss_name)
			.field("boss_id", &self.boss_id)
			.field("source", &self.source)
			.finish()
	}
}

/// An implementation together with its header.
///
/// The value sits last so `Slot<Concrete>` unsizes to `Slot<dyn Trait>`.
///
/// A detach that finds the value locked, typically because the
/// implementation is removing itself from inside one of its own methods,
/// does not wait: `on_detach` runs when the last reference to the slot
/// drops instead.
pub struct Slot<C: Unknown + ?Sized> {
	header: SlotHeader,
	detach_pending: AtomicBool,
	value: RwLock<C>,
}

impl<T: Unknown> Slot<T> {
	#[doc(hidden)]
	pub fn new(header: SlotHeader, value: T) -> Self {
		Self {
			header,
			detach_pending: AtomicBool::new(false),
			value: RwLock::new(value),
		}
	}
}

impl<C: Unknown + ?Sized> Slot<C> {
	pub fn header(&self) -> &SlotHeader {
		&self.header
	}

	pub(crate) fn read(&self) -> RwLockReadGuard<'_, C> {
		self.value.read()
	}

	pub(crate) fn write(&self) -> RwLockWriteGuard<'_, C> {
		self.value.write()
	}

	/// Upgrades the back reference to the owning boss, if it is still alive.
	pub(crate) fn owner(&self) -> Option<BossRef> {
		self.header.owner.upgrade()
	}

	fn detach(&self) {
		match self.value.try_write() {
			Some(mut value) => value.on_detach(),
			None => {
				self.detach_pending.store(true, Ordering::Release);
				tracing::trace!(
					boss = %self.header.boss_name,
					id = %self.header.boss_id,
					capability = %self.header.capability,
					"implementation busy; detach deferred to release"
				);
			}
		}
	}
}

impl<C: Unknown + ?Sized> Drop for Slot<C> {
	fn drop(&mut self) {
		if !*self.detach_pending.get_mut() {
			return;
		}
		let value = self.value.get_mut();
		if panic::catch_unwind(AssertUnwindSafe(|| value.on_detach())).is_err() {
			tracing::error!(
				boss = %self.header.boss_name,
				id = %self.header.boss_id,
				capability = %self.header.capability,
				"deferred on_detach panicked"
			);
		}
	}
}

/// Type-erased view of a slot, as stored in a boss.
pub(crate) trait ErasedSlot: Send + Sync {
	fn header(&self) -> &SlotHeader;

	fn as_any(&self) -> &dyn Any;

	fn adopted(&self);

	fn detach(&self);
}

/// Sized carrier for `Arc<Slot<C>>` so unsized slots can sit behind `dyn ErasedSlot`.
pub(crate) struct TypedSlot<C: Capability + ?Sized>(pub(crate) Arc<Slot<C>>);

impl<C: Capability + ?Sized> ErasedSlot for TypedSlot<C> {
	fn header(&self) -> &SlotHeader {
		&self.0.header
	}

	fn as_any(&self) -> &dyn Any {
		self
	}

	fn adopted(&self) {
		self.0.write().on_adopted();
	}

	fn detach(&self) {
		self.0.detach();
	}
}

/// Recovers the typed slot behind an erased one.
pub(crate) fn downcast<C: Capability + ?Sized>(slot: &dyn ErasedSlot) -> Option<Arc<Slot<C>>> {
	slot.as_any()
		.downcast_ref::<TypedSlot<C>>()
		.map(|typed| typed.0.clone())
}
