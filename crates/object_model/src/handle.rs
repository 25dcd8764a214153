//! Counted handles to implementations.
//!
//! | Handle | Keeps alive | Access |
//! |---|---|---|
//! | [`InterfacePtr`] | owning boss (aggregate root) | `read` + `write` |
//! | [`ConstInterfacePtr`] | owning boss (aggregate root) | `read` |
//! | [`UnknownPtr`] | owning boss | identity, downcast |
//! | [`Pinned`] | the implementation only | `read` + `write` |

use std::fmt;
use std::sync::Arc;

use parking_lot::{RwLockReadGuard, RwLockWriteGuard};

use crate::boss::BossRef;
use crate::capability::Capability;
use crate::error::ObjectModelError;
use crate::name::CapabilityId;
use crate::registry::RegistrationSource;
use crate::slot::{self, ErasedSlot, Slot};

/// Handle to an implementation of capability `C`.
///
/// Holding one holds a reference on the owning boss; cloning adds one.
pub struct InterfacePtr<C: Capability + ?Sized> {
	// Dropped before `owner`.
	slot: Arc<Slot<C>>,
	owner: BossRef,
}

impl<C: Capability + ?Sized> InterfacePtr<C> {
	pub(crate) fn from_erased(owner: BossRef, erased: &dyn ErasedSlot) -> Result<Self, ObjectModelError> {
		let slot = slot::downcast::<C>(erased).ok_or_else(|| ObjectModelError::CapabilityMismatch {
			boss: erased.header().boss_name().clone(),
			capability: erased.header().capability().clone(),
		})?;
		Ok(Self { slot, owner })
	}

	/// Shared access to the implementation.
	pub fn read(&self) -> RwLockReadGuard<'_, C> {
		self.slot.read()
	}

	/// Exclusive access to the implementation, for capability-mutating calls.
	pub fn write(&self) -> RwLockWriteGuard<'_, C> {
		self.slot.write()
	}

	pub fn capability(&self) -> &CapabilityId {
		self.slot.header().capability()
	}

	pub fn source(&self) -> &RegistrationSource {
		self.slot.header().source()
	}

	/// The boss whose reference this handle holds.
	pub fn boss(&self) -> &BossRef {
		&self.owner
	}

	/// Queries a sibling capability on the same boss.
	pub fn query<D: Capability + ?Sized>(&self) -> Result<Option<InterfacePtr<D>>, ObjectModelError> {
		self.owner.query::<D>()
	}

	/// Keeps the implementation alive independently of its boss.
	pub fn pin(&self) -> Pinned<C> {
		Pinned {
			slot: self.slot.clone(),
		}
	}

	pub fn as_const(&self) -> ConstInterfacePtr<C> {
		ConstInterfacePtr::from(self.clone())
	}

	pub fn ptr_eq(a: &Self, b: &Self) -> bool {
		Arc::ptr_eq(&a.slot, &b.slot)
	}
}

impl<C: Capability + ?Sized> Clone for InterfacePtr<C> {
	fn clone(&self) -> Self {
		Self {
			slot: self.slot.clone(),
			owner: self.owner.clone(),
		}
	}
}

impl<C: Capability + ?Sized> fmt::Debug for InterfacePtr<C> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("InterfacePtr")
			.field("capability", self.capability())
			.field("boss", self.owner.name())
			.field("boss_id", &self.owner.id())
			.finish()
	}
}

impl<C: Capability + ?Sized> TryFrom<UnknownPtr> for InterfacePtr<C> {
	type Error = ObjectModelError;

	fn try_from(unknown: UnknownPtr) -> Result<Self, Self::Error> {
		InterfacePtr::from_erased(unknown.owner, unknown.slot.as_ref())
	}
}

/// Read-only handle to an implementation of capability `C`.
///
/// Only `&self` methods of the capability are reachable through it.
pub struct ConstInterfacePtr<C: Capability + ?Sized> {
	inner: InterfacePtr<C>,
}

impl<C: Capability + ?Sized> ConstInterfacePtr<C> {
	pub fn read(&self) -> RwLockReadGuard<'_, C> {
		self.inner.read()
	}

	pub fn capability(&self) -> &CapabilityId {
		self.inner.capability()
	}

	pub fn source(&self) -> &RegistrationSource {
		self.inner.source()
	}

	pub fn boss(&self) -> &BossRef {
		self.inner.boss()
	}

	/// Queries a sibling capability, read-only as well.
	pub fn query<D: Capability + ?Sized>(&self) -> Result<Option<ConstInterfacePtr<D>>, ObjectModelError> {
		self.inner.boss().query_const::<D>()
	}
}

impl<C: Capability + ?Sized> From<InterfacePtr<C>> for ConstInterfacePtr<C> {
	fn from(inner: InterfacePtr<C>) -> Self {
		Self { inner }
	}
}

impl<C: Capability + ?Sized> Clone for ConstInterfacePtr<C> {
	fn clone(&self) -> Self {
		Self {
			inner: self.inner.clone(),
		}
	}
}

impl<C: Capability + ?Sized> fmt::Debug for ConstInterfacePtr<C> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("ConstInterfacePtr").field(&self.inner).finish()
	}
}

/// Type-erased handle, as produced by enumeration and by-name queries.
#[derive(Clone)]
pub struct UnknownPtr {
	slot: Arc<dyn ErasedSlot>,
	owner: BossRef,
}

impl UnknownPtr {
	pub(crate) fn new(owner: BossRef, slot: Arc<dyn ErasedSlot>) -> Self {
		Self { slot, owner }
	}

	pub fn capability(&self) -> &CapabilityId {
		self.slot.header().capability()
	}

	pub fn source(&self) -> &RegistrationSource {
		self.slot.header().source()
	}

	pub fn boss(&self) -> &BossRef {
		&self.owner
	}

	/// Recovers a typed handle; `None` if the implementation is not a `C`.
	pub fn downcast<C: Capability + ?Sized>(&self) -> Option<InterfacePtr<C>> {
		InterfacePtr::from_erased(self.owner.clone(), self.slot.as_ref()).ok()
	}
}

impl fmt::Debug for UnknownPtr {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("UnknownPtr")
			.field("capability", self.capability())
			.field("boss", self.owner.name())
			.field("source", self.source())
			.finish()
	}
}

/// Pins one implementation without holding its boss.
///
/// Lets a call that may detach the implementation from its boss (or drop
/// the last boss reference) keep running against a live value. The
/// implementation is dropped when the last pin goes. A detach that happens
/// while the value is borrowed through a pin runs `on_detach` at that point
/// instead of blocking.
pub struct Pinned<C: Capability + ?Sized> {
	slot: Arc<Slot<C>>,
}

impl<C: Capability + ?Sized> Pinned<C> {
	pub fn read(&self) -> RwLockReadGuard<'_, C> {
		self.slot.read()
	}

	pub fn write(&self) -> RwLockWriteGuard<'_, C> {
		self.slot.write()
	}

	pub fn capability(&self) -> &CapabilityId {
		self.slot.header().capability()
	}

	/// The owning boss, if it is still alive.
	pub fn boss(&self) -> Option<BossRef> {
		self.slot.owner()
	}
}

impl<C: Capability + ?Sized> Clone for Pinned<C> {
	fn clone(&self) -> Self {
		Self {
			slot: self.slot.clone(),
		}
	}
}
