//! Bosses: named aggregates of capability implementations.
//!
//! # Lifetime
//!
//! A boss lives as long as any [`BossRef`] or interface handle resolved
//! through it. The reference count is the `Arc` strong count, so exactly one
//! thread runs teardown. Teardown detaches and drops every implementation
//! in reverse insertion order, then releases inner bosses of an aggregate,
//! then removes the boss from the live-boss set.
//!
//! # Construction
//!
//! Implementations are built one at a time by factories looked up under
//! (boss name, capability). While a capability is under construction a
//! query for it from the constructing thread fails with
//! [`ObjectModelError::ReentrantConstruction`]; other threads wait for the
//! construction to finish. No partially built implementation is ever
//! handed out.
//!
//! # Aggregation
//!
//! [`BossRef::aggregate`] makes one boss the owner of another. Queries on
//! any member search the whole aggregate starting at the outermost boss, and
//! the handles they return keep the outermost boss alive.

mod iter;
mod link;

use std::ops::Deref;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Weak};
use std::thread::{self, ThreadId};

use parking_lot::{Condvar, Mutex, MutexGuard, RwLock};

pub use self::iter::Interfaces;
pub use self::link::{BossLink, ImplContext};
use crate::capability::Capability;
use crate::error::ObjectModelError;
use crate::handle::{ConstInterfacePtr, InterfacePtr, UnknownPtr};
use crate::model::ModelCore;
use crate::name::{BossId, BossName, CapabilityId};
use crate::slot::ErasedSlot;

/// Aggregate object owning an ordered list of implementations.
pub struct Boss {
	id: BossId,
	name: BossName,
	core: Arc<ModelCore>,
	entries: RwLock<Vec<Arc<dyn ErasedSlot>>>,
	constructing: Mutex<Vec<(CapabilityId, ThreadId)>>,
	constructed: Condvar,
	lazy: Mutex<Vec<CapabilityId>>,
	outer: Mutex<Option<Weak<Boss>>>,
	inners: Mutex<Vec<BossRef>>,
}

impl Boss {
	pub(crate) fn new(core: Arc<ModelCore>, name: BossName, lazy: Vec<CapabilityId>) -> BossRef {
		BossRef(Arc::new(Self {
			id: BossId::next(),
			name,
			core,
			entries: RwLock::new(Vec::new()),
			constructing: Mutex::new(Vec::new()),
			constructed: Condvar::new(),
			lazy: Mutex::new(lazy),
			outer: Mutex::new(None),
			inners: Mutex::new(Vec::new()),
		}))
	}

	pub fn id(&self) -> BossId {
		self.id
	}

	pub fn name(&self) -> &BossName {
		&self.name
	}

	/// Capabilities implemented by this boss itself, in insertion order.
	pub fn capabilities(&self) -> Vec<CapabilityId> {
		self.entries
			.read()
			.iter()
			.map(|slot| slot.header().capability().clone())
			.collect()
	}

	/// Returns true if this boss itself currently implements `capability`.
	///
	/// Declared-but-unbuilt lazy capabilities do not count.
	pub fn has(&self, capability: &str) -> bool {
		self.entries
			.read()
			.iter()
			.any(|slot| slot.header().capability() == capability)
	}

	/// Lazily constructible capabilities not built yet.
	pub fn lazy_capabilities(&self) -> Vec<CapabilityId> {
		self.lazy.lock().clone()
	}

	pub fn is_constructing(&self, capability: &str) -> bool {
		self.constructing.lock().iter().any(|(cap, _)| cap == capability)
	}

	/// Blocks while another thread constructs `capability` on this boss and
	/// returns the constructing set, locked, once it is free.
	///
	/// Fails when the calling thread is the one constructing it.
	fn await_construction(
		&self,
		capability: &str,
	) -> Result<MutexGuard<'_, Vec<(CapabilityId, ThreadId)>>, ObjectModelError> {
		let me = thread::current().id();
		let mut constructing = self.constructing.lock();
		loop {
			let builder = constructing
				.iter()
				.find(|(cap, _)| cap == capability)
				.map(|(_, builder)| *builder);
			match builder {
				None => return Ok(constructing),
				Some(builder) if builder == me => return Err(self.reentrant(capability)),
				Some(_) => self.constructed.wait(&mut constructing),
			}
		}
	}

	/// The boss this one is aggregated into, if any.
	pub fn outer(&self) -> Option<BossRef> {
		self.outer.lock().as_ref().and_then(Weak::upgrade).map(BossRef)
	}

	/// Bosses aggregated into this one, in aggregation order.
	pub fn inners(&self) -> Vec<BossRef> {
		self.inners.lock().clone()
	}

	pub(crate) fn slots(&self) -> Vec<Arc<dyn ErasedSlot>> {
		self.entries.read().clone()
	}

	fn local_slot(&self, capability: &str) -> Option<Arc<dyn ErasedSlot>> {
		self.entries
			.read()
			.iter()
			.find(|slot| slot.header().capability() == capability)
			.cloned()
	}

	fn reentrant(&self, capability: &str) -> ObjectModelError {
		ObjectModelError::ReentrantConstruction {
			boss: self.name.clone(),
			capability: CapabilityId::new(capability.to_owned()),
		}
	}
}

impl Drop for Boss {
	fn drop(&mut self) {
		let entries = std::mem::take(self.entries.get_mut());
		for slot in entries.into_iter().rev() {
			let capability = slot.header().capability().clone();
			let outcome = panic::catch_unwind(AssertUnwindSafe(move || {
				slot.detach();
				drop(slot);
			}));
			if let Err(payload) = outcome {
				tracing::error!(
					boss = %self.name,
					id = %self.id,
					capability = %capability,
					panic = panic_message(payload.as_ref()),
					"implementation teardown panicked; continuing"
				);
			}
		}

		let inners = std::mem::take(self.inners.get_mut());
		if panic::catch_unwind(AssertUnwindSafe(move || drop(inners))).is_err() {
			tracing::error!(boss = %self.name, id = %self.id, "inner boss teardown panicked");
		}

		self.core.live.forget(self.id);
		tracing::trace!(boss = %self.name, id = %self.id, "boss destroyed");
	}
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
	payload
		.downcast_ref::<&str>()
		.copied()
		.or_else(|| payload.downcast_ref::<String>().map(String::as_str))
		.unwrap_or("<non-string panic>")
}

/// Counted reference to a boss. Cloning adds a reference; dropping releases it.
#[derive(Clone)]
pub struct BossRef(pub(crate) Arc<Boss>);

impl Deref for BossRef {
	type Target = Boss;

	fn deref(&self) -> &Boss {
		&self.0
	}
}

impl std::fmt::Debug for BossRef {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("BossRef")
			.field("id", &self.id)
			.field("name", &self.name)
			.field("refs", &self.ref_count())
			.finish()
	}
}

/// Removes a capability from the constructing set when construction ends,
/// including by unwinding out of a factory.
struct ConstructionGuard<'a> {
	boss: &'a Boss,
	capability: &'a CapabilityId,
}

impl<'a> ConstructionGuard<'a> {
	fn enter(boss: &'a Boss, capability: &'a CapabilityId) -> Result<Self, ObjectModelError> {
		let mut constructing = boss.await_construction(capability.as_str())?;
		constructing.push((capability.clone(), thread::current().id()));
		Ok(Self { boss, capability })
	}
}

impl Drop for ConstructionGuard<'_> {
	fn drop(&mut self) {
		self.boss
			.constructing
			.lock()
			.retain(|(cap, _)| cap != self.capability);
		self.boss.constructed.notify_all();
	}
}

impl BossRef {
	/// Takes another reference (the `AddRef` of the object model).
	pub fn add_ref(&self) -> BossRef {
		self.clone()
	}

	/// Gives up this reference; the last release destroys the boss.
	pub fn release(self) {}

	/// Current number of strong references.
	pub fn ref_count(&self) -> usize {
		Arc::strong_count(&self.0)
	}

	pub fn link(&self) -> BossLink {
		BossLink::new(self)
	}

	pub fn ptr_eq(a: &BossRef, b: &BossRef) -> bool {
		Arc::ptr_eq(&a.0, &b.0)
	}

	/// Builds the implementation registered for (this boss, `capability`)
	/// and appends it.
	pub fn add_implementation(&self, capability: impl Into<CapabilityId>) -> Result<(), ObjectModelError> {
		self.construct(capability.into()).map(drop)
	}

	fn construct(&self, capability: CapabilityId) -> Result<Arc<dyn ErasedSlot>, ObjectModelError> {
		let exists = || ObjectModelError::CapabilityExists {
			boss: self.name.clone(),
			capability: capability.clone(),
		};
		let guard = ConstructionGuard::enter(self, &capability)?;
		if self.has(capability.as_str()) {
			return Err(exists());
		}
		let resolved = self.core.resolve(self.name.as_str(), capability.as_str())?;
		let ctx = ImplContext::new(self, capability.clone(), resolved.source);
		let slot = resolved.factory.invoke(&ctx)?;

		{
			let mut entries = self.entries.write();
			if entries.iter().any(|s| s.header().capability() == &capability) {
				drop(entries);
				return Err(exists());
			}
			entries.push(slot.clone());
		}
		drop(guard);

		self.lazy.lock().retain(|cap| cap != &capability);
		slot.adopted();
		tracing::trace!(
			boss = %self.name,
			id = %self.id,
			capability = %capability,
			source = %slot.header().source(),
			"implementation added"
		);
		Ok(slot)
	}

	/// Detaches and drops one of this boss's own implementations.
	///
	/// Outstanding handles and pins keep the implementation value alive until
	/// they are released. Returns false if the capability is not present.
	pub fn remove_implementation(&self, capability: &str) -> bool {
		let removed = {
			let mut entries = self.entries.write();
			entries
				.iter()
				.position(|slot| slot.header().capability() == capability)
				.map(|index| entries.remove(index))
		};
		let Some(slot) = removed else {
			return false;
		};
		slot.detach();
		tracing::debug!(boss = %self.name, id = %self.id, capability, "implementation removed");
		true
	}

	/// Outermost boss of the aggregate this boss belongs to.
	pub fn root(&self) -> BossRef {
		let mut current = self.clone();
		while let Some(outer) = current.outer() {
			current = outer;
		}
		current
	}

	fn local(&self, capability: &str) -> Result<Option<Arc<dyn ErasedSlot>>, ObjectModelError> {
		if let Some(slot) = self.local_slot(capability) {
			return Ok(Some(slot));
		}
		drop(self.await_construction(capability)?);
		if let Some(slot) = self.local_slot(capability) {
			return Ok(Some(slot));
		}

		let lazy = self.lazy.lock().iter().find(|cap| *cap == capability).cloned();
		let Some(lazy) = lazy else {
			return Ok(None);
		};
		match self.construct(lazy) {
			Ok(slot) => Ok(Some(slot)),
			// Another thread built it while we waited.
			Err(ObjectModelError::CapabilityExists { .. }) => Ok(self.local_slot(capability)),
			Err(err) => Err(err),
		}
	}

	/// Finds `capability` anywhere in the aggregate, outermost boss first.
	fn find(&self, capability: &str) -> Result<Option<(BossRef, Arc<dyn ErasedSlot>)>, ObjectModelError> {
		let root = self.root();
		let mut pending = vec![root.clone()];
		while let Some(boss) = pending.pop() {
			if let Some(slot) = boss.local(capability)? {
				return Ok(Some((root, slot)));
			}
			pending.extend(boss.inners().into_iter().rev());
		}
		Ok(None)
	}

	/// Queries for capability `C`.
	///
	/// `Ok(None)` is the ordinary outcome for an optional capability the boss
	/// does not have.
	pub fn query<C: Capability + ?Sized>(&self) -> Result<Option<InterfacePtr<C>>, ObjectModelError> {
		match self.find(C::NAME)? {
			Some((owner, slot)) => InterfacePtr::from_erased(owner, slot.as_ref()).map(Some),
			None => Ok(None),
		}
	}

	/// Queries for capability `C` through a read-only handle.
	pub fn query_const<C: Capability + ?Sized>(
		&self,
	) -> Result<Option<ConstInterfacePtr<C>>, ObjectModelError> {
		self.query::<C>().map(|ptr| ptr.map(ConstInterfacePtr::from))
	}

	/// Queries by capability tag, returning an erased handle.
	pub fn query_unknown(&self, capability: &str) -> Result<Option<UnknownPtr>, ObjectModelError> {
		Ok(self
			.find(capability)?
			.map(|(owner, slot)| UnknownPtr::new(owner, slot)))
	}

	/// Iterates over this boss's own implementations in insertion order.
	pub fn interfaces(&self) -> Interfaces {
		Interfaces::new(self.clone())
	}

	/// Makes `inner` part of this boss's aggregate.
	///
	/// This boss takes ownership of `inner`; `inner` keeps a weak link back.
	/// Capabilities present on both are resolved to this boss's
	/// implementation, since searches start at the outermost boss.
	pub fn aggregate(&self, inner: BossRef) -> Result<(), ObjectModelError> {
		let mut ancestor = Some(self.clone());
		while let Some(boss) = ancestor {
			if boss.id == inner.id {
				return Err(ObjectModelError::AggregationCycle {
					boss: inner.name.clone(),
				});
			}
			ancestor = boss.outer();
		}

		{
			let mut outer = inner.outer.lock();
			if outer.as_ref().is_some_and(|link| link.strong_count() > 0) {
				return Err(ObjectModelError::AlreadyAggregated {
					boss: inner.name.clone(),
				});
			}
			*outer = Some(Arc::downgrade(&self.0));
		}

		tracing::debug!(
			outer = %self.name,
			outer_id = %self.id,
			inner = %inner.name,
			inner_id = %inner.id,
			"aggregated boss"
		);
		self.inners.lock().push(inner);
		Ok(())
	}
}
