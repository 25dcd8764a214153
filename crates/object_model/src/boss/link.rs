use std::sync::{Arc, Weak};

use super::{Boss, BossRef};
use crate::capability::Capability;
use crate::error::ObjectModelError;
use crate::handle::InterfacePtr;
use crate::name::{BossId, BossName, CapabilityId};
use crate::registry::RegistrationSource;
use crate::slot::SlotHeader;

/// Non-owning back reference from an implementation to its boss.
///
/// Implementations keep a `BossLink` rather than a [`BossRef`]: a strong
/// reference from an implementation to its own boss is a cycle and the boss
/// would never be destroyed.
#[derive(Clone)]
pub struct BossLink(pub(crate) Weak<Boss>);

impl BossLink {
	pub(crate) fn new(boss: &BossRef) -> Self {
		Self(Arc::downgrade(&boss.0))
	}

	/// A link that never upgrades.
	pub fn dangling() -> Self {
		Self(Weak::new())
	}

	/// Returns a temporary strong reference while the boss is alive.
	pub fn upgrade(&self) -> Option<BossRef> {
		self.0.upgrade().map(BossRef)
	}

	pub fn is_alive(&self) -> bool {
		self.0.strong_count() > 0
	}

	/// Queries a sibling capability on the owning boss.
	///
	/// Returns `Ok(None)` when the capability is absent or the boss is gone.
	pub fn query<C: Capability + ?Sized>(&self) -> Result<Option<InterfacePtr<C>>, ObjectModelError> {
		match self.upgrade() {
			Some(boss) => boss.query::<C>(),
			None => Ok(None),
		}
	}
}

impl std::fmt::Debug for BossLink {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self.0.upgrade() {
			Some(boss) => write!(f, "BossLink({} {})", boss.name(), boss.id()),
			None => f.write_str("BossLink(<dropped>)"),
		}
	}
}

/// What a factory knows about the implementation it is building.
pub struct ImplContext {
	link: BossLink,
	boss_id: BossId,
	boss_name: BossName,
	capability: CapabilityId,
	source: RegistrationSource,
}

impl ImplContext {
	pub(crate) fn new(boss: &BossRef, capability: CapabilityId, source: RegistrationSource) -> Self {
		Self {
			link: BossLink::new(boss),
			boss_id: boss.id(),
			boss_name: boss.name().clone(),
			capability,
			source,
		}
	}

	/// Back reference to the boss under construction.
	///
	/// Querying the capability currently being built through this link fails
	/// with [`ObjectModelError::ReentrantConstruction`].
	pub fn link(&self) -> &BossLink {
		&self.link
	}

	pub fn boss_id(&self) -> BossId {
		self.boss_id
	}

	pub fn boss_name(&self) -> &BossName {
		&self.boss_name
	}

	pub fn capability(&self) -> &CapabilityId {
		&self.capability
	}

	pub fn source(&self) -> &RegistrationSource {
		&self.source
	}

	/// Builds the error a factory returns when it cannot produce its
	/// implementation.
	pub fn fail(&self, message: impl Into<String>) -> ObjectModelError {
		ObjectModelError::Factory {
			boss: self.boss_name.clone(),
			capability: self.capability.clone(),
			message: message.into(),
		}
	}

	pub(crate) fn header(&self) -> SlotHeader {
		SlotHeader {
			capability: self.capability.clone(),
			boss_id: self.boss_id,
			boss_name: self.boss_name.clone(),
			source: self.source.clone(),
			owner: self.link.clone(),
		}
	}
}
