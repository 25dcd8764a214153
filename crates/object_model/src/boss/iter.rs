use super::BossRef;
use crate::handle::UnknownPtr;
use crate::name::CapabilityId;

/// Lazy walk over a boss's own implementations in insertion order.
///
/// Each step takes the entry lock briefly, so the walk sees implementations
/// added behind the cursor while it runs. Call [`BossRef::interfaces`]
/// again to start over.
pub struct Interfaces {
	boss: BossRef,
	next: usize,
}

impl Interfaces {
	pub(super) fn new(boss: BossRef) -> Self {
		Self { boss, next: 0 }
	}
}

impl Iterator for Interfaces {
	type Item = (CapabilityId, UnknownPtr);

	fn next(&mut self) -> Option<Self::Item> {
		let slot = self.boss.entries.read().get(self.next).cloned()?;
		self.next += 1;
		let capability = slot.header().capability().clone();
		Some((capability, UnknownPtr::new(self.boss.clone(), slot)))
	}
}
