use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::Mutex;

use crate::boss::{Boss, BossRef};
use crate::name::BossId;

/// Every boss created through one object model, in creation order.
///
/// Holds weak references only. The lock is never held while a boss is
/// upgraded and dropped, since dropping the last reference re-enters
/// [`LiveSet::forget`].
#[derive(Default)]
pub(crate) struct LiveSet {
	bosses: Mutex<IndexMap<BossId, Weak<Boss>>>,
}

impl LiveSet {
	pub fn insert(&self, boss: &BossRef) {
		self.bosses.lock().insert(boss.id(), Arc::downgrade(&boss.0));
	}

	pub fn forget(&self, id: BossId) {
		self.bosses.lock().shift_remove(&id);
	}

	/// Strong references to every tracked boss that is still alive.
	pub fn upgrade_all(&self) -> Vec<BossRef> {
		let weak: Vec<_> = self.bosses.lock().values().cloned().collect();
		weak.into_iter().filter_map(|boss| boss.upgrade().map(BossRef)).collect()
	}

	pub fn len(&self) -> usize {
		self.bosses.lock().len()
	}
}
