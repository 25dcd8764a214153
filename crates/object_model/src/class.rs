use crate::name::{BossName, CapabilityId};

/// Declarative description of a boss kind: its name and the capabilities it
/// is built with.
///
/// `capabilities` are constructed eagerly, in order, when the boss is
/// created. `lazy` capabilities are constructed on first query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BossDescription {
	pub name: BossName,
	pub capabilities: Vec<CapabilityId>,
	pub lazy: Vec<CapabilityId>,
}

impl BossDescription {
	pub fn new(name: impl Into<BossName>) -> Self {
		Self {
			name: name.into(),
			capabilities: Vec::new(),
			lazy: Vec::new(),
		}
	}

	pub fn with(mut self, capability: impl Into<CapabilityId>) -> Self {
		self.capabilities.push(capability.into());
		self
	}

	pub fn with_lazy(mut self, capability: impl Into<CapabilityId>) -> Self {
		self.lazy.push(capability.into());
		self
	}

	/// Returns true if the description names `capability`, eager or lazy.
	pub fn mentions(&self, capability: &str) -> bool {
		self.capabilities
			.iter()
			.chain(&self.lazy)
			.any(|cap| cap == capability)
	}
}
