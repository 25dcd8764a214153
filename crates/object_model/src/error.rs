use crate::name::{BossName, CapabilityId};
use crate::registry::RegistrationSource;

/// Errors raised by the object model.
///
/// A capability that is simply absent from a boss is not an error: queries
/// return `Ok(None)` for that case.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ObjectModelError {
	/// No factory is registered for the (boss, capability) pair.
	#[error("no implementation of {capability} registered for boss {boss}")]
	UnknownCapability {
		boss: BossName,
		capability: CapabilityId,
	},
	/// A second non-override registration for an occupied pair.
	#[error("{capability} is already registered for boss {boss} by {existing}")]
	DuplicateRegistration {
		boss: BossName,
		capability: CapabilityId,
		existing: RegistrationSource,
	},
	/// A second non-override boss description under an occupied name.
	#[error("boss {boss} is already described by {existing}")]
	DuplicateBoss {
		boss: BossName,
		existing: RegistrationSource,
	},
	/// The capability was requested while it is still being constructed.
	#[error("{capability} on boss {boss} is still under construction")]
	ReentrantConstruction {
		boss: BossName,
		capability: CapabilityId,
	},
	/// The object model has been torn down (or never finished initialising).
	#[error("object model is shut down")]
	ObjectModelShutDown,
	/// `create_boss` was called for a name with no registered description.
	#[error("no boss description registered for {boss}")]
	UnknownBoss { boss: BossName },
	/// The boss already exposes an implementation of this capability.
	#[error("boss {boss} already implements {capability}")]
	CapabilityExists {
		boss: BossName,
		capability: CapabilityId,
	},
	/// The implementation stored under a capability tag has another Rust type.
	#[error("implementation of {capability} on boss {boss} has an unexpected type")]
	CapabilityMismatch {
		boss: BossName,
		capability: CapabilityId,
	},
	/// The boss is already the inner part of another aggregate.
	#[error("boss {boss} is already aggregated")]
	AlreadyAggregated { boss: BossName },
	/// Aggregating would make a boss part of itself.
	#[error("boss {boss} cannot be aggregated into itself")]
	AggregationCycle { boss: BossName },
	/// A factory refused to build its implementation.
	#[error("factory for {capability} on boss {boss} failed: {message}")]
	Factory {
		boss: BossName,
		capability: CapabilityId,
		message: String,
	},
	#[error("plugin {plugin} is already loaded")]
	PluginAlreadyLoaded { plugin: String },
	#[error("plugin {plugin} is not loaded")]
	UnknownPlugin { plugin: String },
	#[error("plugin {plugin} was loaded statically and cannot be unloaded")]
	StaticPlugin { plugin: String },
}

impl ObjectModelError {
	/// Returns true when the immediate caller can reasonably retry or fall back.
	///
	/// Reentrant construction is transient. Duplicate registrations are
	/// recoverable when they come from a plugin, whose load is rolled back.
	pub fn is_recoverable(&self) -> bool {
		match self {
			Self::ReentrantConstruction { .. } => true,
			Self::DuplicateRegistration { .. } | Self::DuplicateBoss { .. } => true,
			Self::PluginAlreadyLoaded { .. } | Self::UnknownPlugin { .. } => true,
			_ => false,
		}
	}
}
