//! Diagnostic output of the live-boss set.

use std::fmt;

use crate::boss::BossRef;
use crate::name::{BossId, BossName, CapabilityId};

/// Destination for [`ObjectModel::dump_bosses`](crate::ObjectModel::dump_bosses).
pub trait LogSink {
	fn write_line(&mut self, line: &str);
}

impl LogSink for String {
	fn write_line(&mut self, line: &str) {
		self.push_str(line);
		self.push('\n');
	}
}

impl LogSink for Vec<String> {
	fn write_line(&mut self, line: &str) {
		self.push(line.to_owned());
	}
}

/// Forwards each line to `tracing` at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
	fn write_line(&mut self, line: &str) {
		tracing::info!(target: "whisper::bosses", "{line}");
	}
}

/// Point-in-time description of one live boss.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BossSummary {
	pub id: BossId,
	pub name: BossName,
	/// Capabilities the boss itself implements, in insertion order.
	pub capabilities: Vec<CapabilityId>,
	/// Declared lazy capabilities not constructed yet.
	pub pending: Vec<CapabilityId>,
	/// Outer boss when this one is part of an aggregate.
	pub outer: Option<BossId>,
}

impl BossSummary {
	pub(crate) fn of(boss: &BossRef) -> Self {
		Self {
			id: boss.id(),
			name: boss.name().clone(),
			capabilities: boss.capabilities(),
			pending: boss.lazy_capabilities(),
			outer: boss.outer().map(|outer| outer.id()),
		}
	}
}

impl fmt::Display for BossSummary {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} {} [", self.id, self.name)?;
		for (i, cap) in self.capabilities.iter().enumerate() {
			if i > 0 {
				f.write_str(", ")?;
			}
			write!(f, "{cap}")?;
		}
		f.write_str("]")?;
		if !self.pending.is_empty() {
			write!(f, " lazy: {}", self.pending.len())?;
		}
		if let Some(outer) = self.outer {
			write!(f, " in {outer}")?;
		}
		Ok(())
	}
}
