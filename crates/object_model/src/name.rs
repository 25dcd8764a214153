//! Identifiers for bosses and capabilities.
//!
//! Names are `Cow<'static, str>` backed so static registrations borrow their
//! literals while descriptions loaded at runtime carry owned strings. Both
//! forms hash and compare identically, and [`Borrow<str>`] lets maps keyed by
//! a name be probed with a plain `&str`.

use std::borrow::{Borrow, Cow};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

macro_rules! define_name {
	($(#[$attr:meta])* $name:ident) => {
		$(#[$attr])*
		#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(transparent)]
		pub struct $name(Cow<'static, str>);

		impl $name {
			/// Wraps a string literal without allocating.
			pub const fn from_static(name: &'static str) -> Self {
				Self(Cow::Borrowed(name))
			}

			/// Wraps any string.
			pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
				Self(name.into())
			}

			pub fn as_str(&self) -> &str {
				&self.0
			}
		}

		impl fmt::Display for $name {
			fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				f.write_str(&self.0)
			}
		}

		impl fmt::Debug for $name {
			fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				fmt::Debug::fmt(&*self.0, f)
			}
		}

		impl Borrow<str> for $name {
			fn borrow(&self) -> &str {
				&self.0
			}
		}

		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				&self.0
			}
		}

		impl PartialEq<str> for $name {
			fn eq(&self, other: &str) -> bool {
				*self.0 == *other
			}
		}

		impl PartialEq<&str> for $name {
			fn eq(&self, other: &&str) -> bool {
				*self.0 == **other
			}
		}

		impl From<&'static str> for $name {
			fn from(name: &'static str) -> Self {
				Self::from_static(name)
			}
		}

		impl From<String> for $name {
			fn from(name: String) -> Self {
				Self(Cow::Owned(name))
			}
		}

		impl From<&$name> for $name {
			fn from(name: &$name) -> Self {
				name.clone()
			}
		}
	};
}

define_name! {
	/// Name of a boss kind. Several live bosses may share one name.
	BossName
}

define_name! {
	/// Explicit tag of a capability (interface), e.g. `"IText"`.
	CapabilityId
}

/// Process-unique identity of one boss instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BossId(u64);

impl BossId {
	pub(crate) fn next() -> Self {
		static NEXT: AtomicU64 = AtomicU64::new(1);
		Self(NEXT.fetch_add(1, Ordering::Relaxed))
	}

	pub const fn as_u64(self) -> u64 {
		self.0
	}
}

impl fmt::Display for BossId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "#{}", self.0)
	}
}

#[cfg(test)]
mod tests {
	use std::collections::HashMap;

	use super::*;

	#[test]
	fn static_and_owned_names_are_interchangeable_keys() {
		let mut map = HashMap::new();
		map.insert(CapabilityId::from_static("IText"), 1);

		assert_eq!(map.get("IText"), Some(&1));
		assert_eq!(map.get(&CapabilityId::from(String::from("IText"))), Some(&1));
	}

	#[test]
	fn boss_ids_are_unique() {
		let a = BossId::next();
		let b = BossId::next();
		assert_ne!(a, b);
		assert_eq!(format!("{a}"), format!("#{}", a.as_u64()));
	}
}
