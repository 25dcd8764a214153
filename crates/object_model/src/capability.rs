//! The base contract every implementation satisfies, and capability tags.
//!
//! A capability is a trait object type. The trait itself extends [`Unknown`];
//! [`Capability`] is implemented on `dyn Trait` and carries the explicit tag
//! bosses and the registry key on:
//!
//! ```ignore
//! pub trait IText: Unknown {
//!     fn text(&self) -> &str;
//!     fn set_text(&mut self, text: &str);
//! }
//! capability!(IText);
//!
//! struct Label { text: String }
//! impl Unknown for Label {}
//! impl IText for Label { /* ... */ }
//! implementation!(Label: IText);
//! ```

use std::sync::Arc;

use crate::name::CapabilityId;
use crate::slot::{Slot, SlotHeader};

/// Minimal contract of an interface implementation.
///
/// Identity and the owning-boss back reference live in the slot that wraps
/// the implementation (see [`crate::InterfacePtr::capability`] and
/// [`crate::ImplContext::link`]); this trait only carries lifetime hooks.
pub trait Unknown: Send + Sync + 'static {
	/// Called once the implementation has been installed into its boss.
	///
	/// Sibling capabilities constructed earlier are queryable from here.
	fn on_adopted(&mut self) {}

	/// Called when the owning boss tears down or removes this implementation,
	/// before it is dropped.
	fn on_detach(&mut self) {}
}

/// Implemented on `dyn Trait` for every capability trait.
pub trait Capability: Unknown {
	/// The capability tag.
	const NAME: &'static str;

	fn id() -> CapabilityId {
		CapabilityId::from_static(Self::NAME)
	}
}

/// Declares that `Self` satisfies capability `C`.
///
/// Use [`implementation!`](crate::implementation) rather than implementing
/// this by hand; it generates the unsizing into `Slot<C>`.
pub trait Implements<C: Capability + ?Sized>: Unknown + Sized {
	#[doc(hidden)]
	fn into_slot(self, header: SlotHeader) -> Arc<Slot<C>>;
}

/// Declares a capability tag for a trait object type.
///
/// `capability!(IText)` tags `dyn IText` as `"IText"`;
/// `capability!(IText => "whisper.text")` uses an explicit tag.
#[macro_export]
macro_rules! capability {
	($trait:ident) => {
		$crate::capability!($trait => stringify!($trait));
	};
	($trait:ident => $name:expr) => {
		impl $crate::Capability for dyn $trait {
			const NAME: &'static str = $name;
		}
	};
}

/// Declares that a concrete type implements one or more capabilities.
#[macro_export]
macro_rules! implementation {
	($ty:ty : $($trait:ident),+ $(,)?) => {
		$(
			impl $crate::Implements<dyn $trait> for $ty {
				fn into_slot(
					self,
					header: $crate::SlotHeader,
				) -> ::std::sync::Arc<$crate::Slot<dyn $trait>> {
					::std::sync::Arc::new($crate::Slot::new(header, self))
				}
			}
		)+
	};
}
