//! Static registration collected through `inventory`.
//!
//! Entries submitted with [`register_interface!`](crate::register_interface),
//! [`register_boss!`](crate::register_boss) and
//! [`register_plugin!`](crate::register_plugin) are installed when an
//! [`ObjectModel`](crate::ObjectModel) initialises with
//! `static_registrations` enabled, in that order.

use crate::class::BossDescription;
use crate::name::{BossName, CapabilityId};
use crate::registry::Factory;

/// A factory submitted by [`register_interface!`](crate::register_interface).
pub struct InterfaceReg {
	pub boss: &'static str,
	/// Crate that submitted the entry, recorded as its registration source.
	pub crate_name: &'static str,
	pub factory: fn() -> Factory,
}

inventory::collect!(InterfaceReg);

/// A boss description submitted by [`register_boss!`](crate::register_boss).
pub struct BossReg {
	pub name: &'static str,
	pub crate_name: &'static str,
	pub capabilities: &'static [&'static str],
	pub lazy: &'static [&'static str],
}

inventory::collect!(BossReg);

impl BossReg {
	pub fn description(&self) -> BossDescription {
		BossDescription {
			name: BossName::from_static(self.name),
			capabilities: self.capabilities.iter().copied().map(CapabilityId::from_static).collect(),
			lazy: self.lazy.iter().copied().map(CapabilityId::from_static).collect(),
		}
	}
}

/// Registers an implementation factory at static-initialisation time.
///
/// ```ignore
/// register_interface!("Widget", IText => Label, |_ctx| Ok(Label::default()));
/// ```
#[macro_export]
macro_rules! register_interface {
	($boss:literal, $cap:ident => $impl_ty:ty, $build:expr $(,)?) => {
		$crate::__private::inventory::submit! {
			$crate::InterfaceReg {
				boss: $boss,
				crate_name: env!("CARGO_PKG_NAME"),
				factory: || $crate::Factory::typed::<dyn $cap, $impl_ty, _>($build),
			}
		}
	};
}

/// Registers a boss description at static-initialisation time.
///
/// ```ignore
/// register_boss!("Widget", ["IText", "IGeometry"], lazy ["IDraw"]);
/// ```
#[macro_export]
macro_rules! register_boss {
	($name:literal, [$($cap:literal),* $(,)?] $(, lazy [$($lazy:literal),* $(,)?])? $(,)?) => {
		$crate::__private::inventory::submit! {
			$crate::BossReg {
				name: $name,
				crate_name: env!("CARGO_PKG_NAME"),
				capabilities: &[$($cap),*],
				lazy: &[$($($lazy),*)?],
			}
		}
	};
}

/// Submits a static plugin, loaded during initialisation.
///
/// ```ignore
/// fn register(r: &mut PluginRegistrar<'_>) -> Result<(), ObjectModelError> { ... }
/// register_plugin!("spelling", register);
/// ```
#[macro_export]
macro_rules! register_plugin {
	($name:literal, $register:path $(,)?) => {
		$crate::__private::inventory::submit! {
			$crate::PluginDef::new($name, $register)
		}
	};
}
