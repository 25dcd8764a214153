#![cfg_attr(test, allow(unused_crate_dependencies))]
//! Boss/interface object model.
//!
//! A *boss* is a named aggregate object composed of *implementations*, each
//! satisfying one *capability* (a trait object type with an explicit tag).
//! Bosses are reference counted through [`BossRef`] and every interface
//! handle resolved from them; the last release destroys their
//! implementations in reverse construction order.
//!
//! # Layout
//!
//! * [`Registry`]: (boss name, capability) → [`Factory`], plus boss
//!   descriptions for [`ObjectModel::create_boss`].
//! * [`Boss`]/[`BossRef`]: construction, query, enumeration, aggregation.
//! * [`InterfacePtr`], [`ConstInterfacePtr`], [`UnknownPtr`], [`Pinned`]:
//!   counted handles.
//! * [`ObjectModel`]: lifecycle, live-boss bookkeeping, plugins, dumps.
//! * [`register_interface!`], [`register_boss!`], [`register_plugin!`]:
//!   static registration collected at initialisation.
//!
//! # Example
//!
//! ```ignore
//! pub trait IText: Unknown {
//!     fn text(&self) -> &str;
//! }
//! capability!(IText);
//!
//! struct Label(String);
//! impl Unknown for Label {}
//! impl IText for Label {
//!     fn text(&self) -> &str { &self.0 }
//! }
//! implementation!(Label: IText);
//!
//! let model = ObjectModel::new(ObjectModelConfig::isolated())?;
//! model.register_implementation::<dyn IText, _, _>("Widget", |_| Ok(Label("hi".into())))?;
//! let widget = model.create_boss_with("Widget", ["IText"])?;
//! let text = widget.query::<dyn IText>()?.expect("registered above");
//! assert_eq!(text.read().text(), "hi");
//! ```

mod boss;
mod capability;
mod class;
mod config;
mod error;
mod handle;
mod macros;
mod model;
mod name;
mod plugin;
mod registry;
mod slot;
#[cfg(test)]
mod testing;

pub use boss::{Boss, BossLink, BossRef, ImplContext, Interfaces};
pub use capability::{Capability, Implements, Unknown};
pub use class::BossDescription;
pub use config::{ConfigError, ObjectModelConfig};
pub use error::ObjectModelError;
pub use handle::{ConstInterfacePtr, InterfacePtr, Pinned, UnknownPtr};
pub use macros::{BossReg, InterfaceReg};
pub use model::{
	BossSummary, LogSink, ModelState, ObjectModel, PluginUnloadReport, TeardownReport, TracingSink,
};
pub use name::{BossId, BossName, CapabilityId};
pub use plugin::{Plugin, PluginDef, PluginInfo, PluginOrigin, PluginRegistrar};
pub use registry::{
	DuplicatePolicy, Factory, InsertAction, Registration, RegistrationSource, Registry,
	ResolvedFactory,
};
pub use slot::{Slot, SlotHeader};

#[doc(hidden)]
pub mod __private {
	pub use inventory;
}
