use std::thread;

use pretty_assertions::assert_eq;

use super::*;
use crate::plugin::PluginRegistrar;
use crate::testing::{Draw, Geometry, IDraw, IGeometry, IText, Journal, Text, register_widget};
use crate::{register_boss, register_interface, register_plugin};

fn init_tracing() {
	let _ = tracing_subscriber::fmt::try_init();
}

register_interface!("StaticWidget", IText => Text, |_ctx| Ok(Text::new("static", &Journal::default())));
register_interface!("StaticWidget", IGeometry => Geometry, |_ctx| {
	Ok(Geometry {
		width: 2,
		height: 2,
		journal: Journal::default(),
	})
});
register_boss!("StaticWidget", ["IText"], lazy ["IGeometry"]);

fn register_static_drawing(registrar: &mut PluginRegistrar<'_>) -> Result<(), ObjectModelError> {
	registrar.implementation::<dyn IDraw, _, _>("StaticWidget", |ctx| {
		Ok(Draw {
			link: ctx.link().clone(),
			journal: Journal::default(),
		})
	})?;
	Ok(())
}

register_plugin!("static-drawing", register_static_drawing);

struct ShapesPlugin {
	name: &'static str,
	clash: bool,
	journal: Journal,
}

impl Plugin for ShapesPlugin {
	fn name(&self) -> &str {
		self.name
	}

	fn register(&self, registrar: &mut PluginRegistrar<'_>) -> Result<(), ObjectModelError> {
		let journal = self.journal.clone();
		registrar.implementation::<dyn IGeometry, _, _>("Shape", move |_| {
			Ok(Geometry {
				width: 5,
				height: 5,
				journal: journal.clone(),
			})
		})?;
		registrar.boss(BossDescription::new("Shape").with("IGeometry"))?;
		if self.clash {
			let journal = self.journal.clone();
			registrar.implementation::<dyn IText, _, _>("Widget", move |_| Ok(Text::new("clash", &journal)))?;
		}
		Ok(())
	}
}

struct PatchPlugin {
	journal: Journal,
}

impl Plugin for PatchPlugin {
	fn name(&self) -> &str {
		"patch"
	}

	fn register(&self, registrar: &mut PluginRegistrar<'_>) -> Result<(), ObjectModelError> {
		let journal = self.journal.clone();
		registrar.override_implementation::<dyn IText, _, _>("Widget", move |_| {
			Ok(Text::new("patched", &journal))
		})?;
		Ok(())
	}
}

fn text_of(boss: &BossRef) -> String {
	boss.query::<dyn IText>().unwrap().unwrap().read().text()
}

#[test]
fn test_teardown_gates_creation_and_registration() {
	init_tracing();
	let journal = Journal::default();
	let model = ObjectModel::isolated();
	register_widget(&model, "Widget", &journal);
	assert_eq!(model.state(), ModelState::Active);

	let report = model.teardown();
	assert_eq!(report.registrations, 3);
	assert!(report.leaked.is_empty());
	assert_eq!(model.state(), ModelState::Shutdown);

	assert_eq!(
		model.create_boss_with("Widget", ["IText"]).unwrap_err(),
		ObjectModelError::ObjectModelShutDown
	);
	assert_eq!(
		model
			.register_implementation::<dyn IText, _, _>("Widget", |_| Ok(Text::new("late", &Journal::default())))
			.unwrap_err(),
		ObjectModelError::ObjectModelShutDown
	);
	assert!(matches!(
		model.lookup("Widget", "IText"),
		Err(ObjectModelError::ObjectModelShutDown)
	));
	assert_eq!(model.teardown(), TeardownReport::default());
}

#[test]
fn test_registry_handle_refuses_registrations_after_teardown() {
	let journal = Journal::default();
	let model = ObjectModel::isolated();
	let registry_journal = journal.clone();
	model.teardown();

	let late = Factory::infallible::<dyn IText, _, _>(move |_| Text::new("late", &registry_journal));
	assert_eq!(
		model.registry().register(Registration::new("Widget", late)).unwrap_err(),
		ObjectModelError::ObjectModelShutDown
	);
	assert_eq!(
		model
			.registry()
			.register_class(BossDescription::new("Widget"), RegistrationSource::Runtime, false)
			.unwrap_err(),
		ObjectModelError::ObjectModelShutDown
	);
	assert!(model.registry().is_empty());
	assert!(journal.events().is_empty());
}

#[test]
fn test_bosses_alive_at_teardown_are_reported_and_frozen() {
	let journal = Journal::default();
	let model = ObjectModel::isolated();
	register_widget(&model, "Widget", &journal);
	let boss = model.create_boss_with("Widget", ["IText"]).unwrap();

	let report = model.teardown();

	assert_eq!(report.leaked.len(), 1);
	assert_eq!(report.leaked[0].id, boss.id());
	assert_eq!(text_of(&boss), "hello");
	assert_eq!(
		boss.add_implementation("IGeometry").unwrap_err(),
		ObjectModelError::ObjectModelShutDown
	);

	drop(boss);
	assert_eq!(journal.filtered("drop"), vec!["drop IText"]);
	assert_eq!(model.live_count(), 0);
}

#[test]
fn test_first_operation_initialises() {
	let model = ObjectModel::uninitialized(ObjectModelConfig::isolated());
	assert_eq!(model.state(), ModelState::Uninitialized);

	let journal = Journal::default();
	register_widget(&model, "Widget", &journal);

	assert_eq!(model.state(), ModelState::Active);
	assert_eq!(model.registry().len(), 3);
}

#[test]
fn test_create_boss_requires_description() {
	let journal = Journal::default();
	let model = ObjectModel::isolated();
	register_widget(&model, "Widget", &journal);

	assert_eq!(
		model.create_boss("Widget").unwrap_err(),
		ObjectModelError::UnknownBoss {
			boss: BossName::from_static("Widget"),
		}
	);

	model
		.register_boss(BossDescription::new("Widget").with("IText").with("IGeometry"))
		.unwrap();
	let boss = model.create_boss("Widget").unwrap();
	assert_eq!(boss.capabilities().len(), 2);

	assert!(model.unregister_boss("Widget").unwrap());
	assert!(model.unregister_implementation("Widget", "IText").unwrap());
	assert!(!model.unregister_implementation("Widget", "IText").unwrap());
	// Existing bosses keep what they were built with.
	assert_eq!(text_of(&boss), "hello");
}

#[test]
fn test_dump_lists_live_bosses_in_creation_order() {
	let journal = Journal::default();
	let model = ObjectModel::isolated();
	register_widget(&model, "Widget", &journal);
	let first = model.create_boss_with("Widget", ["IText", "IGeometry"]).unwrap();
	let second = model.create_boss_with("Widget", ["IDraw"]).unwrap();
	let gone = model.create_boss_with("Widget", ["IText"]).unwrap();
	drop(gone);

	let mut lines: Vec<String> = Vec::new();
	let count = model.dump_bosses(&mut lines);

	assert_eq!(count, 2);
	assert_eq!(
		lines,
		vec![
			"2 live boss(es)".to_owned(),
			format!("  {} Widget [IText, IGeometry]", first.id()),
			format!("  {} Widget [IDraw]", second.id()),
		]
	);

	let mut text = String::new();
	model.dump_bosses(&mut text);
	assert_eq!(text.lines().count(), 3);
	assert_eq!(model.dump_bosses(&mut TracingSink), 2);
}

#[test]
fn test_summaries_record_aggregation_and_lazy() {
	let journal = Journal::default();
	let model = ObjectModel::isolated();
	register_widget(&model, "Widget", &journal);
	model
		.register_boss(BossDescription::new("Widget").with("IText").with_lazy("IDraw"))
		.unwrap();
	let outer = model.create_boss("Widget").unwrap();
	let inner = model.create_boss_with("Widget", ["IGeometry"]).unwrap();
	outer.aggregate(inner.clone()).unwrap();

	let summaries = model.live_bosses();

	assert_eq!(
		summaries,
		vec![
			BossSummary {
				id: outer.id(),
				name: BossName::from_static("Widget"),
				capabilities: vec![CapabilityId::from_static("IText")],
				pending: vec![CapabilityId::from_static("IDraw")],
				outer: None,
			},
			BossSummary {
				id: inner.id(),
				name: BossName::from_static("Widget"),
				capabilities: vec![CapabilityId::from_static("IGeometry")],
				pending: Vec::new(),
				outer: Some(outer.id()),
			},
		]
	);
	assert_eq!(
		summaries[1].to_string(),
		format!("{} Widget [IGeometry] in {}", inner.id(), outer.id())
	);
}

#[test]
fn test_plugin_load_and_double_load() {
	let journal = Journal::default();
	let model = ObjectModel::isolated();
	let plugin = ShapesPlugin {
		name: "shapes",
		clash: false,
		journal: journal.clone(),
	};

	assert_eq!(model.load_plugin(&plugin).unwrap(), 2);
	assert_eq!(
		model.loaded_plugins(),
		vec![PluginInfo {
			name: "shapes".to_owned(),
			origin: PluginOrigin::Dynamic,
			registrations: 2,
		}]
	);
	let shape = model.create_boss("Shape").unwrap();
	assert_eq!(shape.query::<dyn IGeometry>().unwrap().unwrap().read().area(), 25);
	assert_eq!(
		shape.query_unknown("IGeometry").unwrap().unwrap().source(),
		&RegistrationSource::plugin("shapes")
	);

	assert_eq!(
		model.load_plugin(&plugin).unwrap_err(),
		ObjectModelError::PluginAlreadyLoaded {
			plugin: "shapes".to_owned(),
		}
	);
}

/// A plugin whose registration fails leaves no trace behind.
#[test]
fn test_plugin_load_rolls_back_on_duplicate() {
	let journal = Journal::default();
	let model = ObjectModel::isolated();
	register_widget(&model, "Widget", &journal);
	let before = model.registry().len();

	let err = model
		.load_plugin(&ShapesPlugin {
			name: "shapes",
			clash: true,
			journal: journal.clone(),
		})
		.unwrap_err();

	assert!(matches!(err, ObjectModelError::DuplicateRegistration { .. }));
	assert!(err.is_recoverable());
	assert_eq!(model.registry().len(), before);
	assert!(!model.registry().contains("Shape", "IGeometry"));
	assert_eq!(model.registry().class("Shape"), None);
	assert!(model.loaded_plugins().is_empty());

	// The name is free again.
	model
		.load_plugin(&ShapesPlugin {
			name: "shapes",
			clash: false,
			journal,
		})
		.unwrap();
}

#[test]
fn test_unload_restores_overridden_factory_and_reports_dependents() {
	let journal = Journal::default();
	let model = ObjectModel::isolated();
	register_widget(&model, "Widget", &journal);
	model
		.load_plugin(&PatchPlugin {
			journal: journal.clone(),
		})
		.unwrap();

	let patched = model.create_boss_with("Widget", ["IText", "IGeometry"]).unwrap();
	let untouched = model.create_boss_with("Widget", ["IGeometry"]).unwrap();
	assert_eq!(text_of(&patched), "patched");

	let report = model.unload_plugin("patch").unwrap();

	assert_eq!(report.plugin, "patch");
	assert_eq!(report.removed, 1);
	assert_eq!(report.live_bosses.len(), 1);
	assert_eq!(report.live_bosses[0].id, patched.id());
	assert!(model.loaded_plugins().is_empty());

	let fresh = model.create_boss_with("Widget", ["IText"]).unwrap();
	assert_eq!(text_of(&fresh), "hello");
	assert_eq!(text_of(&patched), "patched");
	drop(untouched);

	assert_eq!(
		model.unload_plugin("patch").unwrap_err(),
		ObjectModelError::UnknownPlugin {
			plugin: "patch".to_owned(),
		}
	);
}

#[test]
fn test_static_registrations_load_on_initialisation() {
	init_tracing();
	let model = ObjectModel::new(ObjectModelConfig::default()).unwrap();

	assert_eq!(
		model.registry().resolve("StaticWidget", "IText").unwrap().source,
		RegistrationSource::Crate(env!("CARGO_PKG_NAME"))
	);
	assert_eq!(
		model.registry().resolve("StaticWidget", "IDraw").unwrap().source,
		RegistrationSource::plugin("static-drawing")
	);

	let boss = model.create_boss("StaticWidget").unwrap();
	assert_eq!(boss.lazy_capabilities(), vec![CapabilityId::from_static("IGeometry")]);
	assert_eq!(boss.query::<dyn IGeometry>().unwrap().unwrap().read().area(), 4);
	boss.add_implementation("IDraw").unwrap();
	assert_eq!(boss.query::<dyn IDraw>().unwrap().unwrap().read().draw().unwrap(), "<static>");

	assert_eq!(
		model.loaded_plugins(),
		vec![PluginInfo {
			name: "static-drawing".to_owned(),
			origin: PluginOrigin::Static,
			registrations: 1,
		}]
	);
	assert_eq!(
		model.unload_plugin("static-drawing").unwrap_err(),
		ObjectModelError::StaticPlugin {
			plugin: "static-drawing".to_owned(),
		}
	);
}

#[test]
fn test_concurrent_initialisation_runs_once() {
	let model = ObjectModel::uninitialized(ObjectModelConfig::default());

	let handles: Vec<_> = (0..8)
		.map(|_| {
			let model = model.clone();
			thread::spawn(move || model.initialize())
		})
		.collect();
	for handle in handles {
		handle.join().unwrap().unwrap();
	}

	assert_eq!(model.state(), ModelState::Active);
	assert_eq!(model.loaded_plugins().len(), 1);
	assert!(model.registry().contains("StaticWidget", "IDraw"));
}

#[test]
fn test_isolated_instances_do_not_share_state() {
	let journal = Journal::default();
	let a = ObjectModel::isolated();
	let b = ObjectModel::isolated();
	register_widget(&a, "Widget", &journal);

	assert!(!ObjectModel::ptr_eq(&a, &b));
	assert!(matches!(
		b.create_boss_with("Widget", ["IText"]),
		Err(ObjectModelError::UnknownCapability { .. })
	));
	let boss = a.create_boss_with("Widget", ["IText"]).unwrap();
	assert_eq!(a.live_count(), 1);
	assert_eq!(b.live_count(), 0);
	drop(boss);
}
