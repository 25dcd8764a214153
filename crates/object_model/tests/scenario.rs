#![allow(unused_crate_dependencies)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use whisper_object_model::{
	BossDescription, ObjectModel, ObjectModelError, Unknown, capability, implementation,
};

pub trait IText: Unknown {
	fn text(&self) -> &str;
}
capability!(IText);

pub trait IGeometry: Unknown {
	fn bounds(&self) -> (u32, u32);
}
capability!(IGeometry);

pub trait IDraw: Unknown {
	fn draw(&self);
}
capability!(IDraw);

type Log = Arc<Mutex<Vec<&'static str>>>;

struct Label {
	log: Log,
}

impl Unknown for Label {}

impl Drop for Label {
	fn drop(&mut self) {
		self.log.lock().push("IText");
	}
}

impl IText for Label {
	fn text(&self) -> &str {
		"label"
	}
}

implementation!(Label: IText);

struct Frame {
	log: Log,
}

impl Unknown for Frame {}

impl Drop for Frame {
	fn drop(&mut self) {
		self.log.lock().push("IGeometry");
	}
}

impl IGeometry for Frame {
	fn bounds(&self) -> (u32, u32) {
		(640, 480)
	}
}

implementation!(Frame: IGeometry);

#[test]
fn widget_scenario() {
	let _ = tracing_subscriber::fmt::try_init();
	let model = ObjectModel::isolated();
	let log: Log = Arc::default();

	let l = log.clone();
	model
		.register_implementation::<dyn IText, _, _>("Widget", move |_| Ok(Label { log: l.clone() }))
		.unwrap();
	let l = log.clone();
	model
		.register_implementation::<dyn IGeometry, _, _>("Widget", move |_| Ok(Frame { log: l.clone() }))
		.unwrap();
	model
		.register_boss(BossDescription::new("Widget").with("IText").with("IGeometry"))
		.unwrap();

	let widget = model
		.create_boss_with("Widget", ["IText", "IGeometry"])
		.unwrap();

	let geometry = widget.query::<dyn IGeometry>().unwrap();
	assert_eq!(geometry.as_ref().map(|g| g.read().bounds()), Some((640, 480)));
	assert!(widget.query::<dyn IDraw>().unwrap().is_none());
	assert_eq!(widget.query::<dyn IText>().unwrap().unwrap().read().text(), "label");
	drop(geometry);

	widget.release();

	assert_eq!(*log.lock(), vec!["IGeometry", "IText"]);
	assert_eq!(model.live_count(), 0);
}

pub trait IProbe: Unknown {
	fn touch(&self);
}
capability!(IProbe);

struct Sentinel {
	alive: AtomicBool,
	drops: Arc<AtomicUsize>,
}

impl Sentinel {
	fn new(drops: &Arc<AtomicUsize>) -> Self {
		Self {
			alive: AtomicBool::new(true),
			drops: drops.clone(),
		}
	}
}

impl Unknown for Sentinel {}

impl Drop for Sentinel {
	fn drop(&mut self) {
		self.alive.store(false, Ordering::SeqCst);
		self.drops.fetch_add(1, Ordering::SeqCst);
	}
}

impl IProbe for Sentinel {
	fn touch(&self) {
		assert!(self.alive.load(Ordering::SeqCst), "touched after destruction");
	}
}

implementation!(Sentinel: IProbe);

/// Concurrent add-ref/release from many threads destroys the boss exactly
/// once, and only after the last reference is gone.
#[test]
fn concurrent_release_destroys_once() {
	const THREADS: usize = 8;
	const ROUNDS: usize = 500;

	let model = ObjectModel::isolated();
	let drops = Arc::new(AtomicUsize::new(0));
	let counter = drops.clone();
	model
		.register_implementation::<dyn IProbe, _, _>("Probe", move |_| Ok(Sentinel::new(&counter)))
		.unwrap();

	let boss = model.create_boss_with("Probe", ["IProbe"]).unwrap();
	let barrier = Arc::new(Barrier::new(THREADS));

	let handles: Vec<_> = (0..THREADS)
		.map(|_| {
			let boss = boss.add_ref();
			let barrier = barrier.clone();
			thread::spawn(move || {
				barrier.wait();
				for _ in 0..ROUNDS {
					let extra = boss.add_ref();
					let probe = extra.query::<dyn IProbe>().unwrap().unwrap();
					probe.read().touch();
					extra.release();
					drop(probe);
				}
				boss.release();
			})
		})
		.collect();
	for handle in handles {
		handle.join().unwrap();
	}

	assert_eq!(drops.load(Ordering::SeqCst), 0);
	assert_eq!(boss.ref_count(), 1);
	boss.query::<dyn IProbe>().unwrap().unwrap().read().touch();

	boss.release();
	assert_eq!(drops.load(Ordering::SeqCst), 1);
	assert_eq!(model.live_count(), 0);
}

/// The last release may happen on any thread; destruction still runs once.
#[test]
fn last_release_from_worker_threads() {
	let model = ObjectModel::isolated();
	let drops = Arc::new(AtomicUsize::new(0));
	let counter = drops.clone();
	model
		.register_implementation::<dyn IProbe, _, _>("Probe", move |_| Ok(Sentinel::new(&counter)))
		.unwrap();

	for _ in 0..50 {
		let boss = model.create_boss_with("Probe", ["IProbe"]).unwrap();
		let probe = boss.query::<dyn IProbe>().unwrap().unwrap();
		let workers: Vec<_> = (0..4)
			.map(|_| {
				let probe = probe.clone();
				thread::spawn(move || {
					probe.read().touch();
				})
			})
			.collect();
		drop(probe);
		drop(boss);
		for worker in workers {
			worker.join().unwrap();
		}
	}

	assert_eq!(drops.load(Ordering::SeqCst), 50);
	assert_eq!(model.live_count(), 0);
}

#[test]
fn construction_during_shutdown_is_rejected_across_threads() {
	let model = ObjectModel::isolated();
	let drops = Arc::new(AtomicUsize::new(0));
	let counter = drops.clone();
	model
		.register_implementation::<dyn IProbe, _, _>("Probe", move |_| Ok(Sentinel::new(&counter)))
		.unwrap();

	model.teardown();

	let worker = {
		let model = model.clone();
		thread::spawn(move || model.create_boss_with("Probe", ["IProbe"]).map(drop))
	};
	assert_eq!(worker.join().unwrap(), Err(ObjectModelError::ObjectModelShutDown));
}
