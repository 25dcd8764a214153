//! Capabilities and implementations shared by the unit tests.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::{BossLink, ObjectModel, ObjectModelError, Unknown, capability, implementation};

pub trait IText: Unknown {
	fn text(&self) -> String;
	fn set_text(&mut self, text: &str);
}
capability!(IText);

pub trait IGeometry: Unknown {
	fn area(&self) -> u32;
}
capability!(IGeometry);

pub trait IDraw: Unknown {
	fn draw(&self) -> Result<String, ObjectModelError>;
}
capability!(IDraw);

/// Ordered record of hook and drop events.
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
	pub fn push(&self, event: impl Into<String>) {
		self.0.lock().push(event.into());
	}

	pub fn events(&self) -> Vec<String> {
		self.0.lock().clone()
	}

	/// Events whose text starts with `prefix`.
	pub fn filtered(&self, prefix: &str) -> Vec<String> {
		self.0
			.lock()
			.iter()
			.filter(|event| event.starts_with(prefix))
			.cloned()
			.collect()
	}

	pub fn clear(&self) {
		self.0.lock().clear();
	}
}

pub struct Text {
	pub text: String,
	pub journal: Journal,
}

impl Text {
	pub fn new(text: &str, journal: &Journal) -> Self {
		Self {
			text: text.to_owned(),
			journal: journal.clone(),
		}
	}
}

impl Unknown for Text {
	fn on_adopted(&mut self) {
		self.journal.push("adopt IText");
	}

	fn on_detach(&mut self) {
		self.journal.push("detach IText");
	}
}

impl Drop for Text {
	fn drop(&mut self) {
		self.journal.push("drop IText");
	}
}

impl IText for Text {
	fn text(&self) -> String {
		self.text.clone()
	}

	fn set_text(&mut self, text: &str) {
		self.text = text.to_owned();
	}
}

implementation!(Text: IText);

pub struct Geometry {
	pub width: u32,
	pub height: u32,
	pub journal: Journal,
}

impl Unknown for Geometry {
	fn on_detach(&mut self) {
		self.journal.push("detach IGeometry");
	}
}

impl Drop for Geometry {
	fn drop(&mut self) {
		self.journal.push("drop IGeometry");
	}
}

impl IGeometry for Geometry {
	fn area(&self) -> u32 {
		self.width * self.height
	}
}

implementation!(Geometry: IGeometry);

/// Draws its sibling text through the back reference.
pub struct Draw {
	pub link: BossLink,
	pub journal: Journal,
}

impl Unknown for Draw {
	fn on_detach(&mut self) {
		self.journal.push("detach IDraw");
	}
}

impl Drop for Draw {
	fn drop(&mut self) {
		self.journal.push("drop IDraw");
	}
}

impl IDraw for Draw {
	fn draw(&self) -> Result<String, ObjectModelError> {
		let text = self
			.link
			.query::<dyn IText>()?
			.map(|text| text.read().text())
			.unwrap_or_default();
		Ok(format!("<{text}>"))
	}
}

implementation!(Draw: IDraw);

/// Registers `Text`, `Geometry` and `Draw` for boss `name`.
pub fn register_widget(model: &ObjectModel, name: &'static str, journal: &Journal) {
	let j = journal.clone();
	model
		.register_implementation::<dyn IText, _, _>(name, move |_| Ok(Text::new("hello", &j)))
		.unwrap();
	let j = journal.clone();
	model
		.register_implementation::<dyn IGeometry, _, _>(name, move |_| {
			Ok(Geometry {
				width: 3,
				height: 4,
				journal: j.clone(),
			})
		})
		.unwrap();
	let j = journal.clone();
	model
		.register_implementation::<dyn IDraw, _, _>(name, move |ctx| {
			Ok(Draw {
				link: ctx.link().clone(),
				journal: j.clone(),
			})
		})
		.unwrap();
}
