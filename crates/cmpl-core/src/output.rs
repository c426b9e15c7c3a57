//! Destinations for solver and server output text.
//!
//! This is the text a user watches while a model is solved, not logging.

use std::sync::Mutex;

pub trait OutputSink: Send + Sync {
	fn write(&self, text: &str);
}

/// Trims `text` and prefixes every line with `lead`.
///
/// Returns `None` for blank text.
pub fn with_lead(lead: &str, text: &str) -> Option<String> {
	let text = text.trim();
	if text.is_empty() {
		return None;
	}
	let separator = format!("\n{}", lead);
	Some(format!("{}{}", lead, text.replace('\n', &separator)))
}

/// Prints to stdout.
pub struct ConsoleOutput {
	lead: String,
}

impl ConsoleOutput {
	pub fn new(lead: impl Into<String>) -> Self {
		Self { lead: lead.into() }
	}

	/// Lead of the form `"<stem>> "`.
	pub fn for_model(stem: &str) -> Self {
		Self::new(format!("{}> ", stem))
	}
}

impl OutputSink for ConsoleOutput {
	fn write(&self, text: &str) {
		if let Some(text) = with_lead(&self.lead, text) {
			println!("{}", text);
		}
	}
}

pub struct SilentOutput;

impl OutputSink for SilentOutput {
	fn write(&self, _text: &str) {}
}

/// Keeps the output in memory.
#[derive(Default)]
pub struct CapturedOutput {
	lead: String,
	lines: Mutex<Vec<String>>,
}

impl CapturedOutput {
	pub fn new(lead: impl Into<String>) -> Self {
		Self {
			lead: lead.into(),
			lines: Mutex::new(Vec::new()),
		}
	}

	pub fn lines(&self) -> Vec<String> {
		self.lines.lock().map(|l| l.clone()).unwrap_or_default()
	}

	pub fn text(&self) -> String {
		self.lines().join("\n")
	}
}

impl OutputSink for CapturedOutput {
	fn write(&self, text: &str) {
		let Some(text) = with_lead(&self.lead, text) else {
			return;
		};
		if let Ok(mut lines) = self.lines.lock() {
			lines.extend(text.lines().map(str::to_string));
		}
	}
}
