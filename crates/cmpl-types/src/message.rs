use serde::{Deserialize, Serialize};

/// One structured message produced while compiling or solving a model.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MessageRecord {
	/// Severity, e.g. `error` or `warning`.
	pub kind: String,
	/// Compiler module that raised the message.
	pub module: String,
	/// Source location inside the model.
	pub location: String,
	pub description: String,
}

impl MessageRecord {
	pub fn new(
		kind: impl Into<String>,
		module: impl Into<String>,
		location: impl Into<String>,
		description: impl Into<String>,
	) -> Self {
		Self {
			kind: kind.into(),
			module: module.into(),
			location: location.into(),
			description: description.into(),
		}
	}
}

impl std::fmt::Display for MessageRecord {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(
			f,
			"{} in module <{}> at location <{}> {}",
			self.kind, self.module, self.location, self.description
		)
	}
}
