use serde::{Deserialize, Serialize};

/// A file shipped inside a submission, stored under its alias.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemFile {
	pub name: String,
	pub content: String,
}

/// The payload of one `send`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SubmissionBundle {
	/// Model file name, without directories.
	pub name: String,
	pub job_id: String,
	/// Whether the server still has to precompile the model.
	pub pre_comp: bool,
	/// Raw option strings in insertion order.
	pub options: Vec<String>,
	/// Files in insertion order, unique by alias.
	pub files: Vec<ProblemFile>,
}

impl SubmissionBundle {
	pub fn new(name: impl Into<String>, job_id: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			job_id: job_id.into(),
			..Default::default()
		}
	}

	/// Adds a file, replacing the content of an existing file with the same alias
	/// while keeping its position.
	pub fn insert_file(&mut self, name: impl Into<String>, content: impl Into<String>) {
		let name = name.into();
		let content = content.into();
		match self.files.iter_mut().find(|f| f.name == name) {
			Some(existing) => existing.content = content,
			None => self.files.push(ProblemFile { name, content }),
		}
	}

	pub fn file(&self, name: &str) -> Option<&str> {
		self.files
			.iter()
			.find(|f| f.name == name)
			.map(|f| f.content.as_str())
	}

	pub fn push_option(&mut self, option: impl Into<String>) {
		self.options.push(option.into());
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_insert_file_keeps_position_on_replace() {
		let mut bundle = SubmissionBundle::new("diet.cmpl", "job-1");
		bundle.insert_file("diet.optcmpl", "a");
		bundle.insert_file("diet.cdat", "old");
		bundle.insert_file("diet.optcmpl", "b");

		assert_eq!(bundle.files.len(), 2);
		assert_eq!(bundle.files[0].name, "diet.optcmpl");
		assert_eq!(bundle.file("diet.optcmpl"), Some("b"));
		assert_eq!(bundle.file("missing"), None);
	}
}
