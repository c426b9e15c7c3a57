//! The job record owned by one engine.

use cmpl_instance::ModelData;
use cmpl_types::{CmplError, RemoteStatus, Result, ServerMode};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// CMPL options in insertion order.
///
/// Every option is keyed by the position it got when it was added. Keys are
/// never reused, so deleting one option leaves the keys of the others valid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptionList {
	entries: Vec<(usize, String)>,
	next_key: usize,
}

impl OptionList {
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends an option and returns its key.
	pub fn set_option(&mut self, option: impl Into<String>) -> usize {
		let key = self.next_key;
		self.next_key += 1;
		self.entries.push((key, option.into()));
		key
	}

	/// Replaces all options, returning the new keys.
	pub fn set_options<I, S>(&mut self, options: I) -> Vec<usize>
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.entries.clear();
		options.into_iter().map(|o| self.set_option(o)).collect()
	}

	pub fn del_option(&mut self, key: usize) -> Result<()> {
		let pos = self
			.entries
			.iter()
			.position(|(k, _)| *k == key)
			.ok_or_else(|| CmplError::Validation(format!("{} is not a valid CMPL option", key)))?;
		self.entries.remove(pos);
		Ok(())
	}

	pub fn del_options(&mut self) {
		self.entries.clear();
	}

	pub fn contains(&self, option: &str) -> bool {
		self.entries.iter().any(|(_, o)| o == option)
	}

	pub fn get(&self, key: usize) -> Option<&str> {
		self.entries
			.iter()
			.find(|(k, _)| *k == key)
			.map(|(_, o)| o.as_str())
	}

	pub fn iter(&self) -> impl Iterator<Item = &str> {
		self.entries.iter().map(|(_, o)| o.as_str())
	}

	pub fn to_vec(&self) -> Vec<String> {
		self.iter().map(str::to_string).collect()
	}

	/// Options as command line arguments, each option split on whitespace.
	pub fn to_args(&self) -> Vec<String> {
		self.iter()
			.flat_map(str::split_whitespace)
			.map(str::to_string)
			.collect()
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

/// One optimization problem tracked through its lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
	pub model: PathBuf,
	/// Assigned by the remote side on connect, empty before.
	pub job_id: String,
	pub data: ModelData,
	pub options: OptionList,
	pub status: RemoteStatus,
	pub mode: ServerMode,
	pub solver: String,
	/// URL given to the last connect, either a server or a scheduler.
	pub connect_url: String,
}

impl Job {
	pub fn new(model: impl Into<PathBuf>, solver: impl Into<String>) -> Self {
		Self {
			model: model.into(),
			job_id: String::new(),
			data: ModelData::default(),
			options: OptionList::new(),
			status: RemoteStatus::Unknown,
			mode: ServerMode::Unbound,
			solver: solver.into(),
			connect_url: String::new(),
		}
	}

	/// File name of the model, e.g. `diet.cmpl`.
	pub fn model_name(&self) -> String {
		file_name(&self.model)
	}

	/// Model file name without extension, used for aliases and output lead.
	pub fn stem(&self) -> String {
		self.model
			.file_stem()
			.map(|s| s.to_string_lossy().into_owned())
			.unwrap_or_else(|| self.model_name())
	}
}

fn file_name(path: &Path) -> String {
	path.file_name()
		.map(|n| n.to_string_lossy().into_owned())
		.unwrap_or_default()
}
