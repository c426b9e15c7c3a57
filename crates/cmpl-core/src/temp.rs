//! Temporary files of one job.

use std::path::{Path, PathBuf};
use tracing::warn;
use uuid::Uuid;

/// Files sharing the prefix `<work_dir>/<stem>_cmpl__<id>`.
///
/// The id is unique per job, so two jobs never share a file name.
#[derive(Debug)]
pub struct TempFiles {
	prefix: PathBuf,
	created: Vec<PathBuf>,
}

impl TempFiles {
	pub fn new(work_dir: &Path, stem: &str) -> Self {
		let id = Uuid::new_v4().simple().to_string();
		Self {
			prefix: work_dir.join(format!("{}_cmpl__{}", stem, &id[..12])),
			created: Vec::new(),
		}
	}

	pub fn prefix(&self) -> &Path {
		&self.prefix
	}

	/// Path `<prefix>.<extension>`, registered for removal.
	pub fn path(&mut self, extension: &str) -> PathBuf {
		let mut name = self.prefix.as_os_str().to_owned();
		name.push(".");
		name.push(extension);
		let path = PathBuf::from(name);
		if !self.created.contains(&path) {
			self.created.push(path.clone());
		}
		path
	}

	/// Removes every registered file that exists.
	pub fn remove_all(&mut self) {
		for path in self.created.drain(..) {
			match std::fs::remove_file(&path) {
				Ok(()) => {}
				Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
				Err(e) => warn!(path = %path.display(), "cannot remove temporary file: {}", e),
			}
		}
	}
}
