//! File backend: one `<key>.dump` file per snapshot.

use crate::{StorageError, StorageInterface};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

pub struct FileStorage {
	snapshot_dir: PathBuf,
}

fn backend_error(path: &Path, e: std::io::Error) -> StorageError {
	StorageError::Backend(format!("{}: {}", path.display(), e))
}

impl FileStorage {
	pub fn new(snapshot_dir: PathBuf) -> Self {
		Self { snapshot_dir }
	}

	/// Snapshot file of a model key. Path separators and drive colons in the
	/// key become underscores.
	pub fn snapshot_path(&self, key: &str) -> PathBuf {
		let file_name: String = key
			.chars()
			.map(|c| if matches!(c, '/' | '\\' | ':') { '_' } else { c })
			.collect();
		self.snapshot_dir.join(format!("{}.dump", file_name))
	}

	/// `<key>.dump.part`, renamed onto the snapshot once fully written.
	fn partial_path(snapshot: &Path) -> PathBuf {
		let mut name = snapshot.as_os_str().to_os_string();
		name.push(".part");
		PathBuf::from(name)
	}
}

#[async_trait]
impl StorageInterface for FileStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		let path = self.snapshot_path(key);
		fs::read(&path).await.map_err(|e| match e.kind() {
			ErrorKind::NotFound => StorageError::NotFound,
			_ => backend_error(&path, e),
		})
	}

	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
		fs::create_dir_all(&self.snapshot_dir)
			.await
			.map_err(|e| backend_error(&self.snapshot_dir, e))?;

		let path = self.snapshot_path(key);
		let partial = Self::partial_path(&path);
		if let Err(e) = fs::write(&partial, value).await {
			let _ = fs::remove_file(&partial).await;
			return Err(backend_error(&partial, e));
		}
		fs::rename(&partial, &path)
			.await
			.map_err(|e| backend_error(&path, e))
	}

	async fn delete(&self, key: &str) -> Result<(), StorageError> {
		let path = self.snapshot_path(key);
		match fs::remove_file(&path).await {
			Err(e) if e.kind() != ErrorKind::NotFound => Err(backend_error(&path, e)),
			_ => Ok(()),
		}
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		let path = self.snapshot_path(key);
		fs::try_exists(&path).await.map_err(|e| backend_error(&path, e))
	}
}
