//! Snapshot storage for suspended jobs.
//!
//! A job that was sent to a CmplServer can be suspended and picked up again
//! by a later process (send, then knock, then retrieve). This crate stores
//! those snapshots behind a small key-value interface with file and
//! in-memory backends.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;

/// Re-export implementations
pub mod implementations {
	pub mod file;
	pub mod memory;
}

pub use implementations::file::FileStorage;
pub use implementations::memory::MemoryStorage;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
	#[error("Not found")]
	NotFound,
	#[error("Serialization error: {0}")]
	Serialization(String),
	#[error("Backend error: {0}")]
	Backend(String),
}

/// Low-level key-value interface implemented by snapshot backends.
#[async_trait]
pub trait StorageInterface: Send + Sync {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError>;

	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError>;

	/// Deleting a missing key is not an error.
	async fn delete(&self, key: &str) -> Result<(), StorageError>;

	async fn exists(&self, key: &str) -> Result<bool, StorageError>;
}

/// A stored value together with the time it was written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stored<T> {
	pub saved_at: DateTime<Utc>,
	pub value: T,
}

/// Typed snapshot operations over a [`StorageInterface`] backend.
///
/// Values are stored as JSON. A restored snapshot is removed from the
/// backend so that one suspended job is resumed at most once.
pub struct SnapshotStore {
	backend: Box<dyn StorageInterface>,
}

impl SnapshotStore {
	pub fn new(backend: Box<dyn StorageInterface>) -> Self {
		Self { backend }
	}

	pub async fn persist<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StorageError> {
		let stored = Stored {
			saved_at: Utc::now(),
			value,
		};
		let bytes =
			serde_json::to_vec(&stored).map_err(|e| StorageError::Serialization(e.to_string()))?;
		self.backend.set_bytes(key, bytes).await?;
		debug!(key, "snapshot persisted");
		Ok(())
	}

	/// Reads a snapshot without removing it.
	pub async fn peek<T: DeserializeOwned>(&self, key: &str) -> Result<Stored<T>, StorageError> {
		let bytes = self.backend.get_bytes(key).await?;
		serde_json::from_slice(&bytes).map_err(|e| StorageError::Serialization(e.to_string()))
	}

	/// Reads a snapshot and removes it from the backend.
	pub async fn restore<T: DeserializeOwned>(&self, key: &str) -> Result<T, StorageError> {
		let stored = self.peek::<T>(key).await?;
		self.backend.delete(key).await?;
		debug!(key, saved_at = %stored.saved_at, "snapshot restored");
		Ok(stored.value)
	}

	pub async fn contains(&self, key: &str) -> Result<bool, StorageError> {
		self.backend.exists(key).await
	}
}

/// Creates the file backend used by the command-line client.
pub fn create_storage(snapshot_dir: PathBuf) -> SnapshotStore {
	SnapshotStore::new(Box::new(FileStorage::new(snapshot_dir)))
}
