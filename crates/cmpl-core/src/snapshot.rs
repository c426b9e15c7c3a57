//! Suspending a remote job and resuming it in another process.

use crate::engine::{JobEngine, JobEngineBuilder};
use crate::job::Job;
use cmpl_config::JobSettings;
use cmpl_storage::{SnapshotStore, StorageError};
use cmpl_types::{CmplError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Everything needed to reattach to a job that lives on a CmplServer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSnapshot {
	pub job: Job,
	pub settings: JobSettings,
	pub remote: bool,
	pub connected: bool,
}

fn snapshot_key(model: &Path) -> String {
	model
		.file_name()
		.map(|n| n.to_string_lossy().into_owned())
		.unwrap_or_else(|| model.display().to_string())
}

impl JobEngine {
	pub fn snapshot(&self) -> JobSnapshot {
		JobSnapshot {
			job: self.job.clone(),
			settings: self.settings.clone(),
			remote: self.remote,
			connected: self.connected,
		}
	}

	/// Detaches the engine from its remote job without cleaning it up.
	pub fn suspend(mut self) -> JobSnapshot {
		self.detached = true;
		info!(job_id = %self.job.job_id, "job suspended");
		self.snapshot()
	}
}

impl JobEngineBuilder {
	/// Builds an engine bound to the job of a snapshot.
	pub fn resume(self, snapshot: JobSnapshot) -> Result<JobEngine> {
		// a resumed job only needs the binary if it is sent again
		let mut engine = self
			.with_settings(snapshot.settings)
			.with_default_toolchain()
			.build()?;
		engine.job = snapshot.job;
		engine.remote = snapshot.remote;
		engine.connected = snapshot.connected;
		engine.rebind()?;
		info!(job_id = %engine.job.job_id, mode = %engine.job.mode, "job resumed");
		Ok(engine)
	}
}

/// Stores a snapshot under the model file name.
pub async fn persist(store: &SnapshotStore, snapshot: &JobSnapshot) -> Result<()> {
	let key = snapshot_key(&snapshot.job.model);
	store
		.persist(&key, snapshot)
		.await
		.map_err(|e| CmplError::file_access(&key, e))
}

/// Whether a suspended job of `model` is waiting in the store.
pub async fn pending(store: &SnapshotStore, model: &Path) -> Result<bool> {
	let key = snapshot_key(model);
	store
		.contains(&key)
		.await
		.map_err(|e| CmplError::file_access(&key, e))
}

/// Takes the snapshot of `model` out of the store.
pub async fn restore(store: &SnapshotStore, model: &Path) -> Result<JobSnapshot> {
	let key = snapshot_key(model);
	match store.restore(&key).await {
		Ok(snapshot) => Ok(snapshot),
		Err(StorageError::NotFound) => Err(CmplError::protocol(
			"No CmplServer object exists. Please send your problem to a CmplServer before other actions.",
		)),
		Err(e) => Err(CmplError::file_access(&key, e)),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::test_support::*;
	use cmpl_connector::RemoteCall;
	use cmpl_storage::MemoryStorage;
	use cmpl_types::{RemoteStatus, ServerMode};

	const SERVER: &str = "http://server:8008";

	#[tokio::test]
	async fn test_send_then_retrieve_in_another_engine() {
		let fixture = Fixture::new();
		fixture.cluster.on(SERVER, finishing_server(0));
		let store = SnapshotStore::new(Box::new(MemoryStorage::new()));

		let mut engine = fixture.engine();
		engine.connect(SERVER).await.unwrap();
		engine.send().await.unwrap();
		persist(&store, &engine.suspend()).await.unwrap();

		// a suspended job is left on the server
		tokio::task::yield_now().await;
		assert_eq!(fixture.cluster.count(SERVER, "removeProblem"), 0);

		assert!(pending(&store, &fixture.model).await.unwrap());
		let snapshot = restore(&store, &fixture.model).await.unwrap();
		assert_eq!(snapshot.job.job_id, "job-42");
		assert_eq!(snapshot.job.status, RemoteStatus::Running);

		let mut engine = fixture.builder().resume(snapshot).unwrap();
		assert_eq!(
			engine.mode(),
			&ServerMode::Standalone {
				url: SERVER.into()
			}
		);
		let results = engine.retrieve().await.unwrap();
		assert_eq!(results.nr_of_solutions(), 1);
		assert_eq!(fixture.cluster.count(SERVER, "removeProblem"), 1);

		assert!(!pending(&store, &fixture.model).await.unwrap());
		let err = restore(&store, &fixture.model).await.unwrap_err();
		assert!(err.to_string().starts_with("No CmplServer object exists"));
	}

	#[tokio::test]
	async fn test_resume_grid_job_targets_worker() {
		let fixture = Fixture::new();
		fixture.cluster.on("http://worker:8008", |call| match call {
			RemoteCall::Knock { .. } => reply(RemoteStatus::Running, "", "solving"),
			_ => reply(RemoteStatus::Ok, "", ""),
		});

		let mut engine = fixture.engine();
		engine.job.job_id = "grid-7".into();
		engine.job.status = RemoteStatus::Running;
		engine.job.mode = ServerMode::Grid {
			scheduler_url: "http://scheduler:8008".into(),
			worker_url: Some("http://worker:8008".into()),
		};
		engine.remote = true;
		engine.connected = true;
		let snapshot = engine.suspend();

		let mut engine = fixture.builder().resume(snapshot).unwrap();
		engine.knock().await.unwrap();

		assert_eq!(fixture.cluster.methods("http://worker:8008"), vec!["knock"]);
		assert!(engine.scheduler.is_some());
		assert_eq!(engine.status(), RemoteStatus::Running);
	}

	#[tokio::test]
	async fn test_dropping_resumed_failed_job_makes_no_calls() {
		let fixture = Fixture::new();
		fixture.cluster.on(SERVER, standalone_server());

		let mut engine = fixture.engine();
		engine.job.job_id = "job-42".into();
		engine.job.status = RemoteStatus::Failed;
		engine.job.mode = ServerMode::Standalone {
			url: SERVER.into(),
		};
		engine.remote = true;
		engine.connected = true;
		let snapshot = engine.suspend();

		let engine = fixture.builder().resume(snapshot).unwrap();
		assert!(engine.state().is_terminal());
		drop(engine);
		for _ in 0..10 {
			tokio::task::yield_now().await;
		}

		assert!(fixture.cluster.calls().is_empty());
	}
}
