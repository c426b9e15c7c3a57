//! Subcommand handlers.
//!
//! `send`, `knock`, `retrieve` and `cancel` may run in separate processes;
//! the job is carried between them as a snapshot in the configured snapshot
//! directory.

use crate::cli::JobArgs;
use anyhow::{Context, Result};
use cmpl_config::{CmplConfig, ConfigLoader};
use cmpl_core::snapshot;
use cmpl_core::JobEngine;
use cmpl_results::JobResults;
use cmpl_storage::SnapshotStore;
use cmpl_types::{CmplError, RemoteStatus};
use std::path::Path;
use tracing::info;

/// Applies the command line overrides of one job to the loaded config.
pub fn job_config(mut config: CmplConfig, args: &JobArgs) -> Result<CmplConfig> {
	if args.local {
		config.server.url = None;
		config.server.scheduler_url = None;
	}
	if let Some(url) = &args.url {
		config.server.url = Some(url.clone());
	}
	if let Some(max_tries) = args.max_tries {
		config.server.max_tries = max_tries;
	}
	if let Some(max_time) = args.max_time {
		config.server.max_queuing_time_secs = max_time;
	}
	ConfigLoader::validate_config(&config)?;
	Ok(config)
}

fn build_engine(config: &CmplConfig, args: &JobArgs) -> Result<JobEngine> {
	let mut engine = JobEngine::builder(&args.model)
		.with_config(config)
		.build()
		.context("Failed to set up the job")?;
	engine.set_options(args.options.iter().cloned());
	Ok(engine)
}

async fn resume(config: &CmplConfig, args: &JobArgs, store: &SnapshotStore) -> Result<JobEngine> {
	let snapshot = snapshot::restore(store, &args.model).await?;
	let engine = JobEngine::builder(&args.model)
		.with_config(config)
		.resume(snapshot)
		.context("Failed to resume the job")?;
	Ok(engine)
}

pub async fn solve(config: CmplConfig, args: JobArgs) -> Result<()> {
	let mut engine = build_engine(&config, &args)?;
	let results = engine.solve().await?;
	finish(results, args.cmsg.as_deref()).await
}

pub async fn send(config: CmplConfig, args: JobArgs, store: &SnapshotStore) -> Result<()> {
	let url = config
		.connect_url()
		.map(str::to_string)
		.context("No CmplServer URL, use --url or set server.url")?;
	if snapshot::pending(store, &args.model).await? {
		anyhow::bail!(
			"{:?} was already sent, use knock, retrieve or cancel first",
			args.model
		);
	}

	let mut engine = build_engine(&config, &args)?;
	engine.connect(&url).await?;
	if engine.mode().awaiting_worker() {
		engine.wait_for_worker().await?;
	}
	engine.send().await?;

	info!(job_id = engine.job_id(), status = %engine.status(), "problem sent");
	snapshot::persist(store, &engine.suspend()).await?;
	Ok(())
}

pub async fn knock(config: CmplConfig, args: JobArgs, store: &SnapshotStore) -> Result<()> {
	let mut engine = resume(&config, &args, store).await?;
	engine.knock().await?;

	println!("{}: {}", engine.job_id(), engine.status());
	snapshot::persist(store, &engine.suspend()).await?;
	Ok(())
}

pub async fn retrieve(config: CmplConfig, args: JobArgs, store: &SnapshotStore) -> Result<()> {
	let mut engine = resume(&config, &args, store).await?;

	let outcome = engine.retrieve().await.map(|_| ());
	if let Err(e) = outcome {
		let still_running = matches!(e, CmplError::ProtocolState(_))
			&& matches!(engine.status(), RemoteStatus::Running | RemoteStatus::Busy);
		if still_running {
			snapshot::persist(store, &engine.suspend()).await?;
		}
		return Err(e.into());
	}

	let results = engine
		.results()
		.context("No results were retrieved")?;
	finish(results, args.cmsg.as_deref()).await
}

pub async fn cancel(config: CmplConfig, args: JobArgs, store: &SnapshotStore) -> Result<()> {
	let mut engine = resume(&config, &args, store).await?;
	engine.cancel().await?;
	info!(job_id = engine.job_id(), "problem canceled");
	Ok(())
}

pub fn validate(config: &CmplConfig) -> Result<()> {
	ConfigLoader::validate_config(config)?;

	info!("Configuration is valid");
	match config.connect_url() {
		Some(url) => info!("Remote endpoint: {}", url),
		None => info!("No remote endpoint, models are solved locally"),
	}
	match config.cmpl_binary() {
		Some(binary) => info!("CMPL binary: {}", binary.display()),
		None => info!("No CMPL binary configured"),
	}
	info!("Snapshot directory: {}", config.storage.snapshot_dir().display());
	Ok(())
}

async fn finish(results: &JobResults, cmsg: Option<&Path>) -> Result<()> {
	if let Some(path) = cmsg {
		tokio::fs::write(path, results.messages.to_document())
			.await
			.with_context(|| format!("Failed to write message file: {:?}", path))?;
	}
	print_results(results);
	Ok(())
}

fn print_results(results: &JobResults) {
	println!(
		"Cmpl status: {} ({})",
		results.cmpl_status(),
		results.cmpl_status_text()
	);
	let Some(solution) = results.solution() else {
		println!("No solution");
		return;
	};

	let set = &results.solutions;
	println!("Solver: {} ({})", set.solver_name, set.solver_msg);
	println!("Nr. of solutions: {}", results.nr_of_solutions());
	println!("Objective {} ({}): {}", set.objective_name, set.objective_sense, solution.value);
	println!("Status: {}", solution.status);

	println!("Variables:");
	for v in &solution.variables {
		println!("  {:<20} {:>2} {:>14}", v.name, v.kind, v.activity);
	}
	println!("Constraints:");
	for c in &solution.constraints {
		println!("  {:<20} {:>2} {:>14}", c.name, c.kind, c.activity);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::path::PathBuf;

	fn args() -> JobArgs {
		JobArgs {
			model: PathBuf::from("diet.cmpl"),
			url: None,
			max_tries: None,
			max_time: None,
			options: Vec::new(),
			cmsg: None,
			local: false,
		}
	}

	#[test]
	fn test_command_line_overrides() {
		let mut job = args();
		job.url = Some("http://server:8008".into());
		job.max_tries = Some(4);
		job.max_time = Some(60);

		let config = job_config(CmplConfig::default(), &job).unwrap();
		assert_eq!(config.connect_url(), Some("http://server:8008"));
		assert_eq!(config.server.max_tries, 4);
		assert_eq!(config.server.max_queuing_time_secs, 60);
	}

	#[test]
	fn test_local_drops_configured_endpoints() {
		let mut config = CmplConfig::default();
		config.server.scheduler_url = Some("http://scheduler:8008".into());
		let mut job = args();
		job.local = true;

		let config = job_config(config, &job).unwrap();
		assert_eq!(config.connect_url(), None);
	}

	#[test]
	fn test_invalid_override_is_rejected() {
		let mut job = args();
		job.max_tries = Some(0);
		assert!(job_config(CmplConfig::default(), &job).is_err());
	}

	#[tokio::test]
	async fn test_knock_without_snapshot() {
		let dir = tempfile::tempdir().unwrap();
		let store = cmpl_storage::create_storage(dir.path().to_path_buf());

		let err = knock(CmplConfig::default(), args(), &store).await.unwrap_err();
		assert!(err.to_string().starts_with("No CmplServer object exists"));
	}

	#[tokio::test]
	async fn test_send_refuses_pending_job() {
		let dir = tempfile::tempdir().unwrap();
		let store = cmpl_storage::create_storage(dir.path().to_path_buf());
		let mut job = args();
		job.url = Some("http://server:8008".into());

		let mut pending = JobEngine::builder(&job.model)
			.with_url("http://server:8008")
			.with_toolchain(std::sync::Arc::new(cmpl_core::CmplBinary::new("cmpl")))
			.build()
			.unwrap()
			.suspend();
		pending.job.job_id = "job-42".into();
		snapshot::persist(&store, &pending).await.unwrap();

		let config = job_config(CmplConfig::default(), &job).unwrap();
		let err = send(config, job, &store).await.unwrap_err();
		assert!(err.to_string().contains("was already sent"));
		assert!(snapshot::pending(&store, &PathBuf::from("diet.cmpl")).await.unwrap());
	}
}
