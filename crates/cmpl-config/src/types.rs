//! Configuration types for the CMPL client.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Complete client configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct CmplConfig {
	/// Remote endpoint and retry policy
	pub server: ServerConfig,
	/// Local toolchain settings
	pub local: LocalConfig,
	/// Console output of solver and server text
	pub output: OutputConfig,
	/// Job snapshot location
	pub storage: StorageConfig,
}

/// Remote endpoint settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
	/// CmplServer or CmplGridScheduler URL
	pub url: Option<String>,
	/// Scheduler used when no server URL is configured
	pub scheduler_url: Option<String>,
	/// Maximum number of failed accesses to a server
	pub max_tries: u32,
	/// Maximum time a job may wait in a server or scheduler queue
	pub max_queuing_time_secs: u64,
	/// Delay between two status polls
	pub refresh_interval_ms: u64,
	/// HTTP request timeout for a single remote call
	pub request_timeout_secs: u64,
	/// Protocol compatibility level announced on connect
	pub compatibility: u32,
}

impl Default for ServerConfig {
	fn default() -> Self {
		Self {
			url: None,
			scheduler_url: None,
			max_tries: 10,
			max_queuing_time_secs: 300,
			refresh_interval_ms: 100,
			request_timeout_secs: 30,
			compatibility: 2,
		}
	}
}

/// Local toolchain settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LocalConfig {
	/// CMPL installation directory; the binary lives in `<cmpl_home>/bin`
	pub cmpl_home: Option<PathBuf>,
	/// Solver used until precompilation reports another one
	pub solver: String,
	/// Directory for precompiled artifacts
	pub work_dir: Option<PathBuf>,
	/// Keep artifacts and pause before cleanup
	pub debug: bool,
}

impl Default for LocalConfig {
	fn default() -> Self {
		Self {
			cmpl_home: None,
			solver: "cbc".to_string(),
			work_dir: None,
			debug: false,
		}
	}
}

impl LocalConfig {
	/// Directory for precompiled artifacts, defaulting to the system temp dir.
	pub fn work_dir(&self) -> PathBuf {
		self.work_dir.clone().unwrap_or_else(std::env::temp_dir)
	}
}

/// Output settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
	/// Forward solver and server output to the console
	pub print_output: bool,
	/// Prefix for each forwarded line; defaults to `"<model stem>> "`
	pub lead: Option<String>,
	/// Default tracing filter
	pub log_level: String,
}

impl Default for OutputConfig {
	fn default() -> Self {
		Self {
			print_output: true,
			lead: None,
			log_level: "info".to_string(),
		}
	}
}

/// Snapshot storage settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
	pub snapshot_dir: Option<PathBuf>,
}

impl StorageConfig {
	pub fn snapshot_dir(&self) -> PathBuf {
		self.snapshot_dir.clone().unwrap_or_else(std::env::temp_dir)
	}
}

/// Per-job retry and timing settings.
///
/// Every job carries its own copy; nothing here is shared between jobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSettings {
	pub max_tries: u32,
	pub max_queuing_time: Duration,
	pub refresh_interval: Duration,
	pub compatibility: u32,
	pub solver: String,
	pub debug: bool,
}

impl Default for JobSettings {
	fn default() -> Self {
		CmplConfig::default().job_settings()
	}
}

impl CmplConfig {
	/// Derives the settings handed to a new job.
	pub fn job_settings(&self) -> JobSettings {
		JobSettings {
			max_tries: self.server.max_tries,
			max_queuing_time: Duration::from_secs(self.server.max_queuing_time_secs),
			refresh_interval: Duration::from_millis(self.server.refresh_interval_ms),
			compatibility: self.server.compatibility,
			solver: self.local.solver.clone(),
			debug: self.local.debug,
		}
	}

	/// URL a job connects to when none is given explicitly.
	pub fn connect_url(&self) -> Option<&str> {
		self.server
			.url
			.as_deref()
			.or(self.server.scheduler_url.as_deref())
	}

	/// Location of the `cmpl` binary, if a CMPL home is known.
	pub fn cmpl_binary(&self) -> Option<PathBuf> {
		let home = self.local.cmpl_home.as_ref()?;
		let name = if cfg!(windows) { "cmpl.exe" } else { "cmpl" };
		Some(home.join("bin").join(name))
	}
}
