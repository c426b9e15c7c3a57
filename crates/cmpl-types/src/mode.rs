//! Addressing mode of a job.
//!
//! A job either talks to a worker server directly or reaches one through a
//! grid scheduler. Failover is expressed as transitions over [`ServerMode`]
//! instead of mutating loose URL fields.

use serde::{Deserialize, Serialize};

/// Where the remote side of a job lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ServerMode {
	/// No endpoint bound yet.
	Unbound,
	/// Talking to a CmplServer directly.
	Standalone { url: String },
	/// Reached through a CmplGridScheduler.
	///
	/// `worker_url` is `None` while the scheduler has not assigned a server
	/// (or after the assigned server failed).
	Grid {
		scheduler_url: String,
		worker_url: Option<String>,
	},
}

impl ServerMode {
	/// URL every job-scoped call is addressed to.
	///
	/// In grid mode this is the worker once assigned, the scheduler before.
	pub fn target_url(&self) -> Option<&str> {
		match self {
			Self::Unbound => None,
			Self::Standalone { url } => Some(url),
			Self::Grid {
				scheduler_url,
				worker_url,
			} => Some(worker_url.as_deref().unwrap_or(scheduler_url)),
		}
	}

	pub fn is_grid(&self) -> bool {
		matches!(self, Self::Grid { .. })
	}

	/// True while a grid job still waits for a worker assignment.
	pub fn awaiting_worker(&self) -> bool {
		matches!(
			self,
			Self::Grid {
				worker_url: None,
				..
			}
		)
	}

	/// Scheduler URL, if the job was routed through one.
	pub fn scheduler_url(&self) -> Option<&str> {
		match self {
			Self::Grid { scheduler_url, .. } => Some(scheduler_url),
			_ => None,
		}
	}

	/// Worker URL assigned by a scheduler, if any.
	pub fn worker_url(&self) -> Option<&str> {
		match self {
			Self::Grid { worker_url, .. } => worker_url.as_deref(),
			_ => None,
		}
	}

	/// Binds a worker assigned by the scheduler.
	///
	/// The URL the job was connected to becomes the scheduler URL, so a
	/// standalone binding that turned out to be a scheduler is promoted.
	pub fn assign_worker(self, worker: impl Into<String>) -> Self {
		let scheduler_url = match self {
			Self::Grid { scheduler_url, .. } => scheduler_url,
			Self::Standalone { url } => url,
			Self::Unbound => String::new(),
		};
		Self::Grid {
			scheduler_url,
			worker_url: Some(worker.into()),
		}
	}

	/// Drops the worker binding after a worker failure.
	///
	/// Returns the new mode (targeting the scheduler again) together with the
	/// URL of the worker that failed.
	pub fn release_worker(self) -> (Self, Option<String>) {
		match self {
			Self::Grid {
				scheduler_url,
				worker_url,
			} => (
				Self::Grid {
					scheduler_url,
					worker_url: None,
				},
				worker_url,
			),
			other => (other, None),
		}
	}
}

impl Default for ServerMode {
	fn default() -> Self {
		Self::Unbound
	}
}

impl std::fmt::Display for ServerMode {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Unbound => write!(f, "unbound"),
			Self::Standalone { url } => write!(f, "standalone({})", url),
			Self::Grid {
				scheduler_url,
				worker_url: Some(worker),
			} => write!(f, "grid({} -> {})", scheduler_url, worker),
			Self::Grid { scheduler_url, .. } => write!(f, "grid({})", scheduler_url),
		}
	}
}
