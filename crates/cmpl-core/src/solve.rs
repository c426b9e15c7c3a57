//! One-call solving, remote or local.

use crate::engine::{JobEngine, Route};
use crate::toolchain::solve_args;
use cmpl_connector::RemoteCall;
use cmpl_results::{JobResults, ResultAssembler};
use cmpl_types::{CmplError, RemoteStatus, Result};
use tokio::time::{sleep, Instant};
use tracing::{info, warn};

const QUEUING_TIMEOUT: &str = "maximum CmplServer queuing time is exceeded.";

impl JobEngine {
	/// Solves the model and returns its results.
	///
	/// A job with a URL that is not connected yet is connected first. Without
	/// a URL the model is solved by the local binary.
	pub async fn solve(&mut self) -> Result<&JobResults> {
		self.cleaned = false;

		if !self.remote && !self.job.connect_url.is_empty() {
			let url = self.job.connect_url.clone();
			self.connect(&url).await?;
		}

		if self.remote {
			self.solve_remote().await?;
		} else {
			let outcome = self.run_local().await;
			self.cleanup().await;
			self.results = Some(outcome?);
		}

		self.results
			.as_ref()
			.ok_or_else(|| CmplError::protocol("No Solution found so far"))
	}

	async fn solve_remote(&mut self) -> Result<()> {
		let mut tries = 0;
		loop {
			self.cleaned = false;
			let err = match self.remote_attempt().await {
				Ok(()) => return Ok(()),
				Err(e) => e,
			};

			let worker_failed = self.job.mode.is_grid()
				&& self.job.status == RemoteStatus::Error
				&& self.job.mode.worker_url().is_some();
			if !worker_failed {
				return Err(err);
			}

			self.report_failed_worker().await?;
			tries += 1;
			if tries >= self.settings.max_tries {
				return Err(err);
			}
			warn!(job_id = %self.job.job_id, tries, "retrying on another CmplServer: {}", err);
		}
	}

	async fn remote_attempt(&mut self) -> Result<()> {
		let reconnect = self.job.status == RemoteStatus::Cleaned
			|| (self.job.mode.is_grid() && self.job.status == RemoteStatus::Error);
		if reconnect {
			let url = self
				.job
				.mode
				.scheduler_url()
				.map(str::to_string)
				.unwrap_or_else(|| self.job.connect_url.clone());
			self.connect(&url).await?;
		}

		if self.job.mode.awaiting_worker() {
			self.wait_for_worker().await?;
		}

		self.send().await?;
		self.poll_until_done().await?;
		self.retrieve().await?;
		Ok(())
	}

	/// Tells the scheduler that the assigned server failed and targets the
	/// scheduler again.
	async fn report_failed_worker(&mut self) -> Result<()> {
		let (mode, worker) = std::mem::take(&mut self.job.mode).release_worker();
		self.job.mode = mode;
		let Some(worker_url) = worker else {
			return Ok(());
		};

		let scheduler = self.connector(Route::Scheduler)?;
		let reply = scheduler
			.execute(&RemoteCall::SchedulerFailed {
				worker_url: worker_url.clone(),
			})
			.await
			.map_err(|e| CmplError::remote(format!("CmplGridScheduler failed: {}", e)))?;
		if reply.status.is_error() {
			return Err(CmplError::remote(format!(
				"CmplGridScheduler failed: {}",
				reply.message
			)));
		}

		self.output.write(&format!(
			"CmplServer failed <{}>: Problem will be newly connected to CmplGridScheduler and commited to another CmplServer.",
			worker_url
		));
		self.target = self.scheduler.take();
		Ok(())
	}

	/// Waits until the scheduler assigns a server.
	///
	/// Gives up once the job has been queued longer than the maximum queuing
	/// time, counted from this call.
	pub async fn wait_for_worker(&mut self) -> Result<()> {
		let started = Instant::now();
		while self.job.mode.awaiting_worker() {
			sleep(self.settings.refresh_interval).await;
			self.knock_scheduler().await?;

			if self.job.mode.awaiting_worker() && started.elapsed() >= self.settings.max_queuing_time {
				self.cleanup().await;
				return Err(CmplError::Timeout(QUEUING_TIMEOUT.into()));
			}
		}
		info!(job_id = %self.job.job_id, mode = %self.job.mode, "CmplServer assigned");
		Ok(())
	}

	async fn poll_until_done(&mut self) -> Result<()> {
		let mut busy_since = (self.job.status == RemoteStatus::Busy).then(Instant::now);
		loop {
			self.knock().await?;
			match self.job.status {
				RemoteStatus::Finished | RemoteStatus::Canceled => return Ok(()),
				RemoteStatus::Busy => {
					let since = *busy_since.get_or_insert_with(Instant::now);
					if since.elapsed() >= self.settings.max_queuing_time {
						self.cleanup().await;
						return Err(CmplError::Timeout(QUEUING_TIMEOUT.into()));
					}
				}
				_ => busy_since = None,
			}
			sleep(self.settings.refresh_interval).await;
		}
	}

	async fn run_local(&mut self) -> Result<JobResults> {
		let alias = self.temp.path("cmpl");
		tokio::fs::copy(&self.job.model, &alias)
			.await
			.map_err(|e| CmplError::file_access(&self.job.model, e))?;

		let data_file = self.temp.path("cdat");
		let data = self.job.data.to_cdat()?;
		tokio::fs::write(&data_file, data)
			.await
			.map_err(|e| CmplError::file_access(&data_file, e))?;

		let msg_file = self.temp.path("cmsg");
		let sol_file = self.temp.path("csol");

		let args = solve_args(&alias, &self.job.options.to_args(), &msg_file);
		let messages = self.run_cmpl(&args, &msg_file).await?;

		let solutions = match tokio::fs::read_to_string(&sol_file).await {
			Ok(doc) => doc,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
			Err(e) => return Err(CmplError::file_access(&sol_file, e)),
		};
		ResultAssembler::assemble(messages, &solutions)
	}
}
