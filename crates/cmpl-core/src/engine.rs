//! The job lifecycle state machine.
//!
//! A [`JobEngine`] owns one [`Job`] and every connection used for it. All
//! remote calls go through a [`ServiceConnector`], and every status a reply
//! carries is applied through [`JobEngine::set_status`], which keeps the
//! lifecycle view in step and logs each transition.

use crate::job::Job;
use crate::lifecycle::LifecycleState;
use crate::output::{ConsoleOutput, OutputSink};
use crate::temp::TempFiles;
use crate::toolchain::{precompile_args, CmplBinary, Toolchain};
use cmpl_config::{CmplConfig, JobSettings};
use cmpl_connector::implementations::xmlrpc::create_factory;
use cmpl_connector::{EndpointKind, RemoteCall, ServiceConnector, ServiceFactory};
use cmpl_instance::{document, InstanceBuilder, ModelData, PrecompiledModel};
use cmpl_results::{CmplMessages, JobResults, ResultAssembler};
use cmpl_types::{CmplError, RemoteStatus, Result, ServerMode};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Option added on connect so the server keeps the solution report modules.
pub(crate) const MARK_USED: &str = "-mark-used solutionAscii solutionCsv";

#[derive(Debug, Clone, Copy)]
pub(crate) enum Route {
	/// The server, or the scheduler while no worker is assigned.
	Target,
	/// The scheduler that assigned the current worker.
	Scheduler,
}

pub struct JobEngine {
	pub(crate) job: Job,
	pub(crate) settings: JobSettings,
	pub(crate) factory: Arc<dyn ServiceFactory>,
	pub(crate) toolchain: Arc<dyn Toolchain>,
	pub(crate) output: Arc<dyn OutputSink>,
	pub(crate) target: Option<ServiceConnector>,
	pub(crate) scheduler: Option<ServiceConnector>,
	pub(crate) state: LifecycleState,
	pub(crate) remote: bool,
	pub(crate) connected: bool,
	pub(crate) cleaned: bool,
	/// Set once the job was handed over as a snapshot.
	pub(crate) detached: bool,
	pub(crate) temp: TempFiles,
	pub(crate) precompiled: Option<PrecompiledModel>,
	pub(crate) instance: Option<String>,
	pub(crate) results: Option<JobResults>,
}

impl JobEngine {
	pub fn builder(model: impl Into<PathBuf>) -> JobEngineBuilder {
		JobEngineBuilder::new(model)
	}

	pub fn job(&self) -> &Job {
		&self.job
	}

	pub fn job_id(&self) -> &str {
		&self.job.job_id
	}

	pub fn status(&self) -> RemoteStatus {
		self.job.status
	}

	pub fn mode(&self) -> &ServerMode {
		&self.job.mode
	}

	pub fn state(&self) -> LifecycleState {
		self.state
	}

	pub fn settings(&self) -> &JobSettings {
		&self.settings
	}

	pub fn is_remote(&self) -> bool {
		self.remote
	}

	pub fn results(&self) -> Option<&JobResults> {
		self.results.as_ref()
	}

	/// Instance document of the last send.
	pub fn instance(&self) -> Option<&str> {
		self.instance.as_deref()
	}

	pub fn data_mut(&mut self) -> &mut ModelData {
		&mut self.job.data
	}

	pub fn set_option(&mut self, option: impl Into<String>) -> usize {
		let option = option.into();
		if self.connected {
			warn!(
				option = %option,
				"option is ignored, because the problem has been connected with a CmplServer before"
			);
		}
		self.job.options.set_option(option)
	}

	pub fn set_options<I, S>(&mut self, options: I) -> Vec<usize>
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		if self.connected {
			warn!("options are ignored, because the problem has been connected with a CmplServer before");
		}
		self.job.options.set_options(options)
	}

	pub fn del_option(&mut self, key: usize) -> Result<()> {
		self.job.options.del_option(key)
	}

	pub fn del_options(&mut self) {
		self.job.options.del_options();
	}

	pub(crate) fn set_status(&mut self, status: RemoteStatus) {
		self.job.status = status;
		self.enter(LifecycleState::from_status(status, &self.job.mode));
	}

	pub(crate) fn enter(&mut self, next: LifecycleState) {
		let prev = self.state;
		if prev == next {
			return;
		}
		if !LifecycleState::is_valid_transition(prev, next) {
			warn!(job_id = %self.job.job_id, "Unexpected lifecycle transition: {} -> {}", prev, next);
		}
		self.state = next;
		info!(job_id = %self.job.job_id, "Lifecycle state changed: {} -> {}", prev, next);
	}

	fn open(&self, url: &str, kind: EndpointKind) -> Result<ServiceConnector> {
		ServiceConnector::open(self.factory.as_ref(), url, kind, self.settings.max_tries)
			.map_err(CmplError::from)
	}

	pub(crate) fn connector(&self, route: Route) -> Result<ServiceConnector> {
		match route {
			Route::Target => self
				.target
				.clone()
				.ok_or_else(|| CmplError::protocol("Model is not connected to a CmplServer")),
			Route::Scheduler => self
				.scheduler
				.clone()
				.ok_or_else(|| CmplError::protocol("Model is not connected to a CmplGridScheduler")),
		}
	}

	/// Runs one remote call.
	///
	/// When the connector gives up the job is marked as failed and cleaned
	/// up before the error is returned.
	pub(crate) async fn call(&mut self, route: Route, call: RemoteCall) -> Result<cmpl_connector::RemoteReply> {
		let connector = self.connector(route)?;
		match connector.execute(&call).await {
			Ok(reply) => Ok(reply),
			Err(e) => {
				self.set_status(RemoteStatus::Error);
				self.cleanup().await;
				Err(e.into())
			}
		}
	}

	fn job_call(&self, make: fn(String) -> RemoteCall) -> RemoteCall {
		make(self.job.job_id.clone())
	}

	fn require_remote(&self, operation: &str) -> Result<()> {
		if !self.remote {
			return Err(CmplError::protocol(format!(
				"Cmpl::{} can only be used in remote mode",
				operation
			)));
		}
		Ok(())
	}

	fn require_connected(&self) -> Result<()> {
		if !self.connected {
			return Err(CmplError::protocol("Model is not connected to a CmplServer"));
		}
		Ok(())
	}

	/// Runs the binary and reads the message document it wrote.
	pub(crate) async fn run_cmpl(&self, args: &[String], msg_file: &Path) -> Result<CmplMessages> {
		self.toolchain.run(args, self.output.as_ref()).await?;
		let document = tokio::fs::read_to_string(msg_file)
			.await
			.map_err(|e| CmplError::file_access(msg_file, e))?;
		ResultAssembler::checked_messages(&document)
	}

	async fn precompile(&mut self) -> Result<PrecompiledModel> {
		let prefix = self.temp.prefix().to_path_buf();
		for extension in ["optcmpl", "precmpl", "extdata"] {
			self.temp.path(extension);
		}
		let msg_file = self.temp.path("cmsg");

		let args = precompile_args(&self.job.model, &prefix, &self.job.options.to_args(), &msg_file);
		self.run_cmpl(&args, &msg_file).await?;

		let precompiled = PrecompiledModel::load(&prefix)?;
		self.job.solver = precompiled.args.solver.clone();
		debug!(solver = %self.job.solver, "model precompiled");
		Ok(precompiled)
	}

	/// Connects the job to a CmplServer or CmplGridScheduler.
	///
	/// The model is precompiled first. A scheduler either assigns a server
	/// right away, which the job is then bound to, or queues the job.
	pub async fn connect(&mut self, url: &str) -> Result<()> {
		if !matches!(self.job.status, RemoteStatus::Unknown | RemoteStatus::Cleaned)
			&& !self.job.mode.is_grid()
		{
			return Err(CmplError::protocol(format!(
				"Problem is still connected with CMPLServer: at {} with jobId {}",
				url, self.job.job_id
			)));
		}

		self.cleaned = false;
		self.enter(LifecycleState::Connecting);

		let precompiled = match self.precompile().await {
			Ok(p) => p,
			Err(e) => {
				self.enter(LifecycleState::from_status(self.job.status, &self.job.mode));
				return Err(e);
			}
		};
		self.precompiled = Some(precompiled);
		if !self.job.options.contains(MARK_USED) {
			self.job.options.set_option(MARK_USED);
		}

		self.remote = true;
		self.job.status = RemoteStatus::Unknown;
		self.job.mode = ServerMode::Standalone {
			url: url.to_string(),
		};
		self.job.connect_url = url.to_string();
		self.target = None;
		self.scheduler = None;

		let get_job_id = RemoteCall::GetJobId {
			model_name: self.job.model_name(),
			solver: self.job.solver.clone(),
			compatibility: self.settings.compatibility,
		};
		let server = match self.open(url, EndpointKind::Server) {
			Ok(server) => server,
			Err(e) => {
				self.enter(LifecycleState::Unknown);
				return Err(e);
			}
		};
		let reply = match server.execute(&get_job_id).await {
			Ok(reply) => reply,
			Err(e) => {
				self.enter(LifecycleState::Unknown);
				return Err(e.into());
			}
		};

		let status = reply.status;
		if matches!(
			status,
			RemoteStatus::Ok | RemoteStatus::SchedulerOk | RemoteStatus::SchedulerBusy
		) {
			self.job.job_id = reply.payload.clone();
		}

		if status.is_scheduler() {
			self.job.mode = ServerMode::Grid {
				scheduler_url: url.to_string(),
				worker_url: None,
			};
			match self.open(url, EndpointKind::Scheduler) {
				Ok(scheduler) => self.target = Some(scheduler),
				Err(e) => {
					self.set_status(RemoteStatus::Error);
					return Err(e);
				}
			}
		} else {
			self.target = Some(server);
		}
		self.set_status(status);

		if status.is_scheduler() {
			self.output.write(&format!(
				"Connected with CmplGridScheduler at {} with jobId {}",
				url, self.job.job_id
			));
		}

		if status.is_error() {
			self.cleanup().await;
			return Err(CmplError::remote(reply.message));
		}

		if status == RemoteStatus::SchedulerOk {
			self.connect_via_scheduler(&reply.message)?;
		}

		self.connected = true;
		info!(job_id = %self.job.job_id, mode = %self.job.mode, "connected");

		if !self.job.mode.is_grid() {
			self.announce_server(url);
		}
		if status == RemoteStatus::SchedulerBusy {
			self.output.write(&reply.message);
		}
		Ok(())
	}

	fn announce_server(&self, url: &str) {
		self.output.write(&format!(
			"Connected with CmplServer at {} with jobId {} >> maxServerTries <{}> maxQueuingTime <{}>",
			url,
			self.job.job_id,
			self.settings.max_tries,
			self.settings.max_queuing_time.as_secs()
		));
	}

	/// Binds the server a scheduler assigned to the job.
	pub(crate) fn connect_via_scheduler(&mut self, worker_url: &str) -> Result<()> {
		let worker = match self.open(worker_url, EndpointKind::Server) {
			Ok(worker) => worker,
			Err(e) => {
				self.set_status(RemoteStatus::Error);
				return Err(e);
			}
		};

		self.scheduler = self.target.replace(worker);
		self.job.mode = std::mem::take(&mut self.job.mode).assign_worker(worker_url);
		self.enter(LifecycleState::from_status(self.job.status, &self.job.mode));
		self.announce_server(worker_url);
		Ok(())
	}

	/// Polls the scheduler while the job waits for a server.
	pub(crate) async fn knock_scheduler(&mut self) -> Result<()> {
		if !self.connected {
			return Err(CmplError::protocol("Model is not connected to a CmplScheduler"));
		}
		if self.job.status == RemoteStatus::Canceled {
			return Ok(());
		}

		let knock = self.job_call(|job_id| RemoteCall::Knock { job_id });
		let reply = self.call(Route::Target, knock).await?;
		self.set_status(reply.status);

		match reply.status {
			RemoteStatus::SchedulerError => {
				self.cleanup().await;
				Err(CmplError::remote(reply.message))
			}
			RemoteStatus::SchedulerOk => self.connect_via_scheduler(&reply.message),
			_ => Ok(()),
		}
	}

	/// Sends the problem to the connected server.
	pub async fn send(&mut self) -> Result<()> {
		self.require_remote("send")?;
		self.require_connected()?;

		if self.job.status == RemoteStatus::Running {
			return Err(CmplError::protocol(
				"Don't send the problem again before the CmplServer finished the previous one",
			));
		}
		if self.job.status == RemoteStatus::Cleaned {
			let url = self.job.connect_url.clone();
			self.connect(&url).await?;
		}
		if self.job.mode.awaiting_worker() {
			return Err(CmplError::protocol(
				"Problem is waiting for a CmplServer assigned by the CmplGridScheduler",
			));
		}

		self.knock().await?;
		if self.job.status == RemoteStatus::Running {
			return Err(CmplError::protocol(
				"Don't send the problem again before the CmplServer finished the previous one",
			));
		}

		let data = self.job.data.to_cdat()?;
		let precompiled = match self.precompiled.clone() {
			Some(p) => p,
			None => self.precompile().await?,
		};
		let bundle = InstanceBuilder::new(&self.job.model, &precompiled).build(
			&self.job.options.to_vec(),
			&data,
			&self.job.job_id,
		)?;
		self.precompiled = Some(precompiled);

		let instance = document::to_document(&bundle);
		self.results = None;

		let reply = self
			.call(
				Route::Target,
				RemoteCall::Send {
					instance: instance.clone(),
				},
			)
			.await?;
		self.instance = Some(instance);
		self.set_status(reply.status);

		if reply.status == RemoteStatus::Error {
			self.cleanup().await;
			return Err(CmplError::remote(reply.message));
		}

		if self.settings.debug {
			self.write_instance_file().await?;
		}
		Ok(())
	}

	async fn write_instance_file(&self) -> Result<()> {
		let Some(instance) = &self.instance else {
			return Ok(());
		};
		let path = self.job.model.with_extension("cinst");
		tokio::fs::write(&path, instance)
			.await
			.map_err(|e| CmplError::file_access(&path, e))
	}

	/// Polls the server once and forwards its output.
	pub async fn knock(&mut self) -> Result<()> {
		self.require_remote("knock")?;
		self.require_connected()?;

		match self.job.status {
			RemoteStatus::Cleaned => {
				return Err(CmplError::protocol("Model was received and cleaned on the CmplServer"))
			}
			RemoteStatus::Canceled => return Ok(()),
			_ => {}
		}

		let knock = self.job_call(|job_id| RemoteCall::Knock { job_id });
		let reply = self.call(Route::Target, knock).await?;
		self.set_status(reply.status);
		self.output.write(&reply.payload);

		if matches!(reply.status, RemoteStatus::Error | RemoteStatus::Failed) {
			self.cleanup().await;
			return Err(CmplError::remote(reply.message));
		}
		Ok(())
	}

	/// Fetches messages and solutions of a finished job and cleans it up.
	pub async fn retrieve(&mut self) -> Result<&JobResults> {
		self.require_remote("retrieve")?;
		self.require_connected()?;

		if self.job.status == RemoteStatus::Cleaned {
			return Err(CmplError::protocol(
				"Model was received and cleaned from the CmplServer",
			));
		}

		self.knock().await?;
		match self.job.status {
			RemoteStatus::Finished => {}
			RemoteStatus::Canceled => {
				return Err(CmplError::Cancellation(
					"Model has been canceled by user, cannot retrieve the solution".into(),
				))
			}
			_ => {
				return Err(CmplError::protocol(
					"Model is still running, cannot retrieve the solution",
				))
			}
		}

		let get_messages = self.job_call(|job_id| RemoteCall::GetMessages { job_id });
		let reply = self.call(Route::Target, get_messages).await?;
		if reply.status == RemoteStatus::Error {
			self.set_status(RemoteStatus::Error);
			self.cleanup().await;
			return Err(CmplError::remote(reply.message));
		}
		let messages = match ResultAssembler::checked_messages(&reply.payload) {
			Ok(messages) => messages,
			Err(e) => {
				self.cleanup().await;
				return Err(e);
			}
		};

		let get_solutions = self.job_call(|job_id| RemoteCall::GetSolutions { job_id });
		let reply = self.call(Route::Target, get_solutions).await?;
		if reply.status == RemoteStatus::Error {
			self.set_status(RemoteStatus::Error);
			self.cleanup().await;
			return Err(CmplError::remote(reply.message));
		}
		let results = ResultAssembler::assemble(messages, &reply.payload);
		self.cleanup().await;

		self.results = Some(results?);
		self.results
			.as_ref()
			.ok_or_else(|| CmplError::protocol("No Solution found so far"))
	}

	/// Cancels the job on the server and removes it there.
	///
	/// A local job is only cleaned up.
	pub async fn cancel(&mut self) -> Result<()> {
		if !self.remote {
			self.cleanup().await;
			return Ok(());
		}
		self.require_connected()?;

		match self.job.status {
			RemoteStatus::Cleaned => {
				return Err(CmplError::protocol(
					"Model has been received and cleaned from the CmplServer",
				))
			}
			RemoteStatus::Canceled => return Ok(()),
			_ => {}
		}

		if self.job.mode.awaiting_worker() {
			self.cleanup().await;
			self.set_status(RemoteStatus::Cleaned);
			return Ok(());
		}

		let cancel = self.job_call(|job_id| RemoteCall::Cancel { job_id });
		let reply = self.call(Route::Target, cancel).await?;
		self.set_status(reply.status);
		if reply.status == RemoteStatus::Error {
			self.cleanup().await;
			return Err(CmplError::remote(reply.message));
		}

		let remove = self.job_call(|job_id| RemoteCall::RemoveProblem { job_id });
		let reply = self.call(Route::Target, remove).await?;
		if reply.status == RemoteStatus::Error {
			self.set_status(RemoteStatus::Error);
			self.cleanup().await;
			return Err(CmplError::remote(reply.message));
		}
		self.set_status(RemoteStatus::Cleaned);
		self.cleanup().await;
		Ok(())
	}

	/// Cleans up and leaves remote mode.
	pub async fn disconnect(&mut self) {
		self.cleanup().await;

		self.set_status(RemoteStatus::Unknown);
		self.job.mode = ServerMode::Unbound;
		self.job.connect_url.clear();
		self.target = None;
		self.scheduler = None;
		self.remote = false;
		self.connected = false;
	}

	/// Releases everything the job holds, remote and local.
	///
	/// Remote calls are best effort. Calling this again before the job is
	/// connected or solved anew does nothing.
	pub async fn cleanup(&mut self) {
		if self.cleaned {
			return;
		}
		if self.settings.debug {
			self.pause().await;
		}

		let mut failures = 0;
		if self.remote && !self.job.job_id.is_empty() {
			if !self.job.mode.awaiting_worker() {
				let settled = matches!(
					self.job.status,
					RemoteStatus::Finished
						| RemoteStatus::Error
						| RemoteStatus::Canceled
						| RemoteStatus::Cleaned
				);
				if !settled && self.connected {
					let cancel = self.job_call(|job_id| RemoteCall::Cancel { job_id });
					self.best_effort(cancel, &mut failures).await;
				}

				if !matches!(self.job.status, RemoteStatus::Cleaned | RemoteStatus::Error) {
					let remove = self.job_call(|job_id| RemoteCall::RemoveProblem { job_id });
					self.best_effort(remove, &mut failures).await;
					self.set_status(RemoteStatus::Cleaned);
				}
			}

			if self.job.mode.is_grid()
				&& matches!(
					self.job.status,
					RemoteStatus::SchedulerBusy | RemoteStatus::SchedulerUnknown
				) {
				let disconnect = self.job_call(|job_id| RemoteCall::DisconnectFromScheduler { job_id });
				self.best_effort(disconnect, &mut failures).await;
			}
		}

		self.temp.remove_all();
		self.precompiled = None;
		self.cleaned = true;
		debug!(job_id = %self.job.job_id, "job cleaned up");
	}

	async fn best_effort(&self, call: RemoteCall, failures: &mut u32) {
		let Some(target) = self.target.as_ref() else {
			return;
		};
		if let Err(e) = target.execute(&call).await {
			if *failures == 0 {
				warn!(method = call.method(), "cleanup call failed: {}", e);
			} else {
				debug!(method = call.method(), "cleanup call failed: {}", e);
			}
			*failures += 1;
		}
	}

	async fn pause(&self) {
		self.output.write("Hit Enter to exit");
		let _ = tokio::task::spawn_blocking(|| {
			let mut line = String::new();
			let _ = std::io::stdin().read_line(&mut line);
		})
		.await;
	}

	/// Drives [`JobEngine::solve`] on its own task.
	///
	/// The engine is handed back together with the outcome.
	pub fn spawn(mut self) -> tokio::task::JoinHandle<(JobEngine, Result<()>)> {
		tokio::spawn(async move {
			let result = self.solve().await.map(|_| ());
			(self, result)
		})
	}

	pub(crate) fn rebind(&mut self) -> Result<()> {
		self.target = None;
		self.scheduler = None;
		match self.job.mode.clone() {
			ServerMode::Unbound => {}
			ServerMode::Standalone { url } => {
				self.target = Some(self.open(&url, EndpointKind::Server)?);
			}
			ServerMode::Grid {
				scheduler_url,
				worker_url: None,
			} => {
				self.target = Some(self.open(&scheduler_url, EndpointKind::Scheduler)?);
			}
			ServerMode::Grid {
				scheduler_url,
				worker_url: Some(worker_url),
			} => {
				self.target = Some(self.open(&worker_url, EndpointKind::Server)?);
				self.scheduler = Some(self.open(&scheduler_url, EndpointKind::Scheduler)?);
			}
		}
		self.state = LifecycleState::from_status(self.job.status, &self.job.mode);
		Ok(())
	}
}

impl Drop for JobEngine {
	fn drop(&mut self) {
		self.temp.remove_all();

		if self.cleaned
			|| self.detached
			|| !self.remote
			|| self.job.job_id.is_empty()
			|| self.job.mode.awaiting_worker()
			|| self.state.is_terminal()
			|| self.job.status == RemoteStatus::Unknown
		{
			return;
		}

		let (Some(target), Ok(handle)) = (self.target.clone(), tokio::runtime::Handle::try_current())
		else {
			return;
		};
		let job_id = self.job.job_id.clone();
		let cancel_first = !matches!(
			self.job.status,
			RemoteStatus::Finished | RemoteStatus::Canceled
		);

		debug!(job_id = %job_id, "removing job of a dropped engine");
		handle.spawn(async move {
			if cancel_first {
				let cancel = RemoteCall::Cancel {
					job_id: job_id.clone(),
				};
				if let Err(e) = target.execute(&cancel).await {
					debug!("cancel of dropped job failed: {}", e);
				}
			}
			if let Err(e) = target.execute(&RemoteCall::RemoveProblem { job_id }).await {
				warn!("cannot remove dropped job: {}", e);
			}
		});
	}
}

/// Builder for creating a [`JobEngine`].
pub struct JobEngineBuilder {
	model: PathBuf,
	settings: Option<JobSettings>,
	url: Option<String>,
	factory: Option<Arc<dyn ServiceFactory>>,
	toolchain: Option<Arc<dyn Toolchain>>,
	output: Option<Arc<dyn OutputSink>>,
	work_dir: Option<PathBuf>,
	request_timeout: Duration,
}

impl JobEngineBuilder {
	pub fn new(model: impl Into<PathBuf>) -> Self {
		Self {
			model: model.into(),
			settings: None,
			url: None,
			factory: None,
			toolchain: None,
			output: None,
			work_dir: None,
			request_timeout: Duration::from_secs(30),
		}
	}

	/// Takes settings, URL, toolchain and output from a loaded config.
	pub fn with_config(mut self, config: &CmplConfig) -> Self {
		self.settings = Some(config.job_settings());
		self.url = config.connect_url().map(str::to_string);
		self.work_dir = Some(config.local.work_dir());
		self.request_timeout = Duration::from_secs(config.server.request_timeout_secs);

		if let Some(binary) = config.cmpl_binary() {
			self.toolchain = Some(Arc::new(CmplBinary::new(binary)));
		}

		if config.output.print_output {
			if let Some(lead) = &config.output.lead {
				self.output = Some(Arc::new(ConsoleOutput::new(lead.clone())));
			}
		} else {
			self.output = Some(Arc::new(crate::output::SilentOutput));
		}
		self
	}

	pub fn with_settings(mut self, settings: JobSettings) -> Self {
		self.settings = Some(settings);
		self
	}

	/// URL connected to by [`JobEngine::solve`] when the job is not connected yet.
	pub fn with_url(mut self, url: impl Into<String>) -> Self {
		self.url = Some(url.into());
		self
	}

	pub fn with_factory(mut self, factory: Arc<dyn ServiceFactory>) -> Self {
		self.factory = Some(factory);
		self
	}

	pub fn with_toolchain(mut self, toolchain: Arc<dyn Toolchain>) -> Self {
		self.toolchain = Some(toolchain);
		self
	}

	pub fn with_output(mut self, output: Arc<dyn OutputSink>) -> Self {
		self.output = Some(output);
		self
	}

	pub fn with_work_dir(mut self, work_dir: impl Into<PathBuf>) -> Self {
		self.work_dir = Some(work_dir.into());
		self
	}

	/// Falls back to `cmpl` on the `PATH` when no binary is configured.
	pub(crate) fn with_default_toolchain(mut self) -> Self {
		if self.toolchain.is_none() {
			self.toolchain = Some(Arc::new(CmplBinary::new("cmpl")));
		}
		self
	}

	pub fn build(self) -> Result<JobEngine> {
		let settings = self.settings.unwrap_or_default();
		let factory = match self.factory {
			Some(factory) => factory,
			None => create_factory(self.request_timeout)?,
		};
		let toolchain = self.toolchain.ok_or_else(|| {
			CmplError::Validation(
				"No CMPL binary configured, set CMPLHOME or local.cmpl_home".into(),
			)
		})?;

		let mut job = Job::new(self.model, settings.solver.clone());
		job.connect_url = self.url.unwrap_or_default();

		let output = self
			.output
			.unwrap_or_else(|| Arc::new(ConsoleOutput::for_model(&job.stem())));
		let work_dir = self.work_dir.unwrap_or_else(std::env::temp_dir);
		let temp = TempFiles::new(&work_dir, &job.stem());

		Ok(JobEngine {
			job,
			settings,
			factory,
			toolchain,
			output,
			target: None,
			scheduler: None,
			state: LifecycleState::Unknown,
			remote: false,
			connected: false,
			cleaned: false,
			detached: false,
			temp,
			precompiled: None,
			instance: None,
			results: None,
		})
	}
}
