//! In-memory stand-ins for servers, schedulers and the CMPL binary.

use crate::engine::{JobEngine, JobEngineBuilder};
use crate::output::{CapturedOutput, OutputSink};
use crate::toolchain::Toolchain;
use async_trait::async_trait;
use cmpl_config::JobSettings;
use cmpl_connector::{
	EndpointKind, RemoteCall, RemoteReply, ServiceFactory, ServiceInterface, TransportError,
};
use cmpl_types::{RemoteStatus, Result};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub type CallResult = std::result::Result<RemoteReply, TransportError>;
type Handler = Box<dyn FnMut(&RemoteCall) -> CallResult + Send>;

pub fn reply(status: RemoteStatus, message: &str, payload: &str) -> CallResult {
	Ok(RemoteReply::new(status, message, payload))
}

#[derive(Default)]
struct ClusterState {
	handlers: Mutex<HashMap<String, Handler>>,
	calls: Mutex<Vec<(String, RemoteCall)>>,
}

/// Routes every call to the handler registered for its URL.
///
/// URLs without a handler refuse the connection.
#[derive(Clone, Default)]
pub struct MockCluster {
	state: Arc<ClusterState>,
}

impl MockCluster {
	pub fn on(&self, url: &str, handler: impl FnMut(&RemoteCall) -> CallResult + Send + 'static) {
		self.state
			.handlers
			.lock()
			.unwrap()
			.insert(url.to_string(), Box::new(handler));
	}

	pub fn calls(&self) -> Vec<(String, RemoteCall)> {
		self.state.calls.lock().unwrap().clone()
	}

	pub fn methods(&self, url: &str) -> Vec<&'static str> {
		self.calls()
			.iter()
			.filter(|(u, _)| u == url)
			.map(|(_, c)| c.method())
			.collect()
	}

	pub fn count(&self, url: &str, method: &str) -> usize {
		self.methods(url).into_iter().filter(|m| *m == method).count()
	}
}

struct MockEndpoint {
	url: String,
	kind: EndpointKind,
	state: Arc<ClusterState>,
}

#[async_trait]
impl ServiceInterface for MockEndpoint {
	fn url(&self) -> &str {
		&self.url
	}

	fn kind(&self) -> EndpointKind {
		self.kind
	}

	async fn invoke(&self, call: &RemoteCall) -> CallResult {
		self.state
			.calls
			.lock()
			.unwrap()
			.push((self.url.clone(), call.clone()));
		let mut handlers = self.state.handlers.lock().unwrap();
		match handlers.get_mut(&self.url) {
			Some(handler) => handler(call),
			None => Err(TransportError::Http("connection refused".into())),
		}
	}
}

impl ServiceFactory for MockCluster {
	fn endpoint(
		&self,
		url: &str,
		kind: EndpointKind,
	) -> std::result::Result<Arc<dyn ServiceInterface>, TransportError> {
		Ok(Arc::new(MockEndpoint {
			url: url.to_string(),
			kind,
			state: self.state.clone(),
		}))
	}
}

/// A server that hands out `job-42` and runs every problem it gets.
pub fn standalone_server() -> impl FnMut(&RemoteCall) -> CallResult + Send + 'static {
	|call| match call {
		RemoteCall::GetJobId { .. } => reply(RemoteStatus::Ok, "", "job-42"),
		RemoteCall::Knock { .. } => reply(RemoteStatus::NotRunning, "", ""),
		RemoteCall::Send { .. } => reply(RemoteStatus::Running, "", ""),
		_ => reply(RemoteStatus::Ok, "", ""),
	}
}

/// A server that finishes a problem after `running_knocks` knocks.
pub fn finishing_server(running_knocks: usize) -> impl FnMut(&RemoteCall) -> CallResult + Send + 'static {
	let mut sent = false;
	let mut knocks = 0;
	move |call| match call {
		RemoteCall::GetJobId { .. } => reply(RemoteStatus::Ok, "", "job-42"),
		RemoteCall::Send { .. } => {
			sent = true;
			knocks = 0;
			reply(RemoteStatus::Running, "", "")
		}
		RemoteCall::Knock { .. } if !sent => reply(RemoteStatus::NotRunning, "", ""),
		RemoteCall::Knock { .. } => {
			knocks += 1;
			if knocks > running_knocks {
				reply(RemoteStatus::Finished, "", "solver done")
			} else {
				reply(RemoteStatus::Running, "", "solving")
			}
		}
		RemoteCall::GetMessages { .. } => reply(RemoteStatus::Ok, "", NORMAL_MESSAGES),
		RemoteCall::GetSolutions { .. } => reply(RemoteStatus::Ok, "", ONE_SOLUTION),
		RemoteCall::RemoveProblem { .. } => {
			sent = false;
			reply(RemoteStatus::Cleaned, "", "")
		}
		_ => reply(RemoteStatus::Ok, "", ""),
	}
}

/// Writes the files the CMPL binary would write.
#[derive(Default)]
pub struct MockToolchain {
	pub fail_messages: AtomicBool,
	runs: Mutex<Vec<Vec<String>>>,
}

impl MockToolchain {
	pub fn runs(&self) -> Vec<Vec<String>> {
		self.runs.lock().unwrap().clone()
	}
}

fn after<'a>(args: &'a [String], flag: &str) -> Option<&'a String> {
	args.iter()
		.position(|a| a == flag)
		.and_then(|i| args.get(i + 1))
}

#[async_trait]
impl Toolchain for MockToolchain {
	async fn run(&self, args: &[String], output: &dyn OutputSink) -> Result<()> {
		self.runs.lock().unwrap().push(args.to_vec());
		let model = PathBuf::from(&args[0]);
		let model_name = model.file_name().unwrap().to_string_lossy().into_owned();

		if let Some(opt) = after(args, "-o-opt") {
			let records = format!(
				"i;1;0;0;0;0;0;0;0;1;\"{}\"\nsolver;1;0;0;0;0;0;0;0;1;\"cbc\"\n",
				model_name
			);
			std::fs::write(opt, records).unwrap();
		}
		if let Some(pre) = after(args, "-o-pre") {
			std::fs::write(pre, "precompiled").unwrap();
		}
		if let Some(ext) = after(args, "-o-extern") {
			std::fs::write(ext, "").unwrap();
		}
		if args.iter().any(|a| a == "-solution") {
			std::fs::write(model.with_extension("csol"), ONE_SOLUTION).unwrap();
		}
		if let Some(msg) = after(args, "-cmsg") {
			let doc = if self.fail_messages.load(Ordering::SeqCst) {
				FAILED_MESSAGES
			} else {
				NORMAL_MESSAGES
			};
			std::fs::write(msg, doc).unwrap();
		}
		output.write("CMPL model generation - running");
		Ok(())
	}
}

pub fn settings() -> JobSettings {
	JobSettings {
		max_tries: 3,
		max_queuing_time: Duration::from_secs(1),
		refresh_interval: Duration::from_millis(100),
		..JobSettings::default()
	}
}

/// A model file in a scratch directory plus the mocks an engine needs.
pub struct Fixture {
	pub dir: tempfile::TempDir,
	pub model: PathBuf,
	pub cluster: MockCluster,
	pub toolchain: Arc<MockToolchain>,
	pub output: Arc<CapturedOutput>,
}

impl Fixture {
	pub fn new() -> Self {
		let dir = tempfile::tempdir().unwrap();
		let model = dir.path().join("diet.cmpl");
		std::fs::write(&model, "variables: x: real[0..];\nobjectives: x -> min;\n").unwrap();
		Self {
			dir,
			model,
			cluster: MockCluster::default(),
			toolchain: Arc::new(MockToolchain::default()),
			output: Arc::new(CapturedOutput::default()),
		}
	}

	pub fn builder(&self) -> JobEngineBuilder {
		JobEngine::builder(&self.model)
			.with_settings(settings())
			.with_factory(Arc::new(self.cluster.clone()))
			.with_toolchain(self.toolchain.clone())
			.with_output(self.output.clone())
			.with_work_dir(self.dir.path())
	}

	pub fn engine(&self) -> JobEngine {
		self.builder().build().unwrap()
	}

	/// Files left in the scratch directory besides the model.
	pub fn leftovers(&self) -> Vec<String> {
		std::fs::read_dir(self.dir.path())
			.unwrap()
			.filter_map(|e| e.ok())
			.map(|e| e.file_name().to_string_lossy().into_owned())
			.filter(|name| name != "diet.cmpl")
			.collect()
	}
}

pub const NORMAL_MESSAGES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<CmplMessages version="1.1">
	<general>
		<instanceName>diet.cmpl</instanceName>
		<generalStatus>normal</generalStatus>
		<message>cmpl finished normal</message>
		<cmplVersion>2.0.0</cmplVersion>
	</general>
</CmplMessages>
"#;

pub const FAILED_MESSAGES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<CmplMessages version="1.1">
	<general>
		<instanceName>diet.cmpl</instanceName>
		<generalStatus>error</generalStatus>
		<message>cmpl finished with errors</message>
		<cmplVersion>2.0.0</cmplVersion>
	</general>
	<messages numberOfMessages="1">
		<message type="error" module="compiler" location="diet.cmpl:2" description="syntax error"/>
	</messages>
</CmplMessages>
"#;

pub const ONE_SOLUTION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<CmplSolutions version="1.0">
	<general>
		<instanceName>diet.cmpl</instanceName>
		<nrOfVariables>1</nrOfVariables>
		<nrOfConstraints>1</nrOfConstraints>
		<objectiveName>costs</objectiveName>
		<objectiveSense>min</objectiveSense>
		<nrOfSolutions>1</nrOfSolutions>
		<solverName>CBC</solverName>
		<solverMsg>Optimal solution found</solverMsg>
		<variablesDisplayOptions>(all)</variablesDisplayOptions>
		<constraintsDisplayOptions>(all)</constraintsDisplayOptions>
	</general>
	<solution idx="0" status="optimal" value="0">
		<variables>
			<variable idx="0" name="x" type="C" activity="0" lowerBound="0" upperBound="INF" marginal="1"/>
		</variables>
		<linearConstraints>
			<constraint idx="0" name="demand" type="G" activity="0" lowerBound="0" upperBound="INF" marginal="0"/>
		</linearConstraints>
	</solution>
</CmplSolutions>
"#;
