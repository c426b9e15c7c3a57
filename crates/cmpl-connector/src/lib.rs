//! Channel to CmplServer and CmplGridScheduler endpoints.
//!
//! Every remote operation is a [`RemoteCall`] answered by a [`RemoteReply`]
//! whose first element is the status code. [`ServiceInterface`] is the
//! transport seam; [`ServiceConnector`] wraps one endpoint with the retry
//! policy shared by all calls.

use async_trait::async_trait;
use cmpl_types::{CmplError, RemoteStatus};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Re-export implementations
pub mod implementations {
	pub mod codec;
	pub mod xmlrpc;
}

/// Errors raised by a single transport round-trip.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TransportError {
	#[error("HTTP error: {0}")]
	Http(String),
	#[error("HTTP status {0}")]
	Status(u16),
	#[error("fault {code}: {message}")]
	Fault { code: i64, message: String },
	#[error("invalid URL: {0}")]
	InvalidUrl(String),
	#[error("cannot decode reply: {0}")]
	Decode(String),
}

#[derive(Debug, Error)]
pub enum ConnectorError {
	/// Every attempt failed; carries the error of the last one.
	#[error("CmplServer error: {last_error}")]
	Exhausted {
		attempts: u32,
		last_error: TransportError,
	},
}

impl From<ConnectorError> for CmplError {
	fn from(err: ConnectorError) -> Self {
		CmplError::remote(err.to_string())
	}
}

impl From<TransportError> for CmplError {
	fn from(err: TransportError) -> Self {
		CmplError::remote(format!("CmplServer error: {}", err))
	}
}

/// Which kind of endpoint a URL is treated as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointKind {
	Server,
	Scheduler,
}

/// A remote operation with its arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteCall {
	GetJobId {
		model_name: String,
		solver: String,
		compatibility: u32,
	},
	Send {
		instance: String,
	},
	Knock {
		job_id: String,
	},
	GetMessages {
		job_id: String,
	},
	GetSolutions {
		job_id: String,
	},
	Cancel {
		job_id: String,
	},
	RemoveProblem {
		job_id: String,
	},
	/// Scheduler only: report a worker that stopped answering.
	SchedulerFailed {
		worker_url: String,
	},
	DisconnectFromScheduler {
		job_id: String,
	},
}

impl RemoteCall {
	/// Wire name of the operation.
	pub fn method(&self) -> &'static str {
		match self {
			Self::GetJobId { .. } => "getJobId",
			Self::Send { .. } => "send",
			Self::Knock { .. } => "knock",
			Self::GetMessages { .. } => "getCmplMessages",
			Self::GetSolutions { .. } => "getSolutions",
			Self::Cancel { .. } => "cancel",
			Self::RemoveProblem { .. } => "removeProblem",
			Self::SchedulerFailed { .. } => "cmplServerFailed",
			Self::DisconnectFromScheduler { .. } => "disconnectProblem",
		}
	}
}

/// Decoded answer of a remote call.
///
/// `message` is the second element of the reply (for `getJobId` the worker
/// URL assigned by a scheduler), `payload` the third (job id, output text,
/// message or solution document) or empty.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RemoteReply {
	pub status: RemoteStatus,
	pub message: String,
	pub payload: String,
}

impl RemoteReply {
	pub fn new(status: RemoteStatus, message: impl Into<String>, payload: impl Into<String>) -> Self {
		Self {
			status,
			message: message.into(),
			payload: payload.into(),
		}
	}
}

/// Transport to one remote endpoint.
#[async_trait]
pub trait ServiceInterface: Send + Sync {
	fn url(&self) -> &str;

	fn kind(&self) -> EndpointKind;

	/// Performs one round-trip without retrying.
	async fn invoke(&self, call: &RemoteCall) -> Result<RemoteReply, TransportError>;
}

/// Creates endpoint transports for URLs.
pub trait ServiceFactory: Send + Sync {
	fn endpoint(
		&self,
		url: &str,
		kind: EndpointKind,
	) -> Result<Arc<dyn ServiceInterface>, TransportError>;
}

/// One endpoint plus the retry policy applied to every call on it.
#[derive(Clone)]
pub struct ServiceConnector {
	endpoint: Arc<dyn ServiceInterface>,
	max_tries: u32,
}

impl ServiceConnector {
	pub fn new(endpoint: Arc<dyn ServiceInterface>, max_tries: u32) -> Self {
		Self {
			endpoint,
			max_tries: max_tries.max(1),
		}
	}

	/// Opens an endpoint through a factory.
	pub fn open(
		factory: &dyn ServiceFactory,
		url: &str,
		kind: EndpointKind,
		max_tries: u32,
	) -> Result<Self, TransportError> {
		Ok(Self::new(factory.endpoint(url, kind)?, max_tries))
	}

	pub fn url(&self) -> &str {
		self.endpoint.url()
	}

	pub fn kind(&self) -> EndpointKind {
		self.endpoint.kind()
	}

	pub fn max_tries(&self) -> u32 {
		self.max_tries
	}

	/// Runs a call, retrying transport failures up to `max_tries` attempts.
	///
	/// Attempts follow each other without delay. Status codes reported by
	/// the endpoint are returned as they are; only transport failures count
	/// as failed attempts.
	pub async fn execute(&self, call: &RemoteCall) -> Result<RemoteReply, ConnectorError> {
		let mut attempt = 0;
		loop {
			attempt += 1;
			debug!(
				method = call.method(),
				url = self.url(),
				attempt,
				"remote call"
			);
			match self.endpoint.invoke(call).await {
				Ok(reply) => return Ok(reply),
				Err(e) if attempt >= self.max_tries => {
					warn!(
						method = call.method(),
						url = self.url(),
						"giving up after {} attempts: {}",
						attempt,
						e
					);
					return Err(ConnectorError::Exhausted {
						attempts: attempt,
						last_error: e,
					});
				}
				Err(e) => {
					warn!(
						method = call.method(),
						url = self.url(),
						attempt,
						"remote call failed: {}",
						e
					);
				}
			}
		}
	}
}

impl std::fmt::Debug for ServiceConnector {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ServiceConnector")
			.field("url", &self.url())
			.field("kind", &self.kind())
			.field("max_tries", &self.max_tries)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::{AtomicU32, Ordering};

	struct FlakyEndpoint {
		calls: AtomicU32,
		failures: u32,
	}

	#[async_trait]
	impl ServiceInterface for FlakyEndpoint {
		fn url(&self) -> &str {
			"http://flaky:8008"
		}

		fn kind(&self) -> EndpointKind {
			EndpointKind::Server
		}

		async fn invoke(&self, _call: &RemoteCall) -> Result<RemoteReply, TransportError> {
			let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
			if n <= self.failures {
				Err(TransportError::Http(format!("connection refused #{}", n)))
			} else {
				Ok(RemoteReply::new(RemoteStatus::Running, "", "output"))
			}
		}
	}

	fn knock() -> RemoteCall {
		RemoteCall::Knock {
			job_id: "job-1".into(),
		}
	}

	#[tokio::test]
	async fn test_execute_retries_until_success() {
		let endpoint = Arc::new(FlakyEndpoint {
			calls: AtomicU32::new(0),
			failures: 2,
		});
		let connector = ServiceConnector::new(endpoint.clone(), 5);

		let reply = connector.execute(&knock()).await.unwrap();
		assert_eq!(reply.status, RemoteStatus::Running);
		assert_eq!(endpoint.calls.load(Ordering::SeqCst), 3);
	}

	#[tokio::test]
	async fn test_execute_gives_up_after_max_tries() {
		let endpoint = Arc::new(FlakyEndpoint {
			calls: AtomicU32::new(0),
			failures: u32::MAX,
		});
		let connector = ServiceConnector::new(endpoint.clone(), 4);

		let err = connector.execute(&knock()).await.unwrap_err();
		let ConnectorError::Exhausted {
			attempts,
			last_error,
		} = err;
		assert_eq!(attempts, 4);
		assert_eq!(
			last_error,
			TransportError::Http("connection refused #4".into())
		);
		assert_eq!(endpoint.calls.load(Ordering::SeqCst), 4);
	}

	#[test]
	fn test_exhausted_maps_to_remote_error() {
		let err: CmplError = ConnectorError::Exhausted {
			attempts: 1,
			last_error: TransportError::Status(502),
		}
		.into();
		assert!(matches!(err, CmplError::Remote { .. }));
		assert_eq!(err.to_string(), "CmplServer error: HTTP status 502");
	}

	#[test]
	fn test_method_names() {
		assert_eq!(
			RemoteCall::SchedulerFailed {
				worker_url: "u".into()
			}
			.method(),
			"cmplServerFailed"
		);
		assert_eq!(
			RemoteCall::DisconnectFromScheduler {
				job_id: "j".into()
			}
			.method(),
			"disconnectProblem"
		);
	}
}
