//! Status codes reported by remote endpoints.
//!
//! Every remote operation answers with a status code as its first element.
//! The codes below are the integers used on the wire; anything the client
//! does not know about decodes to [`RemoteStatus::Unknown`].

use serde::{Deserialize, Serialize};

/// Status of a job as last reported by a CmplServer or CmplGridScheduler.
///
/// Exactly one status is authoritative for a job at any time, and it is the
/// only input that drives lifecycle transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteStatus {
	/// Nothing known yet (fresh job or after a disconnect).
	Unknown,
	/// Server accepted the request.
	Ok,
	/// Server accepted the job but queues it.
	Busy,
	/// Problem is being compiled or solved.
	Running,
	/// Problem finished; messages and solutions can be fetched.
	Finished,
	/// Compilation or solving failed on the server.
	Failed,
	/// Server reported an error.
	Error,
	/// Problem was canceled.
	Canceled,
	/// Problem was removed from the server.
	Cleaned,
	/// Server knows the job but it has not been started.
	NotRunning,
	/// Scheduler assigned a worker server.
	SchedulerOk,
	/// Scheduler queues the job until a worker is free.
	SchedulerBusy,
	/// Scheduler reported an error.
	SchedulerError,
	/// Scheduler does not know the state of the job.
	SchedulerUnknown,
}

impl RemoteStatus {
	/// Decodes a wire status code.
	pub fn from_code(code: i64) -> Self {
		match code {
			3 => Self::Failed,
			6 => Self::Ok,
			7 => Self::Error,
			8 => Self::Busy,
			9 => Self::Cleaned,
			11 => Self::Running,
			12 => Self::Finished,
			13 => Self::Canceled,
			14 => Self::NotRunning,
			15 => Self::SchedulerUnknown,
			16 => Self::SchedulerOk,
			17 => Self::SchedulerError,
			18 => Self::SchedulerBusy,
			_ => Self::Unknown,
		}
	}

	/// Encodes the status as a wire status code.
	pub fn code(self) -> i64 {
		match self {
			Self::Unknown => 0,
			Self::Failed => 3,
			Self::Ok => 6,
			Self::Error => 7,
			Self::Busy => 8,
			Self::Cleaned => 9,
			Self::Running => 11,
			Self::Finished => 12,
			Self::Canceled => 13,
			Self::NotRunning => 14,
			Self::SchedulerUnknown => 15,
			Self::SchedulerOk => 16,
			Self::SchedulerError => 17,
			Self::SchedulerBusy => 18,
		}
	}

	/// True for statuses that only a scheduler reports.
	pub fn is_scheduler(self) -> bool {
		matches!(
			self,
			Self::SchedulerOk | Self::SchedulerBusy | Self::SchedulerError | Self::SchedulerUnknown
		)
	}

	/// True for statuses that signal an error reported by the remote side.
	pub fn is_error(self) -> bool {
		matches!(self, Self::Error | Self::SchedulerError)
	}

	/// Human readable name, matching the status names used in server output.
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Unknown => "CMPL_UNKNOWN",
			Self::Ok => "CMPLSERVER_OK",
			Self::Busy => "CMPLSERVER_BUSY",
			Self::Running => "PROBLEM_RUNNING",
			Self::Finished => "PROBLEM_FINISHED",
			Self::Failed => "CMPL_FAILED",
			Self::Error => "CMPLSERVER_ERROR",
			Self::Canceled => "PROBLEM_CANCELED",
			Self::Cleaned => "CMPLSERVER_CLEANED",
			Self::NotRunning => "PROBLEM_NOTRUNNING",
			Self::SchedulerOk => "CMPLGRID_SCHEDULER_OK",
			Self::SchedulerBusy => "CMPLGRID_SCHEDULER_BUSY",
			Self::SchedulerError => "CMPLGRID_SCHEDULER_ERROR",
			Self::SchedulerUnknown => "CMPLGRID_SCHEDULER_UNKNOWN",
		}
	}
}

impl Default for RemoteStatus {
	fn default() -> Self {
		Self::Unknown
	}
}

impl std::fmt::Display for RemoteStatus {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_known_codes_survive_encoding() {
		for status in [
			RemoteStatus::Ok,
			RemoteStatus::Error,
			RemoteStatus::Busy,
			RemoteStatus::Running,
			RemoteStatus::Finished,
			RemoteStatus::Canceled,
			RemoteStatus::Cleaned,
			RemoteStatus::SchedulerOk,
			RemoteStatus::SchedulerBusy,
			RemoteStatus::SchedulerError,
		] {
			assert_eq!(RemoteStatus::from_code(status.code()), status);
		}
	}

	#[test]
	fn test_unmapped_code_is_unknown() {
		assert_eq!(RemoteStatus::from_code(99), RemoteStatus::Unknown);
		assert_eq!(RemoteStatus::from_code(-1), RemoteStatus::Unknown);
	}

	#[test]
	fn test_scheduler_classification() {
		assert!(RemoteStatus::SchedulerBusy.is_scheduler());
		assert!(!RemoteStatus::Busy.is_scheduler());
		assert!(RemoteStatus::SchedulerError.is_error());
		assert!(!RemoteStatus::Failed.is_error());
	}
}
