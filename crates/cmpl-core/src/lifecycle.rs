//! Lifecycle view of a job.
//!
//! The remote status stays authoritative; [`LifecycleState`] is derived from
//! it and from the addressing mode so that transitions can be checked and
//! logged in one place.

use cmpl_types::{RemoteStatus, ServerMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Addressing {
	Standalone,
	Grid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
	Unknown,
	Connecting,
	SchedulerBusy,
	Connected(Addressing),
	Running,
	Finished,
	Canceled,
	Error,
	Cleaned,
}

impl std::fmt::Display for LifecycleState {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Unknown => write!(f, "Unknown"),
			Self::Connecting => write!(f, "Connecting"),
			Self::SchedulerBusy => write!(f, "SchedulerBusy"),
			Self::Connected(Addressing::Standalone) => write!(f, "Connected(standalone)"),
			Self::Connected(Addressing::Grid) => write!(f, "Connected(grid)"),
			Self::Running => write!(f, "Running"),
			Self::Finished => write!(f, "Finished"),
			Self::Canceled => write!(f, "Canceled"),
			Self::Error => write!(f, "Error"),
			Self::Cleaned => write!(f, "Cleaned"),
		}
	}
}

impl LifecycleState {
	pub fn from_status(status: RemoteStatus, mode: &ServerMode) -> Self {
		let addressing = if mode.is_grid() {
			Addressing::Grid
		} else {
			Addressing::Standalone
		};

		match status {
			RemoteStatus::Unknown => Self::Unknown,
			RemoteStatus::Ok | RemoteStatus::NotRunning | RemoteStatus::SchedulerOk => {
				Self::Connected(addressing)
			}
			// queued on the server counts as accepted
			RemoteStatus::Busy | RemoteStatus::Running => Self::Running,
			RemoteStatus::Finished => Self::Finished,
			RemoteStatus::Canceled => Self::Canceled,
			RemoteStatus::Failed | RemoteStatus::Error | RemoteStatus::SchedulerError => Self::Error,
			RemoteStatus::Cleaned => Self::Cleaned,
			RemoteStatus::SchedulerBusy | RemoteStatus::SchedulerUnknown => Self::SchedulerBusy,
		}
	}

	pub fn is_terminal(self) -> bool {
		matches!(self, Self::Error | Self::Cleaned)
	}

	pub fn is_valid_transition(from: LifecycleState, to: LifecycleState) -> bool {
		use LifecycleState::*;

		match (from, to) {
			(a, b) if a == b => true,
			(Unknown | Cleaned | Error, Connecting) => true,
			(Connecting, Connected(_) | SchedulerBusy | Unknown) => true,
			(SchedulerBusy, Connected(Addressing::Grid) | SchedulerBusy) => true,
			(Connected(_), Connected(Addressing::Grid) | Running | Finished | Canceled) => true,
			(Running, Connected(_) | Finished | Canceled) => true,
			(Finished, Canceled) => true,
			// disconnect
			(_, Unknown) => true,
			(_, Error | Cleaned) => true,
			_ => false,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_state_from_status() {
		let grid = ServerMode::Grid {
			scheduler_url: "http://s".into(),
			worker_url: Some("http://w".into()),
		};
		let standalone = ServerMode::Standalone {
			url: "http://w".into(),
		};

		assert_eq!(
			LifecycleState::from_status(RemoteStatus::Ok, &standalone),
			LifecycleState::Connected(Addressing::Standalone)
		);
		assert_eq!(
			LifecycleState::from_status(RemoteStatus::SchedulerOk, &grid),
			LifecycleState::Connected(Addressing::Grid)
		);
		assert_eq!(
			LifecycleState::from_status(RemoteStatus::Busy, &grid),
			LifecycleState::Running
		);
		assert_eq!(
			LifecycleState::from_status(RemoteStatus::Failed, &grid),
			LifecycleState::Error
		);
	}

	#[test]
	fn test_transitions() {
		use LifecycleState::*;

		assert!(LifecycleState::is_valid_transition(Unknown, Connecting));
		assert!(LifecycleState::is_valid_transition(Connecting, SchedulerBusy));
		assert!(LifecycleState::is_valid_transition(
			SchedulerBusy,
			Connected(Addressing::Grid)
		));
		assert!(LifecycleState::is_valid_transition(Running, Finished));
		assert!(LifecycleState::is_valid_transition(Finished, Cleaned));
		assert!(LifecycleState::is_valid_transition(Running, Error));

		assert!(!LifecycleState::is_valid_transition(Cleaned, Running));
		assert!(!LifecycleState::is_valid_transition(Unknown, Finished));
		assert!(!LifecycleState::is_valid_transition(Canceled, Running));
	}
}
