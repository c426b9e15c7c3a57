//! Error types for the CMPL client.

use crate::message::MessageRecord;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CmplError>;

#[derive(Error, Debug)]
pub enum CmplError {
	/// Malformed bundle, options or model data. Local and not retryable.
	#[error("Validation error: {0}")]
	Validation(String),

	#[error("IO error for file <{path}>: {message}")]
	FileAccess { path: String, message: String },

	/// Service reported an error, or the transport gave up after retrying.
	#[error("{message}{}", render_messages(.messages))]
	Remote {
		message: String,
		messages: Vec<MessageRecord>,
	},

	#[error("Timeout: {0}")]
	Timeout(String),

	/// Operation invoked in a lifecycle state that does not allow it.
	#[error("{0}")]
	ProtocolState(String),

	#[error("{0}")]
	Cancellation(String),

	#[error("Malformed document: {0}")]
	MalformedDocument(String),
}

impl CmplError {
	pub fn remote(message: impl Into<String>) -> Self {
		Self::Remote {
			message: message.into(),
			messages: Vec::new(),
		}
	}

	pub fn remote_with_messages(message: impl Into<String>, messages: Vec<MessageRecord>) -> Self {
		Self::Remote {
			message: message.into(),
			messages,
		}
	}

	pub fn file_access(path: impl AsRef<std::path::Path>, err: impl std::fmt::Display) -> Self {
		Self::FileAccess {
			path: path.as_ref().display().to_string(),
			message: err.to_string(),
		}
	}

	pub fn protocol(message: impl Into<String>) -> Self {
		Self::ProtocolState(message.into())
	}

	/// Structured compiler messages carried by a remote error.
	pub fn messages(&self) -> &[MessageRecord] {
		match self {
			Self::Remote { messages, .. } => messages,
			_ => &[],
		}
	}
}

fn render_messages(messages: &[MessageRecord]) -> String {
	messages.iter().map(|m| format!("\n{}", m)).collect()
}
