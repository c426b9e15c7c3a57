//! The CmplMessages document.

use cmpl_types::xml::{self, escape_text};
use cmpl_types::{CmplError, MessageRecord, Result};
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// Outcome of compiling and solving as reported in the message document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CmplStatus {
	Ok,
	Warnings,
	Failed,
	Unknown,
}

impl CmplStatus {
	fn from_general_status(status: &str) -> Self {
		match status {
			"normal" => Self::Ok,
			"warning" => Self::Warnings,
			"error" => Self::Failed,
			_ => Self::Unknown,
		}
	}
}

impl std::fmt::Display for CmplStatus {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Ok => write!(f, "CMPL_OK"),
			Self::Warnings => write!(f, "CMPL_WARNINGS"),
			Self::Failed => write!(f, "CMPL_FAILED"),
			Self::Unknown => write!(f, "CMPL_UNKNOWN"),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CmplMessages {
	pub instance_name: String,
	/// Raw `generalStatus` value (`normal`, `warning`, `error`).
	pub general_status: String,
	pub message: String,
	pub cmpl_version: String,
	pub records: Vec<MessageRecord>,
}

impl CmplMessages {
	pub fn parse(document: &str) -> Result<Self> {
		let root = xml::parse(document)?;
		if root.name != "CmplMessages" {
			return Err(CmplError::MalformedDocument(format!(
				"Can't read cmplMessage document - wrong file type <{}>",
				root.name
			)));
		}

		let mut messages = Self::default();
		if let Some(general) = root.child("general") {
			messages.instance_name = file_name(&general.child_text("instanceName")).to_string();
			messages.general_status = general.child_text("generalStatus");
			messages.message = general.child_text("message");
			messages.cmpl_version = general.child_text("cmplVersion");
		}

		if let Some(list) = root.child("messages") {
			for m in list.children_named("message") {
				let location = m.attr("location").unwrap_or_default();
				messages.records.push(MessageRecord::new(
					m.attr("type").unwrap_or_default(),
					m.attr("module").unwrap_or_default(),
					file_name(&model_location(location)),
					m.attr("description").unwrap_or_default(),
				));
			}
		}

		Ok(messages)
	}

	pub fn cmpl_status(&self) -> CmplStatus {
		CmplStatus::from_general_status(&self.general_status)
	}

	pub fn is_failed(&self) -> bool {
		self.cmpl_status() == CmplStatus::Failed
	}

	/// Renders the messages as a CmplMessages document.
	pub fn to_document(&self) -> String {
		let mut doc = String::new();
		doc.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
		doc.push_str("<CmplMessages version=\"1.1\">\n");
		doc.push_str("\t<general>\n");
		let _ = writeln!(doc, "\t\t<instanceName>{}</instanceName>", escape_text(&self.instance_name));
		let _ = writeln!(doc, "\t\t<generalStatus>{}</generalStatus>", escape_text(&self.general_status));
		let _ = writeln!(doc, "\t\t<message>{}</message>", escape_text(&self.message));
		let _ = writeln!(doc, "\t\t<cmplVersion>{}</cmplVersion>", escape_text(&self.cmpl_version));
		doc.push_str("\t</general>\n");

		if !self.records.is_empty() {
			let _ = writeln!(doc, "\t<messages numberOfMessages=\"{}\">", self.records.len());
			for m in &self.records {
				let _ = writeln!(
					doc,
					"\t\t<message type=\"{}\" module=\"{}\" location=\"{}\" description=\"{}\"/>",
					escape_text(&m.kind),
					escape_text(&m.module),
					escape_text(&m.location),
					escape_text(&m.description)
				);
			}
			doc.push_str("\t</messages>\n");
		}

		doc.push_str("</CmplMessages>\n");
		doc
	}
}

/// Maps a location inside a temporary model copy (`<stem>_cmpl__<id>.cmpl...`)
/// back to the user's model (`<stem>.cmpl...`).
fn model_location(location: &str) -> String {
	if let Some(start) = location.find("_cmpl__") {
		if let Some(ext) = location[start..].find(".cmpl") {
			let rest = &location[start + ext + ".cmpl".len()..];
			return format!("{}.cmpl{}", &location[..start], rest);
		}
	}
	location.to_string()
}

fn file_name(path: &str) -> &str {
	path.rsplit(['/', '\\']).next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
	use super::*;

	const FAILED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<CmplMessages version="1.1">
	<general>
		<instanceName>/home/user/models/diet.cmpl</instanceName>
		<generalStatus>error</generalStatus>
		<message>cmpl finished with errors</message>
		<cmplVersion>2.0.0</cmplVersion>
	</general>
	<messages numberOfMessages="1">
		<message type="error" module="compiler" location="/tmp/diet_cmpl__x7k2.cmpl:12" description="syntax error, unexpected &apos;;&apos;"/>
	</messages>
</CmplMessages>
"#;

	#[test]
	fn test_parse_failed_document() {
		let messages = CmplMessages::parse(FAILED).unwrap();
		assert_eq!(messages.instance_name, "diet.cmpl");
		assert_eq!(messages.cmpl_status(), CmplStatus::Failed);
		assert!(messages.is_failed());
		assert_eq!(messages.records.len(), 1);

		let record = &messages.records[0];
		assert_eq!(record.kind, "error");
		assert_eq!(record.location, "diet.cmpl:12");
		assert_eq!(record.description, "syntax error, unexpected ';'");
	}

	#[test]
	fn test_general_status_mapping() {
		for (raw, expected) in [
			("normal", CmplStatus::Ok),
			("warning", CmplStatus::Warnings),
			("error", CmplStatus::Failed),
			("", CmplStatus::Unknown),
		] {
			assert_eq!(CmplStatus::from_general_status(raw), expected);
		}
	}

	#[test]
	fn test_written_document_reads_back() {
		let messages = CmplMessages::parse(FAILED).unwrap();
		let again = CmplMessages::parse(&messages.to_document()).unwrap();
		assert_eq!(again, messages);
	}

	#[test]
	fn test_location_outside_temp_copy_is_kept() {
		assert_eq!(model_location("diet.cmpl:3"), "diet.cmpl:3");
		assert_eq!(file_name("a\\b\\diet.cmpl:3"), "diet.cmpl:3");
	}

	#[test]
	fn test_wrong_document_type() {
		assert!(CmplMessages::parse("<CmplSolutions/>").is_err());
	}
}
