//! The CmplInstance document.
//!
//! ```text
//! <CmplInstance version="2.0">
//!   <general> name, jobId, preComp </general>
//!   <options> <opt>..</opt>* </options>          (omitted when empty)
//!   <problemFiles> <file name="alias">..</file>* </problemFiles>
//! </CmplInstance>
//! ```
//!
//! File contents and options are written without padding so that reading a
//! document back yields byte-identical values.

use crate::bundle::{ProblemFile, SubmissionBundle};
use cmpl_types::xml::{self, escape_text};
use cmpl_types::{CmplError, Result};
use std::fmt::Write;

pub const INSTANCE_VERSION: &str = "2.0";

/// Serializes a bundle into an instance document.
pub fn to_document(bundle: &SubmissionBundle) -> String {
	let mut doc = String::new();
	doc.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n");
	let _ = writeln!(doc, "<CmplInstance version=\"{}\">", INSTANCE_VERSION);
	doc.push_str("<general>\n");
	let _ = writeln!(doc, "<name>{}</name>", escape_text(&bundle.name));
	let _ = writeln!(doc, "<jobId>{}</jobId>", escape_text(&bundle.job_id));
	let _ = writeln!(
		doc,
		"<preComp>{}</preComp>",
		if bundle.pre_comp { "yes" } else { "no" }
	);
	doc.push_str("</general>\n");

	if !bundle.options.is_empty() {
		doc.push_str("<options>\n");
		for opt in &bundle.options {
			let _ = writeln!(doc, "<opt>{}</opt>", escape_text(opt));
		}
		doc.push_str("</options>\n");
	}

	doc.push_str("<problemFiles>\n");
	for file in &bundle.files {
		let _ = writeln!(
			doc,
			"<file name=\"{}\">{}</file>",
			escape_text(&file.name),
			escape_text(&file.content)
		);
	}
	doc.push_str("</problemFiles>\n");
	doc.push_str("</CmplInstance>\n");
	doc
}

/// Reads an instance document back into a bundle.
pub fn from_document(document: &str) -> Result<SubmissionBundle> {
	let root = xml::parse(document)?;
	if root.name != "CmplInstance" {
		return Err(CmplError::MalformedDocument(format!(
			"expected <CmplInstance>, found <{}>",
			root.name
		)));
	}

	let general = root
		.child("general")
		.ok_or_else(|| CmplError::MalformedDocument("instance without <general>".into()))?;

	let pre_comp = match general.child_text("preComp").as_str() {
		"yes" => true,
		"no" | "" => false,
		other => {
			return Err(CmplError::MalformedDocument(format!(
				"invalid preComp value '{}'",
				other
			)))
		}
	};

	let options = root
		.child("options")
		.map(|opts| opts.children_named("opt").map(|o| o.text()).collect())
		.unwrap_or_default();

	let mut files = Vec::new();
	if let Some(problem_files) = root.child("problemFiles") {
		for file in problem_files.children_named("file") {
			let name = file
				.attr("name")
				.ok_or_else(|| CmplError::MalformedDocument("<file> without name".into()))?;
			files.push(ProblemFile {
				name: name.to_string(),
				content: file.text(),
			});
		}
	}

	let exact = |name: &str| general.child(name).map(|c| c.text()).unwrap_or_default();
	Ok(SubmissionBundle {
		name: exact("name"),
		job_id: exact("jobId"),
		pre_comp,
		options,
		files,
	})
}
