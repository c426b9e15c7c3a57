//! Reader for the option file written by the precompiler.
//!
//! Each non-comment line is a `;` separated record. The first field is the
//! option name, field 9 tells whether a value follows and field 10 holds the
//! quoted value.

use cmpl_types::{CmplError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

const MIN_FIELDS: usize = 11;

/// How the model asked to be run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
	#[default]
	Local,
	RemoteSolve,
	RemoteSend,
	RemoteKnock,
	RemoteRetrieve,
	RemoteCancel,
}

impl RunMode {
	pub fn is_remote(self) -> bool {
		self != Self::Local
	}
}

/// Options collected from a precompiled option file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrecompileArgs {
	/// Model file as named by the `-i` option.
	pub cmpl_file: String,
	/// Model file without its extension.
	pub model_name: String,
	pub url: Option<String>,
	pub max_tries: Option<u32>,
	pub max_time: Option<u64>,
	pub run_mode: RunMode,
	/// Spreadsheet data files. More than one is rejected.
	pub xls_data_files: Vec<String>,
	/// Data and include files in declaration order.
	pub external_files: Vec<String>,
	pub msg_file: Option<String>,
	pub sol_file: Option<String>,
	pub sol_ascii_file: Option<String>,
	pub sol_csv_file: Option<String>,
	/// Matrix or model file output was requested.
	pub file_out: bool,
	pub silent: bool,
	pub solver: String,
}

impl Default for PrecompileArgs {
	fn default() -> Self {
		Self {
			cmpl_file: String::new(),
			model_name: String::new(),
			url: None,
			max_tries: None,
			max_time: None,
			run_mode: RunMode::Local,
			xls_data_files: Vec::new(),
			external_files: Vec::new(),
			msg_file: None,
			sol_file: None,
			sol_ascii_file: None,
			sol_csv_file: None,
			file_out: false,
			silent: false,
			solver: "cbc".to_string(),
		}
	}
}

impl PrecompileArgs {
	pub fn from_file(path: &Path) -> Result<Self> {
		let contents = std::fs::read_to_string(path).map_err(|e| CmplError::file_access(path, e))?;
		Self::parse(&contents)
	}

	pub fn parse(contents: &str) -> Result<Self> {
		if contents.trim().is_empty() {
			return Err(CmplError::Validation(
				"Cannot read options from the option file".into(),
			));
		}

		let mut args = Self::default();

		for (number, line) in contents.lines().enumerate() {
			let line = line.trim();
			if line.is_empty() || line.starts_with('#') {
				continue;
			}

			let fields: Vec<&str> = line.split(';').collect();
			if fields.len() < MIN_FIELDS {
				return Err(CmplError::Validation(format!(
					"option record on line {} has {} fields, expected at least {}",
					number + 1,
					fields.len(),
					MIN_FIELDS
				)));
			}

			let key = fields[0].to_uppercase();
			let value = if fields[9] == "0" { "" } else { fields[10] };
			let unquoted = strip_quotes(value);

			match key.as_str() {
				"I" => {
					args.cmpl_file = unquoted.to_string();
					args.model_name = strip_extension(unquoted);
				}
				"XLSDATA" => {
					let file = if value.is_empty() || unquoted == ":" {
						format!("{}.xdat", args.model_name)
					} else {
						unquoted.to_string()
					};
					args.xls_data_files.push(file);
				}
				"DATA" => {
					let file = if value.is_empty() || unquoted == ":" {
						format!("{}.cdat", args.model_name)
					} else {
						unquoted.to_string()
					};
					args.external_files.push(file);
				}
				"INCLUDE" => args.external_files.push(unquoted.to_string()),
				"URL" => {
					args.url = Some(unquoted.to_string());
					args.run_mode = RunMode::RemoteSolve;
				}
				"SEND" => args.run_mode = RunMode::RemoteSend,
				"KNOCK" => args.run_mode = RunMode::RemoteKnock,
				"RETRIEVE" => args.run_mode = RunMode::RemoteRetrieve,
				"CANCEL" => args.run_mode = RunMode::RemoteCancel,
				"MAXTRIES" => args.max_tries = Some(parse_number(&key, unquoted)?),
				"MAXTIME" => args.max_time = Some(parse_number(&key, unquoted)?),
				"CMSG" => args.msg_file = Some(or_default(unquoted, &args.model_name, "cmsg")),
				"SOLUTION" => args.sol_file = Some(or_default(unquoted, &args.model_name, "csol")),
				"SOLUTIONASCII" => {
					args.sol_ascii_file = Some(or_default(unquoted, &args.model_name, "sol"))
				}
				"SOLUTIONCSV" => {
					args.sol_csv_file = Some(or_default(unquoted, &args.model_name, "csv"))
				}
				"M" | "FM" | "P" | "MATRIX" => args.file_out = true,
				"SILENT" => args.silent = true,
				"SOLVER" => args.solver = unquoted.to_string(),
				_ => {}
			}
		}

		args.validate()?;
		Ok(args)
	}

	pub fn validate(&self) -> Result<()> {
		if self.xls_data_files.len() > 1 {
			return Err(CmplError::Validation(
				"Only one CmplXlsData file per Cmpl model is allowed".into(),
			));
		}
		Ok(())
	}

	pub fn xls_data_file(&self) -> Option<&str> {
		self.xls_data_files.first().map(String::as_str)
	}
}

fn strip_quotes(value: &str) -> &str {
	let mut chars = value.chars();
	chars.next();
	chars.next_back();
	chars.as_str()
}

fn strip_extension(file: &str) -> String {
	Path::new(file)
		.with_extension("")
		.to_string_lossy()
		.into_owned()
}

fn or_default(value: &str, model_name: &str, extension: &str) -> String {
	if value.is_empty() {
		format!("{}.{}", model_name, extension)
	} else {
		value.to_string()
	}
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
	value
		.trim()
		.parse()
		.map_err(|_| CmplError::Validation(format!("invalid value '{}' for option {}", value, key)))
}

#[cfg(test)]
mod tests {
	use super::*;

	fn record(key: &str, value: Option<&str>) -> String {
		match value {
			Some(v) => format!("{};1;0;0;0;0;0;0;0;1;\"{}\"", key, v),
			None => format!("{};1;0;0;0;0;0;0;0;0;", key),
		}
	}

	#[test]
	fn test_parse_collects_files_and_solver() {
		let contents = [
			"# generated".to_string(),
			record("i", Some("models/diet.cmpl")),
			record("data", None),
			record("include", Some("inc/common.cinc")),
			record("solver", Some("glpk")),
			record("maxTries", Some("3")),
			record("cmsg", None),
		]
		.join("\n");

		let args = PrecompileArgs::parse(&contents).unwrap();
		assert_eq!(args.cmpl_file, "models/diet.cmpl");
		assert_eq!(args.model_name, "models/diet");
		assert_eq!(
			args.external_files,
			vec!["models/diet.cdat".to_string(), "inc/common.cinc".to_string()]
		);
		assert_eq!(args.solver, "glpk");
		assert_eq!(args.max_tries, Some(3));
		assert_eq!(args.msg_file.as_deref(), Some("models/diet.cmsg"));
		assert_eq!(args.run_mode, RunMode::Local);
	}

	#[test]
	fn test_parse_run_modes() {
		let contents = [record("url", Some("http://server:8008")), record("send", None)].join("\n");
		let args = PrecompileArgs::parse(&contents).unwrap();
		assert_eq!(args.url.as_deref(), Some("http://server:8008"));
		assert_eq!(args.run_mode, RunMode::RemoteSend);
		assert!(args.run_mode.is_remote());
	}

	#[test]
	fn test_second_spreadsheet_is_rejected() {
		let contents = [
			record("i", Some("diet.cmpl")),
			record("xlsData", Some("a.xdat")),
			record("xlsData", Some("b.xdat")),
		]
		.join("\n");

		assert!(matches!(
			PrecompileArgs::parse(&contents),
			Err(CmplError::Validation(_))
		));
	}

	#[test]
	fn test_short_record_is_rejected() {
		assert!(PrecompileArgs::parse("i;1;0").is_err());
		assert!(PrecompileArgs::parse("   \n").is_err());
	}
}
