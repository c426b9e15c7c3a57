//! Sets and parameters handed to a model as CMPL data (`.cdat`) text.

use cmpl_types::{CmplError, Result};
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// A single data value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DataValue {
	Int(i64),
	Float(f64),
	Text(String),
}

impl DataValue {
	/// Formats the value as a set element or index; floats are truncated.
	fn write_index(&self, out: &mut String) {
		match self {
			Self::Int(i) => {
				let _ = write!(out, "{} ", i);
			}
			Self::Float(f) => {
				let _ = write!(out, "{} ", f.trunc() as i64);
			}
			Self::Text(s) => {
				let _ = write!(out, "\"{}\" ", s);
			}
		}
	}

	/// Formats the value as a parameter value.
	fn write_value(&self, out: &mut String) {
		match self {
			Self::Int(i) => {
				let _ = write!(out, "{}", i);
			}
			Self::Float(f) => {
				let _ = write!(out, "{}", f);
			}
			Self::Text(s) => {
				let _ = write!(out, "\"{}\"", s);
			}
		}
	}
}

impl From<i64> for DataValue {
	fn from(v: i64) -> Self {
		Self::Int(v)
	}
}

impl From<i32> for DataValue {
	fn from(v: i32) -> Self {
		Self::Int(v.into())
	}
}

impl From<f64> for DataValue {
	fn from(v: f64) -> Self {
		Self::Float(v)
	}
}

impl From<&str> for DataValue {
	fn from(v: &str) -> Self {
		Self::Text(v.to_string())
	}
}

impl From<String> for DataValue {
	fn from(v: String) -> Self {
		Self::Text(v)
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SetValues {
	/// Flat list, read `rank` values at a time.
	Enumeration { values: Vec<DataValue> },
	/// Explicit tuples; each must have `rank` entries.
	Tuples { tuples: Vec<Vec<DataValue>> },
	/// `start..end`
	Range { start: i64, end: i64 },
	/// `start(step)end`
	Step { start: i64, step: i64, end: i64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CmplSet {
	pub name: String,
	pub rank: usize,
	pub values: SetValues,
}

impl CmplSet {
	pub fn enumeration(name: impl Into<String>, values: Vec<DataValue>) -> Self {
		Self {
			name: name.into(),
			rank: 1,
			values: SetValues::Enumeration { values },
		}
	}

	pub fn tuples(name: impl Into<String>, rank: usize, tuples: Vec<Vec<DataValue>>) -> Self {
		Self {
			name: name.into(),
			rank,
			values: SetValues::Tuples { tuples },
		}
	}

	pub fn range(name: impl Into<String>, start: i64, end: i64) -> Self {
		Self {
			name: name.into(),
			rank: 1,
			values: SetValues::Range { start, end },
		}
	}

	pub fn step(name: impl Into<String>, start: i64, step: i64, end: i64) -> Self {
		Self {
			name: name.into(),
			rank: 1,
			values: SetValues::Step { start, step, end },
		}
	}

	fn validate(&self) -> Result<()> {
		if self.rank == 0 {
			return Err(CmplError::Validation(format!(
				"set {} must have a rank of at least 1",
				self.name
			)));
		}
		match &self.values {
			SetValues::Enumeration { values } => {
				if values.is_empty() {
					return Err(CmplError::Validation(format!("set {} is empty", self.name)));
				}
				if values.len() % self.rank != 0 {
					return Err(CmplError::Validation(format!(
						"set {} has {} values which is not a multiple of its rank {}",
						self.name,
						values.len(),
						self.rank
					)));
				}
			}
			SetValues::Tuples { tuples } => {
				if tuples.is_empty() {
					return Err(CmplError::Validation(format!("set {} is empty", self.name)));
				}
				if let Some(bad) = tuples.iter().find(|t| t.len() != self.rank) {
					return Err(CmplError::Validation(format!(
						"set {} contains unexpected data {:?}",
						self.name, bad
					)));
				}
			}
			SetValues::Step { step: 0, .. } => {
				return Err(CmplError::Validation(format!(
					"set {} has a step of 0",
					self.name
				)));
			}
			_ => {}
		}
		Ok(())
	}

	fn write(&self, out: &mut String) {
		let _ = write!(out, "%{}", self.name);
		if self.rank > 1 {
			let _ = write!(out, " set[{}] < ", self.rank);
		} else {
			out.push_str(" set < ");
		}

		match &self.values {
			SetValues::Enumeration { values } => {
				out.push('\n');
				for chunk in values.chunks(self.rank) {
					for v in chunk {
						v.write_index(out);
					}
					out.push('\n');
				}
			}
			SetValues::Tuples { tuples } => {
				out.push('\n');
				for tuple in tuples {
					for v in tuple {
						v.write_index(out);
					}
					out.push('\n');
				}
			}
			SetValues::Range { start, end } => {
				let _ = write!(out, "{}..{} ", start, end);
			}
			SetValues::Step { start, step, end } => {
				let _ = write!(out, "{}({}){} ", start, step, end);
			}
		}

		out.push_str(">\n");
	}
}

/// Entry of an array-valued parameter; nested lists form further dimensions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArrayEntry {
	Value(DataValue),
	List(Vec<ArrayEntry>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ParameterValues {
	Scalar { value: DataValue },
	Array { entries: Vec<ArrayEntry> },
	/// Sparse values keyed by index tuple, with an optional default.
	Indexed {
		entries: Vec<(Vec<DataValue>, DataValue)>,
		default: Option<DataValue>,
	},
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CmplParameter {
	pub name: String,
	/// Names of the sets the parameter is defined over.
	pub sets: Vec<String>,
	pub values: ParameterValues,
}

impl CmplParameter {
	pub fn scalar(name: impl Into<String>, value: impl Into<DataValue>) -> Self {
		Self {
			name: name.into(),
			sets: Vec::new(),
			values: ParameterValues::Scalar {
				value: value.into(),
			},
		}
	}

	pub fn array(name: impl Into<String>, sets: &[&str], entries: Vec<ArrayEntry>) -> Self {
		Self {
			name: name.into(),
			sets: sets.iter().map(|s| s.to_string()).collect(),
			values: ParameterValues::Array { entries },
		}
	}

	pub fn indexed(
		name: impl Into<String>,
		sets: &[&str],
		entries: Vec<(Vec<DataValue>, DataValue)>,
		default: Option<DataValue>,
	) -> Self {
		Self {
			name: name.into(),
			sets: sets.iter().map(|s| s.to_string()).collect(),
			values: ParameterValues::Indexed { entries, default },
		}
	}

	fn validate(&self, sets: &[CmplSet]) -> Result<()> {
		for set in &self.sets {
			if !sets.iter().any(|s| &s.name == set) {
				return Err(CmplError::Validation(format!(
					"The set {} used for the parameter {} doesn't exist.",
					set, self.name
				)));
			}
		}

		match (&self.values, self.sets.is_empty()) {
			(ParameterValues::Scalar { .. }, true) => Ok(()),
			(ParameterValues::Scalar { .. }, false) => Err(CmplError::Validation(format!(
				"parameter {} is defined over sets but has a single value",
				self.name
			))),
			(_, true) => Err(CmplError::Validation(format!(
				"parameter {} has several values but no defining set",
				self.name
			))),
			(ParameterValues::Array { entries }, false) if entries.is_empty() => Err(
				CmplError::Validation(format!("parameter {} is empty", self.name)),
			),
			(
				ParameterValues::Indexed {
					entries,
					default: None,
				},
				false,
			) if entries.is_empty() => Err(CmplError::Validation(format!(
				"parameter {} is empty",
				self.name
			))),
			_ => Ok(()),
		}
	}

	fn write(&self, out: &mut String) {
		let _ = write!(out, "%{}", self.name);

		match &self.values {
			ParameterValues::Scalar { value } => {
				out.push_str(" < ");
				value.write_value(out);
				out.push_str(" >\n");
			}
			ParameterValues::Array { entries } => {
				let _ = write!(out, "[{}] ", self.sets.join(","));
				out.push_str(" <\n");
				for entry in entries {
					match entry {
						ArrayEntry::List(list) => write_list(list, out),
						ArrayEntry::Value(v) => {
							v.write_value(out);
							out.push_str(if matches!(v, DataValue::Text(_)) { " \n" } else { "\n" });
						}
					}
				}
				out.push_str(">\n");
			}
			ParameterValues::Indexed { entries, default } => {
				let _ = write!(out, "[{}] ", self.sets.join(","));
				if let Some(default) = default {
					out.push_str(" = ");
					default.write_value(out);
					out.push(' ');
				}
				out.push_str(" indices <\n");
				for (index, value) in entries {
					for i in index {
						i.write_index(out);
					}
					value.write_value(out);
					out.push_str(if matches!(value, DataValue::Text(_)) { " \n" } else { "\n" });
				}
				out.push_str(">\n");
			}
		}
	}
}

fn write_list(entries: &[ArrayEntry], out: &mut String) {
	for entry in entries {
		match entry {
			ArrayEntry::List(inner) => write_list(inner, out),
			ArrayEntry::Value(v) => {
				v.write_value(out);
				out.push(' ');
			}
		}
	}
	out.push('\n');
}

/// Sets and parameters of one model, in declaration order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ModelData {
	pub sets: Vec<CmplSet>,
	pub parameters: Vec<CmplParameter>,
}

impl ModelData {
	/// Adds a set, replacing an earlier one with the same name.
	pub fn set_set(&mut self, set: CmplSet) {
		match self.sets.iter_mut().find(|s| s.name == set.name) {
			Some(existing) => *existing = set,
			None => self.sets.push(set),
		}
	}

	/// Adds a parameter, replacing an earlier one with the same name.
	pub fn set_parameter(&mut self, parameter: CmplParameter) {
		match self
			.parameters
			.iter_mut()
			.find(|p| p.name == parameter.name)
		{
			Some(existing) => *existing = parameter,
			None => self.parameters.push(parameter),
		}
	}

	pub fn is_empty(&self) -> bool {
		self.sets.is_empty() && self.parameters.is_empty()
	}

	/// Renders the data as `.cdat` text; empty when nothing was declared.
	pub fn to_cdat(&self) -> Result<String> {
		let mut out = String::new();
		for set in &self.sets {
			set.validate()?;
			set.write(&mut out);
		}
		for parameter in &self.parameters {
			parameter.validate(&self.sets)?;
			parameter.write(&mut out);
		}
		Ok(out)
	}
}
