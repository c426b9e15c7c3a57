//! The CmplSolutions document and named access to its elements.

use cmpl_types::xml::{self, XmlElement};
use cmpl_types::{CmplError, Result};
use serde::{Deserialize, Serialize};

/// One variable or constraint of a solution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolutionElement {
	pub idx: usize,
	/// Full name including the index, e.g. `x[1,"a"]`.
	pub name: String,
	/// `C`, `I` or `B` for variables; `L`, `E`, `G` or `N` for constraints.
	pub kind: String,
	pub activity: f64,
	pub lower_bound: f64,
	pub upper_bound: f64,
	/// NaN when the solver reports no marginal.
	pub marginal: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solution {
	pub idx: usize,
	pub status: String,
	pub value: f64,
	pub variables: Vec<SolutionElement>,
	pub constraints: Vec<SolutionElement>,
}

/// Index component of an indexed element name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndexValue {
	Int(i64),
	Text(String),
}

impl IndexValue {
	fn parse(raw: &str) -> Self {
		let raw = raw.trim();
		match raw.parse() {
			Ok(i) => Self::Int(i),
			Err(_) => Self::Text(raw.trim_matches('"').to_string()),
		}
	}
}

impl From<i64> for IndexValue {
	fn from(v: i64) -> Self {
		Self::Int(v)
	}
}

impl From<i32> for IndexValue {
	fn from(v: i32) -> Self {
		Self::Int(v.into())
	}
}

impl From<&str> for IndexValue {
	fn from(v: &str) -> Self {
		Self::Text(v.to_string())
	}
}

/// Elements of one indexed name, in document order.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedElements<'a> {
	pub entries: Vec<(Vec<IndexValue>, &'a SolutionElement)>,
}

impl<'a> IndexedElements<'a> {
	pub fn get(&self, index: &[IndexValue]) -> Option<&'a SolutionElement> {
		self.entries
			.iter()
			.find(|(key, _)| key.as_slice() == index)
			.map(|(_, e)| *e)
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = &'a SolutionElement> + '_ {
		self.entries.iter().map(|(_, e)| *e)
	}
}

/// Result of a lookup by declared name.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementRef<'a> {
	Scalar(&'a SolutionElement),
	Indexed(IndexedElements<'a>),
}

impl<'a> ElementRef<'a> {
	pub fn as_scalar(&self) -> Option<&'a SolutionElement> {
		match self {
			Self::Scalar(e) => Some(*e),
			Self::Indexed(_) => None,
		}
	}

	pub fn as_indexed(&self) -> Option<&IndexedElements<'a>> {
		match self {
			Self::Indexed(i) => Some(i),
			Self::Scalar(_) => None,
		}
	}
}

/// Splits `x[1,a]` into `("x", Some([1, "a"]))`.
fn split_name(name: &str) -> (&str, Option<Vec<IndexValue>>) {
	match name.find('[') {
		Some(pos) => {
			let inner = name[pos + 1..].strip_suffix(']').unwrap_or(&name[pos + 1..]);
			(
				&name[..pos],
				Some(inner.split(',').map(IndexValue::parse).collect()),
			)
		}
		None => (name, None),
	}
}

fn lookup<'a>(elements: &'a [SolutionElement], name: &str) -> Option<ElementRef<'a>> {
	let mut scalar = None;
	let mut indexed = Vec::new();

	for element in elements {
		match split_name(&element.name) {
			(base, Some(index)) if base == name => indexed.push((index, element)),
			(base, None) if base == name => scalar = Some(element),
			_ => {}
		}
	}

	if !indexed.is_empty() {
		Some(ElementRef::Indexed(IndexedElements { entries: indexed }))
	} else {
		scalar.map(ElementRef::Scalar)
	}
}

impl Solution {
	pub fn variable(&self, name: &str) -> Option<ElementRef<'_>> {
		lookup(&self.variables, name)
	}

	pub fn constraint(&self, name: &str) -> Option<ElementRef<'_>> {
		lookup(&self.constraints, name)
	}
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SolutionSet {
	pub instance_name: String,
	pub nr_of_variables: usize,
	pub nr_of_constraints: usize,
	pub objective_name: String,
	pub objective_sense: String,
	pub nr_of_solutions: usize,
	pub solver_name: String,
	pub solver_msg: String,
	pub var_display_options: String,
	pub con_display_options: String,
	pub solutions: Vec<Solution>,
}

impl SolutionSet {
	pub fn parse(document: &str) -> Result<Self> {
		let root = xml::parse(document)?;
		if root.name != "CmplSolutions" {
			return Err(CmplError::MalformedDocument(format!(
				"Can't read cmplSolution document - wrong file type <{}>",
				root.name
			)));
		}

		let mut set = Self::default();
		if let Some(general) = root.child("general") {
			set.instance_name = general.child_text("instanceName");
			set.nr_of_variables = count(general, "nrOfVariables")?;
			set.nr_of_constraints = count(general, "nrOfConstraints")?;
			set.objective_name = general.child_text("objectiveName");
			set.objective_sense = general.child_text("objectiveSense");
			set.nr_of_solutions = count(general, "nrOfSolutions")?;
			set.solver_name = general.child_text("solverName");
			set.solver_msg = general.child_text("solverMsg");
			set.var_display_options = general.child_text("variablesDisplayOptions");
			set.con_display_options = general.child_text("constraintsDisplayOptions");
		}

		for solution in root.children_named("solution") {
			set.solutions.push(Solution {
				idx: solution.attr("idx").map(parse_index).transpose()?.unwrap_or(0),
				status: solution.attr("status").unwrap_or_default().to_string(),
				value: parse_number(solution.attr("value").unwrap_or_default())?,
				variables: elements(solution, "variables", "variable")?,
				constraints: elements(solution, "linearConstraints", "constraint")?,
			});
		}

		if set.nr_of_solutions == 0 {
			set.nr_of_solutions = set.solutions.len();
		}
		Ok(set)
	}

	/// True if any variable is integer or binary.
	pub fn is_integer_program(&self) -> bool {
		self.solutions
			.first()
			.map(|s| s.variables.iter().any(|v| v.kind == "I" || v.kind == "B"))
			.unwrap_or(false)
	}

	pub fn solution(&self, nr: usize) -> Option<&Solution> {
		self.solutions.get(nr)
	}
}

fn elements(solution: &XmlElement, section: &str, tag: &str) -> Result<Vec<SolutionElement>> {
	let Some(section) = solution.child(section) else {
		return Ok(Vec::new());
	};

	section
		.children_named(tag)
		.map(|e| {
			Ok(SolutionElement {
				idx: e.attr("idx").map(parse_index).transpose()?.unwrap_or(0),
				name: e.attr("name").unwrap_or_default().to_string(),
				kind: e.attr("type").unwrap_or_default().to_string(),
				activity: parse_number(e.attr("activity").unwrap_or_default())?,
				lower_bound: parse_number(e.attr("lowerBound").unwrap_or("-INF"))?,
				upper_bound: parse_number(e.attr("upperBound").unwrap_or("INF"))?,
				marginal: parse_number(e.attr("marginal").unwrap_or("-"))?,
			})
		})
		.collect()
}

fn count(general: &XmlElement, name: &str) -> Result<usize> {
	let text = general.child_text(name);
	if text.is_empty() {
		return Ok(0);
	}
	parse_index(&text)
}

fn parse_index(raw: &str) -> Result<usize> {
	raw.trim()
		.parse()
		.map_err(|_| CmplError::MalformedDocument(format!("invalid count or index '{}'", raw)))
}

/// Parses solver numbers, including `INF`, `-INF`, `Infinity` and the
/// `-` placeholder for values the solver does not report.
pub fn parse_number(raw: &str) -> Result<f64> {
	match raw.trim() {
		"INF" | "Infinity" | "inf" | "+INF" => Ok(f64::INFINITY),
		"-INF" | "-Infinity" | "-inf" => Ok(f64::NEG_INFINITY),
		"-" | "" | "NaN" => Ok(f64::NAN),
		other => other
			.parse()
			.map_err(|_| CmplError::MalformedDocument(format!("invalid number '{}'", other))),
	}
}

#[cfg(test)]
pub(crate) mod tests {
	use super::*;

	pub(crate) const ONE_SOLUTION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<CmplSolutions version="1.0">
	<general>
		<instanceName>transport.cmpl</instanceName>
		<nrOfVariables>3</nrOfVariables>
		<nrOfConstraints>1</nrOfConstraints>
		<objectiveName>costs</objectiveName>
		<objectiveSense>min</objectiveSense>
		<nrOfSolutions>1</nrOfSolutions>
		<solverName>CBC</solverName>
		<solverMsg>Optimal solution found</solverMsg>
		<variablesDisplayOptions>(all)</variablesDisplayOptions>
		<constraintsDisplayOptions>(all)</constraintsDisplayOptions>
	</general>
	<solution idx="0" status="optimal" value="42.5">
		<variables>
			<variable idx="0" name="x[1,a]" type="C" activity="1.5" lowerBound="0" upperBound="INF" marginal="0"/>
			<variable idx="1" name="x[2,b]" type="C" activity="0" lowerBound="0" upperBound="INF" marginal="3"/>
			<variable idx="2" name="open" type="B" activity="1" lowerBound="0" upperBound="1" marginal="-"/>
		</variables>
		<linearConstraints>
			<constraint idx="0" name="demand" type="G" activity="10" lowerBound="10" upperBound="INF" marginal="2"/>
		</linearConstraints>
	</solution>
</CmplSolutions>
"#;

	#[test]
	fn test_parse_solution_document() {
		let set = SolutionSet::parse(ONE_SOLUTION).unwrap();
		assert_eq!(set.nr_of_solutions, 1);
		assert_eq!(set.nr_of_variables, 3);
		assert_eq!(set.objective_sense, "min");
		assert_eq!(set.solver_name, "CBC");
		assert!(set.is_integer_program());

		let solution = set.solution(0).unwrap();
		assert_eq!(solution.value, 42.5);
		assert_eq!(solution.variables[0].upper_bound, f64::INFINITY);
		assert!(solution.variables[2].marginal.is_nan());
		assert_eq!(solution.constraints[0].kind, "G");
	}

	#[test]
	fn test_named_lookup() {
		let set = SolutionSet::parse(ONE_SOLUTION).unwrap();
		let solution = set.solution(0).unwrap();

		let x = solution.variable("x").unwrap();
		let x = x.as_indexed().unwrap();
		assert_eq!(x.len(), 2);
		assert_eq!(
			x.get(&[2.into(), "b".into()]).unwrap().marginal,
			3.0
		);
		assert!(x.get(&[3.into(), "b".into()]).is_none());

		let open = solution.variable("open").unwrap();
		assert_eq!(open.as_scalar().unwrap().activity, 1.0);

		assert!(solution.constraint("demand").unwrap().as_scalar().is_some());
		assert!(solution.variable("xx").is_none());
		assert!(solution.variable("ope").is_none());
	}

	#[test]
	fn test_number_parsing() {
		assert_eq!(parse_number("-Infinity").unwrap(), f64::NEG_INFINITY);
		assert_eq!(parse_number(" 1e3 ").unwrap(), 1000.0);
		assert!(parse_number("abc").is_err());
	}

	#[test]
	fn test_split_name_with_text_index() {
		let (base, index) = split_name("y[\"north\",3]");
		assert_eq!(base, "y");
		assert_eq!(
			index.unwrap(),
			vec![IndexValue::Text("north".into()), IndexValue::Int(3)]
		);
	}
}
