//! Turns message and solution documents into job results.
//!
//! The documents are produced by the CMPL toolchain, either on a CmplServer
//! (fetched with `getCmplMessages` / `getSolutions`) or locally (read from
//! the `.cmsg` / `.csol` files). [`ResultAssembler`] parses both and checks
//! the compile status; [`JobResults`] gives named access to the solutions.

pub mod messages;
pub mod solution;

pub use messages::{CmplMessages, CmplStatus};
pub use solution::{
	parse_number, ElementRef, IndexValue, IndexedElements, Solution, SolutionElement, SolutionSet,
};

use cmpl_types::{CmplError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Parses the documents returned for a finished job.
pub struct ResultAssembler;

impl ResultAssembler {
	/// Parses a message document and fails if compiling or solving failed.
	///
	/// The returned error carries the structured message list.
	pub fn checked_messages(document: &str) -> Result<CmplMessages> {
		let messages = CmplMessages::parse(document)?;
		if messages.is_failed() {
			return Err(CmplError::remote_with_messages(
				"Cmpl finished with errors",
				messages.records.clone(),
			));
		}
		Ok(messages)
	}

	/// Combines already checked messages with the solution document.
	pub fn assemble(messages: CmplMessages, solution_document: &str) -> Result<JobResults> {
		let solutions = if solution_document.trim().is_empty() {
			SolutionSet::default()
		} else {
			SolutionSet::parse(solution_document)?
		};
		debug!(
			nr_of_solutions = solutions.nr_of_solutions,
			status = %messages.cmpl_status(),
			"assembled results"
		);
		Ok(JobResults {
			messages,
			solutions,
		})
	}

	/// Parses and checks both documents in one step.
	pub fn from_documents(message_document: &str, solution_document: &str) -> Result<JobResults> {
		let messages = Self::checked_messages(message_document)?;
		Self::assemble(messages, solution_document)
	}
}

/// Messages and solutions of a finished job.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct JobResults {
	pub messages: CmplMessages,
	pub solutions: SolutionSet,
}

impl JobResults {
	pub fn cmpl_status(&self) -> CmplStatus {
		self.messages.cmpl_status()
	}

	pub fn cmpl_status_text(&self) -> &str {
		&self.messages.message
	}

	pub fn nr_of_solutions(&self) -> usize {
		self.solutions.nr_of_solutions
	}

	/// Status reported by the solver for the first solution.
	pub fn solver_status(&self) -> Option<&str> {
		self.solutions.solution(0).map(|s| s.status.as_str())
	}

	pub fn solution(&self) -> Option<&Solution> {
		self.solutions.solution(0)
	}

	fn solution_by_nr(&self, solution_nr: usize) -> Result<&Solution> {
		if self.solutions.solutions.is_empty() {
			return Err(CmplError::Validation("No Solution found so far".into()));
		}
		self.solutions.solution(solution_nr).ok_or_else(|| {
			CmplError::Validation(format!(
				"Solution with index {} doesn't exist.",
				solution_nr
			))
		})
	}

	/// Looks up a variable by its declared name in the given solution.
	pub fn variable_by_name(&self, name: &str, solution_nr: usize) -> Result<ElementRef<'_>> {
		self.solution_by_nr(solution_nr)?
			.variable(name)
			.ok_or_else(|| CmplError::Validation(format!("{} does not exist.", name)))
	}

	/// Looks up a constraint by its declared name in the given solution.
	pub fn constraint_by_name(&self, name: &str, solution_nr: usize) -> Result<ElementRef<'_>> {
		self.solution_by_nr(solution_nr)?
			.constraint(name)
			.ok_or_else(|| CmplError::Validation(format!("{} does not exist.", name)))
	}
}
