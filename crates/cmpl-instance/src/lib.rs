//! Submission bundles for remote CMPL jobs.
//!
//! A bundle is everything a CmplServer needs to run one problem: the
//! precompiled model artifacts, external data files under short aliases, the
//! option list and the job id. [`InstanceBuilder`] collects the files,
//! [`document`] turns a bundle into the instance document sent over the wire
//! and back.

pub mod args;
pub mod builder;
pub mod bundle;
pub mod data;
pub mod document;

pub use args::{PrecompileArgs, RunMode};
pub use builder::{InstanceBuilder, PrecompiledModel};
pub use bundle::{ProblemFile, SubmissionBundle};
pub use data::{ArrayEntry, CmplParameter, CmplSet, DataValue, ModelData, ParameterValues, SetValues};
