//! Remote and local solving of CMPL models.
//!
//! [`JobEngine`] drives one job through its lifecycle: precompiling the
//! model, connecting to a CmplServer or CmplGridScheduler, sending the
//! problem, polling, retrieving results and cleaning up. Every job owns its
//! connectors and settings, so jobs can run side by side on separate tasks.

pub mod engine;
pub mod job;
pub mod lifecycle;
pub mod output;
pub mod snapshot;
mod solve;
pub mod temp;
pub mod toolchain;

#[cfg(test)]
mod test_support;

pub use engine::{JobEngine, JobEngineBuilder};
pub use job::{Job, OptionList};
pub use lifecycle::{Addressing, LifecycleState};
pub use output::{CapturedOutput, ConsoleOutput, OutputSink, SilentOutput};
pub use snapshot::JobSnapshot;
pub use toolchain::{CmplBinary, Toolchain};
