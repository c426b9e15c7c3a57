//! Shared types for the CMPL remote job client.
//!
//! This crate holds the vocabulary every other crate speaks: the status codes
//! returned by a CmplServer or CmplGridScheduler, the addressing mode of a job,
//! the structured messages produced by the compiler, and the common error type.

pub mod errors;
pub mod message;
pub mod mode;
pub mod status;
pub mod xml;

pub use errors::*;
pub use message::*;
pub use mode::*;
pub use status::*;
