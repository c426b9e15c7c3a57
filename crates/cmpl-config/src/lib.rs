//! Configuration for the CMPL remote job client.
//!
//! Settings come from a TOML, JSON or YAML file, are overridden by a small
//! set of environment variables, and are validated before use. Each job gets
//! its own [`JobSettings`] copy derived from the loaded [`CmplConfig`].

pub mod loader;
pub mod types;

pub use loader::{load_config, ConfigLoader};
pub use types::*;
