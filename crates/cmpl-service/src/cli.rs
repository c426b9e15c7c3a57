//! Command-line interface definitions.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "cmpl-remote")]
#[command(about = "Solve CMPL models on a CmplServer or CmplGridScheduler", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
	/// Path to configuration file (toml, json or yaml)
	#[arg(short, long, env = "CMPL_CONFIG")]
	pub config: Option<PathBuf>,

	/// Log level (trace, debug, info, warn, error)
	#[arg(long, env = "CMPL_LOG_LEVEL")]
	pub log_level: Option<String>,

	#[command(subcommand)]
	pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
	/// Solve a model and wait for the results
	Solve(JobArgs),

	/// Send a model to a CmplServer and return right away
	Send(JobArgs),

	/// Ask the CmplServer for the state of a sent model
	Knock(JobArgs),

	/// Fetch the results of a finished model
	Retrieve(JobArgs),

	/// Cancel a sent model
	Cancel(JobArgs),

	/// Validate the configuration
	Validate,
}

#[derive(Args, Debug, Clone)]
pub struct JobArgs {
	/// CMPL model file
	pub model: PathBuf,

	/// CmplServer or CmplGridScheduler URL
	#[arg(long)]
	pub url: Option<String>,

	/// Attempts per remote call
	#[arg(long)]
	pub max_tries: Option<u32>,

	/// Maximum queuing time in seconds
	#[arg(long)]
	pub max_time: Option<u64>,

	/// Raw CMPL option, e.g. `--opt "-solver glpk"`
	#[arg(long = "opt", value_name = "OPTION", allow_hyphen_values = true)]
	pub options: Vec<String>,

	/// Write the message document of the run to this file
	#[arg(long, value_name = "FILE")]
	pub cmsg: Option<PathBuf>,

	/// Solve with the local binary even if a URL is configured
	#[arg(long, conflicts_with = "url")]
	pub local: bool,
}
