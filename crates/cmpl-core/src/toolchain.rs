//! The local CMPL binary.
//!
//! The engine runs the binary twice in its life at most: once to precompile
//! the model before a remote job is connected, and once to solve the model
//! when no server is involved. Both go through [`Toolchain::run`].

use crate::output::OutputSink;
use async_trait::async_trait;
use cmpl_types::{CmplError, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tracing::debug;

#[async_trait]
pub trait Toolchain: Send + Sync {
	/// Runs the binary with `args`, forwarding stdout line by line.
	///
	/// A non-zero exit is a [`CmplError::Remote`] carrying stderr.
	async fn run(&self, args: &[String], output: &dyn OutputSink) -> Result<()>;
}

/// Arguments of a precompile run writing its artifacts under `prefix`.
pub fn precompile_args(model: &Path, prefix: &Path, options: &[String], msg_file: &Path) -> Vec<String> {
	let artifact = |ext: &str| format!("{}.{}", prefix.display(), ext);
	let mut args = vec![
		model.display().to_string(),
		"-o-opt".to_string(),
		artifact("optcmpl"),
		"-o-pre".to_string(),
		artifact("precmpl"),
		"-o-extern".to_string(),
		artifact("extdata"),
		"-modules".to_string(),
		"precomp".to_string(),
		"-no-warn-unused".to_string(),
	];
	args.extend(options.iter().cloned());
	args.push("-cmsg".to_string());
	args.push(msg_file.display().to_string());
	args
}

/// Arguments of a local solve of `model_alias`.
pub fn solve_args(model_alias: &Path, options: &[String], msg_file: &Path) -> Vec<String> {
	let mut args = vec![model_alias.display().to_string(), "-solution".to_string()];
	args.extend(options.iter().cloned());
	args.push("-cmsg".to_string());
	args.push(msg_file.display().to_string());
	args
}

/// The `cmpl` executable, run as a child process.
pub struct CmplBinary {
	path: PathBuf,
}

impl CmplBinary {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn path(&self) -> &Path {
		&self.path
	}
}

#[async_trait]
impl Toolchain for CmplBinary {
	async fn run(&self, args: &[String], output: &dyn OutputSink) -> Result<()> {
		debug!(binary = %self.path.display(), ?args, "running cmpl");

		// The child is killed if the run is abandoned before it exits.
		let mut child = Command::new(&self.path)
			.args(args)
			.stdout(Stdio::piped())
			.stderr(Stdio::piped())
			.kill_on_drop(true)
			.spawn()
			.map_err(|e| CmplError::file_access(&self.path, e))?;

		let stdout = child
			.stdout
			.take()
			.ok_or_else(|| CmplError::remote("cmpl stdout is not captured"))?;
		let mut stderr = child
			.stderr
			.take()
			.ok_or_else(|| CmplError::remote("cmpl stderr is not captured"))?;

		let stderr_reader = tokio::spawn(async move {
			let mut raw = Vec::new();
			let _ = stderr.read_to_end(&mut raw).await;
			String::from_utf8_lossy(&raw).into_owned()
		});

		// solver output is not always UTF-8
		let mut stdout = BufReader::new(stdout);
		let mut line = Vec::new();
		loop {
			line.clear();
			let read = stdout
				.read_until(b'\n', &mut line)
				.await
				.map_err(|e| CmplError::file_access(&self.path, e))?;
			if read == 0 {
				break;
			}
			while matches!(line.last(), Some(b'\n' | b'\r')) {
				line.pop();
			}
			output.write(&String::from_utf8_lossy(&line));
		}

		let status = child
			.wait()
			.await
			.map_err(|e| CmplError::file_access(&self.path, e))?;
		let stderr_text = stderr_reader.await.unwrap_or_default();

		if !status.success() {
			return Err(CmplError::remote(stderr_text.trim().to_string()));
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::output::CapturedOutput;

	#[test]
	fn test_precompile_arguments() {
		let args = precompile_args(
			Path::new("diet.cmpl"),
			Path::new("/tmp/diet_cmpl__1"),
			&["-solver".into(), "glpk".into()],
			Path::new("/tmp/diet_cmpl__1.cmsg"),
		);
		assert_eq!(
			args,
			vec![
				"diet.cmpl",
				"-o-opt",
				"/tmp/diet_cmpl__1.optcmpl",
				"-o-pre",
				"/tmp/diet_cmpl__1.precmpl",
				"-o-extern",
				"/tmp/diet_cmpl__1.extdata",
				"-modules",
				"precomp",
				"-no-warn-unused",
				"-solver",
				"glpk",
				"-cmsg",
				"/tmp/diet_cmpl__1.cmsg",
			]
		);
	}

	#[test]
	fn test_solve_arguments() {
		let args = solve_args(
			Path::new("/tmp/diet_cmpl__1.cmpl"),
			&[],
			Path::new("/tmp/diet_cmpl__1.cmsg"),
		);
		assert_eq!(
			args,
			vec!["/tmp/diet_cmpl__1.cmpl", "-solution", "-cmsg", "/tmp/diet_cmpl__1.cmsg"]
		);
	}

	#[cfg(unix)]
	#[tokio::test]
	async fn test_stdout_is_streamed_and_stderr_reported() {
		let binary = CmplBinary::new("/bin/sh");
		let output = CapturedOutput::new("m> ");

		binary
			.run(&["-c".into(), "echo first; echo second".into()], &output)
			.await
			.unwrap();
		assert_eq!(output.lines(), vec!["m> first", "m> second"]);

		let err = binary
			.run(&["-c".into(), "echo broken >&2; exit 3".into()], &output)
			.await
			.unwrap_err();
		assert_eq!(err.to_string(), "broken");
	}

	#[cfg(unix)]
	#[tokio::test]
	async fn test_latin1_output_does_not_abort_run() {
		let binary = CmplBinary::new("/bin/sh");
		let output = CapturedOutput::new("");

		binary
			.run(
				&["-c".into(), "printf 'Kosten f\\374r Di\\344t\\r\\ndone'".into()],
				&output,
			)
			.await
			.unwrap();
		assert_eq!(output.lines(), vec!["Kosten f\u{fffd}r Di\u{fffd}t", "done"]);
	}

	#[tokio::test]
	async fn test_missing_binary_is_file_access_error() {
		let binary = CmplBinary::new("/nonexistent/bin/cmpl");
		let err = binary.run(&[], &crate::output::SilentOutput).await.unwrap_err();
		assert!(matches!(err, CmplError::FileAccess { .. }));
	}
}
