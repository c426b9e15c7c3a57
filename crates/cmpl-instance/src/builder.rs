//! Collects the files of a submission under short aliases.

use crate::args::PrecompileArgs;
use crate::bundle::SubmissionBundle;
use cmpl_types::{CmplError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Artifacts produced by precompiling a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrecompiledModel {
	pub opt_file: PathBuf,
	pub pre_file: PathBuf,
	pub extdata_file: PathBuf,
	pub args: PrecompileArgs,
}

impl PrecompiledModel {
	/// Artifact paths sharing one prefix: `<prefix>.optcmpl`, `.precmpl`, `.extdata`.
	pub fn artifact_paths(prefix: &Path) -> (PathBuf, PathBuf, PathBuf) {
		let with = |ext: &str| {
			let mut p = prefix.as_os_str().to_owned();
			p.push(".");
			p.push(ext);
			PathBuf::from(p)
		};
		(with("optcmpl"), with("precmpl"), with("extdata"))
	}

	/// Reads the option file written next to the other artifacts.
	pub fn load(prefix: &Path) -> Result<Self> {
		let (opt_file, pre_file, extdata_file) = Self::artifact_paths(prefix);
		let args = PrecompileArgs::from_file(&opt_file)?;
		Ok(Self {
			opt_file,
			pre_file,
			extdata_file,
			args,
		})
	}

	pub fn files(&self) -> [&Path; 3] {
		[&self.opt_file, &self.pre_file, &self.extdata_file]
	}
}

/// Builds the [`SubmissionBundle`] for one send.
pub struct InstanceBuilder<'a> {
	model: &'a Path,
	precompiled: &'a PrecompiledModel,
}

impl<'a> InstanceBuilder<'a> {
	pub fn new(model: &'a Path, precompiled: &'a PrecompiledModel) -> Self {
		Self { model, precompiled }
	}

	/// Assembles the bundle.
	///
	/// `options` are copied in order ahead of the options the builder adds
	/// itself; `data` is the in-memory `.cdat` text of the model, used in
	/// place of a data file that carries the model's own data alias.
	pub fn build(&self, options: &[String], data: &str, job_id: &str) -> Result<SubmissionBundle> {
		let args = &self.precompiled.args;
		args.validate()?;

		let model_name = self
			.model
			.file_name()
			.map(|n| n.to_string_lossy().into_owned())
			.ok_or_else(|| {
				CmplError::Validation(format!("{} is not a model file", self.model.display()))
			})?;
		let stem = self
			.model
			.file_stem()
			.map(|s| s.to_string_lossy().into_owned())
			.unwrap_or_else(|| model_name.clone());
		let absolute = self.model.is_absolute();
		let data_alias = format!("{}.cdat", stem);

		let mut bundle = SubmissionBundle::new(model_name, job_id);
		bundle.options = options.to_vec();

		for (path, ext, flag) in [
			(&self.precompiled.opt_file, "optcmpl", "-i-opt"),
			(&self.precompiled.pre_file, "precmpl", "-i-pre"),
			(&self.precompiled.extdata_file, "extdata", "-i-extern"),
		] {
			let alias = format!("{}.{}", stem, ext);
			bundle.insert_file(alias.as_str(), read_file(path)?);
			bundle.push_option(format!("{} {}", flag, alias));
		}

		if let Some(xls) = args.xls_data_file() {
			bundle.push_option(format!("-filealias {}={}", self.alias_source(xls), data_alias));
			bundle.insert_file(data_alias.as_str(), data);
		}

		for declared in &args.external_files {
			let name = declared.strip_suffix(':').unwrap_or(declared);
			let alias = Path::new(name)
				.file_name()
				.map(|n| n.to_string_lossy().into_owned())
				.unwrap_or_else(|| name.to_string());

			if name != alias {
				bundle.push_option(format!("-filealias {}={}", self.alias_source(name), alias));
			}

			let content = if alias == data_alias && !data.is_empty() {
				data.to_string()
			} else {
				read_file(&self.resolve(name))?
			};
			debug!(file = %name, alias = %alias, "adding problem file");
			bundle.insert_file(alias, content);
		}

		if absolute {
			bundle.push_option(format!("-basename {}", stem));
		}

		Ok(bundle)
	}

	fn model_dir(&self) -> &Path {
		self.model.parent().unwrap_or_else(|| Path::new(""))
	}

	/// Name the remote side knows a file under, relative names are anchored
	/// at the model directory when the model path is absolute.
	fn alias_source(&self, name: &str) -> String {
		if self.model.is_absolute() && !Path::new(name).is_absolute() {
			self.model_dir().join(name).to_string_lossy().into_owned()
		} else {
			name.to_string()
		}
	}

	fn resolve(&self, name: &str) -> PathBuf {
		PathBuf::from(self.alias_source(name))
	}
}

fn read_file(path: &Path) -> Result<String> {
	std::fs::read_to_string(path).map_err(|e| CmplError::file_access(path, e))
}
