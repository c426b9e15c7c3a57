//! Configuration loading from files and environment.

use crate::types::*;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
	/// Load configuration from file
	pub fn from_file<P: AsRef<Path>>(path: P) -> Result<CmplConfig> {
		let path = path.as_ref();
		info!("Loading configuration from {:?}", path);

		let contents = std::fs::read_to_string(path)
			.with_context(|| format!("Failed to read config file: {:?}", path))?;

		let config = match path.extension().and_then(|s| s.to_str()) {
			Some("toml") => Self::from_toml(&contents)?,
			Some("json") => Self::from_json(&contents)?,
			Some("yaml") | Some("yml") => Self::from_yaml(&contents)?,
			_ => anyhow::bail!("Unsupported config format: {:?}", path),
		};

		Self::validate_config(&config)?;
		Ok(config)
	}

	/// Load from TOML string
	pub fn from_toml(contents: &str) -> Result<CmplConfig> {
		toml::from_str(contents).map_err(|e| anyhow::anyhow!("Failed to parse TOML: {}", e))
	}

	/// Load from JSON string
	pub fn from_json(contents: &str) -> Result<CmplConfig> {
		serde_json::from_str(contents).context("Failed to parse JSON")
	}

	/// Load from YAML string
	pub fn from_yaml(contents: &str) -> Result<CmplConfig> {
		serde_yaml::from_str(contents).context("Failed to parse YAML")
	}

	/// Load from environment variables with optional file override
	pub fn from_env_and_file(file_path: Option<&Path>) -> Result<CmplConfig> {
		let mut config = if let Some(path) = file_path {
			Self::from_file(path)?
		} else {
			CmplConfig::default()
		};

		Self::apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;

		Self::validate_config(&config)?;
		Ok(config)
	}

	/// Apply environment variable overrides
	///
	/// `lookup` resolves a variable name; tests pass a map instead of the
	/// process environment.
	pub fn apply_env_overrides<F>(config: &mut CmplConfig, lookup: F) -> Result<()>
	where
		F: Fn(&str) -> Option<String>,
	{
		if let Some(url) = lookup("CMPL_URL") {
			debug!("Overriding server url from environment");
			config.server.url = Some(url);
		}

		if let Some(url) = lookup("CMPL_SCHEDULER_URL") {
			debug!("Overriding scheduler url from environment");
			config.server.scheduler_url = Some(url);
		}

		if let Some(tries) = lookup("CMPL_MAX_TRIES") {
			config.server.max_tries = tries
				.trim()
				.parse()
				.with_context(|| format!("Invalid CMPL_MAX_TRIES: {}", tries))?;
		}

		if let Some(secs) = lookup("CMPL_MAX_TIME") {
			config.server.max_queuing_time_secs = secs
				.trim()
				.parse()
				.with_context(|| format!("Invalid CMPL_MAX_TIME: {}", secs))?;
		}

		if let Some(ms) = lookup("CMPL_REFRESH_MS") {
			config.server.refresh_interval_ms = ms
				.trim()
				.parse()
				.with_context(|| format!("Invalid CMPL_REFRESH_MS: {}", ms))?;
		}

		if config.local.cmpl_home.is_none() {
			if let Some(home) = lookup("CMPLHOME") {
				debug!("Using CMPLHOME from environment");
				config.local.cmpl_home = Some(PathBuf::from(home));
			}
		}

		Ok(())
	}

	/// Validate configuration
	pub fn validate_config(config: &CmplConfig) -> Result<()> {
		if config.server.max_tries == 0 {
			anyhow::bail!("server.max_tries must be at least 1");
		}

		if config.server.refresh_interval_ms == 0 {
			anyhow::bail!("server.refresh_interval_ms must be greater than 0");
		}

		for (field, url) in [
			("server.url", &config.server.url),
			("server.scheduler_url", &config.server.scheduler_url),
		] {
			if let Some(url) = url {
				if !(url.starts_with("http://") || url.starts_with("https://")) {
					anyhow::bail!("{} must be an http(s) URL, got '{}'", field, url);
				}
			}
		}

		Ok(())
	}
}

/// Load configuration from standard locations
pub fn load_config() -> Result<CmplConfig> {
	// Check for config file in order:
	// 1. Environment variable CMPL_CONFIG
	// 2. ./cmpl.toml
	// 3. ./config/cmpl.toml
	// 4. Default config with env overrides

	if let Ok(path) = std::env::var("CMPL_CONFIG") {
		return ConfigLoader::from_env_and_file(Some(Path::new(&path)));
	}

	for path in ["./cmpl.toml", "./config/cmpl.toml"] {
		if Path::new(path).exists() {
			return ConfigLoader::from_env_and_file(Some(Path::new(path)));
		}
	}

	ConfigLoader::from_env_and_file(None)
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::HashMap;
	use std::time::Duration;

	#[test]
	fn test_default_config() {
		let config = CmplConfig::default();
		assert_eq!(config.server.max_tries, 10);
		assert_eq!(config.server.max_queuing_time_secs, 300);
		assert_eq!(config.server.refresh_interval_ms, 100);
		assert_eq!(config.local.solver, "cbc");
		assert!(config.output.print_output);
	}

	#[test]
	fn test_toml_parsing() {
		let toml = r#"
[server]
url = "http://localhost:8008"
max_tries = 3
refresh_interval_ms = 250

[local]
solver = "glpk"
debug = true
"#;

		let config = ConfigLoader::from_toml(toml).unwrap();
		assert_eq!(config.server.url.as_deref(), Some("http://localhost:8008"));
		assert_eq!(config.server.max_tries, 3);
		assert_eq!(config.server.max_queuing_time_secs, 300);

		let settings = config.job_settings();
		assert_eq!(settings.refresh_interval, Duration::from_millis(250));
		assert_eq!(settings.solver, "glpk");
		assert!(settings.debug);
	}

	#[test]
	fn test_json_and_yaml_parsing() {
		let json = r#"{"server": {"scheduler_url": "http://grid:8008"}}"#;
		let config = ConfigLoader::from_json(json).unwrap();
		assert_eq!(config.connect_url(), Some("http://grid:8008"));

		let yaml = "server:\n  max_queuing_time_secs: 5\n";
		let config = ConfigLoader::from_yaml(yaml).unwrap();
		assert_eq!(config.job_settings().max_queuing_time, Duration::from_secs(5));
	}

	#[test]
	fn test_from_file_dispatches_on_extension() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("cmpl.toml");
		std::fs::write(&path, "[server]\nmax_tries = 4\n").unwrap();
		assert_eq!(ConfigLoader::from_file(&path).unwrap().server.max_tries, 4);

		let bad = dir.path().join("cmpl.ini");
		std::fs::write(&bad, "").unwrap();
		assert!(ConfigLoader::from_file(&bad).is_err());
	}

	#[test]
	fn test_env_overrides() {
		let env: HashMap<&str, &str> = [
			("CMPL_URL", "http://remote:9000"),
			("CMPL_MAX_TRIES", "7"),
			("CMPL_MAX_TIME", "60"),
			("CMPLHOME", "/opt/cmpl"),
		]
		.into_iter()
		.collect();

		let mut config = CmplConfig::default();
		ConfigLoader::apply_env_overrides(&mut config, |k| env.get(k).map(|v| v.to_string()))
			.unwrap();

		assert_eq!(config.server.url.as_deref(), Some("http://remote:9000"));
		assert_eq!(config.server.max_tries, 7);
		assert_eq!(config.server.max_queuing_time_secs, 60);
		assert_eq!(
			config.cmpl_binary().unwrap(),
			PathBuf::from("/opt/cmpl").join("bin").join(if cfg!(windows) {
				"cmpl.exe"
			} else {
				"cmpl"
			})
		);
	}

	#[test]
	fn test_invalid_env_value_is_rejected() {
		let mut config = CmplConfig::default();
		let result = ConfigLoader::apply_env_overrides(&mut config, |k| {
			(k == "CMPL_MAX_TRIES").then(|| "many".to_string())
		});
		assert!(result.is_err());
	}

	#[test]
	fn test_validation() {
		let mut config = CmplConfig::default();
		assert!(ConfigLoader::validate_config(&config).is_ok());

		config.server.max_tries = 0;
		assert!(ConfigLoader::validate_config(&config).is_err());

		config.server.max_tries = 1;
		config.server.url = Some("ftp://server".into());
		assert!(ConfigLoader::validate_config(&config).is_err());

		config.server.url = None;
		config.server.refresh_interval_ms = 0;
		assert!(ConfigLoader::validate_config(&config).is_err());
	}
}
