use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Command};
use cmpl_config::ConfigLoader;
use cmpl_storage::create_storage;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod commands;

#[tokio::main]
async fn main() -> Result<()> {
	let cli = Cli::parse();

	let config = ConfigLoader::from_env_and_file(cli.config.as_deref())
		.context("Failed to load configuration")?;

	// Initialize tracing
	let log_level = cli
		.log_level
		.clone()
		.unwrap_or_else(|| config.output.log_level.clone());
	setup_tracing(&log_level)?;

	let store = create_storage(config.storage.snapshot_dir());

	match cli.command {
		Command::Solve(args) => {
			let config = commands::job_config(config, &args)?;
			info!("Solving {:?}", args.model);
			commands::solve(config, args).await
		}
		Command::Send(args) => {
			let config = commands::job_config(config, &args)?;
			commands::send(config, args, &store).await
		}
		Command::Knock(args) => {
			let config = commands::job_config(config, &args)?;
			commands::knock(config, args, &store).await
		}
		Command::Retrieve(args) => {
			let config = commands::job_config(config, &args)?;
			commands::retrieve(config, args, &store).await
		}
		Command::Cancel(args) => {
			let config = commands::job_config(config, &args)?;
			commands::cancel(config, args, &store).await
		}
		Command::Validate => commands::validate(&config),
	}
}

fn setup_tracing(log_level: &str) -> Result<()> {
	let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

	tracing_subscriber::registry()
		.with(env_filter)
		.with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
		.init();

	Ok(())
}
