//! `brandline` binary: runs the console's filter pipeline and picker over
//! JSON fixtures.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Command};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let cli = Cli::parse();

	setup_tracing(cli.verbose);

	let config = match &cli.config {
		Some(path) => brandline_config::ConsoleConfig::load(path)?,
		None => brandline_config::ConsoleConfig::default(),
	};
	config.validate()?;
	tracing::debug!(?config, "config.loaded");

	match &cli.command {
		Command::Filter(args) => commands::run_filter(args),
		Command::Search(args) => commands::run_search(args, &config).await,
	}
}

/// Logs go to stderr so command output stays pipeable.
fn setup_tracing(verbose: bool) {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
		if verbose {
			EnvFilter::new("brandline=debug,brandline_console=debug,info")
		} else {
			EnvFilter::new("brandline=info,brandline_console=info,warn")
		}
	});

	tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).with_target(false).init();
}
