// region:    --- Modules
mod agent;
mod cli;
mod error;
mod event;
mod probe;
mod simulate;
mod supervisor;
mod trx;
mod workers;
// endregion: --- Modules

use std::path::Path;

use crate::{
	agent::run_probe,
	cli::{
		args::{Cli, RunMode},
		page_size, ProbeConfig, SimulateConfig,
	},
	simulate::run_simulation,
};

pub use self::error::{Error, Result};
use clap::Parser;
use tracing::{info, level_filters::LevelFilter};
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
	let args = Cli::parse();
	let _log_guard = init_tracing(args.log_file.as_deref())?;

	match args.mode {
		RunMode::Probe => {
			let cfg = ProbeConfig::from_cli(&args, page_size())?;
			run_probe(cfg).await?;
		}

		RunMode::Simulate => {
			let cfg = SimulateConfig::from_cli(&args)?;
			let report = run_simulation(cfg).await?;
			info!(
				triggered = report.triggered,
				delivered = report.delivered,
				dropped = report.dropped,
				"simulation finished"
			);
			report.check()?;
		}
	}

	Ok(())
}

fn init_tracing(log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
	let filter = EnvFilter::builder()
		.with_default_directive(LevelFilter::INFO.into())
		.from_env_lossy();

	let Some(path) = log_file else {
		tracing_subscriber::fmt()
			.with_writer(std::io::stderr)
			.with_target(false)
			.with_env_filter(filter)
			.init();
		return Ok(None);
	};

	let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
	let file_name = path.file_name().ok_or("log file path has no file name")?;
	let file_appender = rolling::never(dir, file_name);
	let (non_blocking_writer, guard) = tracing_appender::non_blocking(file_appender);

	tracing_subscriber::fmt()
		.with_writer(non_blocking_writer)
		.with_ansi(false)
		.with_target(false)
		.with_env_filter(filter)
		.init();

	Ok(Some(guard))
}
