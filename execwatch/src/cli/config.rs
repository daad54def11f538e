use std::time::Duration;

use crate::{
	cli::args::{AttachMode, Cli},
	Error, Result,
};

#[derive(Debug, Clone)]
pub struct ProbeConfig {
	pub attach: AttachMode,
	pub symbol: String,
	pub ring_size: u32,
	pub run_time: Option<Duration>,
	pub stats_interval: Duration,
}

#[derive(Debug, Clone)]
pub struct SimulateConfig {
	pub producers: u32,
	pub events_per_producer: u64,
	pub capacity: usize,
	pub poll_interval: Duration,
	pub stats_interval: Duration,
}

impl ProbeConfig {
	pub fn from_cli(cli: &Cli, page_size: u32) -> Result<Self> {
		validate_ring_size(cli.ring_size, page_size)?;

		Ok(Self {
			attach: cli.attach,
			symbol: cli.symbol.clone(),
			ring_size: cli.ring_size,
			run_time: cli.time.map(Into::into),
			stats_interval: cli.stats_interval.into(),
		})
	}
}

impl SimulateConfig {
	pub fn from_cli(cli: &Cli) -> Result<Self> {
		if cli.time.is_some() {
			return Err(Error::InvalidTimeMode);
		}
		if cli.producers == 0 {
			return Err(Error::NoProducers);
		}

		Ok(Self {
			producers: cli.producers,
			events_per_producer: cli.events,
			capacity: cli.capacity,
			poll_interval: cli.poll_interval.into(),
			stats_interval: cli.stats_interval.into(),
		})
	}
}

/// The kernel ring map only accepts a power-of-two multiple of the page size.
pub fn validate_ring_size(size: u32, page_size: u32) -> Result<()> {
	let valid = size.is_power_of_two() && page_size != 0 && size % page_size == 0;
	if !valid {
		return Err(Error::InvalidRingSize { size, page_size });
	}
	Ok(())
}

pub fn page_size() -> u32 {
	// SAFETY: sysconf has no preconditions.
	let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
	u32::try_from(size).unwrap_or(4096)
}

// region:    --- Tests

#[cfg(test)]
mod tests {
	type Result<T> = core::result::Result<T, Box<dyn std::error::Error>>; // For tests.

	use super::*;
	use clap::Parser;

	#[test]
	fn ring_size_must_be_page_multiple_power_of_two() -> Result<()> {
		assert!(validate_ring_size(4096, 4096).is_ok());
		assert!(validate_ring_size(1 << 24, 4096).is_ok());
		assert!(validate_ring_size(2048, 4096).is_err());
		assert!(validate_ring_size(3 * 4096, 4096).is_err());
		assert!(validate_ring_size(0, 4096).is_err());

		Ok(())
	}

	#[test]
	fn probe_defaults_parse() -> Result<()> {
		// -- Exec
		let cli = Cli::try_parse_from(["execwatch"])?;
		let cfg = ProbeConfig::from_cli(&cli, 4096)?;

		// -- Check
		assert_eq!(cfg.attach, AttachMode::Kprobe);
		assert_eq!(cfg.symbol, "sys_execve");
		assert_eq!(cfg.ring_size, 1 << 24);
		assert_eq!(cfg.run_time, None);
		assert_eq!(cfg.stats_interval, Duration::from_secs(5));

		Ok(())
	}

	#[test]
	fn simulate_flags_parse() -> Result<()> {
		// -- Exec
		let cli = Cli::try_parse_from([
			"execwatch",
			"--mode",
			"simulate",
			"--producers",
			"8",
			"--events",
			"250",
			"--capacity",
			"1024",
			"--poll-interval",
			"2ms",
		])?;
		let cfg = SimulateConfig::from_cli(&cli)?;

		// -- Check
		assert_eq!(cfg.producers, 8);
		assert_eq!(cfg.events_per_producer, 250);
		assert_eq!(cfg.capacity, 1024);
		assert_eq!(cfg.poll_interval, Duration::from_millis(2));

		Ok(())
	}

	#[test]
	fn zero_producers_rejected() -> Result<()> {
		let cli = Cli::try_parse_from(["execwatch", "--mode", "simulate", "--producers", "0"])?;

		let res = SimulateConfig::from_cli(&cli);

		assert!(matches!(res, Err(Error::NoProducers)));

		Ok(())
	}

	#[test]
	fn timed_simulation_rejected() -> Result<()> {
		let cli = Cli::try_parse_from(["execwatch", "--mode", "simulate", "--time", "10s"])?;

		let res = SimulateConfig::from_cli(&cli);

		assert!(matches!(res, Err(Error::InvalidTimeMode)));

		Ok(())
	}

	#[test]
	fn raw_tracepoint_attach_parses() -> Result<()> {
		let cli = Cli::try_parse_from([
			"execwatch",
			"--attach",
			"raw-tracepoint",
			"--ring-size",
			"8192",
			"--time",
			"20s",
		])?;

		let cfg = ProbeConfig::from_cli(&cli, 4096)?;

		assert_eq!(cfg.attach, AttachMode::RawTracepoint);
		assert_eq!(cfg.ring_size, 8192);
		assert_eq!(cfg.run_time, Some(Duration::from_secs(20)));

		Ok(())
	}
}

// endregion: --- Tests
