use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use humantime::Duration;

/// Default kernel ring size in bytes.
pub const DEFAULT_RING_SIZE: u32 = 1 << 24;

#[derive(Parser, Debug)]
#[command(name = "execwatch", about = "Report every execve through a bounded kernel ring")]
pub struct Cli {
	#[arg(long, value_enum, default_value = "probe")]
	pub mode: RunMode,

	#[arg(long, value_enum, default_value = "kprobe")]
	pub attach: AttachMode,

	#[arg(long, default_value = "sys_execve", help = "Kernel symbol for the kprobe")]
	pub symbol: String,

	#[arg(long, default_value_t = DEFAULT_RING_SIZE, help = "Kernel ring size in bytes")]
	pub ring_size: u32,

	#[arg(long, help = "Time duration (e.g., 20s, 5m, 1h). Runs until interrupted when omitted")]
	pub time: Option<Duration>,

	#[arg(long, default_value = "5s")]
	pub stats_interval: Duration,

	#[arg(long, default_value_t = 4, help = "Simulated producer threads")]
	pub producers: u32,

	#[arg(long, default_value_t = 1_000, help = "Triggers per simulated producer")]
	pub events: u64,

	#[arg(long, default_value_t = 4096, help = "Simulated ring size in bytes")]
	pub capacity: usize,

	#[arg(long, default_value = "10ms", help = "How often the simulated consumer drains")]
	pub poll_interval: Duration,

	#[arg(long, help = "Write logs to this file instead of stderr")]
	pub log_file: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, ValueEnum, PartialEq, Eq)]
pub enum RunMode {
	Probe,
	Simulate,
}

#[derive(Copy, Clone, Debug, ValueEnum, PartialEq, Eq)]
pub enum AttachMode {
	Kprobe,
	RawTracepoint,
}
