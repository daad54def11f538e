use aya::{
	maps::{MapData, PerCpuArray, RingBuf},
	programs::{KProbe, RawTracePoint},
	Ebpf, EbpfLoader,
};
use tokio::io::unix::AsyncFd;
use tracing::{debug, info};

use crate::{
	cli::{args::AttachMode, ProbeConfig},
	workers::DropSource,
	Error, Result,
};

const EVENTS_MAP: &str = "EVENTS";
const DROPPED_MAP: &str = "DROPPED";
const EXECVE_NR_GLOBAL: &str = "EXECVE_NR";
const KPROBE_PROG: &str = "kprobe_execve";
const RAW_TP_PROG: &str = "sys_enter_execve";

/// Loaded eBPF object. Programs stay attached for as long as this lives.
pub struct ExecProbe {
	ebpf: Ebpf,
}

impl ExecProbe {
	pub fn load(cfg: &ProbeConfig) -> Result<Self> {
		let execve_nr = libc::SYS_execve as u64;

		let ebpf = EbpfLoader::new()
			.set_max_entries(EVENTS_MAP, cfg.ring_size)
			.set_global(EXECVE_NR_GLOBAL, &execve_nr, true)
			.load(aya::include_bytes_aligned!(concat!(env!("OUT_DIR"), "/execwatch")))?;
		debug!(ring_size = cfg.ring_size, execve_nr, "eBPF object loaded");

		Ok(Self { ebpf })
	}

	/// Returns the hook actually attached to.
	pub fn attach(&mut self, cfg: &ProbeConfig) -> Result<String> {
		match cfg.attach {
			AttachMode::Kprobe => self.attach_kprobe(&cfg.symbol),
			AttachMode::RawTracepoint => self.attach_raw_tracepoint(),
		}
	}

	fn attach_kprobe(&mut self, symbol: &str) -> Result<String> {
		let program: &mut KProbe = self
			.ebpf
			.program_mut(KPROBE_PROG)
			.ok_or(Error::EbpfProgNotFound(KPROBE_PROG))?
			.try_into()?;
		program.load()?;

		let candidates = syscall_symbol_candidates(symbol, std::env::consts::ARCH);
		let mut cause = String::new();
		for candidate in &candidates {
			match program.attach(candidate, 0) {
				Ok(_) => {
					info!(symbol = %candidate, "kprobe attached");
					return Ok(candidate.clone());
				}
				Err(err) => {
					debug!(symbol = %candidate, "kprobe attach failed: {err}");
					cause = err.to_string();
				}
			}
		}

		Err(Error::AttachFailed { candidates, cause })
	}

	fn attach_raw_tracepoint(&mut self) -> Result<String> {
		let program: &mut RawTracePoint = self
			.ebpf
			.program_mut(RAW_TP_PROG)
			.ok_or(Error::EbpfProgNotFound(RAW_TP_PROG))?
			.try_into()?;
		program.load()?;
		program.attach("sys_enter")?;
		info!("raw tracepoint sys_enter attached");

		Ok("sys_enter".to_string())
	}

	pub fn take_ring(&mut self) -> Result<AsyncFd<RingBuf<MapData>>> {
		let map = self.ebpf.take_map(EVENTS_MAP).ok_or(Error::EbpfMapNotFound(EVENTS_MAP))?;
		let ring_buf = RingBuf::try_from(map)?;
		let fd = AsyncFd::new(ring_buf)?;
		Ok(fd)
	}

	pub fn take_drop_counter(&mut self) -> Result<KernelDropCounter> {
		let map = self.ebpf.take_map(DROPPED_MAP).ok_or(Error::EbpfMapNotFound(DROPPED_MAP))?;
		Ok(KernelDropCounter(PerCpuArray::try_from(map)?))
	}
}

/// The kernel's per-CPU drop counters, summed on read.
pub struct KernelDropCounter(PerCpuArray<MapData, u64>);

impl DropSource for KernelDropCounter {
	fn dropped(&self) -> Result<u64> {
		let values = self.0.get(&0, 0)?;
		Ok(values.iter().sum())
	}
}

/// Syscall entry points are wrapped per architecture on newer kernels
/// (`__x64_sys_execve`), older ones only export the bare name.
pub fn syscall_symbol_candidates(symbol: &str, arch: &str) -> Vec<String> {
	let prefix = match arch {
		"x86_64" => Some("__x64_"),
		"x86" => Some("__ia32_"),
		"aarch64" => Some("__arm64_"),
		"s390x" => Some("__s390x_"),
		"riscv64" => Some("__riscv_"),
		_ => None,
	};

	match prefix {
		Some(prefix) if symbol.starts_with("sys_") => vec![format!("{prefix}{symbol}"), symbol.to_string()],
		_ => vec![symbol.to_string()],
	}
}

// region:    --- Tests


// endregion: --- Tests
