#![no_std]
#![no_main]

use aya_ebpf::{
	macros::{kprobe, map, raw_tracepoint},
	maps::{PerCpuArray, RingBuf},
	programs::{ProbeContext, RawTracePointContext},
};

mod hooks;
mod sink;
mod task;

/// 16 MiB by default, resized by the loader.
#[map]
static EVENTS: RingBuf = RingBuf::with_byte_size(1 << 24, 0);

/// Events lost to a full ring, one counter per CPU.
#[map]
static DROPPED: PerCpuArray<u64> = PerCpuArray::with_max_entries(1, 0);

/// Syscall number of execve on the host, patched in at load time.
#[no_mangle]
static EXECVE_NR: u64 = 59;

#[kprobe]
pub fn kprobe_execve(ctx: ProbeContext) -> u32 {
	match hooks::try_kprobe_execve(ctx) {
		Ok(ret) => ret,
		Err(ret) => ret,
	}
}

#[raw_tracepoint(tracepoint = "sys_enter")]
pub fn sys_enter_execve(ctx: RawTracePointContext) -> i32 {
	match hooks::try_sys_enter_execve(ctx) {
		Ok(ret) => ret,
		Err(ret) => ret,
	}
}

#[cfg(not(test))]
#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
	loop {}
}

#[link_section = "license"]
#[no_mangle]
static LICENSE: [u8; 13] = *b"Dual MIT/GPL\0";
