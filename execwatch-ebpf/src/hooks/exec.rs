use aya_ebpf::{
	programs::{ProbeContext, RawTracePointContext},
	EbpfContext,
};
use execwatch_common::emit;

use crate::{sink::KernelSink, task::CurrentTask, EXECVE_NR};

// A lost event is never reported back to the traced task: both hooks return 0
// whether or not the ring had room.

pub fn try_kprobe_execve(_ctx: ProbeContext) -> Result<u32, u32> {
	emit(&CurrentTask, &KernelSink);
	Ok(0)
}

pub fn try_sys_enter_execve(ctx: RawTracePointContext) -> Result<i32, i32> {
	// sys_enter args: [struct pt_regs *regs, long id]
	let id = unsafe { *(ctx.as_ptr() as *const u64).add(1) };
	let execve_nr = unsafe { core::ptr::read_volatile(&EXECVE_NR) };
	if id != execve_nr {
		return Ok(0);
	}

	emit(&CurrentTask, &KernelSink);
	Ok(0)
}
