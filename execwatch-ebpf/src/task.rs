use core::ffi::c_void;

use aya_ebpf::helpers::{bpf_get_current_pid_tgid, bpf_get_current_uid_gid, r#gen::bpf_get_current_comm};
use execwatch_common::{TaskContext, TASK_COMM_LEN};

/// The task that hit the probe.
pub struct CurrentTask;

impl TaskContext for CurrentTask {
	#[inline(always)]
	fn uid_gid(&self) -> u64 {
		bpf_get_current_uid_gid()
	}

	#[inline(always)]
	fn pid_tgid(&self) -> u64 {
		bpf_get_current_pid_tgid()
	}

	#[inline(always)]
	fn read_comm(&self, dst: &mut [u8; TASK_COMM_LEN]) {
		// the helper zero-fills `dst` when it fails
		unsafe {
			bpf_get_current_comm(dst.as_mut_ptr() as *mut c_void, TASK_COMM_LEN as u32);
		}
	}
}
