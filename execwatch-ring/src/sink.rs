use execwatch_common::{Event, EventSink, EventSlot, TaskContext, EVENT_SIZE, TASK_COMM_LEN};
use tracing::warn;
use zerocopy::FromBytes;

use crate::{Consumer, Producer, Slot};

/// An event-sized slot in the user-space ring.
pub struct RingEventSlot<'a>(Slot<'a>);

impl EventSlot for RingEventSlot<'_> {
	fn bytes_mut(&mut self) -> &mut [u8; EVENT_SIZE] {
		let buf = self.0.as_mut_slice();
		debug_assert_eq!(buf.len(), EVENT_SIZE);
		// SAFETY: the slot was reserved with exactly EVENT_SIZE bytes.
		unsafe { &mut *(buf.as_mut_ptr() as *mut [u8; EVENT_SIZE]) }
	}

	fn commit(self) {
		self.0.commit();
	}

	fn discard(self) {
		self.0.discard();
	}
}

impl EventSink for Producer {
	type Slot<'a> = RingEventSlot<'a>;

	fn reserve(&self) -> Option<Self::Slot<'_>> {
		Producer::reserve(self, EVENT_SIZE).ok().map(RingEventSlot)
	}

	fn note_drop(&self) {
		Producer::note_drop(self);
	}
}

impl Consumer {
	/// `drain` decoded as events. Records too short for an event are logged
	/// and skipped.
	pub fn drain_events(&mut self) -> impl Iterator<Item = Event> + '_ {
		self.drain().filter_map(|record| match Event::read_from_prefix(&record) {
			Ok((evt, _)) => Some(evt),
			Err(_) => {
				warn!(len = record.len(), "skipping record shorter than an event");
				None
			}
		})
	}
}

/// Trigger source for driving the producer without a kernel.
#[derive(Clone, Debug)]
pub struct SimulatedTask {
	uid_gid: u64,
	pid_tgid: u64,
	comm: [u8; TASK_COMM_LEN],
}

impl SimulatedTask {
	/// `comm` is truncated to 15 bytes and NUL padded, as the kernel does.
	pub fn new(uid: u32, gid: u32, tgid: u32, tid: u32, comm: &str) -> Self {
		let mut buf = [0u8; TASK_COMM_LEN];
		let len = comm.len().min(TASK_COMM_LEN - 1);
		buf[..len].copy_from_slice(&comm.as_bytes()[..len]);

		Self {
			uid_gid: ((gid as u64) << 32) | uid as u64,
			pid_tgid: ((tgid as u64) << 32) | tid as u64,
			comm: buf,
		}
	}
}

impl TaskContext for SimulatedTask {
	fn uid_gid(&self) -> u64 {
		self.uid_gid
	}

	fn pid_tgid(&self) -> u64 {
		self.pid_tgid
	}

	fn read_comm(&self, dst: &mut [u8; TASK_COMM_LEN]) {
		*dst = self.comm;
	}
}

// region:    --- Tests


// endregion: --- Tests
