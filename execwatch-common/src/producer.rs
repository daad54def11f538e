use crate::{EventWriter, EVENT_SIZE, TASK_COMM_LEN};

/// Current-task state as seen from the probe trigger.
///
/// Nothing is passed in by the traced code; everything is pulled from the
/// task that hit the probe.
pub trait TaskContext {
	/// Combined id, gid in the high half and uid in the low half.
	fn uid_gid(&self) -> u64;
	/// Combined id, tgid in the high half and thread id in the low half.
	fn pid_tgid(&self) -> u64;
	fn read_comm(&self, dst: &mut [u8; TASK_COMM_LEN]);
}

/// A reserved region of exactly one event, owned by the producer until
/// `commit` or `discard`.
pub trait EventSlot {
	fn bytes_mut(&mut self) -> &mut [u8; EVENT_SIZE];
	fn commit(self);
	fn discard(self);
}

/// Transport side seen by the producer. `reserve` must never block.
pub trait EventSink {
	type Slot<'a>: EventSlot
	where
		Self: 'a;

	fn reserve(&self) -> Option<Self::Slot<'_>>;
	fn note_drop(&self);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Emitted {
	Committed,
	Dropped,
}

/// Capture the current task and publish one event.
///
/// A full transport drops the event and bumps the sink's drop counter. There
/// is no retry; the caller returns to the kernel either way.
#[inline(always)]
pub fn emit<C, S>(ctx: &C, sink: &S) -> Emitted
where
	C: TaskContext,
	S: EventSink,
{
	let uid = ctx.uid_gid() as u32;
	let tgid = (ctx.pid_tgid() >> 32) as u32;

	let Some(mut slot) = sink.reserve() else {
		sink.note_drop();
		return Emitted::Dropped;
	};

	let mut writer = EventWriter::new(slot.bytes_mut());
	writer.set_uid(uid);
	writer.set_pid(tgid);
	ctx.read_comm(writer.comm_mut());

	slot.commit();
	Emitted::Committed
}

// region:    --- Tests

#[cfg(test)]
mod tests {
	type Result<T> = core::result::Result<T, Box<dyn std::error::Error>>; // For tests.

	use super::*;
	use crate::Event;
	use std::{cell::RefCell, vec::Vec};
	use zerocopy::FromBytes;

	struct FakeTask;

	impl TaskContext for FakeTask {
		fn uid_gid(&self) -> u64 {
			(100u64 << 32) | 1000
		}

		fn pid_tgid(&self) -> u64 {
			(4242u64 << 32) | 4250
		}

		fn read_comm(&self, dst: &mut [u8; TASK_COMM_LEN]) {
			*dst = [0u8; TASK_COMM_LEN];
			dst[..4].copy_from_slice(b"bash");
		}
	}

	#[derive(Default)]
	struct VecSink {
		room: RefCell<usize>,
		committed: RefCell<Vec<[u8; EVENT_SIZE]>>,
		drops: RefCell<u64>,
	}

	struct VecSlot<'a> {
		buf: [u8; EVENT_SIZE],
		sink: &'a VecSink,
	}

	impl EventSlot for VecSlot<'_> {
		fn bytes_mut(&mut self) -> &mut [u8; EVENT_SIZE] {
			&mut self.buf
		}

		fn commit(self) {
			self.sink.committed.borrow_mut().push(self.buf);
		}

		fn discard(self) {
			*self.sink.room.borrow_mut() += 1;
		}
	}

	impl EventSink for VecSink {
		type Slot<'a> = VecSlot<'a>;

		fn reserve(&self) -> Option<Self::Slot<'_>> {
			let mut room = self.room.borrow_mut();
			if *room == 0 {
				return None;
			}
			*room -= 1;
			Some(VecSlot {
				buf: [0u8; EVENT_SIZE],
				sink: self,
			})
		}

		fn note_drop(&self) {
			*self.drops.borrow_mut() += 1;
		}
	}

	#[test]
	fn emit_reports_tgid_and_low_uid() -> Result<()> {
		// -- Setup & Fixtures
		let fx_sink = VecSink {
			room: RefCell::new(1),
			..Default::default()
		};

		// -- Exec
		let res = emit(&FakeTask, &fx_sink);

		// -- Check
		assert_eq!(res, Emitted::Committed);
		let committed = fx_sink.committed.borrow();
		let (evt, _) = Event::read_from_prefix(&committed[0]).map_err(|_| "short record")?;
		assert_eq!(evt.uid, 1000);
		assert_eq!(evt.pid, 4242);
		assert_eq!(evt.comm_bytes(), b"bash");
		assert_eq!(*fx_sink.drops.borrow(), 0);

		Ok(())
	}

	#[test]
	fn emit_drops_when_sink_is_full() -> Result<()> {
		// -- Setup & Fixtures
		let fx_sink = VecSink::default();

		// -- Exec
		let first = emit(&FakeTask, &fx_sink);
		let second = emit(&FakeTask, &fx_sink);

		// -- Check
		assert_eq!(first, Emitted::Dropped);
		assert_eq!(second, Emitted::Dropped);
		assert!(fx_sink.committed.borrow().is_empty());
		assert_eq!(*fx_sink.drops.borrow(), 2);

		Ok(())
	}
}

// endregion: --- Tests
