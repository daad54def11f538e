use aya_ebpf::maps::ring_buf::RingBufEntry;
use execwatch_common::{EventSink, EventSlot, EVENT_SIZE};

use crate::{DROPPED, EVENTS};

pub struct KernelSlot(RingBufEntry<[u8; EVENT_SIZE]>);

impl EventSlot for KernelSlot {
	#[inline(always)]
	fn bytes_mut(&mut self) -> &mut [u8; EVENT_SIZE] {
		// zeroed in `reserve`
		unsafe { self.0.assume_init_mut() }
	}

	#[inline(always)]
	fn commit(self) {
		self.0.submit(0);
	}

	#[inline(always)]
	fn discard(self) {
		self.0.discard(0);
	}
}

/// `EVENTS` ring plus the per-CPU `DROPPED` counter.
pub struct KernelSink;

impl EventSink for KernelSink {
	type Slot<'a> = KernelSlot;

	#[inline(always)]
	fn reserve(&self) -> Option<KernelSlot> {
		let mut entry = EVENTS.reserve::<[u8; EVENT_SIZE]>(0)?;
		entry.write([0u8; EVENT_SIZE]);
		Some(KernelSlot(entry))
	}

	#[inline(always)]
	fn note_drop(&self) {
		// per-CPU value, nothing else writes it while this program runs
		if let Some(count) = DROPPED.get_ptr_mut(0) {
			unsafe { *count += 1 };
		}
	}
}
