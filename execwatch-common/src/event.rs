use zerocopy_derive::{FromBytes, Immutable, IntoBytes, KnownLayout};

pub const TASK_COMM_LEN: usize = 16;

pub const UID_OFFSET: usize = 0;
pub const PID_OFFSET: usize = 4;
pub const COMM_OFFSET: usize = 8;

/// Size of one record on the wire. The ring adds its own per-slot header.
pub const EVENT_SIZE: usize = COMM_OFFSET + TASK_COMM_LEN; // 24

/// One execve hit, as laid out in a ring slot.
///
/// Producer and consumer are compiled independently, so the layout is pinned
/// by the offset constants above and checked against the struct at compile
/// time. Integers are host-endian.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct Event {
	pub uid: u32,                  //  4
	pub pid: u32,                  //  4
	pub comm: [u8; TASK_COMM_LEN], // 16
}

const _: () = assert!(core::mem::size_of::<Event>() == EVENT_SIZE);
const _: () = assert!(core::mem::offset_of!(Event, uid) == UID_OFFSET);
const _: () = assert!(core::mem::offset_of!(Event, pid) == PID_OFFSET);
const _: () = assert!(core::mem::offset_of!(Event, comm) == COMM_OFFSET);

impl Event {
	/// Command name up to the first NUL, or all 16 bytes when the kernel
	/// filled the buffer without a terminator.
	pub fn comm_bytes(&self) -> &[u8] {
		let len = self.comm.iter().position(|&b| b == 0).unwrap_or(TASK_COMM_LEN);
		&self.comm[..len]
	}
}

/// Field-by-field writer over a reserved slot.
///
/// The event is never assembled on the stack and copied in; each field lands
/// directly at its wire offset.
pub struct EventWriter<'a> {
	buf: &'a mut [u8; EVENT_SIZE],
}

impl<'a> EventWriter<'a> {
	pub fn new(buf: &'a mut [u8; EVENT_SIZE]) -> Self {
		Self { buf }
	}

	#[inline(always)]
	pub fn set_uid(&mut self, uid: u32) {
		self.buf[UID_OFFSET..UID_OFFSET + 4].copy_from_slice(&uid.to_ne_bytes());
	}

	#[inline(always)]
	pub fn set_pid(&mut self, pid: u32) {
		self.buf[PID_OFFSET..PID_OFFSET + 4].copy_from_slice(&pid.to_ne_bytes());
	}

	#[inline(always)]
	pub fn comm_mut(&mut self) -> &mut [u8; TASK_COMM_LEN] {
		// SAFETY: COMM_OFFSET + TASK_COMM_LEN == EVENT_SIZE and u8 has no alignment.
		unsafe { &mut *(self.buf.as_mut_ptr().add(COMM_OFFSET) as *mut [u8; TASK_COMM_LEN]) }
	}
}

// region:    --- Tests

#[cfg(test)]
mod tests {
	type Result<T> = core::result::Result<T, Box<dyn std::error::Error>>; // For tests.

	use super::*;
	use zerocopy::{FromBytes, IntoBytes};

	#[test]
	fn event_writer_places_fields_at_wire_offsets() -> Result<()> {
		// -- Setup & Fixtures
		let mut fx_buf = [0xAAu8; EVENT_SIZE];

		// -- Exec
		let mut writer = EventWriter::new(&mut fx_buf);
		writer.set_uid(1000);
		writer.set_pid(4242);
		writer.comm_mut().copy_from_slice(b"bash\0\0\0\0\0\0\0\0\0\0\0\0");

		// -- Check
		assert_eq!(&fx_buf[0..4], &1000u32.to_ne_bytes());
		assert_eq!(&fx_buf[4..8], &4242u32.to_ne_bytes());
		assert_eq!(&fx_buf[8..12], b"bash");
		assert!(fx_buf[12..].iter().all(|&b| b == 0));

		Ok(())
	}

	#[test]
	fn event_reads_back_what_writer_wrote() -> Result<()> {
		// -- Setup & Fixtures
		let mut fx_buf = [0u8; EVENT_SIZE];
		let mut writer = EventWriter::new(&mut fx_buf);
		writer.set_uid(0);
		writer.set_pid(u32::MAX);
		writer.comm_mut().copy_from_slice(b"systemd-journal\0");

		// -- Exec
		let (evt, rest) = Event::read_from_prefix(&fx_buf).map_err(|_| "short buffer")?;

		// -- Check
		assert!(rest.is_empty());
		assert_eq!(evt.uid, 0);
		assert_eq!(evt.pid, u32::MAX);
		assert_eq!(evt.comm_bytes(), b"systemd-journal");
		assert_eq!(evt.as_bytes(), &fx_buf);

		Ok(())
	}

	#[test]
	fn comm_without_terminator_keeps_all_bytes() -> Result<()> {
		let evt = Event {
			uid: 1,
			pid: 2,
			comm: *b"0123456789abcdef",
		};

		assert_eq!(evt.comm_bytes(), b"0123456789abcdef");

		Ok(())
	}

	#[test]
	fn short_record_is_rejected() -> Result<()> {
		let fx_buf = [0u8; EVENT_SIZE - 1];

		assert!(Event::read_from_prefix(&fx_buf).is_err());

		Ok(())
	}
}

// endregion: --- Tests
