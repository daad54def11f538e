use std::sync::Arc;

use execwatch_common::Event;
use zerocopy::FromBytes;

use crate::{Error, Result};

/// One execve observation, decoded for user space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecEvent {
	pub uid: u32,
	pub pid: u32,
	pub comm: Arc<str>,
}

impl From<Event> for ExecEvent {
	fn from(evt: Event) -> Self {
		Self {
			uid: evt.uid,
			pid: evt.pid,
			comm: Arc::from(String::from_utf8_lossy(evt.comm_bytes()).as_ref()),
		}
	}
}

pub fn parse_event_from_bytes(data: &[u8]) -> Result<Event> {
	let (evt, _) = Event::read_from_prefix(data).map_err(|_| Error::InvalidEventSize)?;
	Ok(evt)
}

// region:    --- Tests


// endregion: --- Tests
