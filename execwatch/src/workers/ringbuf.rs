use aya::maps::{MapData, RingBuf};
use execwatch_common::Event;
use tokio::io::unix::AsyncFd;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{
	event::{parse_event_from_bytes, ExecEvent},
	trx::Tx,
	Result,
};

/// Non-blocking reader of decoded records. `None` once nothing is ready.
pub trait RecordSource {
	fn next_event(&mut self) -> Option<Result<Event>>;
}

impl RecordSource for RingBuf<MapData> {
	fn next_event(&mut self) -> Option<Result<Event>> {
		// the item is handed back to the kernel when it drops here
		let item = self.next()?;
		Some(parse_event_from_bytes(&item))
	}
}

/// Forwards records from the kernel ring into the event channel.
pub struct RingBufWorker {
	pub ringbuf_fd: AsyncFd<RingBuf<MapData>>,
	pub tx: Tx<ExecEvent>,
	pub shutdown: CancellationToken,
}

impl RingBufWorker {
	pub fn start(ringbuf_fd: AsyncFd<RingBuf<MapData>>, tx: Tx<ExecEvent>, shutdown: CancellationToken) -> Result<Self> {
		Ok(RingBufWorker {
			ringbuf_fd,
			tx,
			shutdown,
		})
	}

	pub async fn run(mut self) -> Result<()> {
		loop {
			let mut guard = tokio::select! {
				_ = self.shutdown.cancelled() => break,
				guard = self.ringbuf_fd.readable_mut() => guard?,
			};

			forward_ready(guard.get_inner_mut(), &self.tx).await?;
			guard.clear_ready();
		}

		// records committed before shutdown still count as delivered
		let forwarded = forward_ready(self.ringbuf_fd.get_mut(), &self.tx).await?;
		debug!(forwarded, "ring buffer worker stopped");
		Ok(())
	}
}

/// Send everything ready right now. Malformed records are logged and skipped.
pub async fn forward_ready<S: RecordSource>(source: &mut S, tx: &Tx<ExecEvent>) -> Result<u64> {
	let mut forwarded = 0;
	while let Some(parsed) = source.next_event() {
		match parsed {
			Ok(evt) => {
				tx.send(ExecEvent::from(evt)).await?;
				forwarded += 1;
			}
			Err(err) => debug!("Failed to parse event: {err}"),
		}
	}
	Ok(forwarded)
}

// region:    --- Tests

#[cfg(test)]
mod tests {
	type Result<T> = core::result::Result<T, Box<dyn std::error::Error>>; // For tests.

	use super::*;
	use crate::trx::new_channel;
	use execwatch_common::{EventWriter, EVENT_SIZE};
	use std::collections::VecDeque;

	struct FxRecords(VecDeque<Vec<u8>>);

	impl RecordSource for FxRecords {
		fn next_event(&mut self) -> Option<crate::Result<Event>> {
			let record = self.0.pop_front()?;
			Some(parse_event_from_bytes(&record))
		}
	}

	fn fx_record(pid: u32) -> Vec<u8> {
		let mut buf = [0u8; EVENT_SIZE];
		let mut writer = EventWriter::new(&mut buf);
		writer.set_uid(0);
		writer.set_pid(pid);
		writer.comm_mut()[..2].copy_from_slice(b"sh");
		buf.to_vec()
	}

	#[tokio::test]
	async fn forward_ready_empties_the_source() -> Result<()> {
		// -- Setup & Fixtures
		let mut fx_source = FxRecords(VecDeque::from([fx_record(1), vec![0u8; 3], fx_record(2)]));
		let (tx, rx) = new_channel::<ExecEvent>("test");

		// -- Exec
		let forwarded = forward_ready(&mut fx_source, &tx).await?;
		drop(tx);
		let mut pids = Vec::new();
		while let Ok(evt) = rx.recv().await {
			pids.push(evt.pid);
		}

		// -- Check
		assert_eq!(forwarded, 2);
		assert_eq!(pids, vec![1, 2]);
		assert!(fx_source.0.is_empty());

		Ok(())
	}
}

// endregion: --- Tests
