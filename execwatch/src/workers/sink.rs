use std::sync::{atomic::Ordering, Arc};

use tracing::{debug, info};

use crate::{event::ExecEvent, trx::Rx, workers::PipelineCounters, Result};

/// Reports each event. Runs until every sender is gone, so events already
/// queued at shutdown are still reported.
pub struct SinkWorker {
	rx: Rx<ExecEvent>,
	counters: Arc<PipelineCounters>,
}

impl SinkWorker {
	pub fn start(rx: Rx<ExecEvent>, counters: Arc<PipelineCounters>) -> Result<Self> {
		Ok(Self { rx, counters })
	}

	pub async fn run(self) -> Result<()> {
		while let Ok(evt) = self.rx.recv().await {
			info!(target: "exec", "uid: {}\tpid: {}\tcomm: {}", evt.uid, evt.pid, evt.comm);
			self.counters.delivered.fetch_add(1, Ordering::Relaxed);
		}

		debug!(channel = self.rx.name(), "event channel closed");
		Ok(())
	}
}

// region:    --- Tests

#[cfg(test)]
mod tests {
	type Result<T> = core::result::Result<T, Box<dyn std::error::Error>>; // For tests.

	use super::*;
	use crate::trx::new_channel;

	#[tokio::test]
	async fn sink_counts_until_senders_are_gone() -> Result<()> {
		// -- Setup & Fixtures
		let (tx, rx) = new_channel::<ExecEvent>("test");
		let counters = Arc::new(PipelineCounters::default());
		let sink = SinkWorker::start(rx, counters.clone())?;

		// -- Exec
		for pid in 0..3 {
			tx.send(ExecEvent {
				uid: 0,
				pid,
				comm: Arc::from("sh"),
			})
			.await?;
		}
		drop(tx);
		sink.run().await?;

		// -- Check
		assert_eq!(counters.delivered.load(Ordering::Relaxed), 3);

		Ok(())
	}
}

// endregion: --- Tests
