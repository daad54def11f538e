use std::time::Duration;

use execwatch_ring::Consumer;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::{event::ExecEvent, trx::Tx, Result};

/// Polls the in-process ring and forwards what it finds. A last drain runs
/// after `stop` so nothing committed before it is left behind.
pub struct LocalRingWorker {
	consumer: Consumer,
	tx: Tx<ExecEvent>,
	poll_interval: Duration,
	stop: CancellationToken,
}

impl LocalRingWorker {
	pub fn start(consumer: Consumer, tx: Tx<ExecEvent>, poll_interval: Duration, stop: CancellationToken) -> Result<Self> {
		Ok(Self {
			consumer,
			tx,
			poll_interval,
			stop,
		})
	}

	pub async fn run(mut self) -> Result<()> {
		let mut ticker = tokio::time::interval(self.poll_interval);

		loop {
			let stopped = tokio::select! {
				_ = self.stop.cancelled() => true,
				_ = ticker.tick() => false,
			};
			if stopped {
				break;
			}
			self.forward().await?;
		}

		self.forward().await
	}

	async fn forward(&mut self) -> Result<()> {
		let events: Vec<ExecEvent> = self.consumer.drain_events().map(ExecEvent::from).collect();
		if !events.is_empty() {
			trace!(count = events.len(), "drained local ring");
		}
		for evt in events {
			self.tx.send(evt).await?;
		}
		Ok(())
	}
}
