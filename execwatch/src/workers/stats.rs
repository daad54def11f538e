use std::{
	sync::{
		atomic::{AtomicU64, Ordering},
		Arc,
	},
	time::Duration,
};

use execwatch_ring::Producer;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::Result;

/// Where the drop count of a transport is read from.
pub trait DropSource: Send + 'static {
	fn dropped(&self) -> Result<u64>;
}

impl DropSource for Producer {
	fn dropped(&self) -> Result<u64> {
		Ok(Producer::dropped(self))
	}
}

#[derive(Debug, Default)]
pub struct PipelineCounters {
	pub delivered: AtomicU64,
	pub dropped: AtomicU64,
}

impl PipelineCounters {
	pub fn snapshot(&self) -> (u64, u64) {
		(self.delivered.load(Ordering::Relaxed), self.dropped.load(Ordering::Relaxed))
	}
}

/// Samples the drop source on an interval and logs when anything moved.
/// Takes a last sample on shutdown.
pub struct StatsWorker<D> {
	source: D,
	counters: Arc<PipelineCounters>,
	interval: Duration,
	shutdown: CancellationToken,
}

impl<D: DropSource> StatsWorker<D> {
	pub fn start(source: D, counters: Arc<PipelineCounters>, interval: Duration, shutdown: CancellationToken) -> Result<Self> {
		Ok(Self {
			source,
			counters,
			interval,
			shutdown,
		})
	}

	pub async fn run(self) -> Result<()> {
		let mut ticker = tokio::time::interval(self.interval);
		let mut last = (0, 0);

		loop {
			tokio::select! {
				_ = self.shutdown.cancelled() => break,
				_ = ticker.tick() => {
					self.sample();
					let now = self.counters.snapshot();
					if now != last {
						info!(delivered = now.0, dropped = now.1, "pipeline stats");
						last = now;
					}
				}
			}
		}

		self.sample();
		Ok(())
	}

	fn sample(&self) {
		match self.source.dropped() {
			Ok(dropped) => self.counters.dropped.store(dropped, Ordering::Relaxed),
			Err(err) => warn!("failed to read drop counter: {err}"),
		}
	}
}

// region:    --- Tests


// endregion: --- Tests
