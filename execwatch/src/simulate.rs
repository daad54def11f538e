use std::sync::Arc;

use execwatch_common::{emit, Emitted};
use execwatch_ring::{new_ring, Producer, SimulatedTask};
use tokio::task::JoinSet;
use tracing::debug;

use crate::{
	cli::SimulateConfig,
	event::ExecEvent,
	supervisor::Supervisor,
	trx::new_channel,
	workers::{LocalRingWorker, PipelineCounters, SinkWorker, StatsWorker},
	Error, Result,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationReport {
	pub triggered: u64,
	pub committed: u64,
	pub delivered: u64,
	pub dropped: u64,
}

impl SimulationReport {
	/// Every trigger is either delivered or counted as dropped.
	pub fn check(&self) -> Result<()> {
		if self.committed != self.delivered || self.delivered + self.dropped != self.triggered {
			return Err(Error::AccountingMismatch {
				triggered: self.triggered,
				delivered: self.delivered,
				dropped: self.dropped,
			});
		}
		Ok(())
	}
}

/// Drive the producer from blocking threads into an in-process ring and run
/// the same sink and stats workers as the kernel pipeline.
pub async fn run_simulation(cfg: SimulateConfig) -> Result<SimulationReport> {
	let (producer, consumer) = new_ring(cfg.capacity)?;
	let (evt_tx, evt_rx) = new_channel::<ExecEvent>("exec_event");
	let counters = Arc::new(PipelineCounters::default());

	let mut supervisor = Supervisor::new();
	let drain_stop = supervisor.token().child_token();

	let local_worker = LocalRingWorker::start(consumer, evt_tx, cfg.poll_interval, drain_stop.clone())?;
	let sink_worker = SinkWorker::start(evt_rx, counters.clone())?;
	let stats_worker = StatsWorker::start(producer.clone(), counters.clone(), cfg.stats_interval, supervisor.token())?;
	supervisor.spawn("local_ring", local_worker.run());
	supervisor.spawn("sink", sink_worker.run());
	supervisor.spawn("stats", stats_worker.run());

	let mut producers = JoinSet::new();
	for cpu in 0..cfg.producers {
		let producer = producer.clone();
		let events = cfg.events_per_producer;
		producers.spawn_blocking(move || fire(cpu, events, &producer));
	}

	let mut committed = 0;
	while let Some(res) = producers.join_next().await {
		committed += res?;
	}
	debug!(committed, "producers finished");

	drain_stop.cancel();
	supervisor.shutdown().await?;

	let (delivered, _) = counters.snapshot();
	Ok(SimulationReport {
		triggered: cfg.producers as u64 * cfg.events_per_producer,
		committed,
		delivered,
		dropped: producer.dropped(),
	})
}

fn fire(cpu: u32, events: u64, producer: &Producer) -> u64 {
	let task = SimulatedTask::new(1000 + cpu, 1000, 4000 + cpu, 4000 + cpu, "sim-exec");

	(0..events).filter(|_| emit(&task, producer) == Emitted::Committed).count() as u64
}

// region:    --- Tests

#[cfg(test)]
mod tests {
	type Result<T> = core::result::Result<T, Box<dyn std::error::Error>>; // For tests.

	use super::*;
	use execwatch_common::EVENT_SIZE;
	use execwatch_ring::record_size;
	use std::time::Duration;

	fn fx_config(producers: u32, events: u64, capacity: usize) -> SimulateConfig {
		SimulateConfig {
			producers,
			events_per_producer: events,
			capacity,
			poll_interval: Duration::from_millis(1),
			stats_interval: Duration::from_secs(60),
		}
	}

	#[tokio::test]
	async fn small_ring_accounts_for_every_trigger() -> Result<()> {
		// -- Setup & Fixtures
		let fx_cfg = fx_config(2, 500, record_size(EVENT_SIZE) * 4);

		// -- Exec
		let report = run_simulation(fx_cfg).await?;

		// -- Check
		assert_eq!(report.triggered, 1000);
		assert_eq!(report.delivered + report.dropped, 1000);
		report.check()?;

		Ok(())
	}

	#[tokio::test]
	async fn roomy_ring_drops_nothing() -> Result<()> {
		let fx_cfg = fx_config(1, 1000, 32 * 1024);

		let report = run_simulation(fx_cfg).await?;

		assert_eq!(report.dropped, 0);
		assert_eq!(report.delivered, 1000);

		Ok(())
	}

	#[tokio::test]
	async fn bad_capacity_is_rejected() -> Result<()> {
		let res = run_simulation(fx_config(1, 1, 10)).await;

		assert!(matches!(res, Err(Error::Ring(_))));

		Ok(())
	}

	#[test]
	fn check_flags_lost_events() -> Result<()> {
		let report = SimulationReport {
			triggered: 10,
			committed: 6,
			delivered: 5,
			dropped: 4,
		};

		assert!(matches!(report.check(), Err(Error::AccountingMismatch { .. })));

		Ok(())
	}
}

// endregion: --- Tests
