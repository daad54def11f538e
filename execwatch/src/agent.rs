use std::{sync::Arc, time::Duration};

use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
	cli::ProbeConfig,
	event::ExecEvent,
	probe::ExecProbe,
	supervisor::Supervisor,
	trx::new_channel,
	workers::{PipelineCounters, RingBufWorker, SinkWorker, StatsWorker},
	Result,
};

pub async fn run_probe(cfg: ProbeConfig) -> Result<()> {
	bump_memlock_rlimit();

	let mut probe = ExecProbe::load(&cfg)?;
	let hook = probe.attach(&cfg)?;
	let ringbuf_fd = probe.take_ring()?;
	let drop_counter = probe.take_drop_counter()?;

	let (evt_tx, evt_rx) = new_channel::<ExecEvent>("exec_event");
	let counters = Arc::new(PipelineCounters::default());

	let mut supervisor = Supervisor::new();
	let ringbuf_worker = RingBufWorker::start(ringbuf_fd, evt_tx, supervisor.token())?;
	let sink_worker = SinkWorker::start(evt_rx, counters.clone())?;
	let stats_worker = StatsWorker::start(drop_counter, counters.clone(), cfg.stats_interval, supervisor.token())?;
	supervisor.spawn("ringbuf", ringbuf_worker.run());
	supervisor.spawn("sink", sink_worker.run());
	supervisor.spawn("stats", stats_worker.run());

	info!(hook = %hook, "Watching execve, Ctrl-C to stop");
	wait_for_shutdown(cfg.run_time, supervisor.token()).await?;

	supervisor.shutdown().await?;

	let (delivered, dropped) = counters.snapshot();
	info!(delivered, dropped, "execwatch stopped");

	// detaches the programs
	drop(probe);
	Ok(())
}

async fn wait_for_shutdown(run_time: Option<Duration>, token: CancellationToken) -> Result<()> {
	let mut sigterm = signal(SignalKind::terminate())?;

	tokio::select! {
		res = tokio::signal::ctrl_c() => {
			res?;
			info!("Received Ctrl-C, exiting..");
		}
		_ = sigterm.recv() => info!("Received SIGTERM, exiting.."),
		_ = run_timer(run_time) => info!("Run time elapsed, exiting.."),
		_ = token.cancelled() => warn!("A worker stopped, exiting.."),
	}

	Ok(())
}

async fn run_timer(run_time: Option<Duration>) {
	match run_time {
		Some(run_time) => tokio::time::sleep(run_time).await,
		None => std::future::pending().await,
	}
}

// Bump the memlock rlimit. This is needed for older kernels that don't use the
// new memcg based accounting, see https://lwn.net/Articles/837122/
fn bump_memlock_rlimit() {
	let rlim = libc::rlimit {
		rlim_cur: libc::RLIM_INFINITY,
		rlim_max: libc::RLIM_INFINITY,
	};
	let ret = unsafe { libc::setrlimit(libc::RLIMIT_MEMLOCK, &rlim) };
	if ret != 0 {
		debug!("remove limit on locked memory failed, ret is: {ret}");
	}
}
