use std::future::Future;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::Result;

pub struct Supervisor {
	pub shutdown: CancellationToken,
	pub tasks: JoinSet<Result<()>>,
}

impl Supervisor {
	pub fn new() -> Self {
		Self {
			shutdown: CancellationToken::new(),
			tasks: JoinSet::new(),
		}
	}

	pub fn token(&self) -> CancellationToken {
		self.shutdown.clone()
	}

	/// A failing worker cancels the shared token so the rest wind down too.
	pub fn spawn<F>(&mut self, name: &'static str, fut: F)
	where
		F: Future<Output = Result<()>> + Send + 'static,
	{
		let shutdown = self.shutdown.clone();
		self.tasks.spawn(async move {
			let res = fut.await;
			if let Err(err) = &res {
				error!(worker = name, "worker failed: {err}");
				shutdown.cancel();
			}
			res
		});
	}

	pub async fn shutdown(mut self) -> Result<()> {
		info!("Supervisor shutdown starting");
		self.shutdown.cancel();

		while let Some(res) = self.tasks.join_next().await {
			res??;
		}
		info!("Supervisor shutdown complete");

		Ok(())
	}
}

// region:    --- Tests

#[cfg(test)]
mod tests {
	type Result<T> = core::result::Result<T, Box<dyn std::error::Error>>; // For tests.

	use super::*;
	use crate::Error;

	#[tokio::test]
	async fn failing_worker_cancels_the_rest() -> Result<()> {
		// -- Setup & Fixtures
		let mut supervisor = Supervisor::new();
		let token = supervisor.token();

		// -- Exec
		supervisor.spawn("waiter", async move {
			token.cancelled().await;
			Ok(())
		});
		supervisor.spawn("failer", async { Err(Error::from("boom")) });
		supervisor.token().cancelled().await;
		let res = supervisor.shutdown().await;

		// -- Check
		assert!(matches!(res, Err(Error::Custom(msg)) if msg == "boom"));

		Ok(())
	}

	#[tokio::test]
	async fn shutdown_joins_clean_workers() -> Result<()> {
		let mut supervisor = Supervisor::new();
		let token = supervisor.token();
		supervisor.spawn("waiter", async move {
			token.cancelled().await;
			Ok(())
		});

		supervisor.shutdown().await?;

		Ok(())
	}
}

// endregion: --- Tests
