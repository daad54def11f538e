use crate::Result;

pub fn new_channel<T>(name: &'static str) -> (Tx<T>, Rx<T>) {
	let (tx, rx) = flume::unbounded();

	(Tx(tx, name), Rx(rx, name))
}

pub struct Tx<T>(flume::Sender<T>, &'static str);

impl<T> Tx<T> {
	pub async fn send(&self, value: impl Into<T>) -> Result<()> {
		self.0
			.send_async(value.into())
			.await
			.map_err(|err| crate::Error::EventSend(format!("{}: {err}", self.1)))
	}
}

pub struct Rx<T>(flume::Receiver<T>, &'static str);

impl<T> Rx<T> {
	/// Fails once every `Tx` is gone and the queue is empty.
	pub async fn recv(&self) -> Result<T> {
		let res = self.0.recv_async().await?;
		Ok(res)
	}

	pub fn name(&self) -> &'static str {
		self.1
	}
}
