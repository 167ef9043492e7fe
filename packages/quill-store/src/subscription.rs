use std::future::Future;

use tokio::{sync::mpsc, task::JoinHandle};

use crate::Error;

const CHANNEL_CAPACITY: usize = 16;

/// Handle to a live feed. The feed's background task and its backend listener are released
/// exactly once, by `unsubscribe` or by dropping the handle.
pub struct Subscription<T, E = Error> {
	label: String,
	rx: mpsc::Receiver<Result<T, E>>,
	task: Option<JoinHandle<()>>,
}
impl<T, E> Subscription<T, E>
where
	T: Send + 'static,
	E: Send + 'static,
{
	/// Starts `feed` on the runtime. The feed pushes values into the sender and should return
	/// once sending fails.
	pub fn spawn<F, Fut>(label: impl Into<String>, feed: F) -> Self
	where
		F: FnOnce(mpsc::Sender<Result<T, E>>) -> Fut,
		Fut: Future<Output = ()> + Send + 'static,
	{
		let label = label.into();
		let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
		let task = tokio::spawn(feed(tx));

		tracing::debug!(subscription = %label, "Subscription opened.");

		Self { label, rx, task: Some(task) }
	}

	/// Waits for the next value. Returns `None` once the feed has ended.
	pub async fn next(&mut self) -> Option<Result<T, E>> {
		self.rx.recv().await
	}

	/// Transforms every value. The source subscription is owned by the new one and released with
	/// it.
	pub fn map<U, E2, F>(mut self, f: F) -> Subscription<U, E2>
	where
		U: Send + 'static,
		E2: From<E> + Send + 'static,
		F: Fn(T) -> Result<U, E2> + Send + 'static,
	{
		let label = self.label.clone();

		Subscription::spawn(label, move |tx| async move {
			while let Some(item) = self.next().await {
				let mapped = item.map_err(E2::from).and_then(&f);

				if tx.send(mapped).await.is_err() {
					break;
				}
			}
		})
	}

	pub fn label(&self) -> &str {
		&self.label
	}

	pub fn unsubscribe(self) {
		drop(self);
	}
}
impl<T, E> Subscription<T, E> {
	fn release(&mut self) {
		if let Some(task) = self.task.take() {
			task.abort();

			tracing::debug!(subscription = %self.label, "Subscription released.");
		}
	}
}
impl<T, E> Drop for Subscription<T, E> {
	fn drop(&mut self) {
		self.release();
	}
}
