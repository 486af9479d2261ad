use std::future::Future;
use std::sync::OnceLock;

use tokio::runtime::{Builder, Handle, Runtime};
use tokio::task::JoinHandle;

use crate::TaskClass;

static FALLBACK: OnceLock<Runtime> = OnceLock::new();

/// The ambient runtime, or a small private one when called outside of any
/// tokio context.
fn handle() -> Handle {
	Handle::try_current().unwrap_or_else(|_| {
		FALLBACK
			.get_or_init(|| {
				Builder::new_multi_thread()
					.enable_all()
					.worker_threads(1)
					.thread_name("brandline-fallback")
					.build()
					.expect("failed to build brandline fallback runtime")
			})
			.handle()
			.clone()
	})
}

/// Spawns `fut`, tagging the trace event with its [`TaskClass`].
pub fn spawn<F>(class: TaskClass, fut: F) -> JoinHandle<F::Output>
where
	F: Future + Send + 'static,
	F::Output: Send + 'static,
{
	let handle = handle();
	tracing::trace!(worker_class = class.as_str(), flavor = ?handle.runtime_flavor(), "worker.spawn");
	handle.spawn(fut)
}
