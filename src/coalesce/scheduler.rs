use futures_util::future::BoxFuture;
use std::time::Duration;

/// Runs a one-shot task after a delay. Arming never cancels earlier tasks.
pub trait FlushScheduler: Send + Sync {
    fn arm(&self, delay: Duration, task: BoxFuture<'static, ()>);
}

/// Spawns each armed task onto the current tokio runtime.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioScheduler;

impl FlushScheduler for TokioScheduler {
    fn arm(&self, delay: Duration, task: BoxFuture<'static, ()>) {
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            task.await;
        });
    }
}
