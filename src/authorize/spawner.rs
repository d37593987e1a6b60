//! Background task supervision.
//!
//! Forked push continuations run detached in production; the spawner seam
//! lets tests capture the task and drive it deterministically instead of
//! racing a live runtime.

use std::future::Future;
use std::pin::Pin;

/// Boxed unit of background work.
pub type BackgroundTask = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Spawns detached background work.
pub trait TaskSpawner: Send + Sync {
    fn spawn(&self, task: BackgroundTask);
}

/// Production spawner; tasks run unsupervised on the tokio runtime and the
/// caller never joins them.
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioSpawner;

impl TaskSpawner for TokioSpawner {
    fn spawn(&self, task: BackgroundTask) {
        tokio::spawn(task);
    }
}
