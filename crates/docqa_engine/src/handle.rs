use std::future::Future;

use tokio::task::JoinHandle;

/// Interest in the result of a spawned controller operation.
///
/// Dropping or abandoning the handle does not abort the request; the
/// controller still applies its outcome when it completes.
#[derive(Debug)]
pub struct OpHandle<T> {
    task: JoinHandle<T>,
}

impl<T: Send + 'static> OpHandle<T> {
    pub(crate) fn spawn<F>(future: F) -> Self
    where
        F: Future<Output = T> + Send + 'static,
    {
        Self {
            task: tokio::spawn(future),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub fn abandon(self) {
        drop(self.task);
    }

    /// Waits for the operation. `None` if the task panicked.
    pub async fn outcome(self) -> Option<T> {
        self.task.await.ok()
    }
}
