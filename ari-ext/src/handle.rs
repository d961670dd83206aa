//! Background operations

use std::future::Future;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::coordinator::Outcome;
use crate::error::{OperationError, Result};

/// A play or record operation running on its own task
#[derive(Debug)]
pub struct OperationHandle {
    cancel: CancellationToken,
    task: JoinHandle<Result<Outcome>>,
}

impl OperationHandle {
    /// Abandon the operation; [`wait`](Self::wait) then yields
    /// [`Outcome::Canceled`] unless it had already ended
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub async fn wait(self) -> Result<Outcome> {
        self.task
            .await
            .map_err(|e| OperationError::Join(e.to_string()))?
    }
}

/// Run `operation` on a new task
///
/// The operation receives the token [`OperationHandle::cancel`] fires and
/// should pass it into its options.
///
/// ```rust,no_run
/// use ari_ext::{play, spawn, PlayOptions, Target};
///
/// # async fn demo(target: Target) -> ari_ext::Result<()> {
/// let handle = spawn(move |cancel| async move {
///     play(&target, "sound:hello-world", &PlayOptions::default().with_cancel(cancel)).await
/// });
///
/// handle.cancel();
/// assert!(handle.wait().await?.is_canceled());
/// # Ok(())
/// # }
/// ```
pub fn spawn<F, Fut>(operation: F) -> OperationHandle
where
    F: FnOnce(CancellationToken) -> Fut,
    Fut: Future<Output = Result<Outcome>> + Send + 'static,
{
    let cancel = CancellationToken::new();
    let task = tokio::spawn(operation(cancel.clone()));
    OperationHandle { cancel, task }
}
