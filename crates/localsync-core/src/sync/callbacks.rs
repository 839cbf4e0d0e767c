//! Sync callback registry and concurrent fan-out

use std::future::Future;
use std::sync::Arc;

use futures::future::{join_all, BoxFuture, FutureExt};
use tracing::{debug, error, warn};

use crate::queue::OfflineOperation;

/// A reconciliation hook run on every sync pass
pub type SyncCallback = Arc<dyn Fn() -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// Delivers one queued operation to the backend.
///
/// Delivery is at-least-once: an operation that reached the backend but
/// whose acknowledgement was lost is sent again on the next pass, so the
/// processor must tolerate replays (client-generated ids, set semantics for
/// likes and follows).
pub type OperationProcessor =
    Arc<dyn Fn(OfflineOperation) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// Box a plain async closure into a [`SyncCallback`]
pub fn sync_callback<F, Fut>(f: F) -> SyncCallback
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(move || f().boxed())
}

/// Box a plain async closure into an [`OperationProcessor`]
pub fn operation_processor<F, Fut>(f: F) -> OperationProcessor
where
    F: Fn(OfflineOperation) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(move |op| f(op).boxed())
}

#[derive(Clone)]
pub(crate) struct RegisteredCallback {
    pub name: String,
    pub callback: SyncCallback,
}

/// Outcome of one callback
pub(crate) struct CallbackOutcome {
    pub name: String,
    pub error: Option<String>,
}

/// Run every callback concurrently, each on its own task.
///
/// A callback that errors or panics only affects its own outcome.
pub(crate) async fn run_all(callbacks: Vec<RegisteredCallback>) -> Vec<CallbackOutcome> {
    let tasks = callbacks.into_iter().map(|registered| {
        let handle = tokio::spawn((registered.callback)());
        let name = registered.name;
        async move {
            let error = match handle.await {
                Ok(Ok(())) => {
                    debug!(callback = %name, "Sync callback finished");
                    None
                }
                Ok(Err(e)) => {
                    warn!(callback = %name, error = %format!("{:#}", e), "Sync callback failed");
                    Some(format!("{:#}", e))
                }
                Err(join_err) => {
                    error!(callback = %name, error = %join_err, "Sync callback panicked");
                    Some(join_err.to_string())
                }
            };
            CallbackOutcome { name, error }
        }
    });

    join_all(tasks).await
}
