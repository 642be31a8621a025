use std::future::Future;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::FetchError;

/// Where a fetch stands from the consumer's point of view. Loading always
/// flips off, on the success path and on every failure path.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchState<T> {
    Loading,
    Ready(T),
    Failed(String),
}

impl<T> FetchState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, FetchState::Loading)
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            FetchState::Ready(data) => Some(data),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            FetchState::Failed(message) => Some(message),
            _ => None,
        }
    }
}

/// One fetch running on the runtime, publishing its state over a watch
/// channel. Dropping the task aborts the fetch, so an abandoned fetch can
/// never update state after its consumer is gone.
pub struct FetchTask<T> {
    rx: watch::Receiver<FetchState<T>>,
    handle: JoinHandle<()>,
}

impl<T: Clone + Send + Sync + 'static> FetchTask<T> {
    pub fn spawn<F>(fetch: F) -> Self
    where
        F: Future<Output = Result<T, FetchError>> + Send + 'static,
    {
        let (tx, rx) = watch::channel(FetchState::Loading);
        let handle = tokio::spawn(async move {
            let state = match fetch.await {
                Ok(data) => FetchState::Ready(data),
                Err(err) => {
                    tracing::error!(error = %err, "fetch failed");
                    FetchState::Failed(err.to_string())
                }
            };
            let _ = tx.send(state);
        });
        Self { rx, handle }
    }

    pub fn state(&self) -> FetchState<T> {
        self.rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<FetchState<T>> {
        self.rx.clone()
    }

    /// Waits until the fetch leaves `Loading`. If the task was aborted this
    /// resolves to whatever state was last published.
    pub async fn finished(&mut self) -> FetchState<T> {
        loop {
            let state = self.rx.borrow_and_update().clone();
            if !state.is_loading() {
                return state;
            }
            if self.rx.changed().await.is_err() {
                return self.rx.borrow().clone();
            }
        }
    }
}

impl<T> Drop for FetchTask<T> {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
