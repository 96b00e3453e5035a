//! Handle to the eventual result of a submitted operation.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::error::{Result, StorageLinkError};

/// Future resolving to the result of one storage operation.
///
/// The operation itself runs on the client's runtime whether or not this
/// handle is polled. Dropping it only discards the result.
#[must_use = "a Pending does nothing to the result unless awaited"]
#[derive(Debug)]
pub struct Pending<T> {
    rx: oneshot::Receiver<Result<T>>,
}

impl<T> Pending<T> {
    /// A pending result together with the sender that completes it.
    pub(crate) fn channel() -> (oneshot::Sender<Result<T>>, Self) {
        let (tx, rx) = oneshot::channel();
        (tx, Self { rx })
    }

    /// An already completed result.
    pub(crate) fn ready(result: Result<T>) -> Self {
        let (tx, pending) = Self::channel();
        let _ = tx.send(result);
        pending
    }

    pub(crate) fn failed(error: StorageLinkError) -> Self {
        Self::ready(Err(error))
    }
}

impl<T> Future for Pending<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|received| {
            received.unwrap_or_else(|_| {
                Err(StorageLinkError::InternalError(
                    "operation was dropped before completing".to_string(),
                ))
            })
        })
    }
}
