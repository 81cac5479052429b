use super::error::Error;

use std::{future::Future, time::Duration};
use tokio::{sync::watch, time};

/// Create a pair of cancellation halves.
pub fn new() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { sender: Some(tx) }, CancelSignal { receiver: rx })
}

/// Controlling half of a cancellation pair.
///
/// Calling [`cancel`](CancelHandle::cancel) makes every cloned [`CancelSignal`] observe the
/// cancellation. Dropping the handle without cancelling leaves the signals untouched.
#[derive(Debug)]
pub struct CancelHandle {
    sender: Option<watch::Sender<bool>>,
}

impl CancelHandle {
    /// Send `Cancel` event to every signal half.
    pub fn cancel(&mut self) {
        if let Some(tx) = self.sender.take() {
            // Signals created later still need to see the event, so keep the value even when
            // no receiver is alive right now.
            tx.send_replace(true);
        }
    }

    /// Return true if `cancel` has already been called.
    pub fn is_cancelled(&self) -> bool {
        self.sender.is_none()
    }
}

/// Observing half of a cancellation pair, shared by every stage of the pipeline.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    receiver: watch::Receiver<bool>,
}

impl CancelSignal {
    /// A signal that never fires.
    pub fn never() -> Self {
        let (tx, rx) = watch::channel(false);
        // A watch receiver keeps its last value after the sender is gone.
        drop(tx);
        Self { receiver: rx }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Complete once the cancel event is received. Never completes if the handle was dropped
    /// without cancelling.
    pub async fn cancelled(&self) {
        let mut rx = self.receiver.clone();

        loop {
            if *rx.borrow_and_update() {
                return;
            }

            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }

    /// Run a request, giving up with [`Error::Cancelled`] as soon as the signal fires and with
    /// [`Error::Timeout`] once `timeout` elapses.
    pub async fn guard<T, F>(&self, timeout: Option<Duration>, request: F) -> Result<T, Error>
    where
        F: Future<Output = Result<T, Error>>,
    {
        if self.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let request = async {
            match timeout {
                Some(duration) => time::timeout(duration, request)
                    .await
                    .map_err(|_| Error::Timeout(duration))?,
                None => request.await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancelled() => Err(Error::Cancelled),
            output = request => output,
        }
    }
}
