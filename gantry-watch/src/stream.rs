//! Subscription surface over a polling session
//!
//! Consumers of the watchers receive a `WatchStream` and pull batches off it;
//! cancelling the subscription (explicitly or by dropping the stream) stops
//! the underlying session, so an abandoned subscriber can never leak polling.

use tokio::sync::mpsc;

use crate::poller::Poller;

/// A stream of successive results from one polling session
pub struct WatchStream<T> {
    rx: mpsc::UnboundedReceiver<T>,
    session: Poller<T>,
}

impl<T> WatchStream<T> {
    pub(crate) fn new(rx: mpsc::UnboundedReceiver<T>, session: Poller<T>) -> Self {
        Self { rx, session }
    }

    /// Receive the next batch
    ///
    /// Returns `None` once the session has stopped (convergence, expiration,
    /// or cancellation) and every batch delivered before the stop has been
    /// consumed. Expiration before convergence is not an error: the stream
    /// simply ends, and the last batch holds the final observed states.
    pub async fn next(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Cancel the subscription, stopping the underlying session
    ///
    /// Idempotent; batches already delivered remain readable.
    pub fn stop(&self) {
        self.session.stop();
    }

    /// Whether the underlying session is still running
    pub fn is_running(&self) -> bool {
        self.session.is_running()
    }
}

impl<T> Drop for WatchStream<T> {
    fn drop(&mut self) {
        self.session.stop();
    }
}
