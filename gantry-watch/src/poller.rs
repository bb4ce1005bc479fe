//! Poll engine
//!
//! Drives one asynchronous operation on a fixed cadence and delivers each
//! successful result to a handler. The engine knows nothing about nodes or
//! jobs; the watchers in `watch.rs` supply it with queries and convergence
//! logic.
//!
//! A session guarantees:
//! - at most one outstanding request at a time, with results delivered
//!   strictly in order
//! - the first request is dispatched immediately, the next one interval after
//!   the previous delivery
//! - stopping is idempotent and effective at every suspension point: a pending
//!   timer is disarmed, an in-flight request's eventual result is discarded
//! - an expiration deadline, fixed at start, stops the session after the
//!   in-flight response (if any) has been delivered and before a new request
//!   is dispatched
//! - a failed request drops that tick and keeps the cadence

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Error type produced by poll sources
pub type SourceError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Boxed request future, as stored in a session's source slot
pub type SourceFuture<T> = Pin<Box<dyn Future<Output = Result<T, SourceError>> + Send>>;

type SourceFn<T> = Box<dyn FnMut() -> SourceFuture<T> + Send>;

fn box_source<T, S, Fut>(mut source: S) -> SourceFn<T>
where
    S: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, SourceError>> + Send + 'static,
{
    Box::new(move || Box::pin(source()))
}

/// Callbacks a polling session delivers into
pub struct Handlers<T> {
    on_next: Box<dyn FnMut(T, &Poller<T>) + Send>,
    on_stop: Option<Box<dyn FnOnce() + Send>>,
}

impl<T> Handlers<T> {
    /// Create handlers from the per-tick callback
    ///
    /// The callback receives each successful result together with the session
    /// handle, so it can stop the session or swap its source from within.
    /// The engine does not arm the next tick until the callback returns.
    pub fn new(on_next: impl FnMut(T, &Poller<T>) + Send + 'static) -> Self {
        Self {
            on_next: Box::new(on_next),
            on_stop: None,
        }
    }

    /// Attach a callback fired exactly once when the session stops,
    /// whatever the cause (explicit stop, convergence, expiration)
    pub fn on_stop(mut self, on_stop: impl FnOnce() + Send + 'static) -> Self {
        self.on_stop = Some(Box::new(on_stop));
        self
    }
}

/// Shared mutable state of a session
///
/// The lock is only ever held for field access, never across an await and
/// never around a handler call, so handlers can call back into the session.
struct Slot<T> {
    source: SourceFn<T>,
    on_stop: Option<Box<dyn FnOnce() + Send>>,
    stopped: bool,
}

struct Inner<T> {
    slot: Mutex<Slot<T>>,
    cancel: CancellationToken,
}

/// Handle to a running polling session
///
/// Returned by [`Poller::start`]; clones address the same session. Dropping a
/// handle does not stop the session: stopping is always explicit (the stream
/// layer takes care of it for subscription-style consumers).
pub struct Poller<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for Poller<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Poller<T> {
    /// Stop the session
    ///
    /// Idempotent. Disarms a pending timer, discards an in-flight request's
    /// eventual result, and fires `on_stop` exactly once.
    pub fn stop(&self) {
        let on_stop = {
            let mut slot = self.inner.slot.lock().unwrap();
            if slot.stopped {
                return;
            }
            slot.stopped = true;
            self.inner.cancel.cancel();
            slot.on_stop.take()
        };

        if let Some(on_stop) = on_stop {
            on_stop();
        }
    }

    /// Whether the session is still running
    pub fn is_running(&self) -> bool {
        !self.inner.slot.lock().unwrap().stopped
    }
}

impl<T: Send + 'static> Poller<T> {
    /// Start a polling session
    ///
    /// Dispatches `source` immediately, then again `interval` after each
    /// delivery. With an `expiration`, the deadline is fixed once at
    /// `now + expiration` and the session stops when it passes.
    ///
    /// # Panics
    /// Panics if `interval` is zero.
    pub fn start<S, Fut>(
        source: S,
        handlers: Handlers<T>,
        interval: Duration,
        expiration: Option<Duration>,
    ) -> Self
    where
        S: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, SourceError>> + Send + 'static,
    {
        assert!(interval > Duration::ZERO, "poll interval must be positive");

        let Handlers { on_next, on_stop } = handlers;
        let deadline = expiration.map(|e| Instant::now() + e);

        let session = Self {
            inner: Arc::new(Inner {
                slot: Mutex::new(Slot {
                    source: box_source(source),
                    on_stop,
                    stopped: false,
                }),
                cancel: CancellationToken::new(),
            }),
        };

        tokio::spawn(session.clone().run(on_next, interval, deadline));
        session
    }

    /// Replace the operation dispatched on the next tick
    ///
    /// A request already in flight is not affected. Ignored once the session
    /// has stopped.
    pub fn set_source<S, Fut>(&self, source: S)
    where
        S: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, SourceError>> + Send + 'static,
    {
        let mut slot = self.inner.slot.lock().unwrap();
        if !slot.stopped {
            slot.source = box_source(source);
        }
    }

    /// Build the next request from the current source, unless stopped
    fn next_request(&self) -> Option<SourceFuture<T>> {
        let mut slot = self.inner.slot.lock().unwrap();
        if slot.stopped {
            return None;
        }
        Some((slot.source)())
    }

    async fn run(
        self,
        mut on_next: Box<dyn FnMut(T, &Poller<T>) + Send>,
        interval: Duration,
        deadline: Option<Instant>,
    ) {
        let cancel = self.inner.cancel.clone();

        loop {
            // Dispatch the current source. Stopping while the request is in
            // flight discards its eventual result.
            let request = match self.next_request() {
                Some(request) => request,
                None => break,
            };
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                result = request => result,
            };

            match result {
                Ok(value) => on_next(value, &self),
                // Operator-facing reporting of a failed query is the source's
                // own concern; the engine just keeps the cadence.
                Err(err) => debug!("dropping failed poll tick: {}", err),
            }

            // The handler may have stopped the session; the deadline stops it
            // only after the response above was delivered.
            if !self.is_running() {
                break;
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                break;
            }

            // Wait one interval before the next dispatch. Stop and deadline
            // are re-checked at fire time, so neither can let another request
            // slip out.
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = expire(deadline) => break,
                _ = time::sleep(interval) => {}
            }
        }

        self.stop();
    }
}

async fn expire(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}
