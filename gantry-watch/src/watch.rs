//! Watch-until-convergence
//!
//! Expresses "perform an action on some entities, then report their evolving
//! state until every one reaches a target condition or a timeout elapses" as a
//! single subscribable stream of snapshots.
//!
//! The flow, for the set-based watcher:
//! 1. Await the triggering action; if it fails, no session is ever started and
//!    the failure surfaces once to the caller.
//! 2. Start a [`Poller`] whose source queries all target names.
//! 3. On each batch: forward it to the stream, then compute the subset that
//!    has not converged. Empty subset stops the session; otherwise the source
//!    is swapped for a query over just that subset, so the polled set strictly
//!    narrows over time.
//! 4. Expiration before convergence silently ends the stream; the last batch
//!    holds the final observed states.

use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::poller::{Handlers, Poller, SourceError, SourceFuture};
use crate::stream::WatchStream;

/// The view of an entity the set watcher needs: a stable identifier it can
/// requery the entity by while it has not converged
pub trait Snapshot {
    /// Identifier used to narrow follow-up queries
    fn ident(&self) -> &str;
}

/// Act on a set of named entities, then stream their states until all
/// converge
///
/// `query` is invoked with the names still pending; `is_converged` decides,
/// per entity, whether it has reached the target. See the module docs for the
/// full flow.
pub async fn watch_set<T, A, E, Q, Fut, C>(
    action: A,
    query: Q,
    is_converged: C,
    names: Vec<String>,
    interval: Duration,
    expiration: Option<Duration>,
) -> Result<WatchStream<Vec<T>>, E>
where
    T: Snapshot + Send + 'static,
    A: Future<Output = Result<(), E>>,
    E: Into<SourceError> + Send + 'static,
    Q: Fn(Vec<String>) -> Fut + Clone + Send + 'static,
    Fut: Future<Output = Result<Vec<T>, E>> + Send + 'static,
    C: Fn(&T) -> bool + Send + 'static,
{
    // The triggering action must complete before any polling begins.
    action.await?;

    let (tx, rx) = mpsc::unbounded_channel();

    let initial = source_for(query.clone(), names);
    let handlers = Handlers::new(move |batch: Vec<T>, session: &Poller<Vec<T>>| {
        let pending: Vec<String> = batch
            .iter()
            .filter(|entity| !is_converged(entity))
            .map(|entity| entity.ident().to_string())
            .collect();

        // A dropped receiver stops the session through the stream's Drop
        // impl; nothing to do about the failed send here.
        let _ = tx.send(batch);

        if pending.is_empty() {
            session.stop();
        } else {
            session.set_source(source_for(query.clone(), pending));
        }
    });

    let session = Poller::start(initial, handlers, interval, expiration);
    Ok(WatchStream::new(rx, session))
}

/// Act on a single long-lived entity, then poll it until it converges
///
/// No narrowing applies: the same query is re-issued unmodified every tick,
/// and the session stops on the first snapshot where `is_converged` holds.
pub async fn watch_one<T, A, E, Q, Fut, C>(
    action: A,
    query: Q,
    is_converged: C,
    interval: Duration,
    expiration: Option<Duration>,
) -> Result<WatchStream<T>, E>
where
    T: Send + 'static,
    A: Future<Output = Result<(), E>>,
    E: Into<SourceError> + Send + 'static,
    Q: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    C: Fn(&T) -> bool + Send + 'static,
{
    action.await?;

    let (tx, rx) = mpsc::unbounded_channel();

    let handlers = Handlers::new(move |snapshot: T, session: &Poller<T>| {
        let converged = is_converged(&snapshot);
        let _ = tx.send(snapshot);
        if converged {
            session.stop();
        }
    });

    let source = move || {
        let request = query();
        async move { request.await.map_err(Into::into) }
    };

    let session = Poller::start(source, handlers, interval, expiration);
    Ok(WatchStream::new(rx, session))
}

/// Stream a query's results on a fixed cadence, with no action and no
/// convergence condition
///
/// Runs until the stream is stopped or dropped, or the expiration passes.
/// This is what list views poll their tables with.
pub fn poll<T, E, Q, Fut>(
    query: Q,
    interval: Duration,
    expiration: Option<Duration>,
) -> WatchStream<T>
where
    T: Send + 'static,
    E: Into<SourceError> + Send + 'static,
    Q: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();

    let handlers = Handlers::new(move |value: T, _: &Poller<T>| {
        let _ = tx.send(value);
    });

    let source = move || {
        let request = query();
        async move { request.await.map_err(Into::into) }
    };

    let session = Poller::start(source, handlers, interval, expiration);
    WatchStream::new(rx, session)
}

/// Bind a names-parameterized query and a fixed name set into a poll source
fn source_for<T, E, Q, Fut>(
    query: Q,
    names: Vec<String>,
) -> impl FnMut() -> SourceFuture<Vec<T>> + Send + 'static
where
    T: Send + 'static,
    E: Into<SourceError> + Send + 'static,
    Q: Fn(Vec<String>) -> Fut + Send + 'static,
    Fut: Future<Output = Result<Vec<T>, E>> + Send + 'static,
{
    move || {
        let request = query(names.clone());
        let request: SourceFuture<Vec<T>> =
            Box::pin(async move { request.await.map_err(Into::into) });
        request
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use tokio::time;

    struct Probe {
        name: String,
        done: bool,
    }

    impl Snapshot for Probe {
        fn ident(&self) -> &str {
            &self.name
        }
    }

    fn names(batch: &[Probe]) -> Vec<&str> {
        batch.iter().map(|p| p.name.as_str()).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_watch_narrows_to_pending_entities() {
        let calls: Arc<Mutex<Vec<Vec<String>>>> = Arc::new(Mutex::new(Vec::new()));

        // Round 1: A and C have converged, B has not. Round 2: everything has.
        let query = {
            let calls = calls.clone();
            move |pending: Vec<String>| {
                let calls = calls.clone();
                async move {
                    let round = {
                        let mut calls = calls.lock().unwrap();
                        calls.push(pending.clone());
                        calls.len()
                    };
                    let batch = pending
                        .into_iter()
                        .map(|name| Probe {
                            done: round > 1 || name != "B",
                            name,
                        })
                        .collect::<Vec<_>>();
                    Ok::<_, SourceError>(batch)
                }
            }
        };

        let mut stream = watch_set(
            async { Ok::<_, SourceError>(()) },
            query,
            |probe: &Probe| probe.done,
            vec!["A".to_string(), "B".to_string(), "C".to_string()],
            Duration::from_millis(100),
            None,
        )
        .await
        .unwrap();

        let first = stream.next().await.unwrap();
        assert_eq!(names(&first), ["A", "B", "C"]);

        let second = stream.next().await.unwrap();
        assert_eq!(names(&second), ["B"]);

        // B converged in round 2, so the session stopped and no further
        // batches arrive.
        assert!(stream.next().await.is_none());

        let calls = calls.lock().unwrap();
        assert_eq!(*calls, vec![vec!["A", "B", "C"], vec!["B"]]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_watch_expires_without_convergence() {
        let calls: Arc<Mutex<Vec<Vec<String>>>> = Arc::new(Mutex::new(Vec::new()));

        let query = {
            let calls = calls.clone();
            move |pending: Vec<String>| {
                let calls = calls.clone();
                async move {
                    calls.lock().unwrap().push(pending.clone());
                    let batch = pending
                        .into_iter()
                        .map(|name| Probe { name, done: false })
                        .collect::<Vec<_>>();
                    Ok::<_, SourceError>(batch)
                }
            }
        };

        let mut stream = watch_set(
            async { Ok::<_, SourceError>(()) },
            query,
            |probe: &Probe| probe.done,
            vec!["N1".to_string()],
            Duration::from_millis(100),
            Some(Duration::from_millis(200)),
        )
        .await
        .unwrap();

        // Exactly two batches, at t=0 and t=interval, then a silent end.
        assert!(stream.next().await.is_some());
        assert!(stream.next().await.is_some());
        assert!(stream.next().await.is_none());

        let calls = calls.lock().unwrap();
        assert_eq!(*calls, vec![vec!["N1"], vec!["N1"]]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_action_never_starts_polling() {
        let queries = Arc::new(AtomicUsize::new(0));

        let query = {
            let queries = queries.clone();
            move |_pending: Vec<String>| {
                let queries = queries.clone();
                async move {
                    queries.fetch_add(1, Ordering::SeqCst);
                    Ok::<Vec<Probe>, SourceError>(Vec::new())
                }
            }
        };

        let result = watch_set(
            async { Err::<(), SourceError>("rejected".into()) },
            query,
            |probe: &Probe| probe.done,
            vec!["N1".to_string()],
            Duration::from_millis(100),
            None,
        )
        .await;

        assert!(result.is_err());
        time::sleep(Duration::from_secs(1)).await;
        assert_eq!(queries.load(Ordering::SeqCst), 0);
    }

    struct Status {
        seq: usize,
        ended: bool,
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_entity_watch_stops_on_first_converged_tick() {
        let calls = Arc::new(AtomicUsize::new(0));

        let query = {
            let calls = calls.clone();
            move || {
                let calls = calls.clone();
                async move {
                    let seq = calls.fetch_add(1, Ordering::SeqCst) + 1;
                    Ok::<_, SourceError>(Status {
                        seq,
                        ended: seq >= 3,
                    })
                }
            }
        };

        let mut stream = watch_one(
            async { Ok::<_, SourceError>(()) },
            query,
            |status: &Status| status.ended,
            Duration::from_millis(100),
            None,
        )
        .await
        .unwrap();

        assert!(!stream.next().await.unwrap().ended);
        assert!(!stream.next().await.unwrap().ended);
        let last = stream.next().await.unwrap();
        assert!(last.ended);
        assert_eq!(last.seq, 3);
        assert!(stream.next().await.is_none());

        // No queries past the converged one.
        time::sleep(Duration::from_secs(1)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_stream_stops_polling() {
        let calls = Arc::new(AtomicUsize::new(0));

        let query = {
            let calls = calls.clone();
            move || {
                let calls = calls.clone();
                async move { Ok::<_, SourceError>(calls.fetch_add(1, Ordering::SeqCst)) }
            }
        };

        let mut stream = poll(query, Duration::from_millis(100), None);
        stream.next().await.unwrap();
        drop(stream);

        let seen = calls.load(Ordering::SeqCst);
        time::sleep(Duration::from_secs(5)).await;
        assert_eq!(calls.load(Ordering::SeqCst), seen);
    }
}
