//! Gantry Watch
//!
//! The polling core of the cluster console.
//!
//! Architecture:
//! - Poller: a generic engine that re-invokes an asynchronous operation on a
//!   fixed cadence, delivers each result to a handler, and supports swapping
//!   the operation between ticks, an absolute expiration deadline, and
//!   race-free cancellation
//! - Watch: the watch-until-convergence pattern built on the engine (act on a
//!   set of entities, stream their states, narrow the query as they converge)
//! - Stream: the subscribe/cancel surface consumers receive batches through
//! - Ops: the named cluster operations (node online/offline watches, job
//!   lifecycle watches) binding the watchers over the HTTP client

pub mod ops;
pub mod poller;
pub mod stream;
pub mod watch;

pub use ops::ClusterOps;
pub use poller::{Handlers, Poller, SourceError, SourceFuture};
pub use stream::WatchStream;
pub use watch::{Snapshot, poll, watch_one, watch_set};
