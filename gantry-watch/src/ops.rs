//! Cluster operations
//!
//! The named watch operations the console exposes, each a thin binding of the
//! generic watchers in `watch.rs` over the HTTP client. This is the seam the
//! UI layer talks to: it subscribes to a stream of batches and renders them,
//! nothing more.

use std::future::Future;
use std::time::Duration;
use tracing::warn;

use gantry_client::{ClientError, ClusterClient};
use gantry_core::domain::job::Job;
use gantry_core::domain::node::{Node, NodeOperation};

use crate::stream::WatchStream;
use crate::watch::{self, Snapshot};

impl Snapshot for Node {
    fn ident(&self) -> &str {
        &self.name
    }
}

/// Watch operations over a cluster
///
/// Cheap to clone; clones share the client's connection pool.
#[derive(Debug, Clone)]
pub struct ClusterOps {
    client: ClusterClient,
}

impl ClusterOps {
    /// Create the operations facade over a client
    pub fn new(client: ClusterClient) -> Self {
        Self { client }
    }

    /// The underlying client
    pub fn client(&self) -> &ClusterClient {
        &self.client
    }

    // =============================================================================
    // Node Watches
    // =============================================================================

    /// Bring nodes online and stream their states until every one is Online
    pub async fn bring_nodes_online_and_watch(
        &self,
        names: Vec<String>,
        interval: Duration,
        expiration: Option<Duration>,
    ) -> Result<WatchStream<Vec<Node>>, ClientError> {
        self.operate_nodes_and_watch(NodeOperation::Online, names, interval, expiration)
            .await
    }

    /// Take nodes offline and stream their states until every one is Offline
    pub async fn take_nodes_offline_and_watch(
        &self,
        names: Vec<String>,
        interval: Duration,
        expiration: Option<Duration>,
    ) -> Result<WatchStream<Vec<Node>>, ClientError> {
        self.operate_nodes_and_watch(NodeOperation::Offline, names, interval, expiration)
            .await
    }

    /// Request a node state operation, then stream the targeted nodes until
    /// every one reaches the operation's target state
    ///
    /// Each batch carries the current snapshots of the nodes still being
    /// tracked; the query narrows to the not-yet-converged subset tick by
    /// tick. If the expiration passes first the stream just ends; compare
    /// the last batch against the target to find the stragglers.
    pub async fn operate_nodes_and_watch(
        &self,
        operation: NodeOperation,
        names: Vec<String>,
        interval: Duration,
        expiration: Option<Duration>,
    ) -> Result<WatchStream<Vec<Node>>, ClientError> {
        let target = operation.target_state();

        let action = {
            let client = self.client.clone();
            let names = names.clone();
            async move { client.operate_nodes(operation, &names).await }
        };
        let query = {
            let client = self.client.clone();
            move |pending: Vec<String>| {
                let client = client.clone();
                async move {
                    client
                        .list_nodes_by_name(&pending)
                        .await
                        .inspect_err(|err| warn!("node state query failed: {}", err))
                }
            }
        };

        watch::watch_set(
            action,
            query,
            move |node: &Node| node.state == target,
            names,
            interval,
            expiration,
        )
        .await
    }

    /// Poll the full node table on a fixed cadence
    ///
    /// Runs until the stream is stopped or dropped; this is what the node
    /// list view subscribes to.
    pub fn watch_all_nodes(&self, interval: Duration) -> WatchStream<Vec<Node>> {
        let client = self.client.clone();
        watch::poll(
            move || {
                let client = client.clone();
                async move {
                    client
                        .list_nodes()
                        .await
                        .inspect_err(|err| warn!("node list query failed: {}", err))
                }
            },
            interval,
            None,
        )
    }

    // =============================================================================
    // Job Watches
    // =============================================================================

    /// Submit a job, then stream its record until it reaches a terminal state
    pub async fn submit_job_and_watch(
        &self,
        job_id: u64,
        interval: Duration,
        expiration: Option<Duration>,
    ) -> Result<WatchStream<Job>, ClientError> {
        let client = self.client.clone();
        self.watch_job(
            async move { client.submit_job(job_id).await },
            job_id,
            interval,
            expiration,
        )
        .await
    }

    /// Cancel a job, then stream its record until it reaches a terminal state
    pub async fn cancel_job_and_watch(
        &self,
        job_id: u64,
        interval: Duration,
        expiration: Option<Duration>,
    ) -> Result<WatchStream<Job>, ClientError> {
        let client = self.client.clone();
        self.watch_job(
            async move { client.cancel_job(job_id).await },
            job_id,
            interval,
            expiration,
        )
        .await
    }

    /// Requeue a job, then stream its record until it reaches a terminal state
    pub async fn requeue_job_and_watch(
        &self,
        job_id: u64,
        interval: Duration,
        expiration: Option<Duration>,
    ) -> Result<WatchStream<Job>, ClientError> {
        let client = self.client.clone();
        self.watch_job(
            async move { client.requeue_job(job_id).await },
            job_id,
            interval,
            expiration,
        )
        .await
    }

    /// Finish a job, then stream its record until it reaches a terminal state
    pub async fn finish_job_and_watch(
        &self,
        job_id: u64,
        interval: Duration,
        expiration: Option<Duration>,
    ) -> Result<WatchStream<Job>, ClientError> {
        let client = self.client.clone();
        self.watch_job(
            async move { client.finish_job(job_id).await },
            job_id,
            interval,
            expiration,
        )
        .await
    }

    /// Run a job verb, then poll the job until [`Job::ended`]
    ///
    /// A single long-lived job id: the query is re-issued unmodified every
    /// tick, no narrowing applies.
    async fn watch_job<A>(
        &self,
        action: A,
        job_id: u64,
        interval: Duration,
        expiration: Option<Duration>,
    ) -> Result<WatchStream<Job>, ClientError>
    where
        A: Future<Output = Result<(), ClientError>>,
    {
        let client = self.client.clone();
        let query = move || {
            let client = client.clone();
            async move {
                client
                    .get_job(job_id)
                    .await
                    .inspect_err(|err| warn!("job {} query failed: {}", job_id, err))
            }
        };

        watch::watch_one(action, query, |job: &Job| job.ended(), interval, expiration).await
    }
}
