//! Job-related API endpoints

use crate::ClusterClient;
use crate::error::Result;
use gantry_core::domain::job::Job;
use gantry_core::rest::RestObject;
use tracing::debug;

impl ClusterClient {
    // =============================================================================
    // Job Queries
    // =============================================================================

    /// Get a job by id
    ///
    /// This is the query the job watcher re-issues every tick.
    pub async fn get_job(&self, job_id: u64) -> Result<Job> {
        let url = format!("{}/api/jobs/{}", self.base_url, job_id);
        let response = self.client.get(&url).send().await?;

        let obj: RestObject = self.handle_response(response).await?;
        Ok(Job::from_properties(&obj)?)
    }

    /// List every job known to the scheduler
    pub async fn list_jobs(&self) -> Result<Vec<Job>> {
        let url = format!("{}/api/jobs", self.base_url);
        let response = self.client.get(&url).send().await?;

        let objects: Vec<RestObject> = self.handle_response(response).await?;
        objects
            .iter()
            .map(|obj| Job::from_properties(obj).map_err(Into::into))
            .collect()
    }

    // =============================================================================
    // Job Lifecycle Verbs
    // =============================================================================

    /// Submit a configured job to the queue
    pub async fn submit_job(&self, job_id: u64) -> Result<()> {
        self.job_verb(job_id, "submit").await
    }

    /// Cancel a job
    pub async fn cancel_job(&self, job_id: u64) -> Result<()> {
        self.job_verb(job_id, "cancel").await
    }

    /// Requeue a failed or canceled job
    pub async fn requeue_job(&self, job_id: u64) -> Result<()> {
        self.job_verb(job_id, "requeue").await
    }

    /// Finish a running job, marking it completed ahead of its tasks
    pub async fn finish_job(&self, job_id: u64) -> Result<()> {
        self.job_verb(job_id, "finish").await
    }

    async fn job_verb(&self, job_id: u64, verb: &str) -> Result<()> {
        debug!("Requesting {} for job {}", verb, job_id);

        let url = format!("{}/api/jobs/{}/{}", self.base_url, job_id, verb);
        let response = self.client.post(&url).send().await?;

        self.handle_empty_response(response).await
    }
}
