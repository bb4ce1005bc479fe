//! Job domain model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::str::FromStr;

use crate::rest::{DecodeError, RestObject};

/// A scheduler job
///
/// The console only reads jobs; mutation happens through the job verbs on the
/// client (submit, cancel, requeue, finish). The job watcher polls this record
/// until [`Job::ended`] reports a terminal state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Numeric job id assigned at creation
    pub id: u64,

    /// Display name
    pub name: Option<String>,

    /// Submitting user
    pub owner: Option<String>,

    /// Current scheduler state
    pub state: JobState,

    /// When the job was submitted to the queue
    pub submit_time: Option<DateTime<Utc>>,

    /// When the job started running
    pub start_time: Option<DateTime<Utc>>,

    /// When the job reached a terminal state
    pub end_time: Option<DateTime<Utc>>,
}

impl Job {
    /// Decode a job from the API's property bag
    pub fn from_properties(obj: &RestObject) -> Result<Self, DecodeError> {
        let id = obj
            .get_parsed("Id")
            .ok_or(DecodeError::MissingProperty("Id"))?;

        let state = obj
            .get("State")
            .map(|v| v.parse().unwrap_or(JobState::Unknown))
            .unwrap_or(JobState::Unknown);

        Ok(Self {
            id,
            name: obj.get("Name").map(str::to_string),
            owner: obj.get("Owner").map(str::to_string),
            state,
            submit_time: obj.get_time("SubmitTime"),
            start_time: obj.get_time("StartTime"),
            end_time: obj.get_time("EndTime"),
        })
    }

    /// Whether the job has reached a terminal state
    ///
    /// This is the convergence condition for every job watch.
    pub fn ended(&self) -> bool {
        matches!(
            self.state,
            JobState::Finished | JobState::Failed | JobState::Canceled
        )
    }
}

/// Scheduler state of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    Configuring,
    Submitted,
    Validating,
    Queued,
    Running,
    Finishing,
    Finished,
    Failed,
    Canceling,
    Canceled,
    /// State not reported or not recognized
    Unknown,
}

impl FromStr for JobState {
    type Err = Infallible;

    /// Never fails: states this build does not know map to `Unknown`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "Configuring" => JobState::Configuring,
            "Submitted" => JobState::Submitted,
            "Validating" => JobState::Validating,
            "Queued" => JobState::Queued,
            "Running" => JobState::Running,
            "Finishing" => JobState::Finishing,
            "Finished" => JobState::Finished,
            "Failed" => JobState::Failed,
            "Canceling" => JobState::Canceling,
            "Canceled" => JobState::Canceled,
            _ => JobState::Unknown,
        })
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobState::Configuring => "Configuring",
            JobState::Submitted => "Submitted",
            JobState::Validating => "Validating",
            JobState::Queued => "Queued",
            JobState::Running => "Running",
            JobState::Finishing => "Finishing",
            JobState::Finished => "Finished",
            JobState::Failed => "Failed",
            JobState::Canceling => "Canceling",
            JobState::Canceled => "Canceled",
            JobState::Unknown => "Unknown",
        };
        write!(f, "{}", s)
    }
}
