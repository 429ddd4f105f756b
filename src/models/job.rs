use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Status of a face-swap prediction as reported by the inference service.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Display, EnumString, PartialEq, Eq)]
#[serde(rename_all = "snake_case", from = "String")]
#[strum(serialize_all = "snake_case")]
pub enum JobStatus {
    Starting,
    Processing,
    Succeeded,
    Failed,
    Canceled,
    Unknown,
}

/// Statuses this service does not know are kept as non-terminal.
impl From<String> for JobStatus {
    fn from(value: String) -> Self {
        value.parse().unwrap_or(Self::Unknown)
    }
}

impl JobStatus {
    /// Terminal statuses end a job's tracked lifecycle. A canceled
    /// prediction never produces output, so it is settled like a failure.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Canceled)
    }
}

/// An accepted face-swap job, held in memory until a terminal status is seen.
#[derive(Debug, Clone)]
pub struct JobRecord {
    pub job_id: String,
    pub source_image_ref: String,
    pub mask_image_ref: Option<String>,
    pub character: String,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
}

impl JobRecord {
    /// Time since the job was accepted, clamped at zero.
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        (now - self.created_at).max(chrono::Duration::zero())
    }
}

/// What a single poll observed.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Pending { status: JobStatus },
    Succeeded { result_url: String },
    Failed { error: String },
}
