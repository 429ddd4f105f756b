use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::models::job::{JobRecord, JobStatus};

/// In-memory set of jobs awaiting a terminal status.
///
/// Every operation holds the lock for a single map access, never across an
/// await, so polls for different jobs do not wait on each other.
#[derive(Debug, Default)]
pub struct JobStore {
    jobs: Mutex<HashMap<String, JobRecord>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, JobRecord>> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn insert(&self, record: JobRecord) {
        self.lock().insert(record.job_id.clone(), record);
    }

    pub fn contains(&self, job_id: &str) -> bool {
        self.lock().contains_key(job_id)
    }

    pub fn get(&self, job_id: &str) -> Option<JobRecord> {
        self.lock().get(job_id).cloned()
    }

    /// Returns false if the job is no longer tracked.
    pub fn update_status(&self, job_id: &str, status: JobStatus) -> bool {
        match self.lock().get_mut(job_id) {
            Some(record) => {
                record.status = status;
                true
            }
            None => false,
        }
    }

    /// Atomically remove a job. Only the caller that gets `Some` owns its cleanup.
    pub fn take(&self, job_id: &str) -> Option<JobRecord> {
        self.lock().remove(job_id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
