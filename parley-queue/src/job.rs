//! Job definition.

use crate::error::QueueError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Job unique identifier.
pub type JobId = Uuid;

/// Job data payload.
pub type JobData = serde_json::Value;

/// Job priority, 1 (lowest) to 9 (most urgent).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct JobPriority(u8);

impl JobPriority {
    pub const LOWEST: JobPriority = JobPriority(1);
    pub const HIGHEST: JobPriority = JobPriority(9);

    /// Create a priority, rejecting values outside 1..=9.
    pub fn new(value: u8) -> Result<Self, QueueError> {
        if (Self::LOWEST.0..=Self::HIGHEST.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(QueueError::InvalidPriority(value))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// All priorities, most urgent first.
    pub fn descending() -> impl Iterator<Item = JobPriority> {
        (Self::LOWEST.0..=Self::HIGHEST.0).rev().map(JobPriority)
    }
}

impl Default for JobPriority {
    fn default() -> Self {
        JobPriority(5)
    }
}

impl fmt::Display for JobPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u8> for JobPriority {
    type Error = QueueError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        JobPriority::new(value)
    }
}

impl From<JobPriority> for u8 {
    fn from(priority: JobPriority) -> Self {
        priority.0
    }
}

/// A job handed to the queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Unique job identifier
    pub id: JobId,

    /// Job type/name
    pub job_type: String,

    /// Job payload data
    pub data: JobData,

    /// Job priority
    pub priority: JobPriority,

    /// Queue name
    pub queue: String,

    /// When the job was created
    pub created_at: DateTime<Utc>,

    /// Job metadata
    pub metadata: HashMap<String, String>,
}

impl Job {
    /// Create a new job.
    pub fn new(queue: impl Into<String>, job_type: impl Into<String>, data: JobData) -> Self {
        Self {
            id: Uuid::new_v4(),
            job_type: job_type.into(),
            data,
            priority: JobPriority::default(),
            queue: queue.into(),
            created_at: Utc::now(),
            metadata: HashMap::new(),
        }
    }

    /// Set job priority.
    pub fn with_priority(mut self, priority: JobPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Add metadata.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}
