//! Job descriptors, queue names, and timestamps.

use crate::error::ValidationError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

// ============================================================================
// Core Domain Identifiers
// ============================================================================

/// Validated queue name with length and character restrictions
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct QueueName(String);

impl QueueName {
    /// Create new queue name with validation
    pub fn new(name: impl Into<String>) -> Result<Self, ValidationError> {
        let name = name.into();

        if name.is_empty() || name.len() > 128 {
            return Err(ValidationError::OutOfRange {
                field: "queue_name".to_string(),
                message: "must be 1-128 characters".to_string(),
            });
        }

        // Validate characters (ASCII alphanumeric, hyphens, underscores)
        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ValidationError::InvalidFormat {
                field: "queue_name".to_string(),
                message: "only ASCII alphanumeric, hyphens, and underscores allowed".to_string(),
            });
        }

        // Validate no leading/trailing hyphens or consecutive hyphens
        if name.starts_with('-') || name.ends_with('-') || name.contains("--") {
            return Err(ValidationError::InvalidFormat {
                field: "queue_name".to_string(),
                message: "no leading/trailing hyphens or consecutive hyphens".to_string(),
            });
        }

        Ok(Self(name))
    }

    /// Get queue name as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for QueueName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for QueueName {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for QueueName {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<QueueName> for String {
    fn from(value: QueueName) -> Self {
        value.0
    }
}

/// Unique identifier for queue entries
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(String);

impl JobId {
    /// Generate new random job ID
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Get job ID as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for JobId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ValidationError::Required {
                field: "job_id".to_string(),
            });
        }

        Ok(Self(s.to_string()))
    }
}

/// Timestamp wrapper for consistent time handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create timestamp for current time
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Create timestamp from DateTime
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Get underlying DateTime
    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }

    /// Seconds since the Unix epoch; the score used by scheduled-set backends
    pub fn epoch_seconds(&self) -> i64 {
        self.0.timestamp()
    }

    /// Timestamp shifted forward by whole seconds
    pub fn add_seconds(&self, seconds: i64) -> Self {
        Self(self.0 + Duration::seconds(seconds))
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

// ============================================================================
// Job Types
// ============================================================================

/// A unit of background work to submit to a named queue.
///
/// Two descriptors are duplicates iff `job_type` and `args` are deeply
/// equal; `queue` and `scheduled_at` are not part of that identity. The
/// argument sequence is positional: order matters for both the consuming
/// worker and duplicate comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDescriptor {
    /// Logical job identifier consumed by the external worker fleet
    pub job_type: String,

    /// Positional JSON arguments
    pub args: Vec<serde_json::Value>,

    /// Destination queue
    pub queue: QueueName,

    /// Earliest execution time
    pub scheduled_at: Timestamp,
}

impl JobDescriptor {
    /// Create new job descriptor
    pub fn new(
        job_type: impl Into<String>,
        args: Vec<serde_json::Value>,
        queue: QueueName,
        scheduled_at: Timestamp,
    ) -> Self {
        Self {
            job_type: job_type.into(),
            args,
            queue,
            scheduled_at,
        }
    }

    /// Whether a pending entry describes the same logical work.
    ///
    /// Only `job_type` and the full `args` sequence participate; the queue a
    /// copy happens to sit in and its scheduling time are ignored.
    pub fn same_work_as(&self, pending: &PendingJob) -> bool {
        self.job_type == pending.job_type && self.args == pending.args
    }
}

/// An entry currently waiting in a queue, as reported by a provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingJob {
    /// Provider-assigned entry identifier
    pub jid: JobId,

    /// Logical job identifier
    pub job_type: String,

    /// Positional JSON arguments
    pub args: Vec<serde_json::Value>,

    /// Queue the entry is waiting in
    pub queue: QueueName,

    /// Earliest execution time
    pub scheduled_at: Timestamp,
}

impl PendingJob {
    /// Build the pending entry a provider stores for a descriptor
    pub fn from_descriptor(descriptor: &JobDescriptor, jid: JobId) -> Self {
        Self {
            jid,
            job_type: descriptor.job_type.clone(),
            args: descriptor.args.clone(),
            queue: descriptor.queue.clone(),
            scheduled_at: descriptor.scheduled_at,
        }
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
