//! Redis-backed job handoff.
//!
//! Jobs are stored as JSON under `<prefix>:job:<id>` and indexed in one
//! sorted set per priority (`<prefix>:priority:<n>`) scored by creation time,
//! which is the layout the external workers poll.

use crate::error::{QueueError, QueueResult};
use crate::job::{Job, JobData, JobId, JobPriority};
use crate::queue::JobQueue;
use async_trait::async_trait;
use redis::{AsyncCommands, Client, aio::ConnectionManager};
use std::time::Duration;
use tracing::{debug, info};

/// Redis queue configuration.
#[derive(Debug, Clone)]
pub struct RedisQueueConfig {
    /// Redis connection URL
    pub redis_url: String,

    /// Queue name
    pub queue_name: String,

    /// Key prefix for Redis keys
    pub key_prefix: String,

    /// Maximum queue size (0 = unlimited)
    pub max_size: usize,

    /// How long job bodies are kept
    pub retention_time: Duration,
}

impl RedisQueueConfig {
    /// Create a new queue configuration.
    pub fn new(redis_url: impl Into<String>, queue_name: impl Into<String>) -> Self {
        let queue_name = queue_name.into();
        Self {
            redis_url: redis_url.into(),
            key_prefix: format!("parley:queue:{}", queue_name),
            queue_name,
            max_size: 0,
            retention_time: Duration::from_secs(86400), // 24 hours
        }
    }

    /// Set the key prefix.
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Set the maximum queue size.
    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    /// Set the retention time for job bodies.
    pub fn with_retention_time(mut self, retention_time: Duration) -> Self {
        self.retention_time = retention_time;
        self
    }

    /// Build Redis key.
    pub fn key(&self, suffix: &str) -> String {
        format!("{}:{}", self.key_prefix, suffix)
    }

    pub fn job_key(&self, job_id: JobId) -> String {
        self.key(&format!("job:{}", job_id))
    }

    pub fn priority_key(&self, priority: JobPriority) -> String {
        self.key(&format!("priority:{}", priority.get()))
    }

    /// Job body and priority index written in one MULTI/EXEC transaction.
    pub fn enqueue_pipeline(&self, job: &Job) -> QueueResult<redis::Pipeline> {
        let job_json =
            serde_json::to_string(job).map_err(|e| QueueError::Serialization(e.to_string()))?;

        let mut pipe = redis::pipe();
        pipe.atomic()
            .set_ex(self.job_key(job.id), job_json, self.retention_time.as_secs())
            .ignore()
            .zadd(
                self.priority_key(job.priority),
                job.id.to_string(),
                job.created_at.timestamp_millis(),
            )
            .ignore();
        Ok(pipe)
    }
}

/// Job queue backed by Redis.
#[derive(Clone)]
pub struct RedisQueue {
    connection: ConnectionManager,
    config: RedisQueueConfig,
}

impl RedisQueue {
    /// Connect with the given configuration.
    pub async fn connect(config: RedisQueueConfig) -> QueueResult<Self> {
        info!(queue = %config.queue_name, "Initializing redis job queue");
        debug!(prefix = %config.key_prefix, max_size = config.max_size, "Queue config");

        let client = Client::open(config.redis_url.as_str())
            .map_err(|e| QueueError::Config(e.to_string()))?;

        let connection = ConnectionManager::new(client).await?;

        info!(queue = %config.queue_name, "Redis job queue ready");
        Ok(Self { connection, config })
    }

    pub fn config(&self) -> &RedisQueueConfig {
        &self.config
    }

    /// Enqueue a prebuilt job.
    pub async fn enqueue_job(&self, job: Job) -> QueueResult<JobId> {
        if self.config.max_size > 0 {
            let size = self.size().await?;
            if size >= self.config.max_size {
                return Err(QueueError::QueueFull);
            }
        }

        let mut conn = self.connection.clone();
        self.config
            .enqueue_pipeline(&job)?
            .query_async::<()>(&mut conn)
            .await?;

        Ok(job.id)
    }

    /// Pending jobs across all priorities.
    pub async fn size(&self) -> QueueResult<usize> {
        let mut conn = self.connection.clone();
        let mut total = 0;
        for priority in JobPriority::descending() {
            let count: usize = conn.zcard(self.config.priority_key(priority)).await?;
            total += count;
        }
        Ok(total)
    }
}

#[async_trait]
impl JobQueue for RedisQueue {
    async fn enqueue(
        &self,
        job_type: &str,
        data: JobData,
        priority: JobPriority,
    ) -> QueueResult<JobId> {
        debug!(queue = %self.config.queue_name, job_type, priority = priority.get(), "Enqueueing job");
        let job = Job::new(&self.config.queue_name, job_type, data).with_priority(priority);
        self.enqueue_job(job).await
    }

    fn name(&self) -> &str {
        &self.config.queue_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = RedisQueueConfig::new("redis://localhost:6379", "conversations");

        assert_eq!(config.key_prefix, "parley:queue:conversations");
        assert_eq!(config.max_size, 0);
        assert_eq!(config.retention_time, Duration::from_secs(86400));
    }

    #[test]
    fn test_key_layout() {
        let config = RedisQueueConfig::new("redis://localhost:6379", "q").with_key_prefix("app:q");
        let id = uuid::Uuid::nil();

        assert_eq!(
            config.job_key(id),
            "app:q:job:00000000-0000-0000-0000-000000000000"
        );
        assert_eq!(
            config.priority_key(JobPriority::new(4).unwrap()),
            "app:q:priority:4"
        );
    }

    #[test]
    fn test_enqueue_is_one_transaction() {
        let config = RedisQueueConfig::new("redis://localhost:6379", "q").with_key_prefix("app:q");
        let job = Job::new("q", "process_conversation_event", serde_json::json!({"n": 1}))
            .with_priority(JobPriority::new(4).unwrap());

        let packed = config.enqueue_pipeline(&job).unwrap().get_packed_pipeline();
        let packed = String::from_utf8(packed).unwrap();

        let multi = packed.find("MULTI").unwrap();
        let body = packed.find(&config.job_key(job.id)).unwrap();
        let index = packed.find("app:q:priority:4").unwrap();
        let exec = packed.rfind("EXEC").unwrap();
        assert!(multi < body && body < index && index < exec);
        assert!(packed.contains("ZADD"));
    }
}
