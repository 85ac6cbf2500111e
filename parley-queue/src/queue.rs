//! The enqueue seam and the in-memory queue.

use crate::error::{QueueError, QueueResult};
use crate::job::{Job, JobData, JobId, JobPriority};
use async_trait::async_trait;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Hand a job to a queue for deferred processing.
///
/// Delivery is at-most-once: once `enqueue` returns the caller does not track
/// the job any further.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Enqueue a job and return its id once the backend acknowledged it.
    async fn enqueue(
        &self,
        job_type: &str,
        data: JobData,
        priority: JobPriority,
    ) -> QueueResult<JobId>;

    /// Queue name, for logs
    fn name(&self) -> &str;
}

#[derive(Debug)]
struct Pending {
    seq: u64,
    job: Job,
}

impl Pending {
    fn key(&self) -> (JobPriority, Reverse<u64>) {
        (self.job.priority, Reverse(self.seq))
    }
}

impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Pending {}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Pending {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

#[derive(Debug, Default)]
struct State {
    heap: BinaryHeap<Pending>,
    next_seq: u64,
}

/// In-process queue used in development and tests.
///
/// Jobs come out highest priority first, oldest first within a priority.
#[derive(Clone)]
pub struct MemoryQueue {
    name: String,
    max_size: usize,
    state: Arc<Mutex<State>>,
}

impl MemoryQueue {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            max_size: 0,
            state: Arc::new(Mutex::new(State::default())),
        }
    }

    /// Set the maximum queue size (0 = unlimited).
    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    /// Enqueue a prebuilt job.
    pub async fn enqueue_job(&self, job: Job) -> QueueResult<JobId> {
        let mut state = self.state.lock().await;

        if self.max_size > 0 && state.heap.len() >= self.max_size {
            return Err(QueueError::QueueFull);
        }

        let job_id = job.id;
        let seq = state.next_seq;
        state.next_seq += 1;
        state.heap.push(Pending { seq, job });

        Ok(job_id)
    }

    /// Take the next job, if any.
    pub async fn dequeue(&self) -> Option<Job> {
        self.state.lock().await.heap.pop().map(|pending| pending.job)
    }

    /// Pending jobs in dequeue order, without removing them.
    pub async fn snapshot(&self) -> Vec<Job> {
        let state = self.state.lock().await;
        let mut pending: Vec<&Pending> = state.heap.iter().collect();
        pending.sort_by(|a, b| b.cmp(a));
        pending.into_iter().map(|p| p.job.clone()).collect()
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.heap.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl JobQueue for MemoryQueue {
    async fn enqueue(
        &self,
        job_type: &str,
        data: JobData,
        priority: JobPriority,
    ) -> QueueResult<JobId> {
        debug!(queue = %self.name, job_type, priority = priority.get(), "Enqueueing job");
        let job = Job::new(&self.name, job_type, data).with_priority(priority);
        self.enqueue_job(job).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn priority(value: u8) -> JobPriority {
        JobPriority::new(value).unwrap()
    }

    #[tokio::test]
    async fn test_enqueue_and_dequeue() {
        let queue = MemoryQueue::new("default");
        let id = queue
            .enqueue("send_digest", json!({"to": "ops"}), priority(3))
            .await
            .unwrap();

        assert_eq!(queue.len().await, 1);
        let job = queue.dequeue().await.unwrap();
        assert_eq!(job.id, id);
        assert_eq!(job.job_type, "send_digest");
        assert_eq!(job.queue, "default");
        assert!(queue.is_empty().await);
    }

    #[tokio::test]
    async fn test_priority_then_fifo_order() {
        let queue = MemoryQueue::new("default");
        queue.enqueue("a", json!(1), priority(2)).await.unwrap();
        queue.enqueue("b", json!(2), priority(6)).await.unwrap();
        queue.enqueue("c", json!(3), priority(2)).await.unwrap();
        queue.enqueue("d", json!(4), priority(6)).await.unwrap();

        let snapshot: Vec<String> = queue
            .snapshot()
            .await
            .into_iter()
            .map(|job| job.job_type)
            .collect();
        assert_eq!(snapshot, vec!["b", "d", "a", "c"]);

        let mut drained = Vec::new();
        while let Some(job) = queue.dequeue().await {
            drained.push(job.job_type);
        }
        assert_eq!(drained, snapshot);
    }

    #[tokio::test]
    async fn test_max_size() {
        let queue = MemoryQueue::new("bounded").with_max_size(1);
        queue.enqueue("a", json!({}), priority(5)).await.unwrap();

        let err = queue.enqueue("b", json!({}), priority(5)).await.unwrap_err();
        assert!(matches!(err, QueueError::QueueFull));
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let queue = MemoryQueue::new("shared");
        let other = queue.clone();
        queue.enqueue("a", json!({}), priority(5)).await.unwrap();

        assert_eq!(other.len().await, 1);
        assert_eq!(JobQueue::name(&other), "shared");
    }
}
