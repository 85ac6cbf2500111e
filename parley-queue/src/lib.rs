//! Deferred job handoff for Parley.
//!
//! Events below the immediate-processing threshold are handed to a queue as
//! jobs. The workers that consume them live outside this repository; this
//! crate only defines the [`JobQueue`] seam and two backends:
//!
//! - [`MemoryQueue`] - in-process, priority ordered, for development and tests
//! - [`RedisQueue`] - writes jobs where the external workers pick them up
//!
//! ## Quick Start
//!
//! ```
//! use parley_queue::{JobPriority, JobQueue, MemoryQueue};
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let queue = MemoryQueue::new("conversations");
//! let job_id = queue
//!     .enqueue(
//!         "process_conversation_event",
//!         json!({"conversationEvent": {"conversationId": "c1"}}),
//!         JobPriority::new(4)?,
//!     )
//!     .await?;
//!
//! let job = queue.dequeue().await.unwrap();
//! assert_eq!(job.id, job_id);
//! assert_eq!(job.priority.get(), 4);
//! # Ok::<(), parley_queue::QueueError>(())
//! # }).unwrap();
//! ```

pub mod error;
pub mod job;
pub mod queue;
pub mod redis_queue;

pub use error::{QueueError, QueueResult};
pub use job::{Job, JobData, JobId, JobPriority};
pub use queue::{JobQueue, MemoryQueue};
pub use redis_queue::{RedisQueue, RedisQueueConfig};
