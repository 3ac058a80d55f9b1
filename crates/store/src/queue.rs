// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable message queue with priority, delay, retry metadata and dead-lettering

use crate::capability::KvService;
use crate::error::{QueueError, StoreError};
use loom_core::{Backoff, Clock, Message, QueueName};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// How often a blocked `dequeue` re-checks the queue.
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Options supplied at enqueue time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnqueueOptions {
    #[serde(default)]
    pub priority: u8,
    /// Message is invisible until the delay elapses.
    #[serde(default)]
    pub delay_ms: u64,
    /// Max delivery attempts, including the first. Observability only; the
    /// worker owns retry decisions.
    #[serde(default = "default_attempts")]
    pub attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backoff: Option<Backoff>,
}

fn default_attempts() -> u32 {
    1
}

impl Default for EnqueueOptions {
    fn default() -> Self {
        Self { priority: 0, delay_ms: 0, attempts: default_attempts(), backoff: None }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Active,
    Completed,
    Failed,
    Delayed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttemptStatus {
    Started,
    Completed,
    Failed,
}

/// One entry in a job's ordered attempt log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub attempt_number: u32,
    pub timestamp_ms: u64,
    pub status: AttemptStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_id: Option<String>,
}

/// Observable per-job metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    /// Job id doubles as the message id so the attempt log follows retries.
    pub job_id: String,
    pub queue_name: QueueName,
    pub data: Message,
    pub options: EnqueueOptions,
    pub status: JobStatus,
    pub attempts: u32,
    pub max_attempts: u32,
    /// Monotonic per-queue enqueue sequence; FIFO tie-break within one
    /// priority band.
    #[serde(default)]
    pub seq: u64,
    pub created_at_ms: u64,
    pub updated_at_ms: u64,
    /// Epoch ms before which the job is invisible to `dequeue`.
    #[serde(default)]
    pub next_visible_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminal_error: Option<String>,
    #[serde(default)]
    pub attempt_log: Vec<AttemptRecord>,
}

/// Per-queue totals.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QueueStats {
    pub queued: u64,
    pub active: u64,
    pub completed: u64,
    pub failed: u64,
    pub delayed: u64,
    pub last_updated_ms: u64,
}

/// One claimed delivery handed to a worker.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveredMessage {
    pub message: Message,
    pub job_id: String,
    /// 1-based delivery attempt.
    pub attempt: u32,
}

/// Message queue over the KV capability.
///
/// Claims are serialized through an in-process mutex; cross-process claim
/// arbitration belongs to the concrete engine behind [`KvService`].
#[derive(Clone)]
pub struct MessageQueue<K, C> {
    kv: K,
    clock: C,
    claim: Arc<tokio::sync::Mutex<()>>,
    worker_id: Option<String>,
}

fn jobs_key(queue: &QueueName) -> String {
    format!("queue:{queue}:jobs")
}

fn meta_key(queue: &QueueName) -> String {
    format!("queue:{queue}:meta")
}

impl<K, C> MessageQueue<K, C>
where
    K: KvService,
    C: Clock,
{
    pub fn new(kv: K, clock: C) -> Self {
        Self { kv, clock, claim: Arc::new(tokio::sync::Mutex::new(())), worker_id: None }
    }

    /// Tag attempt log entries with a worker identity.
    pub fn with_worker_id(mut self, worker_id: impl Into<String>) -> Self {
        self.worker_id = Some(worker_id.into());
        self
    }

    async fn load_job(&self, queue: &QueueName, job_id: &str) -> Result<JobRecord, QueueError> {
        let value = self
            .kv
            .hget(&jobs_key(queue), job_id)
            .await?
            .ok_or_else(|| QueueError::UnknownJob(job_id.to_string()))?;
        Ok(serde_json::from_value(value).map_err(StoreError::from)?)
    }

    async fn save_job(&self, job: &JobRecord) -> Result<(), QueueError> {
        let value = serde_json::to_value(job).map_err(StoreError::from)?;
        self.kv.hset(&jobs_key(&job.queue_name), &job.job_id, value).await?;
        Ok(())
    }

    /// Enqueue one message. With a delay the job starts `delayed` and becomes
    /// visible when due.
    pub async fn enqueue(
        &self,
        queue: &QueueName,
        message: Message,
        options: EnqueueOptions,
    ) -> Result<String, QueueError> {
        let now_ms = self.clock.epoch_ms();
        let job_id = message.message_id.to_string();
        let delayed = options.delay_ms > 0;
        let existing = self.kv.hget(&jobs_key(queue), &job_id).await?;
        let mut job = match existing {
            // Re-enqueue of a known message keeps its attempt history
            Some(value) => {
                let mut job: JobRecord =
                    serde_json::from_value(value).map_err(StoreError::from)?;
                job.options = options.clone();
                job
            }
            None => {
                let seq = self.kv.hincrby(&meta_key(queue), "seq", 1).await? as u64;
                JobRecord {
                    job_id: job_id.clone(),
                    queue_name: queue.clone(),
                    data: message,
                    options: options.clone(),
                    status: JobStatus::Queued,
                    attempts: 0,
                    max_attempts: options.attempts,
                    seq,
                    created_at_ms: now_ms,
                    updated_at_ms: now_ms,
                    next_visible_at_ms: 0,
                    terminal_error: None,
                    attempt_log: Vec::new(),
                }
            }
        };
        job.status = if delayed { JobStatus::Delayed } else { JobStatus::Queued };
        job.next_visible_at_ms = now_ms + options.delay_ms;
        job.updated_at_ms = now_ms;
        self.save_job(&job).await?;
        self.kv.sadd("queues", queue.as_str()).await?;
        tracing::debug!(queue = %queue, job = %job_id, priority = options.priority, delay_ms = options.delay_ms, "enqueued");
        Ok(job_id)
    }

    /// Blocking poll: returns the best visible job within `timeout`, or
    /// `None`. Higher priority wins; FIFO within one priority band.
    pub async fn dequeue(
        &self,
        queue: &QueueName,
        timeout: Duration,
    ) -> Result<Option<DeliveredMessage>, QueueError> {
        let deadline = self.clock.now() + timeout;
        loop {
            if let Some(delivery) = self.try_claim(queue).await? {
                return Ok(Some(delivery));
            }
            if self.clock.now() >= deadline {
                return Ok(None);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn try_claim(&self, queue: &QueueName) -> Result<Option<DeliveredMessage>, QueueError> {
        let _guard = self.claim.lock().await;
        let now_ms = self.clock.epoch_ms();
        let all = self.kv.hgetall(&jobs_key(queue)).await?;

        let mut best: Option<JobRecord> = None;
        for value in all.into_values() {
            let job: JobRecord = serde_json::from_value(value).map_err(StoreError::from)?;
            let visible = match job.status {
                JobStatus::Queued => true,
                JobStatus::Delayed => job.next_visible_at_ms <= now_ms,
                _ => false,
            };
            if !visible {
                continue;
            }
            let better = match &best {
                None => true,
                Some(current) => {
                    (job.options.priority, std::cmp::Reverse(job.seq))
                        > (current.options.priority, std::cmp::Reverse(current.seq))
                }
            };
            if better {
                best = Some(job);
            }
        }

        let Some(mut job) = best else {
            return Ok(None);
        };
        job.status = JobStatus::Active;
        job.attempts += 1;
        job.updated_at_ms = now_ms;
        job.data.metadata.delivery_attempt = Some(job.attempts);
        job.attempt_log.push(AttemptRecord {
            attempt_number: job.attempts,
            timestamp_ms: now_ms,
            status: AttemptStatus::Started,
            duration_ms: None,
            error: None,
            worker_id: self.worker_id.clone(),
        });
        self.save_job(&job).await?;
        Ok(Some(DeliveredMessage {
            message: job.data.clone(),
            job_id: job.job_id,
            attempt: job.attempts,
        }))
    }

    fn close_attempt(job: &mut JobRecord, now_ms: u64, status: AttemptStatus, error: Option<String>) {
        let started_at = job
            .attempt_log
            .iter()
            .rfind(|a| a.status == AttemptStatus::Started)
            .map(|a| a.timestamp_ms);
        job.attempt_log.push(AttemptRecord {
            attempt_number: job.attempts,
            timestamp_ms: now_ms,
            status,
            duration_ms: started_at.map(|t| now_ms.saturating_sub(t)),
            error,
            worker_id: None,
        });
    }

    /// Successful processing: the job is done.
    pub async fn ack(&self, queue: &QueueName, job_id: &str) -> Result<(), QueueError> {
        let now_ms = self.clock.epoch_ms();
        let mut job = self.load_job(queue, job_id).await?;
        job.status = JobStatus::Completed;
        job.updated_at_ms = now_ms;
        Self::close_attempt(&mut job, now_ms, AttemptStatus::Completed, None);
        self.save_job(&job).await
    }

    /// Failed processing with immediate redelivery.
    pub async fn nack(&self, queue: &QueueName, job_id: &str, error: &str) -> Result<(), QueueError> {
        let now_ms = self.clock.epoch_ms();
        let mut job = self.load_job(queue, job_id).await?;
        job.status = JobStatus::Queued;
        job.next_visible_at_ms = 0;
        job.updated_at_ms = now_ms;
        Self::close_attempt(&mut job, now_ms, AttemptStatus::Failed, Some(error.to_string()));
        self.save_job(&job).await
    }

    /// Failed processing; redeliver after `delay`.
    pub async fn retry(
        &self,
        queue: &QueueName,
        job_id: &str,
        delay: Duration,
        error: &str,
    ) -> Result<(), QueueError> {
        let now_ms = self.clock.epoch_ms();
        let mut job = self.load_job(queue, job_id).await?;
        job.status = JobStatus::Delayed;
        job.next_visible_at_ms = now_ms + delay.as_millis() as u64;
        job.updated_at_ms = now_ms;
        Self::close_attempt(&mut job, now_ms, AttemptStatus::Failed, Some(error.to_string()));
        self.save_job(&job).await
    }

    /// Terminal failure: the job is marked failed and a copy of the original
    /// message, tagged with the terminal error, lands on `<queue>.dlq`.
    pub async fn dead_letter(
        &self,
        queue: &QueueName,
        job_id: &str,
        error: &str,
    ) -> Result<(), QueueError> {
        let now_ms = self.clock.epoch_ms();
        let mut job = self.load_job(queue, job_id).await?;
        job.status = JobStatus::Failed;
        job.terminal_error = Some(error.to_string());
        job.updated_at_ms = now_ms;
        Self::close_attempt(&mut job, now_ms, AttemptStatus::Failed, Some(error.to_string()));
        self.save_job(&job).await?;

        let dlq = queue.dead_letter();
        let seq = self.kv.hincrby(&meta_key(&dlq), "seq", 1).await? as u64;
        let dead = JobRecord {
            job_id: job.job_id.clone(),
            queue_name: dlq.clone(),
            data: job.data.clone(),
            options: job.options.clone(),
            status: JobStatus::Queued,
            attempts: 0,
            max_attempts: 1,
            seq,
            created_at_ms: now_ms,
            updated_at_ms: now_ms,
            next_visible_at_ms: 0,
            terminal_error: Some(error.to_string()),
            attempt_log: Vec::new(),
        };
        let value = serde_json::to_value(&dead).map_err(StoreError::from)?;
        self.kv.hset(&jobs_key(&dlq), &dead.job_id, value).await?;
        self.kv.sadd("queues", dlq.as_str()).await?;
        tracing::warn!(queue = %queue, job = %job_id, error, "dead-lettered");
        Ok(())
    }

    /// Observable job metadata for the admin surface.
    pub async fn job(&self, queue: &QueueName, job_id: &str) -> Result<Option<JobRecord>, QueueError> {
        match self.load_job(queue, job_id).await {
            Ok(job) => Ok(Some(job)),
            Err(QueueError::UnknownJob(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn jobs(&self, queue: &QueueName) -> Result<Vec<JobRecord>, QueueError> {
        let all = self.kv.hgetall(&jobs_key(queue)).await?;
        let mut jobs = Vec::with_capacity(all.len());
        for value in all.into_values() {
            jobs.push(serde_json::from_value::<JobRecord>(value).map_err(StoreError::from)?);
        }
        jobs.sort_by_key(|j| j.seq);
        Ok(jobs)
    }

    pub async fn stats(&self, queue: &QueueName) -> Result<QueueStats, QueueError> {
        let now_ms = self.clock.epoch_ms();
        let mut stats = QueueStats { last_updated_ms: now_ms, ..QueueStats::default() };
        for job in self.jobs(queue).await? {
            match job.status {
                JobStatus::Queued => stats.queued += 1,
                JobStatus::Active => stats.active += 1,
                JobStatus::Completed => stats.completed += 1,
                JobStatus::Failed => stats.failed += 1,
                JobStatus::Delayed => stats.delayed += 1,
            }
        }
        Ok(stats)
    }

    /// All queues that have seen traffic.
    pub async fn queue_names(&self) -> Result<Vec<QueueName>, QueueError> {
        let mut names = self.kv.smembers("queues").await?;
        names.sort();
        Ok(names.into_iter().map(QueueName::new).collect())
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
