// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use bugtrail_core::{Endpoint, Event};

use super::{post_json, Transport};
use crate::error::Result;

/// Timeout of one delivery attempt made by a worker.
pub const JOB_TIMEOUT: Duration = Duration::from_secs(10);

/// A self-contained unit of delivery work.
///
/// Holds only plain data so any queue can persist it and any worker can run
/// it later, in another process if need be.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryJob {
	pub key: String,
	/// Store URL the payload is posted to.
	pub url: String,
	pub payload: serde_json::Value,
}

impl DeliveryJob {
	pub fn new(endpoint: &Endpoint, event: &Event) -> Result<Self> {
		Ok(Self {
			key: endpoint.key().to_string(),
			url: endpoint.store_url(),
			payload: serde_json::to_value(event)?,
		})
	}

	/// One delivery attempt. An error tells the queue to retry.
	pub async fn run(&self, client: &reqwest::Client) -> Result<()> {
		post_json(client, &self.url, &self.key, &self.payload, JOB_TIMEOUT).await
	}

	/// Event id of the payload, for logs.
	pub fn event_id(&self) -> Option<&str> {
		self.payload.get("event_id").and_then(|v| v.as_str())
	}
}

impl std::fmt::Debug for DeliveryJob {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("DeliveryJob")
			.field("key", &"[REDACTED]")
			.field("event_id", &self.event_id())
			.finish()
	}
}

/// Fixed-backoff retry policy of a queued delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
	/// Total attempts, the first included.
	pub tries: u32,
	/// Delay between attempts.
	pub backoff: Duration,
}

impl Default for RetryPolicy {
	fn default() -> Self {
		Self {
			tries: 3,
			backoff: Duration::from_secs(5),
		}
	}
}

/// A job addressed to a queue, with its retry policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedJob {
	/// Queue backend name; `None` means the host's default.
	pub connection: Option<String>,
	pub queue: String,
	pub job: DeliveryJob,
	pub retry: RetryPolicy,
}

/// A durable work queue owned by the host.
pub trait JobQueue: Send + Sync {
	/// Accepts the job for later execution.
	fn dispatch(&self, job: QueuedJob) -> Result<()>;
}

/// Hands each event to a [`JobQueue`] instead of sending it inline.
#[derive(Clone)]
pub struct QueuedTransport {
	queue: Arc<dyn JobQueue>,
	endpoint: Endpoint,
	connection: Option<String>,
	queue_name: String,
	retry: RetryPolicy,
}

impl QueuedTransport {
	pub fn new(
		queue: Arc<dyn JobQueue>,
		endpoint: Endpoint,
		connection: Option<String>,
		queue_name: impl Into<String>,
	) -> Self {
		Self {
			queue,
			endpoint,
			connection,
			queue_name: queue_name.into(),
			retry: RetryPolicy::default(),
		}
	}

	pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
		self.retry = retry;
		self
	}
}

#[async_trait]
impl Transport for QueuedTransport {
	async fn send(&self, event: Event) -> Result<()> {
		let job = QueuedJob {
			connection: self.connection.clone(),
			queue: self.queue_name.clone(),
			job: DeliveryJob::new(&self.endpoint, &event)?,
			retry: self.retry,
		};
		debug!(event_id = %event.event_id, queue = %job.queue, "dispatching delivery job");
		self.queue.dispatch(job)
	}

	fn name(&self) -> &'static str {
		"queued"
	}
}
