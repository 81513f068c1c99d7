// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-process job queue for hosts without a durable queue.
//!
//! Jobs are lost if the process exits before they run; hosts needing
//! durability implement [`JobQueue`] over their own backend.

use std::sync::Mutex;

use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, instrument, warn};

use crate::error::{AgentError, Result};
use crate::transport::{JobQueue, QueuedJob, JOB_TIMEOUT};

/// Runs delivery jobs on background Tokio tasks with their retry policy.
pub struct LocalJobQueue {
	tx: Mutex<Option<mpsc::UnboundedSender<QueuedJob>>>,
	worker: Mutex<Option<JoinHandle<()>>>,
}

impl LocalJobQueue {
	/// Starts the worker on the current Tokio runtime.
	pub fn spawn() -> Result<Self> {
		let client = bugtrail_common_http::client_with_timeout(JOB_TIMEOUT)?;
		Self::with_client(client)
	}

	pub fn with_client(client: reqwest::Client) -> Result<Self> {
		let handle =
			tokio::runtime::Handle::try_current().map_err(|_| AgentError::RuntimeUnavailable)?;
		let (tx, rx) = mpsc::unbounded_channel();
		let worker = handle.spawn(run_worker(rx, client));

		info!("local delivery queue started");
		Ok(Self {
			tx: Mutex::new(Some(tx)),
			worker: Mutex::new(Some(worker)),
		})
	}

	/// Stops accepting jobs and waits for queued and in-flight jobs to finish.
	pub async fn close(&self) {
		if let Ok(mut tx) = self.tx.lock() {
			tx.take();
		}
		let worker = match self.worker.lock() {
			Ok(mut worker) => worker.take(),
			Err(_) => None,
		};
		if let Some(worker) = worker {
			if let Err(e) = worker.await {
				warn!(error = %e, "delivery worker ended abnormally");
			}
		}
		info!("local delivery queue closed");
	}
}

impl JobQueue for LocalJobQueue {
	fn dispatch(&self, job: QueuedJob) -> Result<()> {
		let tx = self
			.tx
			.lock()
			.map_err(|_| AgentError::QueueRejected("queue lock poisoned".to_string()))?;
		match tx.as_ref() {
			Some(tx) => tx
				.send(job)
				.map_err(|_| AgentError::QueueRejected("worker stopped".to_string())),
			None => Err(AgentError::QueueRejected("queue closed".to_string())),
		}
	}
}

async fn run_worker(mut rx: mpsc::UnboundedReceiver<QueuedJob>, client: reqwest::Client) {
	let mut running = JoinSet::new();

	while let Some(job) = rx.recv().await {
		let client = client.clone();
		running.spawn(async move { run_job_with_retry(&client, job).await });

		// Reap finished jobs so the set does not grow without bound.
		while running.try_join_next().is_some() {}
	}

	while running.join_next().await.is_some() {}
}

/// Runs `job` until it succeeds or its attempts are used up. Returns whether
/// the job was delivered.
#[instrument(skip(client, job), fields(event_id = job.job.event_id().unwrap_or("unknown"), queue = %job.queue))]
pub(crate) async fn run_job_with_retry(client: &reqwest::Client, job: QueuedJob) -> bool {
	let tries = job.retry.tries.max(1);

	for attempt in 1..=tries {
		match job.job.run(client).await {
			Ok(()) => {
				debug!(attempt, "event delivered");
				return true;
			}
			Err(e) if attempt < tries => {
				warn!(
					attempt,
					backoff_ms = job.retry.backoff.as_millis() as u64,
					error = %e,
					"delivery failed, retrying"
				);
				tokio::time::sleep(job.retry.backoff).await;
			}
			Err(e) => {
				warn!(attempt, error = %e, "delivery failed, dropping event");
			}
		}
	}

	false
}
