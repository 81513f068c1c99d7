// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Event delivery to the ingestion endpoint.
//!
//! - [`ImmediateTransport`] posts inline and reports the result to the caller.
//! - [`QueuedTransport`] packages a self-contained [`DeliveryJob`] and hands it
//!   to a [`JobQueue`] which owns retries.

mod immediate;
mod queued;

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use bugtrail_core::{Event, KEY_HEADER};

use crate::error::{AgentError, Result};

pub use immediate::{ImmediateTransport, IMMEDIATE_TIMEOUT};
pub use queued::{DeliveryJob, JobQueue, QueuedJob, QueuedTransport, RetryPolicy, JOB_TIMEOUT};

/// Delivers one finished event.
#[async_trait]
pub trait Transport: Send + Sync {
	async fn send(&self, event: Event) -> Result<()>;

	/// Short name for logs.
	fn name(&self) -> &'static str;
}

/// POSTs `payload` as JSON with the key header; any non-2xx is an error.
pub(crate) async fn post_json<T>(
	client: &reqwest::Client,
	url: &str,
	key: &str,
	payload: &T,
	timeout: Duration,
) -> Result<()>
where
	T: Serialize + ?Sized,
{
	// The URL embeds the destination key; keep it out of logs.
	debug!(timeout_ms = timeout.as_millis() as u64, "posting to ingestion endpoint");

	let response = client
		.post(url)
		.header(KEY_HEADER, key)
		.timeout(timeout)
		.json(payload)
		.send()
		.await?;

	if !response.status().is_success() {
		let status = response.status().as_u16();
		let message = response.text().await.unwrap_or_default();
		return Err(AgentError::ServerError { status, message });
	}

	Ok(())
}
