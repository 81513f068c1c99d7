// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::time::Duration;

use async_trait::async_trait;

use bugtrail_core::{Endpoint, Event};

use super::{post_json, Transport};
use crate::error::Result;

/// Timeout of an inline delivery.
pub const IMMEDIATE_TIMEOUT: Duration = Duration::from_secs(5);

/// One POST per event to the store endpoint, awaited by the capture call.
#[derive(Debug, Clone)]
pub struct ImmediateTransport {
	client: reqwest::Client,
	endpoint: Endpoint,
}

impl ImmediateTransport {
	pub fn new(endpoint: Endpoint) -> Result<Self> {
		let client = bugtrail_common_http::client_with_timeout(IMMEDIATE_TIMEOUT)?;
		Ok(Self::with_client(client, endpoint))
	}

	pub fn with_client(client: reqwest::Client, endpoint: Endpoint) -> Self {
		Self { client, endpoint }
	}
}

#[async_trait]
impl Transport for ImmediateTransport {
	async fn send(&self, event: Event) -> Result<()> {
		post_json(
			&self.client,
			&self.endpoint.store_url(),
			self.endpoint.key(),
			&event,
			IMMEDIATE_TIMEOUT,
		)
		.await
	}

	fn name(&self) -> &'static str {
		"immediate"
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::AgentError;
	use crate::testing::sample_event;
	use wiremock::matchers::{body_partial_json, header, method, path};
	use wiremock::{Mock, MockServer, ResponseTemplate};

	#[tokio::test]
	async fn posts_event_to_store_with_key() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(path("/api/bug-tracking/key_1/store"))
			.and(header("X-BT-Key", "key_1"))
			.and(body_partial_json(serde_json::json!({"type": "app::Oops"})))
			.respond_with(ResponseTemplate::new(201))
			.expect(1)
			.mount(&server)
			.await;

		let transport = ImmediateTransport::new(Endpoint::new(server.uri(), "key_1")).unwrap();
		transport.send(sample_event()).await.unwrap();
	}

	#[tokio::test]
	async fn non_success_status_is_an_error() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.respond_with(ResponseTemplate::new(422).set_body_string("bad event"))
			.mount(&server)
			.await;

		let transport = ImmediateTransport::new(Endpoint::new(server.uri(), "key_1")).unwrap();
		let result = transport.send(sample_event()).await;

		assert!(matches!(
			result,
			Err(AgentError::ServerError { status: 422, ref message }) if message == "bad event"
		));
	}
}
