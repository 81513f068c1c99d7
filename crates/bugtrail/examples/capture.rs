// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Example: capture an error with the bugtrail agent.
//!
//! Run with:
//!   BUGTRAIL_DSN=proj_key BUGTRAIL_URL=http://localhost:8000 \
//!     cargo run --example capture -p bugtrail

use std::sync::Arc;

use bugtrail::{
	AgentClient, AuthenticatedUser, CaptureContext, CapturedError, HostSignal, IncomingRequest,
	LocalJobQueue, RequestScope,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
struct PaymentDeclined;

impl std::fmt::Display for PaymentDeclined {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "card issuer declined the charge")
	}
}

impl std::error::Error for PaymentDeclined {}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("bugtrail=debug")))
		.init();

	let config = bugtrail::config::load_config_from_env()?;
	if !config.is_enabled() {
		println!("BUGTRAIL_DSN is not set; the agent is disabled.");
	}

	let queue = Arc::new(LocalJobQueue::spawn()?);
	let client = AgentClient::builder(config.clone())
		.job_queue(queue.clone())
		.build()?;
	client.set_context("example", true);

	let request = IncomingRequest::new("POST", "http://localhost:3000/checkout")
		.with_header("Authorization", "Bearer example-token")
		.with_header("X-Request-ID", "req_example_1")
		.with_body(serde_json::json!({"card_number": "4111111111111111", "amount": 1999}))
		.with_client_ip("127.0.0.1")
		.with_route("checkout.store");

	let mut scope = RequestScope::new(&config.breadcrumbs);
	scope.begin(&request);
	scope.observe(&HostSignal::QueryExecuted {
		sql: "select * from carts where id = ?".to_string(),
		duration_ms: 1.7,
		connection: "primary".to_string(),
	});
	scope.observe(&HostSignal::HttpResponseReceived {
		method: "POST".to_string(),
		url: "https://payments.example.com/charges".to_string(),
		status: 402,
		duration_ms: 212.4,
	});

	let error = CapturedError::from_error(&PaymentDeclined);
	let outcome = client
		.capture_exception(
			&error,
			CaptureContext::new()
				.scope(&scope)
				.request(&request)
				.user(AuthenticatedUser::new("user_123").email("example@example.com")),
		)
		.await;
	println!("capture outcome: {outcome:?}");

	if let Some(bootstrap) = client.browser_bootstrap(None) {
		println!("page bootstrap: {}", bootstrap.to_json()?);
	}

	queue.close().await;
	Ok(())
}
