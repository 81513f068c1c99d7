// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Shared test fixtures.

use bugtrail_core::{BrowserConfig, Event, Level, Platform};

pub(crate) fn browser_config() -> BrowserConfig {
	BrowserConfig {
		dsn: "key_1".to_string(),
		url: "https://ingest.test/api/bug-tracking/key_1".to_string(),
		environment: "test".to_string(),
		release: None,
		capture_console: true,
		batch_interval: 5000,
		max_breadcrumbs: 30,
	}
}

pub(crate) fn sample_event(message: &str) -> Event {
	Event {
		event_id: uuid::Uuid::now_v7(),
		timestamp: chrono::Utc::now(),
		title: message.to_string(),
		message: message.to_string(),
		kind: "Error".to_string(),
		level: Level::Error,
		platform: Platform::Browser,
		environment: "test".to_string(),
		release: None,
		server_name: None,
		session_id: Some("sess_test".to_string()),
		stacktrace: Vec::new(),
		breadcrumbs: Vec::new(),
		request_data: None,
		user_data: None,
		runtime: None,
		context: Default::default(),
	}
}
