// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Shared test fixtures.

use bugtrail_core::{Event, Level, Platform};

pub(crate) fn sample_event() -> Event {
	Event {
		event_id: uuid::Uuid::now_v7(),
		timestamp: chrono::Utc::now(),
		title: "Oops: broke".to_string(),
		message: "broke".to_string(),
		kind: "app::Oops".to_string(),
		level: Level::Error,
		platform: Platform::Server,
		environment: "test".to_string(),
		release: None,
		server_name: None,
		session_id: None,
		stacktrace: Vec::new(),
		breadcrumbs: Vec::new(),
		request_data: None,
		user_data: None,
		runtime: None,
		context: Default::default(),
	}
}
