// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Ingestion endpoint addressing and the multi-event envelope.

use serde::{Deserialize, Serialize};

use crate::event::Event;

/// Header carrying the destination key on direct POSTs.
pub const KEY_HEADER: &str = "X-BT-Key";

/// Maximum events per batch request.
pub const MAX_BATCH_EVENTS: usize = 25;

/// Routes events for one destination key on one ingestion host.
#[derive(Clone, PartialEq, Eq)]
pub struct Endpoint {
	base_url: String,
	key: String,
}

impl Endpoint {
	pub fn new(base_url: impl AsRef<str>, key: impl Into<String>) -> Self {
		Self {
			base_url: base_url.as_ref().trim_end_matches('/').to_string(),
			key: key.into(),
		}
	}

	pub fn key(&self) -> &str {
		&self.key
	}

	pub fn base_url(&self) -> &str {
		&self.base_url
	}

	/// `{base}/api/bug-tracking/{key}`
	pub fn project_url(&self) -> String {
		format!("{}/api/bug-tracking/{}", self.base_url, self.key)
	}

	pub fn store_url(&self) -> String {
		format!("{}/store", self.project_url())
	}

	pub fn batch_url(&self) -> String {
		format!("{}/batch", self.project_url())
	}

	/// True when `url` targets the ingestion API itself.
	pub fn is_ingestion_url(url: &str) -> bool {
		url.contains("/api/bug-tracking/")
	}
}

impl std::fmt::Debug for Endpoint {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Endpoint")
			.field("base_url", &self.base_url)
			.field("key", &"[REDACTED]")
			.finish()
	}
}

/// Body of a batch request: `{"events": [...]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchEnvelope {
	pub events: Vec<Event>,
}
