// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Nested configuration sections: breadcrumbs, request capture, page script.

use serde::{Deserialize, Serialize};

use bugtrail_core::DEFAULT_MAX_BREADCRUMBS;

pub const DEFAULT_MAX_BODY_SIZE: usize = 10_000;
pub const DEFAULT_BATCH_INTERVAL_MS: u64 = 5000;

pub const DEFAULT_SANITIZE_HEADERS: &[&str] = &["Authorization", "Cookie", "X-CSRF-TOKEN"];

pub const DEFAULT_SANITIZE_BODY_KEYS: &[&str] = &[
	"password",
	"password_confirmation",
	"secret",
	"token",
	"credit_card",
	"card_number",
	"cvv",
];

fn owned(list: &[&str]) -> Vec<String> {
	list.iter().map(|s| s.to_string()).collect()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BreadcrumbsConfigLayer {
	pub queries: Option<bool>,
	pub logs: Option<bool>,
	pub http_client: Option<bool>,
	pub max_breadcrumbs: Option<usize>,
}

impl BreadcrumbsConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.queries.is_some() {
			self.queries = other.queries;
		}
		if other.logs.is_some() {
			self.logs = other.logs;
		}
		if other.http_client.is_some() {
			self.http_client = other.http_client;
		}
		if other.max_breadcrumbs.is_some() {
			self.max_breadcrumbs = other.max_breadcrumbs;
		}
	}

	pub fn finalize(self) -> BreadcrumbsConfig {
		BreadcrumbsConfig {
			queries: self.queries.unwrap_or(true),
			logs: self.logs.unwrap_or(true),
			http_client: self.http_client.unwrap_or(true),
			max_breadcrumbs: self.max_breadcrumbs.unwrap_or(DEFAULT_MAX_BREADCRUMBS),
		}
	}
}

/// Which host signals become breadcrumbs, and how many are kept.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BreadcrumbsConfig {
	pub queries: bool,
	pub logs: bool,
	pub http_client: bool,
	pub max_breadcrumbs: usize,
}

impl Default for BreadcrumbsConfig {
	fn default() -> Self {
		BreadcrumbsConfigLayer::default().finalize()
	}
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RequestConfigLayer {
	pub capture_body: Option<bool>,
	pub max_body_size: Option<usize>,
	pub sanitize_headers: Option<Vec<String>>,
	pub sanitize_body_keys: Option<Vec<String>>,
}

impl RequestConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.capture_body.is_some() {
			self.capture_body = other.capture_body;
		}
		if other.max_body_size.is_some() {
			self.max_body_size = other.max_body_size;
		}
		if other.sanitize_headers.is_some() {
			self.sanitize_headers = other.sanitize_headers;
		}
		if other.sanitize_body_keys.is_some() {
			self.sanitize_body_keys = other.sanitize_body_keys;
		}
	}

	pub fn finalize(self) -> RequestConfig {
		RequestConfig {
			capture_body: self.capture_body.unwrap_or(true),
			max_body_size: self.max_body_size.unwrap_or(DEFAULT_MAX_BODY_SIZE),
			sanitize_headers: self
				.sanitize_headers
				.unwrap_or_else(|| owned(DEFAULT_SANITIZE_HEADERS)),
			sanitize_body_keys: self
				.sanitize_body_keys
				.unwrap_or_else(|| owned(DEFAULT_SANITIZE_BODY_KEYS)),
		}
	}
}

/// What request data is captured and how it is redacted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RequestConfig {
	pub capture_body: bool,
	/// Serialized body size limit in bytes.
	pub max_body_size: usize,
	pub sanitize_headers: Vec<String>,
	pub sanitize_body_keys: Vec<String>,
}

impl Default for RequestConfig {
	fn default() -> Self {
		RequestConfigLayer::default().finalize()
	}
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct JavascriptConfigLayer {
	pub enabled: Option<bool>,
	pub capture_console: Option<bool>,
	pub batch_interval_ms: Option<u64>,
}

impl JavascriptConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.enabled.is_some() {
			self.enabled = other.enabled;
		}
		if other.capture_console.is_some() {
			self.capture_console = other.capture_console;
		}
		if other.batch_interval_ms.is_some() {
			self.batch_interval_ms = other.batch_interval_ms;
		}
	}

	pub fn finalize(self) -> JavascriptConfig {
		JavascriptConfig {
			enabled: self.enabled.unwrap_or(true),
			capture_console: self.capture_console.unwrap_or(true),
			batch_interval_ms: self.batch_interval_ms.unwrap_or(DEFAULT_BATCH_INTERVAL_MS),
		}
	}
}

/// Settings forwarded to the page agent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JavascriptConfig {
	pub enabled: bool,
	pub capture_console: bool,
	pub batch_interval_ms: u64,
}

impl Default for JavascriptConfig {
	fn default() -> Self {
		JavascriptConfigLayer::default().finalize()
	}
}
