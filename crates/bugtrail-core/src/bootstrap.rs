// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Runtime configuration the server agent hands to the page agent.
//!
//! The host serializes a [`BrowserBootstrap`] into the page; the page agent
//! deserializes the same JSON at load time.

use serde::{Deserialize, Serialize};

use crate::breadcrumb::DEFAULT_MAX_BREADCRUMBS;

const DEFAULT_BATCH_INTERVAL_MS: u64 = 5000;
/// Breadcrumbs kept by a page session unless configured otherwise.
pub const DEFAULT_BROWSER_BREADCRUMBS: usize = 30;

/// Page agent settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserConfig {
	pub dsn: String,
	/// Project URL, `{base}/api/bug-tracking/{key}`.
	pub url: String,
	#[serde(default = "default_environment")]
	pub environment: String,
	#[serde(default)]
	pub release: Option<String>,
	#[serde(default = "default_true")]
	pub capture_console: bool,
	/// Debounce interval of the flush timer in milliseconds.
	#[serde(default = "default_batch_interval")]
	pub batch_interval: u64,
	#[serde(default = "default_browser_breadcrumbs")]
	pub max_breadcrumbs: usize,
}

impl BrowserConfig {
	/// Whether the page agent should run at all.
	pub fn is_enabled(&self) -> bool {
		!self.dsn.is_empty() && !self.url.is_empty()
	}

	/// Breadcrumb capacity, never above what an event can carry.
	pub fn breadcrumb_capacity(&self) -> usize {
		self.max_breadcrumbs.min(DEFAULT_MAX_BREADCRUMBS)
	}
}

/// The user the page is rendered for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserUser {
	pub id: String,
	#[serde(default)]
	pub email: Option<String>,
	#[serde(default)]
	pub name: Option<String>,
}

/// Everything embedded into a page for the page agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrowserBootstrap {
	pub config: BrowserConfig,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub user: Option<BrowserUser>,
}

impl BrowserBootstrap {
	pub fn to_json(&self) -> crate::Result<String> {
		Ok(serde_json::to_string(self)?)
	}

	pub fn from_json(json: &str) -> crate::Result<Self> {
		Ok(serde_json::from_str(json)?)
	}
}

fn default_environment() -> String {
	"production".to_string()
}

fn default_true() -> bool {
	true
}

fn default_batch_interval() -> u64 {
	DEFAULT_BATCH_INTERVAL_MS
}

fn default_browser_breadcrumbs() -> usize {
	DEFAULT_BROWSER_BREADCRUMBS
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn minimal_json_fills_defaults() {
		let bootstrap = BrowserBootstrap::from_json(
			r#"{"config":{"dsn":"k","url":"https://x.test/api/bug-tracking/k"}}"#,
		)
		.unwrap();

		assert!(bootstrap.config.is_enabled());
		assert_eq!(bootstrap.config.environment, "production");
		assert!(bootstrap.config.capture_console);
		assert_eq!(bootstrap.config.batch_interval, 5000);
		assert_eq!(bootstrap.config.max_breadcrumbs, 30);
		assert!(bootstrap.user.is_none());
	}

	#[test]
	fn serializes_camel_case() {
		let bootstrap = BrowserBootstrap {
			config: BrowserConfig {
				dsn: "k".to_string(),
				url: "u".to_string(),
				environment: "staging".to_string(),
				release: Some("1.0.0".to_string()),
				capture_console: false,
				batch_interval: 1000,
				max_breadcrumbs: 10,
			},
			user: Some(BrowserUser {
				id: "42".to_string(),
				email: None,
				name: Some("Ada".to_string()),
			}),
		};
		let json: serde_json::Value = serde_json::from_str(&bootstrap.to_json().unwrap()).unwrap();

		assert_eq!(json["config"]["captureConsole"], false);
		assert_eq!(json["config"]["batchInterval"], 1000);
		assert_eq!(json["user"]["id"], "42");
	}

	#[test]
	fn empty_dsn_disables() {
		let config = BrowserConfig {
			dsn: String::new(),
			url: "u".to_string(),
			environment: default_environment(),
			release: None,
			capture_console: true,
			batch_interval: 5000,
			max_breadcrumbs: 30,
		};
		assert!(!config.is_enabled());
	}
}
