// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Layered agent configuration.
//!
//! Precedence (highest to lowest):
//! 1. Environment variables (`BUGTRAIL_*`)
//! 2. Config file (`/etc/bugtrail/agent.toml`)
//! 3. Built-in defaults
//!
//! ```ignore
//! let config = bugtrail::config::load_config()?;
//! let client = bugtrail::AgentClient::builder(config).build()?;
//! ```

pub mod sections;
pub mod sources;

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;

pub use sections::{
	BreadcrumbsConfig, BreadcrumbsConfigLayer, JavascriptConfig, JavascriptConfigLayer,
	RequestConfig, RequestConfigLayer,
};
pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_ENVIRONMENT: &str = "production";
pub const DEFAULT_QUEUE_NAME: &str = "default";

/// Error kinds dropped unless configured otherwise: input validation, missing
/// routes, unauthenticated access, wrong HTTP method, CSRF mismatch.
pub const DEFAULT_IGNORED_KINDS: &[&str] = &[
	"validation",
	"not_found",
	"authentication",
	"method_not_allowed",
	"token_mismatch",
];

/// The secret identifier routing events to one ingestion project.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct DestinationKey(String);

impl DestinationKey {
	pub fn new(key: impl Into<String>) -> Self {
		Self(key.into())
	}

	pub fn expose(&self) -> &str {
		&self.0
	}
}

impl fmt::Debug for DestinationKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("DestinationKey([REDACTED])")
	}
}

/// How finished events leave the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
	/// One POST awaited inline by the capture call.
	Immediate,
	/// A self-contained job handed to a durable queue.
	Queued,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct AgentConfigLayer {
	pub dsn: Option<String>,
	pub url: Option<String>,
	pub environment: Option<String>,
	pub release: Option<String>,
	pub server_name: Option<String>,
	pub queue: Option<bool>,
	pub queue_connection: Option<String>,
	pub queue_name: Option<String>,
	pub sample_rate: Option<f64>,
	pub ignored_kinds: Option<Vec<String>>,
	pub breadcrumbs: Option<BreadcrumbsConfigLayer>,
	pub request: Option<RequestConfigLayer>,
	pub javascript: Option<JavascriptConfigLayer>,
}

macro_rules! merge_field {
	($self:ident, $other:ident, $($field:ident),+ $(,)?) => {
		$(
			if $other.$field.is_some() {
				$self.$field = $other.$field;
			}
		)+
	};
}

macro_rules! merge_section {
	($self:ident, $other:ident, $($field:ident),+ $(,)?) => {
		$(
			if let Some(next) = $other.$field {
				match $self.$field.as_mut() {
					Some(current) => current.merge(next),
					None => $self.$field = Some(next),
				}
			}
		)+
	};
}

impl AgentConfigLayer {
	pub fn merge(&mut self, other: Self) {
		merge_field!(
			self,
			other,
			dsn,
			url,
			environment,
			release,
			server_name,
			queue,
			queue_connection,
			queue_name,
			sample_rate,
			ignored_kinds,
		);
		merge_section!(self, other, breadcrumbs, request, javascript);
	}

	/// Rejects values no default could stand in for.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if let Some(rate) = self.sample_rate {
			if !rate.is_finite() {
				return Err(ConfigError::InvalidValue {
					key: "sample_rate".to_string(),
					message: format!("sample rate must be a finite number, got {rate}"),
				});
			}
		}
		Ok(())
	}

	pub fn finalize(self) -> AgentConfig {
		AgentConfig {
			dsn: self
				.dsn
				.filter(|key| !key.trim().is_empty())
				.map(DestinationKey::new),
			url: self.url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
			environment: self
				.environment
				.unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string()),
			release: self.release,
			server_name: self.server_name,
			delivery: if self.queue.unwrap_or(true) {
				DeliveryMode::Queued
			} else {
				DeliveryMode::Immediate
			},
			queue_connection: self.queue_connection,
			queue_name: self
				.queue_name
				.unwrap_or_else(|| DEFAULT_QUEUE_NAME.to_string()),
			sample_rate: self
				.sample_rate
				.filter(|rate| rate.is_finite())
				.unwrap_or(1.0)
				.clamp(0.0, 1.0),
			ignored_kinds: self.ignored_kinds.unwrap_or_else(|| {
				DEFAULT_IGNORED_KINDS
					.iter()
					.map(|kind| kind.to_string())
					.collect()
			}),
			breadcrumbs: self.breadcrumbs.unwrap_or_default().finalize(),
			request: self.request.unwrap_or_default().finalize(),
			javascript: self.javascript.unwrap_or_default().finalize(),
		}
	}
}

/// Fully resolved agent configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
	/// Absent key means the agent is disabled.
	pub dsn: Option<DestinationKey>,
	pub url: String,
	pub environment: String,
	pub release: Option<String>,
	/// Falls back to the machine hostname.
	pub server_name: Option<String>,
	pub delivery: DeliveryMode,
	pub queue_connection: Option<String>,
	pub queue_name: String,
	/// Probability in [0, 1] that a captured error is forwarded.
	pub sample_rate: f64,
	pub ignored_kinds: Vec<String>,
	pub breadcrumbs: BreadcrumbsConfig,
	pub request: RequestConfig,
	pub javascript: JavascriptConfig,
}

impl AgentConfig {
	/// A configuration with defaults everywhere and the given key.
	pub fn with_dsn(dsn: impl Into<String>) -> Self {
		AgentConfigLayer {
			dsn: Some(dsn.into()),
			..Default::default()
		}
		.finalize()
	}

	pub fn is_enabled(&self) -> bool {
		self.dsn.is_some()
	}
}

impl Default for AgentConfig {
	fn default() -> Self {
		AgentConfigLayer::default().finalize()
	}
}

fn load_from(mut sources: Vec<Box<dyn ConfigSource>>) -> Result<AgentConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = AgentConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		merged.merge(source.load()?);
	}

	merged.validate()?;
	Ok(merged.finalize())
}

/// Load configuration from all sources with standard precedence.
pub fn load_config() -> Result<AgentConfig, ConfigError> {
	load_from(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource::process()),
	])
}

/// Load configuration from environment only.
pub fn load_config_from_env() -> Result<AgentConfig, ConfigError> {
	load_from(vec![Box::new(DefaultsSource), Box::new(EnvSource::process())])
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(
	config_path: impl Into<std::path::PathBuf>,
) -> Result<AgentConfig, ConfigError> {
	load_from(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource::process()),
	])
}
