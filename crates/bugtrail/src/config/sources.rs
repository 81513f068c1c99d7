// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: built-in defaults, TOML files, environment variables.

use std::collections::HashMap;
use std::path::PathBuf;

use tracing::{debug, trace};

use super::sections::{BreadcrumbsConfigLayer, JavascriptConfigLayer, RequestConfigLayer};
use super::AgentConfigLayer;
use crate::error::ConfigError;

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<AgentConfigLayer, ConfigError>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<AgentConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(AgentConfigLayer::default())
	}
}

/// TOML file configuration source.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn system() -> Self {
		Self::new("/etc/bugtrail/agent.toml")
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<AgentConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(AgentConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: AgentConfigLayer =
			toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
				path: self.path.clone(),
				source: e,
			})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: `BUGTRAIL_<FIELD>`; the environment name also falls back to
/// `APP_ENV`.
pub struct EnvSource {
	vars: Option<HashMap<String, String>>,
}

impl EnvSource {
	/// Reads the process environment.
	pub fn process() -> Self {
		Self { vars: None }
	}

	/// Reads from a fixed map instead of the process environment.
	pub fn from_map(vars: HashMap<String, String>) -> Self {
		Self { vars: Some(vars) }
	}

	fn var(&self, name: &str) -> Option<String> {
		let value = match &self.vars {
			Some(vars) => vars.get(name).cloned(),
			None => std::env::var(name).ok(),
		};
		value.filter(|s| !s.is_empty())
	}

	fn bool(&self, name: &str) -> Option<bool> {
		self
			.var(name)
			.map(|v| v.eq_ignore_ascii_case("true") || v == "1")
	}

	fn parsed<T: std::str::FromStr>(
		&self,
		name: &str,
		kind: &str,
	) -> Result<Option<T>, ConfigError> {
		match self.var(name) {
			Some(v) => v.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
				key: name.to_string(),
				message: format!("invalid {kind} value '{v}'"),
			}),
			None => Ok(None),
		}
	}
}

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<AgentConfigLayer, ConfigError> {
		debug!("loading environment variables");
		Ok(AgentConfigLayer {
			dsn: self.var("BUGTRAIL_DSN"),
			url: self.var("BUGTRAIL_URL"),
			environment: self.var("BUGTRAIL_ENV").or_else(|| self.var("APP_ENV")),
			release: self.var("BUGTRAIL_RELEASE"),
			server_name: self.var("BUGTRAIL_SERVER_NAME"),
			queue: self.bool("BUGTRAIL_QUEUE"),
			queue_connection: self.var("BUGTRAIL_QUEUE_CONNECTION"),
			queue_name: self.var("BUGTRAIL_QUEUE_NAME"),
			sample_rate: self.parsed("BUGTRAIL_SAMPLE_RATE", "float")?,
			ignored_kinds: None,
			breadcrumbs: Some(BreadcrumbsConfigLayer {
				max_breadcrumbs: self.parsed("BUGTRAIL_MAX_BREADCRUMBS", "usize")?,
				..Default::default()
			}),
			request: Some(RequestConfigLayer {
				max_body_size: self.parsed("BUGTRAIL_MAX_BODY_SIZE", "usize")?,
				..Default::default()
			}),
			javascript: Some(JavascriptConfigLayer {
				enabled: self.bool("BUGTRAIL_JS_ENABLED"),
				..Default::default()
			}),
		})
	}
}
