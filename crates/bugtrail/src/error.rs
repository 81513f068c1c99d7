// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the server agent.
//!
//! None of these ever reach the instrumented code path through a capture
//! call; they surface from construction, configuration loading, and the
//! transports (where the client logs and swallows them).

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for agent operations.
pub type Result<T> = std::result::Result<T, AgentError>;

/// Errors that can occur in the agent.
#[derive(Debug, Error)]
pub enum AgentError {
	/// HTTP request failed (connect, timeout, body).
	#[error("HTTP request failed: {0}")]
	RequestFailed(#[from] reqwest::Error),

	/// Ingestion server answered with a non-success status.
	#[error("server error (status {status}): {message}")]
	ServerError {
		/// HTTP status code.
		status: u16,
		/// Response body, if any.
		message: String,
	},

	/// Failed to serialize an event or job.
	#[error("serialization error: {0}")]
	SerializationError(#[from] serde_json::Error),

	/// Queued delivery was selected but no job queue was supplied.
	#[error("queued delivery requires a job queue")]
	MissingJobQueue,

	/// The job queue did not accept the unit of work.
	#[error("job queue rejected delivery: {0}")]
	QueueRejected(String),

	/// A background worker was requested outside a Tokio runtime.
	#[error("no Tokio runtime available to run the delivery worker")]
	RuntimeUnavailable,

	/// Configuration could not be loaded.
	#[error(transparent)]
	Config(#[from] ConfigError),
}

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("failed to read config file {path}: {source}")]
	FileRead {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("failed to parse config file {path}: {source}")]
	TomlParse {
		path: PathBuf,
		#[source]
		source: toml::de::Error,
	},

	#[error("invalid value for {key}: {message}")]
	InvalidValue { key: String, message: String },
}
