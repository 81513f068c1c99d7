// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the page agent.

use thiserror::Error;

/// Result type alias for page agent operations.
pub type Result<T> = std::result::Result<T, BrowserError>;

#[derive(Debug, Error)]
pub enum BrowserError {
	/// The bootstrap carries no destination key or URL.
	#[error("page agent disabled: missing destination key or URL")]
	Disabled,

	/// A network call made through the page's HTTP capability failed.
	#[error("network request failed: {0}")]
	Network(String),

	/// Failed to serialize an event or batch.
	#[error("serialization error: {0}")]
	Serialization(#[from] serde_json::Error),

	/// The bootstrap could not be read.
	#[error(transparent)]
	Core(#[from] bugtrail_core::CoreError),
}
