// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the shared event model.

use thiserror::Error;

/// Errors raised while parsing or encoding core types.
#[derive(Debug, Error)]
pub enum CoreError {
	#[error("invalid breadcrumb type: {0}")]
	InvalidBreadcrumbType(String),

	#[error("invalid level: {0}")]
	InvalidLevel(String),

	#[error("invalid platform: {0}")]
	InvalidPlatform(String),

	#[error("serialization error: {0}")]
	Serialization(#[from] serde_json::Error),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
