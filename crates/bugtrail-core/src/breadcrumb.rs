// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Breadcrumbs (ambient occurrences leading up to an error) and the bounded
//! recorder that retains them.

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Maximum stored length of a breadcrumb message, in characters.
pub const MAX_MESSAGE_CHARS: usize = 500;

/// Default recorder capacity.
pub const DEFAULT_MAX_BREADCRUMBS: usize = 50;

const ELLIPSIS: &str = "...";

/// A timestamped, categorized note of something that happened before an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Breadcrumb {
	#[serde(rename = "type")]
	pub kind: BreadcrumbType,
	/// "db.query", "log.error", "http.client", "ui.click", ...
	pub category: String,
	pub message: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub data: Option<serde_json::Map<String, serde_json::Value>>,
	pub timestamp: DateTime<Utc>,
}

/// Coarse kind of a breadcrumb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreadcrumbType {
	Query,
	Log,
	Http,
	Navigation,
	User,
	Default,
}

impl fmt::Display for BreadcrumbType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Query => write!(f, "query"),
			Self::Log => write!(f, "log"),
			Self::Http => write!(f, "http"),
			Self::Navigation => write!(f, "navigation"),
			Self::User => write!(f, "user"),
			Self::Default => write!(f, "default"),
		}
	}
}

impl FromStr for BreadcrumbType {
	type Err = CoreError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"query" => Ok(Self::Query),
			"log" => Ok(Self::Log),
			"http" => Ok(Self::Http),
			"navigation" => Ok(Self::Navigation),
			"user" => Ok(Self::User),
			"default" => Ok(Self::Default),
			_ => Err(CoreError::InvalidBreadcrumbType(s.to_string())),
		}
	}
}

/// Cuts `s` to at most `max` characters.
pub fn truncate_chars(s: &str, max: usize) -> String {
	match s.char_indices().nth(max) {
		Some((idx, _)) => s[..idx].to_string(),
		None => s.to_string(),
	}
}

/// Cuts `s` to at most `max` characters, ending in `...` when anything was
/// removed.
pub fn truncate_with_marker(s: &str, max: usize) -> String {
	if s.chars().count() <= max {
		return s.to_string();
	}
	let keep = max.saturating_sub(ELLIPSIS.len());
	let mut out = truncate_chars(s, keep);
	out.push_str(ELLIPSIS);
	out
}

/// Fixed-capacity FIFO of breadcrumbs.
///
/// A recorder belongs to exactly one request (server) or one page session
/// (browser); it is never shared across concurrent requests, so mutation goes
/// through `&mut self` without locking.
#[derive(Debug, Clone)]
pub struct BreadcrumbRecorder {
	crumbs: VecDeque<Breadcrumb>,
	max_breadcrumbs: usize,
}

impl BreadcrumbRecorder {
	pub fn new(max_breadcrumbs: usize) -> Self {
		Self {
			crumbs: VecDeque::with_capacity(max_breadcrumbs.min(DEFAULT_MAX_BREADCRUMBS)),
			max_breadcrumbs,
		}
	}

	/// Records a breadcrumb stamped with the current time.
	pub fn add(
		&mut self,
		kind: BreadcrumbType,
		category: impl Into<String>,
		message: impl AsRef<str>,
		data: Option<serde_json::Map<String, serde_json::Value>>,
	) {
		self.push(Breadcrumb {
			kind,
			category: category.into(),
			message: message.as_ref().to_string(),
			data,
			timestamp: Utc::now(),
		});
	}

	/// Appends a prepared breadcrumb, truncating its message and evicting the
	/// oldest entries beyond capacity.
	pub fn push(&mut self, mut crumb: Breadcrumb) {
		if crumb.message.chars().count() > MAX_MESSAGE_CHARS {
			crumb.message = truncate_chars(&crumb.message, MAX_MESSAGE_CHARS);
		}
		self.crumbs.push_back(crumb);
		while self.crumbs.len() > self.max_breadcrumbs {
			self.crumbs.pop_front();
		}
	}

	/// Returns a snapshot of the retained breadcrumbs, oldest first.
	pub fn breadcrumbs(&self) -> Vec<Breadcrumb> {
		self.crumbs.iter().cloned().collect()
	}

	pub fn clear(&mut self) {
		self.crumbs.clear();
	}

	pub fn len(&self) -> usize {
		self.crumbs.len()
	}

	pub fn is_empty(&self) -> bool {
		self.crumbs.is_empty()
	}

	pub fn max_breadcrumbs(&self) -> usize {
		self.max_breadcrumbs
	}
}

impl Default for BreadcrumbRecorder {
	fn default() -> Self {
		Self::new(DEFAULT_MAX_BREADCRUMBS)
	}
}
