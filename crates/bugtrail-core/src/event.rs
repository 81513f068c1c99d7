// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The event payload delivered to the ingestion endpoint.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::breadcrumb::Breadcrumb;
use crate::error::CoreError;
use crate::stacktrace::StackFrame;

/// Maximum breadcrumbs carried by one event.
pub const MAX_EVENT_BREADCRUMBS: usize = 50;

const MAX_TITLE_MESSAGE_CHARS: usize = 200;

/// A captured error, fully built and ready for delivery.
///
/// Built once per capture and moved into the transport; nothing mutates it
/// afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
	pub event_id: Uuid,
	pub timestamp: DateTime<Utc>,
	pub title: String,
	pub message: String,
	#[serde(rename = "type")]
	pub kind: String,
	pub level: Level,
	pub platform: Platform,
	pub environment: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub release: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub server_name: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub session_id: Option<String>,
	#[serde(default)]
	pub stacktrace: Vec<StackFrame>,
	#[serde(default)]
	pub breadcrumbs: Vec<Breadcrumb>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub request_data: Option<RequestData>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub user_data: Option<UserData>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub runtime: Option<RuntimeInfo>,
	#[serde(default)]
	pub context: serde_json::Map<String, serde_json::Value>,
}

/// Severity of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
	Debug,
	Info,
	Warning,
	#[default]
	Error,
	Fatal,
}

impl fmt::Display for Level {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Debug => write!(f, "debug"),
			Self::Info => write!(f, "info"),
			Self::Warning => write!(f, "warning"),
			Self::Error => write!(f, "error"),
			Self::Fatal => write!(f, "fatal"),
		}
	}
}

impl FromStr for Level {
	type Err = CoreError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"debug" => Ok(Self::Debug),
			"info" => Ok(Self::Info),
			"warning" => Ok(Self::Warning),
			"error" => Ok(Self::Error),
			"fatal" => Ok(Self::Fatal),
			_ => Err(CoreError::InvalidLevel(s.to_string())),
		}
	}
}

/// Which agent produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
	Server,
	Browser,
}

impl fmt::Display for Platform {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Server => write!(f, "server"),
			Self::Browser => write!(f, "browser"),
		}
	}
}

impl FromStr for Platform {
	type Err = CoreError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"server" => Ok(Self::Server),
			"browser" => Ok(Self::Browser),
			_ => Err(CoreError::InvalidPlatform(s.to_string())),
		}
	}
}

/// HTTP request context, already sanitized.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestData {
	pub url: String,
	pub method: String,
	#[serde(default)]
	pub headers: BTreeMap<String, String>,
	/// Absent when body capture is off or the body exceeded the size limit.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub body: Option<serde_json::Value>,
}

/// The authenticated user at capture time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserData {
	pub id: String,
	#[serde(default)]
	pub email: Option<String>,
	#[serde(default)]
	pub name: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub ip: Option<String>,
}

/// Runtime the error was raised in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuntimeInfo {
	/// "rust", "browser"
	pub name: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub version: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub os: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub arch: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub hostname: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub user_agent: Option<String>,
	/// Peak resident set size of the process at capture time.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub peak_memory_bytes: Option<u64>,
	pub sdk: String,
}

/// Builds `"{ShortType}: {message}"`, cutting long messages to 200 chars.
pub fn format_title(kind: &str, message: &str) -> String {
	let base = match kind.split_once('<') {
		Some((head, _)) if !head.is_empty() => head,
		_ => kind,
	};
	let short = base
		.rsplit(|c| matches!(c, ':' | '\\' | '.' | '/'))
		.find(|segment| !segment.is_empty())
		.unwrap_or(base);

	let message = if message.chars().count() > MAX_TITLE_MESSAGE_CHARS {
		let mut cut = crate::breadcrumb::truncate_chars(message, MAX_TITLE_MESSAGE_CHARS);
		cut.push_str("...");
		cut
	} else {
		message.to_string()
	};

	format!("{short}: {message}")
}

/// Keeps the most recent [`MAX_EVENT_BREADCRUMBS`] breadcrumbs.
pub fn retain_recent(mut breadcrumbs: Vec<Breadcrumb>) -> Vec<Breadcrumb> {
	if breadcrumbs.len() > MAX_EVENT_BREADCRUMBS {
		breadcrumbs.drain(..breadcrumbs.len() - MAX_EVENT_BREADCRUMBS);
	}
	breadcrumbs
}
