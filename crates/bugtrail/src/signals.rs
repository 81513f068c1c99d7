// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Translation of host notifications into breadcrumbs.

use serde_json::{json, Map, Value};

use bugtrail_core::{truncate_with_marker, BreadcrumbRecorder, BreadcrumbType, MAX_MESSAGE_CHARS};

use crate::config::BreadcrumbsConfig;

/// A notification emitted by the host's event bus.
#[derive(Debug, Clone, PartialEq)]
pub enum HostSignal {
	/// A database query finished.
	QueryExecuted {
		sql: String,
		duration_ms: f64,
		connection: String,
	},
	/// A log line was written.
	LogEmitted { level: String, message: String },
	/// An outbound HTTP call received its response.
	HttpResponseReceived {
		method: String,
		url: String,
		status: u16,
		duration_ms: f64,
	},
}

/// Decides which signals are recorded and how they are rendered.
#[derive(Debug, Clone)]
pub struct SignalListener {
	queries: bool,
	logs: bool,
	http_client: bool,
}

impl SignalListener {
	pub fn new(config: &BreadcrumbsConfig) -> Self {
		Self {
			queries: config.queries,
			logs: config.logs,
			http_client: config.http_client,
		}
	}

	/// Records `signal` into `recorder` if its family is enabled.
	pub fn record(&self, recorder: &mut BreadcrumbRecorder, signal: &HostSignal) {
		match signal {
			HostSignal::QueryExecuted {
				sql,
				duration_ms,
				connection,
			} if self.queries => {
				recorder.add(
					BreadcrumbType::Query,
					"db.query",
					truncate_with_marker(sql, MAX_MESSAGE_CHARS),
					Some(data(json!({
						"duration_ms": round2(*duration_ms),
						"connection": connection,
					}))),
				);
			}
			HostSignal::LogEmitted { level, message } if self.logs => {
				recorder.add(
					BreadcrumbType::Log,
					format!("log.{level}"),
					truncate_with_marker(message, MAX_MESSAGE_CHARS),
					Some(data(json!({ "level": level }))),
				);
			}
			HostSignal::HttpResponseReceived {
				method,
				url,
				status,
				duration_ms,
			} if self.http_client => {
				recorder.add(
					BreadcrumbType::Http,
					"http.client",
					truncate_with_marker(&format!("{method} {url}"), MAX_MESSAGE_CHARS),
					Some(data(json!({
						"method": method,
						"url": url,
						"status": status,
						"duration_ms": round2(*duration_ms),
					}))),
				);
			}
			_ => {}
		}
	}
}

fn round2(value: f64) -> f64 {
	(value * 100.0).round() / 100.0
}

fn data(value: Value) -> Map<String, Value> {
	match value {
		Value::Object(map) => map,
		_ => Map::new(),
	}
}
