// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Per-request breadcrumb trail and context.
//!
//! One scope per request, owned by the task serving it and passed by `&mut`;
//! concurrent requests never share a scope.

use serde_json::{json, Map, Value};
use uuid::Uuid;

use bugtrail_core::{Breadcrumb, BreadcrumbRecorder, BreadcrumbType};

use crate::config::BreadcrumbsConfig;
use crate::request::RequestAccessor;
use crate::signals::{HostSignal, SignalListener};

const REQUEST_ID_HEADER: &str = "X-Request-ID";

/// Breadcrumbs and context accumulated while serving one request.
#[derive(Debug, Clone)]
pub struct RequestScope {
	recorder: BreadcrumbRecorder,
	listener: SignalListener,
	context: Map<String, Value>,
}

impl RequestScope {
	pub fn new(config: &BreadcrumbsConfig) -> Self {
		Self {
			recorder: BreadcrumbRecorder::new(config.max_breadcrumbs),
			listener: SignalListener::new(config),
			context: Map::new(),
		}
	}

	/// Resets the scope for a new request and records its arrival.
	pub fn begin(&mut self, request: &dyn RequestAccessor) {
		self.recorder.clear();
		self.context.clear();

		let url = request.full_url();
		self.recorder.add(
			BreadcrumbType::Navigation,
			"http.request",
			format!("{} {}", request.method(), request.path()),
			Some(object(json!({ "url": url }))),
		);

		let request_id = request
			.header(REQUEST_ID_HEADER)
			.filter(|id| !id.is_empty())
			.unwrap_or_else(|| Uuid::new_v4().to_string());
		self.set_context("request_id", request_id);
		if let Some(route) = request.route_name() {
			self.set_context("route", route);
		}
	}

	/// Records a host notification, subject to the enabled listener families.
	pub fn observe(&mut self, signal: &HostSignal) {
		self.listener.record(&mut self.recorder, signal);
	}

	pub fn add_breadcrumb(
		&mut self,
		kind: BreadcrumbType,
		category: impl Into<String>,
		message: impl AsRef<str>,
		data: Option<Map<String, Value>>,
	) {
		self.recorder.add(kind, category, message, data);
	}

	pub fn set_context(&mut self, key: impl Into<String>, value: impl Into<Value>) {
		self.context.insert(key.into(), value.into());
	}

	pub fn breadcrumbs(&self) -> Vec<Breadcrumb> {
		self.recorder.breadcrumbs()
	}

	pub fn context(&self) -> &Map<String, Value> {
		&self.context
	}
}

impl Default for RequestScope {
	fn default() -> Self {
		Self::new(&BreadcrumbsConfig::default())
	}
}

fn object(value: Value) -> Map<String, Value> {
	match value {
		Value::Object(map) => map,
		_ => Map::new(),
	}
}
