// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Network breadcrumbs through an explicit wrapper over the page's HTTP
//! capability.

use std::cell::RefCell;
use std::rc::Rc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Map, Value};

use bugtrail_core::{BreadcrumbRecorder, BreadcrumbType, Endpoint};

use crate::error::Result;

/// A request issued by page code.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
	pub method: String,
	pub url: String,
	pub headers: Vec<(String, String)>,
	pub body: Option<String>,
}

impl HttpRequest {
	pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
		Self {
			method: method.into(),
			url: url.into(),
			headers: Vec::new(),
			body: None,
		}
	}

	pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.push((name.into(), value.into()));
		self
	}

	pub fn body(mut self, body: impl Into<String>) -> Self {
		self.body = Some(body.into());
		self
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
	pub status: u16,
	pub body: String,
}

/// Whatever the page uses to talk HTTP (fetch, XHR, a test double).
#[async_trait(?Send)]
pub trait HttpCapability {
	async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// Which page API the wrapped capability stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkApi {
	Fetch,
	Xhr,
}

impl NetworkApi {
	fn category(self) -> &'static str {
		match self {
			Self::Fetch => "fetch",
			Self::Xhr => "xhr",
		}
	}
}

/// Records an `http` breadcrumb for every request passed through it.
///
/// Requests to the ingestion API are forwarded without a breadcrumb so the
/// agent's own deliveries never show up in the trail.
pub struct BreadcrumbHttp<H> {
	inner: H,
	recorder: Rc<RefCell<BreadcrumbRecorder>>,
	api: NetworkApi,
}

impl<H: HttpCapability> BreadcrumbHttp<H> {
	pub fn new(inner: H, recorder: Rc<RefCell<BreadcrumbRecorder>>, api: NetworkApi) -> Self {
		Self {
			inner,
			recorder,
			api,
		}
	}

	pub fn into_inner(self) -> H {
		self.inner
	}

	fn record(&self, request: &HttpRequest, outcome: std::result::Result<u16, String>, duration_ms: i64) {
		let mut data = Map::new();
		data.insert("method".to_string(), json!(request.method));
		data.insert("url".to_string(), json!(request.url));
		data.insert("duration".to_string(), json!(duration_ms));

		let message = match outcome {
			Ok(status) => {
				data.insert("status".to_string(), json!(status));
				format!("{} {}", request.method, request.url)
			}
			Err(error) => {
				data.insert("error".to_string(), Value::String(error));
				format!("{} {} (failed)", request.method, request.url)
			}
		};

		self.recorder
			.borrow_mut()
			.add(BreadcrumbType::Http, self.api.category(), message, Some(data));
	}
}

#[async_trait(?Send)]
impl<H: HttpCapability> HttpCapability for BreadcrumbHttp<H> {
	async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
		if Endpoint::is_ingestion_url(&request.url) {
			return self.inner.execute(request).await;
		}

		let started = Utc::now();
		let result = self.inner.execute(request.clone()).await;
		let duration_ms = (Utc::now() - started).num_milliseconds();

		let outcome = match &result {
			Ok(response) => Ok(response.status),
			Err(e) => Err(e.to_string()),
		};
		self.record(&request, outcome, duration_ms);
		result
	}
}
