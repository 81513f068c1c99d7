// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Redaction of request headers and bodies before they leave the process.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::config::RequestConfig;

/// Replacement for any redacted value.
pub const FILTERED: &str = "[FILTERED]";

/// Applies the header and body denylists, and the body size guard.
///
/// Matching is case-insensitive in both denylists. Sanitizing an already
/// sanitized payload yields the same payload.
#[derive(Debug, Clone)]
pub struct PayloadSanitizer {
	headers: Vec<String>,
	body_keys: Vec<String>,
	capture_body: bool,
	max_body_size: usize,
}

impl PayloadSanitizer {
	pub fn new(config: &RequestConfig) -> Self {
		Self {
			headers: lowercase(&config.sanitize_headers),
			body_keys: lowercase(&config.sanitize_body_keys),
			capture_body: config.capture_body,
			max_body_size: config.max_body_size,
		}
	}

	/// Joins multi-valued headers with `", "` and redacts denylisted names.
	/// Names keep their original spelling.
	pub fn sanitize_headers<'a, I, V>(&self, headers: I) -> BTreeMap<String, String>
	where
		I: IntoIterator<Item = (&'a str, V)>,
		V: IntoIterator,
		V::Item: AsRef<str>,
	{
		let mut sanitized: BTreeMap<String, String> = BTreeMap::new();
		for (name, values) in headers {
			let value = if self.is_sensitive_header(name) {
				FILTERED.to_string()
			} else {
				values
					.into_iter()
					.map(|v| v.as_ref().to_string())
					.collect::<Vec<_>>()
					.join(", ")
			};
			sanitized.insert(name.to_string(), value);
		}
		sanitized
	}

	/// [`Self::sanitize_headers`] over an `http` header map. Values that are
	/// not visible ASCII are rendered lossily.
	pub fn sanitize_header_map(&self, headers: &http::HeaderMap) -> BTreeMap<String, String> {
		self.sanitize_headers(headers.keys().map(|name| {
			let values: Vec<String> = headers
				.get_all(name)
				.iter()
				.map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
				.collect();
			(name.as_str(), values)
		}))
	}

	/// Replaces the whole value of every denylisted key, at any depth.
	pub fn sanitize_body(&self, body: &Value) -> Value {
		match body {
			Value::Object(map) => {
				let mut sanitized = Map::with_capacity(map.len());
				for (key, value) in map {
					let value = if self.is_sensitive_key(key) {
						Value::String(FILTERED.to_string())
					} else {
						self.sanitize_body(value)
					};
					sanitized.insert(key.clone(), value);
				}
				Value::Object(sanitized)
			}
			Value::Array(items) => Value::Array(items.iter().map(|v| self.sanitize_body(v)).collect()),
			other => other.clone(),
		}
	}

	/// The sanitized body, or `None` when body capture is off, the body is
	/// empty, or its serialized form exceeds the size limit.
	pub fn sanitized_body(&self, body: Option<&Value>) -> Option<Value> {
		if !self.capture_body {
			return None;
		}
		let body = body.filter(|b| !is_empty_body(b))?;
		self.guard_size(self.sanitize_body(body))
	}

	fn guard_size(&self, body: Value) -> Option<Value> {
		let size = serde_json::to_string(&body).map(|s| s.len()).ok()?;
		if size > self.max_body_size {
			tracing::debug!(size, limit = self.max_body_size, "request body omitted, too large");
			return None;
		}
		Some(body)
	}

	fn is_sensitive_header(&self, name: &str) -> bool {
		self.headers.iter().any(|h| h.eq_ignore_ascii_case(name))
	}

	fn is_sensitive_key(&self, key: &str) -> bool {
		self.body_keys.iter().any(|k| k.eq_ignore_ascii_case(key))
	}
}

fn lowercase(list: &[String]) -> Vec<String> {
	list.iter().map(|s| s.to_ascii_lowercase()).collect()
}

fn is_empty_body(body: &Value) -> bool {
	match body {
		Value::Null => true,
		Value::Object(map) => map.is_empty(),
		Value::Array(items) => items.is_empty(),
		Value::String(s) => s.is_empty(),
		_ => false,
	}
}
