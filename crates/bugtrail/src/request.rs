// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Host request and user access, and their capture into event context.

use std::net::SocketAddr;

use serde_json::Value;

use bugtrail_core::{RequestData, UserData};

use crate::sanitize::PayloadSanitizer;

/// Read access to the request being served.
pub trait RequestAccessor {
	fn method(&self) -> String;

	/// Absolute URL including the query string.
	fn full_url(&self) -> String;

	fn path(&self) -> String;

	/// Every header with all of its values, in arrival order.
	fn headers(&self) -> Vec<(String, Vec<String>)>;

	/// First value of `name`, matched case-insensitively.
	fn header(&self, name: &str) -> Option<String> {
		self
			.headers()
			.into_iter()
			.find(|(n, _)| n.eq_ignore_ascii_case(name))
			.and_then(|(_, values)| values.into_iter().next())
	}

	/// Parsed input, if any.
	fn body(&self) -> Option<&Value>;

	fn client_ip(&self) -> Option<String>;

	/// Name of the matched route, when the router exposes one.
	fn route_name(&self) -> Option<String>;
}

/// The authenticated user of the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
	pub id: String,
	pub email: Option<String>,
	pub name: Option<String>,
}

impl AuthenticatedUser {
	pub fn new(id: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			email: None,
			name: None,
		}
	}

	pub fn email(mut self, email: impl Into<String>) -> Self {
		self.email = Some(email.into());
		self
	}

	pub fn name(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into());
		self
	}
}

/// Looks up the authenticated user, if any.
pub trait UserAccessor: Send + Sync {
	fn current_user(&self) -> Option<AuthenticatedUser>;
}

/// Route name attached to an `http::Request` by the router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteName(pub String);

/// A framework-neutral request snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IncomingRequest {
	method: String,
	url: String,
	headers: Vec<(String, Vec<String>)>,
	body: Option<Value>,
	client_ip: Option<String>,
	route: Option<String>,
}

impl IncomingRequest {
	pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
		Self {
			method: method.into(),
			url: url.into(),
			..Default::default()
		}
	}

	/// Appends a value, joining repeated names into one entry.
	pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		let name = name.into();
		let value = value.into();
		match self
			.headers
			.iter_mut()
			.find(|(n, _)| n.eq_ignore_ascii_case(&name))
		{
			Some((_, values)) => values.push(value),
			None => self.headers.push((name, vec![value])),
		}
		self
	}

	pub fn with_body(mut self, body: Value) -> Self {
		self.body = Some(body);
		self
	}

	pub fn with_client_ip(mut self, ip: impl Into<String>) -> Self {
		self.client_ip = Some(ip.into());
		self
	}

	pub fn with_route(mut self, route: impl Into<String>) -> Self {
		self.route = Some(route.into());
		self
	}
}

impl RequestAccessor for IncomingRequest {
	fn method(&self) -> String {
		self.method.to_ascii_uppercase()
	}

	fn full_url(&self) -> String {
		self.url.clone()
	}

	fn path(&self) -> String {
		path_of(&self.url)
	}

	fn headers(&self) -> Vec<(String, Vec<String>)> {
		self.headers.clone()
	}

	fn body(&self) -> Option<&Value> {
		self.body.as_ref()
	}

	fn client_ip(&self) -> Option<String> {
		self.client_ip.clone()
	}

	fn route_name(&self) -> Option<String> {
		self.route.clone()
	}
}

impl RequestAccessor for http::Request<Value> {
	fn method(&self) -> String {
		self.method().as_str().to_string()
	}

	fn full_url(&self) -> String {
		let uri = self.uri();
		if uri.scheme().is_some() {
			return uri.to_string();
		}
		match self.headers().get(http::header::HOST).and_then(|h| h.to_str().ok()) {
			Some(host) => format!("http://{host}{uri}"),
			None => uri.to_string(),
		}
	}

	fn path(&self) -> String {
		self.uri().path().to_string()
	}

	fn headers(&self) -> Vec<(String, Vec<String>)> {
		let map = self.headers();
		map.keys()
			.map(|name| {
				let values = map
					.get_all(name)
					.iter()
					.map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
					.collect();
				(name.as_str().to_string(), values)
			})
			.collect()
	}

	fn header(&self, name: &str) -> Option<String> {
		self
			.headers()
			.get(name)
			.map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
	}

	fn body(&self) -> Option<&Value> {
		Some(self.body())
	}

	fn client_ip(&self) -> Option<String> {
		let forwarded = self
			.headers()
			.get("x-forwarded-for")
			.and_then(|v| v.to_str().ok())
			.and_then(|v| v.split(',').next())
			.map(|ip| ip.trim().to_string())
			.filter(|ip| !ip.is_empty());
		forwarded.or_else(|| {
			self
				.extensions()
				.get::<SocketAddr>()
				.map(|addr| addr.ip().to_string())
		})
	}

	fn route_name(&self) -> Option<String> {
		self.extensions().get::<RouteName>().map(|r| r.0.clone())
	}
}

fn path_of(url: &str) -> String {
	let without_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
	let path = match without_scheme.find('/') {
		Some(idx) => &without_scheme[idx..],
		None => "/",
	};
	path.split(['?', '#']).next().unwrap_or("/").to_string()
}

/// Snapshot of the request with sanitized headers and body.
pub fn capture_request(request: &dyn RequestAccessor, sanitizer: &PayloadSanitizer) -> RequestData {
	let headers = request.headers();
	RequestData {
		url: request.full_url(),
		method: request.method(),
		headers: sanitizer.sanitize_headers(headers.iter().map(|(name, values)| (name.as_str(), values))),
		body: sanitizer.sanitized_body(request.body()),
	}
}

/// The authenticated user with the request's client IP.
pub fn capture_user(user: AuthenticatedUser, request: Option<&dyn RequestAccessor>) -> UserData {
	UserData {
		id: user.id,
		email: user.email,
		name: user.name,
		ip: request.and_then(|r| r.client_ip()),
	}
}
