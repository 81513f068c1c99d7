// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The agent client: builds events from errors and hands them to a transport.

use std::future::Future;
use std::sync::{Arc, RwLock};

use chrono::Utc;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use bugtrail_core::{
	format_title, retain_recent, BrowserBootstrap, BrowserConfig, BrowserUser, Endpoint, Event,
	Level, Platform, RuntimeInfo, StackTraceNormalizer, DEFAULT_BROWSER_BREADCRUMBS,
};

use crate::backtrace::capture_frames;
use crate::config::{AgentConfig, DeliveryMode};
use crate::error::{AgentError, Result};
use crate::reportable::{CapturedError, Reportable};
use crate::request::{capture_request, capture_user, AuthenticatedUser, RequestAccessor, UserAccessor};
use crate::runtime;
use crate::sampling::{BeforeSend, Decision, RandomSource, SamplingFilter};
use crate::sanitize::PayloadSanitizer;
use crate::scope::RequestScope;
use crate::source::FileSourceProvider;
use crate::transport::{ImmediateTransport, JobQueue, QueuedTransport, Transport};

/// What happened to a capture. Informational only; capture never fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOutcome {
	/// No destination key configured.
	Disabled,
	/// Lost the sampling draw.
	SampledOut,
	/// The error is an ignored kind.
	Ignored,
	/// The before-send hook discarded the event.
	Dropped,
	/// Handed to the transport successfully.
	Dispatched,
	/// The transport failed; the event is gone.
	Lost,
}

/// Per-capture context supplied by the caller.
#[derive(Default)]
pub struct CaptureContext<'a> {
	scope: Option<&'a RequestScope>,
	request: Option<&'a dyn RequestAccessor>,
	user: Option<AuthenticatedUser>,
	level: Level,
	extra: Map<String, Value>,
}

impl<'a> CaptureContext<'a> {
	pub fn new() -> Self {
		Self::default()
	}

	/// Breadcrumbs and request context of the current request.
	pub fn scope(mut self, scope: &'a RequestScope) -> Self {
		self.scope = Some(scope);
		self
	}

	/// The request being served, captured sanitized.
	pub fn request(mut self, request: &'a dyn RequestAccessor) -> Self {
		self.request = Some(request);
		self
	}

	/// Overrides the user from the configured [`UserAccessor`].
	pub fn user(mut self, user: AuthenticatedUser) -> Self {
		self.user = Some(user);
		self
	}

	pub fn level(mut self, level: Level) -> Self {
		self.level = level;
		self
	}

	pub fn extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
		self.extra.insert(key.into(), value.into());
		self
	}
}

/// Builder for [`AgentClient`].
pub struct AgentClientBuilder {
	config: AgentConfig,
	before_send: Option<Arc<dyn BeforeSend>>,
	transport: Option<Arc<dyn Transport>>,
	job_queue: Option<Arc<dyn JobQueue>>,
	user_accessor: Option<Arc<dyn UserAccessor>>,
	random: Option<RandomSource>,
}

impl AgentClientBuilder {
	pub fn new(config: AgentConfig) -> Self {
		Self {
			config,
			before_send: None,
			transport: None,
			job_queue: None,
			user_accessor: None,
			random: None,
		}
	}

	/// Installs the before-send transform.
	pub fn before_send(mut self, hook: impl BeforeSend + 'static) -> Self {
		self.before_send = Some(Arc::new(hook));
		self
	}

	/// Uses `transport` regardless of the configured delivery mode.
	pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
		self.transport = Some(transport);
		self
	}

	/// Queue receiving delivery jobs in queued mode.
	pub fn job_queue(mut self, queue: Arc<dyn JobQueue>) -> Self {
		self.job_queue = Some(queue);
		self
	}

	pub fn user_accessor(mut self, accessor: Arc<dyn UserAccessor>) -> Self {
		self.user_accessor = Some(accessor);
		self
	}

	/// Replaces the sampling draw.
	pub fn random(mut self, random: RandomSource) -> Self {
		self.random = Some(random);
		self
	}

	/// Builds the client.
	///
	/// A missing destination key yields a disabled client, not an error.
	/// Queued delivery without a job queue is an error.
	pub fn build(self) -> Result<AgentClient> {
		let endpoint = self
			.config
			.dsn
			.as_ref()
			.map(|key| Endpoint::new(&self.config.url, key.expose()));

		let transport = match (self.transport, &endpoint) {
			(Some(transport), _) => Some(transport),
			(None, None) => None,
			(None, Some(endpoint)) => Some(default_transport(
				&self.config,
				endpoint.clone(),
				self.job_queue,
			)?),
		};

		let mut sampling = SamplingFilter::new(&self.config);
		if let Some(random) = self.random {
			sampling = sampling.with_random(random);
		}

		info!(
			enabled = endpoint.is_some(),
			environment = %self.config.environment,
			transport = transport.as_ref().map(|t| t.name()).unwrap_or("none"),
			sample_rate = self.config.sample_rate,
			"bugtrail agent initialized"
		);

		let server_name = self.config.server_name.clone().or_else(runtime::hostname);
		let inner = Arc::new(AgentClientInner {
			sanitizer: PayloadSanitizer::new(&self.config.request),
			sampling,
			before_send: self.before_send,
			transport,
			user_accessor: self.user_accessor,
			endpoint,
			server_name,
			runtime: runtime::current(),
			context: RwLock::new(Map::new()),
			config: self.config,
		});

		Ok(AgentClient { inner })
	}
}

fn default_transport(
	config: &AgentConfig,
	endpoint: Endpoint,
	job_queue: Option<Arc<dyn JobQueue>>,
) -> Result<Arc<dyn Transport>> {
	match config.delivery {
		DeliveryMode::Immediate => Ok(Arc::new(ImmediateTransport::new(endpoint)?)),
		DeliveryMode::Queued => {
			let queue = job_queue.ok_or(AgentError::MissingJobQueue)?;
			Ok(Arc::new(QueuedTransport::new(
				queue,
				endpoint,
				config.queue_connection.clone(),
				config.queue_name.clone(),
			)))
		}
	}
}

struct AgentClientInner {
	config: AgentConfig,
	endpoint: Option<Endpoint>,
	sampling: SamplingFilter,
	sanitizer: PayloadSanitizer,
	before_send: Option<Arc<dyn BeforeSend>>,
	transport: Option<Arc<dyn Transport>>,
	user_accessor: Option<Arc<dyn UserAccessor>>,
	server_name: Option<String>,
	runtime: RuntimeInfo,
	context: RwLock<Map<String, Value>>,
}

/// Captures errors and delivers them. Cheap to clone and share across tasks.
#[derive(Clone)]
pub struct AgentClient {
	inner: Arc<AgentClientInner>,
}

impl AgentClient {
	pub fn builder(config: AgentConfig) -> AgentClientBuilder {
		AgentClientBuilder::new(config)
	}

	pub fn is_enabled(&self) -> bool {
		self.inner.endpoint.is_some()
	}

	pub fn config(&self) -> &AgentConfig {
		&self.inner.config
	}

	/// Merges `key` into the context attached to every event.
	pub fn set_context(&self, key: impl Into<String>, value: impl Into<Value>) {
		match self.inner.context.write() {
			Ok(mut context) => {
				context.insert(key.into(), value.into());
			}
			Err(_) => warn!("global context lock poisoned, context not updated"),
		}
	}

	/// Captures `error`.
	///
	/// The event is built before this returns, so borrowed context need not
	/// outlive the call; the returned future only performs delivery.
	pub fn capture_exception(
		&self,
		error: &dyn Reportable,
		context: CaptureContext<'_>,
	) -> impl Future<Output = CaptureOutcome> + Send + 'static {
		let prepared = self.prepare(error, context);
		let inner = Arc::clone(&self.inner);
		async move {
			match prepared {
				Ok(event) => deliver(&inner, event).await,
				Err(outcome) => outcome,
			}
		}
	}

	/// Captures a plain message with a backtrace taken here.
	pub fn capture_message(
		&self,
		message: &str,
		context: CaptureContext<'_>,
	) -> impl Future<Output = CaptureOutcome> + Send + 'static {
		let error = CapturedError::new("Message", message).with_frames(capture_frames());
		self.capture_exception(&error, context)
	}

	/// Page agent settings, or `None` when either agent is disabled.
	pub fn browser_bootstrap(&self, user: Option<AuthenticatedUser>) -> Option<BrowserBootstrap> {
		let endpoint = self.inner.endpoint.as_ref()?;
		let config = &self.inner.config;
		if !config.javascript.enabled {
			return None;
		}

		Some(BrowserBootstrap {
			config: BrowserConfig {
				dsn: endpoint.key().to_string(),
				url: endpoint.project_url(),
				environment: config.environment.clone(),
				release: config.release.clone(),
				capture_console: config.javascript.capture_console,
				batch_interval: config.javascript.batch_interval_ms,
				max_breadcrumbs: DEFAULT_BROWSER_BREADCRUMBS,
			},
			user: user.map(|u| BrowserUser {
				id: u.id,
				email: u.email,
				name: u.name,
			}),
		})
	}

	fn prepare(
		&self,
		error: &dyn Reportable,
		context: CaptureContext<'_>,
	) -> std::result::Result<Event, CaptureOutcome> {
		match self.inner.sampling.decide(error) {
			Decision::Disabled => return Err(CaptureOutcome::Disabled),
			Decision::SampledOut => {
				debug!(kind = error.kind(), "event sampled out");
				return Err(CaptureOutcome::SampledOut);
			}
			Decision::Ignored => {
				debug!(kind = error.kind(), "event kind ignored");
				return Err(CaptureOutcome::Ignored);
			}
			Decision::Capture => {}
		}

		let event = self.build_event(error, context);

		match &self.inner.before_send {
			Some(hook) => hook.transform(event, error).ok_or_else(|| {
				debug!(kind = error.kind(), "event dropped by before-send hook");
				CaptureOutcome::Dropped
			}),
			None => Ok(event),
		}
	}

	fn build_event(&self, error: &dyn Reportable, context: CaptureContext<'_>) -> Event {
		let inner = &self.inner;
		let message = error.message();

		let source = FileSourceProvider::new();
		let stacktrace = StackTraceNormalizer::with_source(&source).normalize(error.frames());

		let mut merged = inner
			.context
			.read()
			.map(|global| global.clone())
			.unwrap_or_default();
		let breadcrumbs = match context.scope {
			Some(scope) => {
				merged.extend(scope.context().clone());
				retain_recent(scope.breadcrumbs())
			}
			None => Vec::new(),
		};
		merged.extend(context.extra);

		let request_data = context
			.request
			.map(|request| capture_request(request, &inner.sanitizer));
		let user = context.user.or_else(|| {
			inner
				.user_accessor
				.as_ref()
				.and_then(|accessor| accessor.current_user())
		});
		let user_data = user.map(|user| capture_user(user, context.request));

		Event {
			event_id: Uuid::now_v7(),
			timestamp: Utc::now(),
			title: format_title(error.kind(), &message),
			message,
			kind: error.kind().to_string(),
			level: context.level,
			platform: Platform::Server,
			environment: inner.config.environment.clone(),
			release: inner.config.release.clone(),
			server_name: inner.server_name.clone(),
			session_id: None,
			stacktrace,
			breadcrumbs,
			request_data,
			user_data,
			runtime: Some(RuntimeInfo {
				peak_memory_bytes: runtime::peak_memory_bytes(),
				..inner.runtime.clone()
			}),
			context: merged,
		}
	}
}

async fn deliver(inner: &AgentClientInner, event: Event) -> CaptureOutcome {
	let Some(transport) = &inner.transport else {
		return CaptureOutcome::Disabled;
	};

	let event_id = event.event_id;
	match transport.send(event).await {
		Ok(()) => {
			debug!(event_id = %event_id, transport = transport.name(), "event dispatched");
			CaptureOutcome::Dispatched
		}
		Err(e) => {
			warn!(event_id = %event_id, transport = transport.name(), error = %e, "event delivery failed");
			CaptureOutcome::Lost
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::AgentConfigLayer;
	use crate::request::IncomingRequest;
	use crate::signals::HostSignal;
	use async_trait::async_trait;
	use serde_json::json;
	use std::sync::atomic::{AtomicBool, Ordering};
	use std::sync::Mutex;

	#[derive(Default)]
	struct StubTransport {
		sent: Mutex<Vec<Event>>,
		fail: AtomicBool,
	}

	impl StubTransport {
		fn sent(&self) -> Vec<Event> {
			self.sent.lock().unwrap().clone()
		}
	}

	#[async_trait]
	impl Transport for StubTransport {
		async fn send(&self, event: Event) -> Result<()> {
			if self.fail.load(Ordering::SeqCst) {
				return Err(AgentError::ServerError {
					status: 503,
					message: "unavailable".to_string(),
				});
			}
			self.sent.lock().unwrap().push(event);
			Ok(())
		}

		fn name(&self) -> &'static str {
			"stub"
		}
	}

	fn client_with(layer: AgentConfigLayer) -> (AgentClient, Arc<StubTransport>) {
		let transport = Arc::new(StubTransport::default());
		let client = AgentClient::builder(layer.finalize())
			.transport(transport.clone())
			.build()
			.unwrap();
		(client, transport)
	}

	fn enabled() -> AgentConfigLayer {
		AgentConfigLayer {
			dsn: Some("key_test".to_string()),
			server_name: Some("web-1".to_string()),
			..Default::default()
		}
	}

	#[tokio::test]
	async fn builds_full_event() {
		let (client, transport) = client_with(enabled());
		client.set_context("deploy", "blue");

		let request = IncomingRequest::new("POST", "https://shop.test/orders")
			.with_header("Cookie", "session=1")
			.with_body(json!({"password": "hunter2", "sku": "A-1"}))
			.with_client_ip("203.0.113.5");
		let mut scope = RequestScope::default();
		scope.begin(&request);
		scope.observe(&HostSignal::QueryExecuted {
			sql: "insert into orders".to_string(),
			duration_ms: 3.0,
			connection: "primary".to_string(),
		});

		let error = CapturedError::new("shop::orders::OutOfStock", "sku A-1 unavailable");
		let outcome = client
			.capture_exception(
				&error,
				CaptureContext::new()
					.scope(&scope)
					.request(&request)
					.user(AuthenticatedUser::new("7").email("c@shop.test"))
					.extra("order_id", 99),
			)
			.await;
		assert_eq!(outcome, CaptureOutcome::Dispatched);

		let sent = transport.sent();
		assert_eq!(sent.len(), 1);
		let event = &sent[0];
		assert_eq!(event.title, "OutOfStock: sku A-1 unavailable");
		assert_eq!(event.kind, "shop::orders::OutOfStock");
		assert_eq!(event.platform, Platform::Server);
		assert_eq!(event.server_name.as_deref(), Some("web-1"));
		assert_eq!(event.breadcrumbs.len(), 2);
		assert_eq!(event.context["deploy"], "blue");
		assert_eq!(event.context["order_id"], 99);
		assert!(event.context.contains_key("request_id"));

		let request_data = event.request_data.as_ref().unwrap();
		assert_eq!(request_data.headers["Cookie"], "[FILTERED]");
		assert_eq!(
			request_data.body,
			Some(json!({"password": "[FILTERED]", "sku": "A-1"}))
		);
		let user = event.user_data.as_ref().unwrap();
		assert_eq!(user.id, "7");
		assert_eq!(user.ip.as_deref(), Some("203.0.113.5"));
	}

	#[tokio::test]
	async fn ignored_kind_never_reaches_transport() {
		let (client, transport) = client_with(enabled());

		for _ in 0..20 {
			let error = CapturedError::new("app::RouteMissing", "no route").is_also("not_found");
			let outcome = client.capture_exception(&error, CaptureContext::new()).await;
			assert_eq!(outcome, CaptureOutcome::Ignored);
		}
		assert!(transport.sent().is_empty());
	}

	#[tokio::test]
	async fn zero_sample_rate_sends_nothing() {
		let (client, transport) = client_with(AgentConfigLayer {
			sample_rate: Some(0.0),
			..enabled()
		});

		for _ in 0..1000 {
			let outcome = client
				.capture_exception(&CapturedError::new("E", "m"), CaptureContext::new())
				.await;
			assert_eq!(outcome, CaptureOutcome::SampledOut);
		}
		assert!(transport.sent().is_empty());
	}

	#[tokio::test]
	async fn hook_can_drop_or_rewrite() {
		let transport = Arc::new(StubTransport::default());
		let client = AgentClient::builder(enabled().finalize())
			.transport(transport.clone())
			.before_send(|mut event: Event, error: &dyn Reportable| {
				if error.is_a("noise") {
					return None;
				}
				event.context.insert("hooked".to_string(), json!(true));
				Some(event)
			})
			.build()
			.unwrap();

		let noisy = CapturedError::new("E", "m").is_also("noise");
		assert_eq!(
			client.capture_exception(&noisy, CaptureContext::new()).await,
			CaptureOutcome::Dropped
		);
		assert_eq!(
			client
				.capture_exception(&CapturedError::new("E", "m"), CaptureContext::new())
				.await,
			CaptureOutcome::Dispatched
		);

		let sent = transport.sent();
		assert_eq!(sent.len(), 1);
		assert_eq!(sent[0].context["hooked"], true);
	}

	#[tokio::test]
	async fn disabled_client_does_nothing() {
		let (client, transport) = client_with(AgentConfigLayer::default());

		assert!(!client.is_enabled());
		let outcome = client
			.capture_exception(&CapturedError::new("E", "m"), CaptureContext::new())
			.await;
		assert_eq!(outcome, CaptureOutcome::Disabled);
		assert!(transport.sent().is_empty());
		assert!(client.browser_bootstrap(None).is_none());
	}

	#[tokio::test]
	async fn transport_failure_is_swallowed() {
		let (client, transport) = client_with(enabled());
		transport.fail.store(true, Ordering::SeqCst);

		let outcome = client
			.capture_exception(&CapturedError::new("E", "m"), CaptureContext::new())
			.await;
		assert_eq!(outcome, CaptureOutcome::Lost);
	}

	#[tokio::test]
	async fn message_capture_uses_level() {
		let (client, transport) = client_with(enabled());
		let outcome = client
			.capture_message("cache warmed", CaptureContext::new().level(Level::Info))
			.await;

		assert_eq!(outcome, CaptureOutcome::Dispatched);
		let event = &transport.sent()[0];
		assert_eq!(event.level, Level::Info);
		assert_eq!(event.title, "Message: cache warmed");
	}

	#[tokio::test]
	async fn message_frames_start_at_caller() {
		let (client, transport) = client_with(enabled());
		client.capture_message("hello", CaptureContext::new()).await;

		let event = &transport.sent()[0];
		let first = event.stacktrace[0].function.as_deref().unwrap_or_default();
		assert!(
			first.contains("message_frames_start_at_caller"),
			"frame 0 was {first}"
		);
		assert!(event
			.stacktrace
			.iter()
			.filter_map(|frame| frame.function.as_deref())
			.all(|name| !name.contains("0x") && !name.contains("std::backtrace")));
	}

	#[cfg(target_os = "linux")]
	#[tokio::test]
	async fn events_carry_peak_memory() {
		let (client, transport) = client_with(enabled());
		client
			.capture_exception(&CapturedError::new("E", "m"), CaptureContext::new())
			.await;

		let runtime = transport.sent()[0].runtime.clone().unwrap();
		assert!(runtime.peak_memory_bytes.is_some_and(|bytes| bytes > 0));
	}

	#[test]
	fn queued_mode_requires_a_queue() {
		let result = AgentClient::builder(enabled().finalize()).build();
		assert!(matches!(result, Err(AgentError::MissingJobQueue)));
	}

	#[test]
	fn bootstrap_carries_page_settings() {
		let (client, _) = client_with(AgentConfigLayer {
			url: Some("https://ingest.test/".to_string()),
			release: Some("2.1.0".to_string()),
			..enabled()
		});

		let bootstrap = client
			.browser_bootstrap(Some(AuthenticatedUser::new("42").name("Ada")))
			.unwrap();
		assert_eq!(bootstrap.config.dsn, "key_test");
		assert_eq!(bootstrap.config.url, "https://ingest.test/api/bug-tracking/key_test");
		assert_eq!(bootstrap.config.release.as_deref(), Some("2.1.0"));
		assert_eq!(bootstrap.config.batch_interval, 5000);
		assert_eq!(bootstrap.user.unwrap().name.as_deref(), Some("Ada"));
	}

	#[test]
	fn client_is_shareable() {
		fn assert_send_sync<T: Send + Sync + Clone>() {}
		assert_send_sync::<AgentClient>();
	}
}
