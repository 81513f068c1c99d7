// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! One page session: breadcrumbs, capture and delivery for a page load.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use chrono::Utc;
use serde_json::{Map, Value};
use tracing::{debug, info};
use uuid::Uuid;

use bugtrail_core::{
	truncate_chars, Breadcrumb, BreadcrumbRecorder, BreadcrumbType, BrowserBootstrap,
	BrowserConfig, BrowserUser, Event, Level, Platform, RawFrame, RequestData, RuntimeInfo,
	StackTraceNormalizer, UserData,
};

use crate::error::{BrowserError, Result};
use crate::network::{BreadcrumbHttp, HttpCapability, NetworkApi};
use crate::stack::parse_stack;
use crate::transport::{BrowserTransport, FlushTimer, PageNetwork};

const MAX_TITLE_CHARS: usize = 1000;
const MAX_CLICK_TEXT_CHARS: usize = 50;
const SESSION_ID_CHARS: usize = 16;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Where the session runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageInfo {
	pub url: String,
	pub user_agent: String,
}

/// A thrown script error, as the page sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptError {
	/// Constructor name, e.g. `TypeError`.
	pub name: String,
	pub message: String,
	pub stack: Option<String>,
}

impl ScriptError {
	pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			message: message.into(),
			stack: None,
		}
	}

	pub fn stack(mut self, stack: impl Into<String>) -> Self {
		self.stack = Some(stack.into());
		self
	}
}

/// An uncaught error report: the handler message, its location and, when
/// available, the error object itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorReport {
	pub message: String,
	pub source: Option<String>,
	pub line: u32,
	pub column: u32,
	pub error: Option<ScriptError>,
}

impl ErrorReport {
	pub fn new(message: impl Into<String>) -> Self {
		Self {
			message: message.into(),
			source: None,
			line: 0,
			column: 0,
			error: None,
		}
	}

	pub fn location(mut self, source: impl Into<String>, line: u32, column: u32) -> Self {
		self.source = Some(source.into());
		self.line = line;
		self.column = column;
		self
	}

	pub fn error(mut self, error: ScriptError) -> Self {
		self.error = Some(error);
		self
	}
}

/// Reason an unhandled promise rejection carried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
	Error(ScriptError),
	/// Any non-error value, already stringified.
	Value(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleLevel {
	Error,
	Warn,
}

impl ConsoleLevel {
	fn category(self) -> &'static str {
		match self {
			Self::Error => "console.error",
			Self::Warn => "console.warn",
		}
	}
}

/// The element a click landed on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClickTarget {
	pub tag: String,
	pub id: Option<String>,
	pub class_name: Option<String>,
	pub text: String,
}

impl ClickTarget {
	/// `tag#id.firstclass`, omitting empty parts.
	fn selector(&self) -> String {
		let mut selector = self.tag.to_lowercase();
		if let Some(id) = self.id.as_deref().filter(|id| !id.is_empty()) {
			selector.push('#');
			selector.push_str(id);
		}
		if let Some(class) = self
			.class_name
			.as_deref()
			.and_then(|c| c.split_whitespace().next())
		{
			selector.push('.');
			selector.push_str(class);
		}
		selector
	}
}

/// Page agent state for one page load.
///
/// Single-threaded: the breadcrumb recorder is shared with network wrappers
/// through `Rc<RefCell<_>>`.
pub struct PageSession<N, T> {
	config: BrowserConfig,
	session_id: String,
	page: PageInfo,
	user: Option<BrowserUser>,
	recorder: Rc<RefCell<BreadcrumbRecorder>>,
	transport: BrowserTransport<N, T>,
}

impl<N: PageNetwork, T: FlushTimer> PageSession<N, T> {
	/// Starts a session from the bootstrap the server embedded into the page.
	pub fn start(bootstrap: BrowserBootstrap, page: PageInfo, network: N, timer: T) -> Result<Self> {
		let BrowserBootstrap { config, user } = bootstrap;
		if !config.is_enabled() {
			return Err(BrowserError::Disabled);
		}

		let session_id = new_session_id();
		info!(
			session_id = %session_id,
			environment = %config.environment,
			capture_console = config.capture_console,
			"page agent started"
		);

		Ok(Self {
			recorder: Rc::new(RefCell::new(BreadcrumbRecorder::new(config.breadcrumb_capacity()))),
			transport: BrowserTransport::new(&config, network, timer),
			config,
			session_id,
			page,
			user,
		})
	}

	/// Starts a session from the bootstrap JSON.
	pub fn start_from_json(json: &str, page: PageInfo, network: N, timer: T) -> Result<Self> {
		Self::start(BrowserBootstrap::from_json(json)?, page, network, timer)
	}

	pub fn session_id(&self) -> &str {
		&self.session_id
	}

	pub fn breadcrumbs(&self) -> Vec<Breadcrumb> {
		self.recorder.borrow().breadcrumbs()
	}

	pub fn transport(&self) -> &BrowserTransport<N, T> {
		&self.transport
	}

	/// Captures an uncaught error and queues it; returns the event id.
	pub fn capture_error(&mut self, report: ErrorReport) -> Uuid {
		let (kind, message, frames) = match report.error {
			Some(error) => {
				let frames = error.stack.as_deref().map(parse_stack).unwrap_or_default();
				(error.name, error.message, frames)
			}
			None => {
				let mut frame = RawFrame::new(report.source.unwrap_or_default(), report.line);
				frame.column = (report.column > 0).then_some(report.column);
				("Error".to_string(), report.message.clone(), vec![frame])
			}
		};

		let event = self.build_event(&report.message, message, kind, frames);
		let event_id = event.event_id;
		debug!(event_id = %event_id, kind = %event.kind, "captured page error");
		self.transport.enqueue(event);
		event_id
	}

	/// Captures an unhandled promise rejection.
	pub fn capture_rejection(&mut self, reason: Rejection) -> Uuid {
		let report = match reason {
			Rejection::Error(error) => {
				ErrorReport::new(format!("Unhandled Promise Rejection: {}", error.message)).error(error)
			}
			Rejection::Value(value) => {
				ErrorReport::new(format!("Unhandled Promise Rejection: {value}"))
			}
		};
		self.capture_error(report)
	}

	pub fn add_breadcrumb(
		&self,
		kind: BreadcrumbType,
		category: impl Into<String>,
		message: impl AsRef<str>,
		data: Option<Map<String, Value>>,
	) {
		self.recorder.borrow_mut().add(kind, category, message, data);
	}

	/// Records a console error or warning; a no-op with console capture off.
	pub fn record_console<I, S>(&self, level: ConsoleLevel, args: I)
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		if !self.config.capture_console {
			return;
		}
		let message = args
			.into_iter()
			.map(|arg| arg.as_ref().to_string())
			.collect::<Vec<_>>()
			.join(" ");
		self.add_breadcrumb(BreadcrumbType::Log, level.category(), message, None);
	}

	pub fn record_click(&self, target: &ClickTarget) {
		let text = truncate_chars(target.text.trim(), MAX_CLICK_TEXT_CHARS);
		let message = format!("{} \"{}\"", target.selector(), text);
		self.add_breadcrumb(BreadcrumbType::User, "ui.click", message, None);
	}

	/// Records a history navigation and makes `url` the page URL of later
	/// events.
	pub fn record_navigation(&mut self, url: impl Into<String>) {
		self.page.url = url.into();
		self.add_breadcrumb(BreadcrumbType::Navigation, "navigation", &self.page.url, None);
	}

	pub fn set_user(&mut self, user: Option<BrowserUser>) {
		self.user = user;
	}

	/// Wraps the page's HTTP capability so its requests leave breadcrumbs in
	/// this session.
	pub fn instrument_http<H: HttpCapability>(&self, inner: H, api: NetworkApi) -> BreadcrumbHttp<H> {
		BreadcrumbHttp::new(inner, self.recorder.clone(), api)
	}

	pub fn on_timer_fired(&mut self) {
		self.transport.on_timer_fired();
	}

	/// Page hide or unload: sends everything queued.
	pub fn on_page_hide(&mut self) {
		self.transport.force_flush();
	}

	fn build_event(&self, title: &str, message: String, kind: String, frames: Vec<RawFrame>) -> Event {
		let mut headers = BTreeMap::new();
		headers.insert("User-Agent".to_string(), self.page.user_agent.clone());

		Event {
			event_id: Uuid::now_v7(),
			timestamp: Utc::now(),
			title: truncate_chars(title, MAX_TITLE_CHARS),
			message,
			kind,
			level: Level::Error,
			platform: Platform::Browser,
			environment: self.config.environment.clone(),
			release: self.config.release.clone(),
			server_name: None,
			session_id: Some(self.session_id.clone()),
			stacktrace: StackTraceNormalizer::new().normalize(frames),
			breadcrumbs: self.breadcrumbs(),
			request_data: Some(RequestData {
				url: self.page.url.clone(),
				method: "GET".to_string(),
				headers,
				body: None,
			}),
			user_data: self.user.as_ref().map(|user| UserData {
				id: user.id.clone(),
				email: user.email.clone(),
				name: user.name.clone(),
				ip: None,
			}),
			runtime: Some(RuntimeInfo {
				name: "browser".to_string(),
				user_agent: Some(self.page.user_agent.clone()),
				sdk: format!("bugtrail-browser/{}", env!("CARGO_PKG_VERSION")),
				..Default::default()
			}),
			context: Map::new(),
		}
	}
}

/// `sess_` followed by 16 base-36 characters.
fn new_session_id() -> String {
	let suffix: String = (0..SESSION_ID_CHARS)
		.map(|_| BASE36[fastrand::usize(..BASE36.len())] as char)
		.collect();
	format!("sess_{suffix}")
}
