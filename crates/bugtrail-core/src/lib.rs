// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core types for the bugtrail error-reporting agents.
//!
//! This crate holds the data model shared by the server agent (`bugtrail`)
//! and the page-session agent (`bugtrail-browser`):
//!
//! - [`Breadcrumb`] and the bounded [`BreadcrumbRecorder`]
//! - [`RawFrame`] / [`StackFrame`] and the frame-capping [`StackTraceNormalizer`]
//! - the wire [`Event`] plus the ingestion [`Endpoint`] and [`BatchEnvelope`]
//! - the [`BrowserBootstrap`] contract the server hands to the page agent

pub mod bootstrap;
pub mod breadcrumb;
pub mod endpoint;
pub mod error;
pub mod event;
pub mod stacktrace;

pub use bootstrap::{BrowserBootstrap, BrowserConfig, BrowserUser, DEFAULT_BROWSER_BREADCRUMBS};
pub use breadcrumb::{
	truncate_chars, truncate_with_marker, Breadcrumb, BreadcrumbRecorder, BreadcrumbType,
	DEFAULT_MAX_BREADCRUMBS, MAX_MESSAGE_CHARS,
};
pub use endpoint::{BatchEnvelope, Endpoint, KEY_HEADER, MAX_BATCH_EVENTS};
pub use error::{CoreError, Result};
pub use event::{
	format_title, retain_recent, Event, Level, Platform, RequestData, RuntimeInfo, UserData,
	MAX_EVENT_BREADCRUMBS,
};
pub use stacktrace::{
	extract_window, RawFrame, SourceProvider, StackFrame, StackTraceNormalizer, CONTEXT_LINES,
	MAX_FRAMES,
};
