// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Page-session error-reporting agent.
//!
//! Consumes the [`BrowserBootstrap`](bugtrail_core::BrowserBootstrap) the
//! server embeds into a page, records breadcrumbs for console output, clicks,
//! navigation and network calls, and delivers captured script errors in
//! debounced batches.
//!
//! The page's primitives (timer, beacon, keep-alive POST, HTTP) are supplied
//! by the host through [`FlushTimer`], [`PageNetwork`] and [`HttpCapability`].

pub mod error;
pub mod network;
pub mod session;
pub mod stack;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{BrowserError, Result};
pub use network::{BreadcrumbHttp, HttpCapability, HttpRequest, HttpResponse, NetworkApi};
pub use session::{
	ClickTarget, ConsoleLevel, ErrorReport, PageInfo, PageSession, Rejection, ScriptError,
};
pub use stack::parse_stack;
pub use transport::{BrowserTransport, FlushState, FlushTimer, PageNetwork};
