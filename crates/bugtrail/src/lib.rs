// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Server-side error-reporting agent.
//!
//! Captures errors raised while serving requests, enriches them with the
//! request's breadcrumb trail, source-level stack frames, and sanitized
//! request and user context, then delivers them to the ingestion endpoint
//! without ever failing the host.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use bugtrail::{AgentClient, CaptureContext, CapturedError, LocalJobQueue, RequestScope};
//!
//! let config = bugtrail::config::load_config()?;
//! let client = AgentClient::builder(config.clone())
//!     .job_queue(Arc::new(LocalJobQueue::spawn()?))
//!     .build()?;
//!
//! let mut scope = RequestScope::new(&config.breadcrumbs);
//! scope.begin(&request);
//!
//! if let Err(e) = handle(&request).await {
//!     let error = CapturedError::from_error(&e);
//!     client
//!         .capture_exception(&error, CaptureContext::new().scope(&scope).request(&request))
//!         .await;
//! }
//! ```

pub mod backtrace;
pub mod client;
pub mod config;
pub mod error;
pub mod jobs;
pub mod reportable;
pub mod request;
pub mod runtime;
pub mod sampling;
pub mod sanitize;
pub mod scope;
pub mod signals;
pub mod source;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{AgentClient, AgentClientBuilder, CaptureContext, CaptureOutcome};
pub use config::{AgentConfig, DeliveryMode, DestinationKey};
pub use error::{AgentError, ConfigError, Result};
pub use jobs::LocalJobQueue;
pub use reportable::{CapturedError, Reportable};
pub use request::{
	AuthenticatedUser, IncomingRequest, RequestAccessor, RouteName, UserAccessor,
};
pub use sampling::{BeforeSend, Decision, SamplingFilter};
pub use sanitize::{PayloadSanitizer, FILTERED};
pub use scope::RequestScope;
pub use signals::{HostSignal, SignalListener};
pub use source::FileSourceProvider;
pub use transport::{
	DeliveryJob, ImmediateTransport, JobQueue, QueuedJob, QueuedTransport, RetryPolicy, Transport,
};

pub use bugtrail_core::{Breadcrumb, BreadcrumbType, Event, Level, Platform};
