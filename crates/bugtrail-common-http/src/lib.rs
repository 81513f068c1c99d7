// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Shared HTTP utilities for bugtrail.
//!
//! Every agent-side request goes through a client built here so the
//! ingestion server sees a consistent User-Agent.

mod client;

pub use client::{builder, client_with_timeout, user_agent};
