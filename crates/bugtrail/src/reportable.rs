// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The capability an error needs to be reported.

use bugtrail_core::RawFrame;

use crate::backtrace::capture_frames;

/// Something that can be captured as an event.
///
/// `is_a` replaces runtime class matching: an error answers for its own kind
/// and for every broader kind it declares, so an ignore list can name either.
pub trait Reportable {
	/// Type identifier, e.g. `my_app::db::QueryError`.
	fn kind(&self) -> &str;

	fn message(&self) -> String;

	/// Whether this error is `kind` or a specialisation of it.
	fn is_a(&self, kind: &str) -> bool {
		self.kind() == kind
	}

	/// Raw frames, throw site first.
	fn frames(&self) -> Vec<RawFrame>;
}

/// A concrete error snapshot: kind, message, lineage, frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedError {
	kind: String,
	message: String,
	lineage: Vec<String>,
	frames: Vec<RawFrame>,
}

impl CapturedError {
	/// An error with no frames and no declared supertypes.
	pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
		Self {
			kind: kind.into(),
			message: message.into(),
			lineage: Vec::new(),
			frames: Vec::new(),
		}
	}

	/// Snapshot of a Rust error with a backtrace taken at this call.
	pub fn from_error<E>(error: &E) -> Self
	where
		E: std::error::Error + 'static,
	{
		Self {
			kind: std::any::type_name::<E>().to_string(),
			message: error.to_string(),
			lineage: Vec::new(),
			frames: capture_frames(),
		}
	}

	/// Declares a broader kind this error belongs to.
	pub fn is_also(mut self, kind: impl Into<String>) -> Self {
		self.lineage.push(kind.into());
		self
	}

	pub fn with_frames(mut self, frames: Vec<RawFrame>) -> Self {
		self.frames = frames;
		self
	}
}

impl Reportable for CapturedError {
	fn kind(&self) -> &str {
		&self.kind
	}

	fn message(&self) -> String {
		self.message.clone()
	}

	fn is_a(&self, kind: &str) -> bool {
		self.kind == kind || self.lineage.iter().any(|k| k == kind)
	}

	fn frames(&self) -> Vec<RawFrame> {
		self.frames.clone()
	}
}
