// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Stack frames and normalization of raw frames into the wire shape.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Maximum number of frames carried by an event.
pub const MAX_FRAMES: usize = 30;

/// Lines of source shown on each side of a frame's line.
pub const CONTEXT_LINES: u32 = 5;

/// A frame as produced by a backtrace or a parsed stack string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
	pub file: String,
	pub line: u32,
	pub column: Option<u32>,
	pub function: Option<String>,
}

impl RawFrame {
	pub fn new(file: impl Into<String>, line: u32) -> Self {
		Self {
			file: file.into(),
			line,
			column: None,
			function: None,
		}
	}

	pub fn column(mut self, column: u32) -> Self {
		self.column = Some(column);
		self
	}

	pub fn function(mut self, function: impl Into<String>) -> Self {
		self.function = Some(function.into());
		self
	}

	fn has_location(&self) -> bool {
		!self.file.is_empty() && self.line > 0
	}
}

/// One normalized entry of an event's stack trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackFrame {
	pub file: String,
	pub line: u32,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub column: Option<u32>,
	#[serde(default)]
	pub function: Option<String>,
	/// Absolute line number to source text.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub context: Option<BTreeMap<u32, String>>,
}

/// Supplies source context for a frame location.
///
/// Implementations must never fail loudly: anything unreadable is `None`.
pub trait SourceProvider {
	fn context(&self, file: &str, line: u32) -> Option<BTreeMap<u32, String>>;
}

/// Extracts lines `[line - radius, line + radius]` of `content`, keyed by
/// their 1-based line number. Returns `None` when the window is empty.
pub fn extract_window(content: &str, line: u32, radius: u32) -> Option<BTreeMap<u32, String>> {
	if line == 0 {
		return None;
	}
	let first = line.saturating_sub(radius).max(1);
	let last = line.saturating_add(radius);

	let window: BTreeMap<u32, String> = content
		.lines()
		.enumerate()
		.map(|(idx, text)| (idx as u32 + 1, text))
		.skip_while(|(n, _)| *n < first)
		.take_while(|(n, _)| *n <= last)
		.map(|(n, text)| (n, text.trim_end().to_string()))
		.collect();

	if window.is_empty() {
		None
	} else {
		Some(window)
	}
}

/// Turns raw frames into at most [`MAX_FRAMES`] stack frames, keeping the
/// frames nearest the throw site.
pub struct StackTraceNormalizer<'a> {
	source: Option<&'a dyn SourceProvider>,
}

impl<'a> StackTraceNormalizer<'a> {
	/// A normalizer that never attaches source context.
	pub fn new() -> Self {
		Self { source: None }
	}

	pub fn with_source(source: &'a dyn SourceProvider) -> Self {
		Self {
			source: Some(source),
		}
	}

	pub fn normalize<I>(&self, frames: I) -> Vec<StackFrame>
	where
		I: IntoIterator<Item = RawFrame>,
	{
		// Cap first so dropped frames never cost a source read.
		frames
			.into_iter()
			.take(MAX_FRAMES)
			.map(|raw| {
				let context = match self.source {
					Some(source) if raw.has_location() => source.context(&raw.file, raw.line),
					_ => None,
				};
				StackFrame {
					file: raw.file,
					line: raw.line,
					column: raw.column,
					function: raw.function,
					context,
				}
			})
			.collect()
	}
}

impl Default for StackTraceNormalizer<'_> {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;
	use std::cell::RefCell;

	struct CountingSource {
		calls: RefCell<Vec<(String, u32)>>,
	}

	impl SourceProvider for CountingSource {
		fn context(&self, file: &str, line: u32) -> Option<BTreeMap<u32, String>> {
			self.calls.borrow_mut().push((file.to_string(), line));
			Some(BTreeMap::from([(line, format!("// {file}"))]))
		}
	}

	fn frames(n: usize) -> Vec<RawFrame> {
		(0..n)
			.map(|i| RawFrame::new(format!("src/f{i}.rs"), i as u32 + 1).function(format!("f{i}")))
			.collect()
	}

	#[test]
	fn window_is_centered_and_keyed_by_line() {
		let content: String = (1..=20).map(|i| format!("line {i}  \n")).collect();
		let window = extract_window(&content, 10, CONTEXT_LINES).unwrap();

		assert_eq!(window.len(), 11);
		assert_eq!(window.keys().next(), Some(&5));
		assert_eq!(window.keys().last(), Some(&15));
		assert_eq!(window[&10], "line 10");
	}

	#[test]
	fn window_clips_at_file_edges() {
		let content = "a\nb\nc\n";
		let window = extract_window(content, 2, CONTEXT_LINES).unwrap();
		assert_eq!(window.keys().copied().collect::<Vec<_>>(), vec![1, 2, 3]);

		assert!(extract_window(content, 40, CONTEXT_LINES).is_none());
		assert!(extract_window(content, 0, CONTEXT_LINES).is_none());
	}

	#[test]
	fn source_is_only_read_for_kept_frames_with_location() {
		let source = CountingSource {
			calls: RefCell::new(Vec::new()),
		};
		let mut raw = frames(40);
		raw[1] = RawFrame::new("[internal]", 0);

		let normalized = StackTraceNormalizer::with_source(&source).normalize(raw);

		assert_eq!(normalized.len(), MAX_FRAMES);
		assert_eq!(source.calls.borrow().len(), MAX_FRAMES - 1);
		assert!(normalized[1].context.is_none());
		assert!(normalized[0].context.is_some());
	}

	#[test]
	fn frame_without_source_omits_context_on_the_wire() {
		let normalized = StackTraceNormalizer::new().normalize(vec![RawFrame::new("app.rs", 3)]);
		let json = serde_json::to_value(&normalized[0]).unwrap();

		assert!(json.get("context").is_none());
		assert!(json.get("column").is_none());
		assert!(json["function"].is_null());
	}

	proptest! {
		#[test]
		fn keeps_frames_nearest_throw_site(n in 0usize..80) {
			let raw = frames(n);
			let normalized = StackTraceNormalizer::new().normalize(raw.clone());

			prop_assert_eq!(normalized.len(), n.min(MAX_FRAMES));
			for (frame, raw) in normalized.iter().zip(raw.iter()) {
				prop_assert_eq!(&frame.file, &raw.file);
				prop_assert_eq!(frame.line, raw.line);
			}
		}
	}
}
