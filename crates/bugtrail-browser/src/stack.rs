// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Parsing of free-text script stack traces.
//!
//! Three line shapes are recognised, tried in order:
//!
//! - `at fn (file:line:col)`
//! - `at file:line:col`
//! - `fn@file:line:col` (function may be empty)
//!
//! The column is optional in each. Lines matching none of them, such as the
//! leading `TypeError: ...` message line, are dropped.

use bugtrail_core::RawFrame;

/// Parses `stack` into raw frames, innermost first.
pub fn parse_stack(stack: &str) -> Vec<RawFrame> {
	stack.lines().filter_map(parse_line).collect()
}

fn parse_line(line: &str) -> Option<RawFrame> {
	let line = line.trim();
	if line.is_empty() {
		return None;
	}

	if let Some(rest) = line.strip_prefix("at ") {
		let rest = rest.trim();
		if let Some(frame) = parse_call_with_location(rest) {
			return Some(frame);
		}
		return parse_location(rest, None);
	}

	let (function, location) = line.split_once('@')?;
	let function = function.trim();
	parse_location(location, (!function.is_empty()).then_some(function))
}

/// `fn (location)`
fn parse_call_with_location(rest: &str) -> Option<RawFrame> {
	let inner = rest.strip_suffix(')')?;
	let (function, location) = inner.rsplit_once(" (")?;
	let function = function.trim();
	if function.is_empty() {
		return None;
	}
	parse_location(location, Some(function))
}

/// `file:line[:col]`; the file itself may contain colons (URLs).
fn parse_location(location: &str, function: Option<&str>) -> Option<RawFrame> {
	let location = location.trim();
	let (head, last) = location.rsplit_once(':')?;
	let last: u32 = last.parse().ok()?;

	let (file, line, column) = match head.rsplit_once(':') {
		Some((file, line)) => match line.parse::<u32>() {
			Ok(line) => (file, line, Some(last)),
			Err(_) => (head, last, None),
		},
		None => (head, last, None),
	};

	if file.is_empty() {
		return None;
	}

	let mut frame = RawFrame::new(file, line);
	frame.column = column;
	frame.function = function.map(str::to_string);
	Some(frame)
}
