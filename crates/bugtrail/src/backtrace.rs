// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Backtrace capture and parsing into raw frames.

use std::backtrace::Backtrace;

use bugtrail_core::RawFrame;
use rustc_demangle::demangle;

/// File recorded for frames without a resolvable location.
pub const INTERNAL_FILE: &str = "[internal]";

/// Frames belonging to the capture machinery itself; skipped when they lead
/// the trace so frame 0 is the caller. Matched against normalized names.
const CAPTURE_PREFIXES: &[&str] = &[
	"std::backtrace",
	"<std::backtrace",
	"std::sys::backtrace",
	"backtrace::",
	"bugtrail::backtrace::capture_frames",
	"bugtrail::backtrace::parse_backtrace",
	"bugtrail::reportable::CapturedError::from_error",
	"bugtrail::client::AgentClient::capture_message",
];

/// Parse a Rust backtrace into raw frames, innermost first.
pub fn parse_backtrace(backtrace: &Backtrace) -> Vec<RawFrame> {
	parse_backtrace_string(&format!("{:#}", backtrace))
}

/// Capture a fresh backtrace at the caller and parse it.
pub fn capture_frames() -> Vec<RawFrame> {
	parse_backtrace(&Backtrace::force_capture())
}

fn parse_backtrace_string(bt_string: &str) -> Vec<RawFrame> {
	let mut frames: Vec<RawFrame> = Vec::new();

	for line in bt_string.lines() {
		let line = line.trim();
		if line.is_empty() {
			continue;
		}

		if let Some(location) = line.strip_prefix("at ") {
			// Location info for the previous frame
			if let Some(frame) = frames.last_mut() {
				apply_location(frame, location);
			}
			continue;
		}

		if let Some(function) = parse_function_line(line) {
			frames.push(RawFrame {
				file: INTERNAL_FILE.to_string(),
				line: 0,
				column: None,
				function: Some(function),
			});
		}
	}

	let skip = frames
		.iter()
		.take_while(|frame| {
			frame
				.function
				.as_deref()
				.is_some_and(|f| CAPTURE_PREFIXES.iter().any(|p| f.starts_with(p)))
		})
		.count();
	frames.drain(..skip);
	frames
}

/// Parse `"N: [0xADDR - ]symbol"` into a normalized function name.
fn parse_function_line(line: &str) -> Option<String> {
	let (prefix, rest) = line.split_once(':')?;
	prefix.trim().parse::<u32>().ok()?;

	let symbol = strip_address(rest.trim());
	if symbol.is_empty() {
		return None;
	}
	Some(normalize_symbol(symbol))
}

/// Drops a leading `0x55dfccb2a43b - ` instruction address.
fn strip_address(symbol: &str) -> &str {
	let Some(hex) = symbol.strip_prefix("0x") else {
		return symbol;
	};
	let digits = hex.chars().take_while(char::is_ascii_hexdigit).count();
	match hex[digits..].strip_prefix(" - ") {
		Some(rest) if digits > 0 => rest.trim_start(),
		_ => symbol,
	}
}

/// Demangles `symbol` and removes crate disambiguators (`std[e28293b1aa0f68bd]`)
/// and the trailing `::h0123456789abcdef` hash.
fn normalize_symbol(symbol: &str) -> String {
	let demangled = format!("{:#}", demangle(symbol));
	let without_hash = strip_hash_suffix(&demangled);
	strip_disambiguators(without_hash)
}

fn strip_hash_suffix(name: &str) -> &str {
	match name.rsplit_once("::h") {
		Some((head, hash)) if hash.len() == 16 && hash.chars().all(|c| c.is_ascii_hexdigit()) => {
			head
		}
		_ => name,
	}
}

fn strip_disambiguators(name: &str) -> String {
	let mut out = String::with_capacity(name.len());
	let mut rest = name;
	while let Some(open) = rest.find('[') {
		let (before, from_bracket) = rest.split_at(open);
		out.push_str(before);
		let inner = &from_bracket[1..];
		match inner.find(']') {
			Some(close)
				if close > 0 && inner[..close].chars().all(|c| c.is_ascii_hexdigit()) =>
			{
				rest = &inner[close + 1..];
			}
			_ => {
				out.push('[');
				rest = inner;
			}
		}
	}
	out.push_str(rest);
	out
}

/// Apply `file:line:col` (column optional) to a frame.
fn apply_location(frame: &mut RawFrame, location: &str) {
	let mut parts = location.trim().rsplitn(3, ':');
	let last = parts.next().and_then(|s| s.parse::<u32>().ok());
	let middle = parts.next();
	let rest = parts.next();

	match (rest, middle.and_then(|s| s.parse::<u32>().ok()), last) {
		(Some(file), Some(line), Some(column)) => {
			frame.file = file.to_string();
			frame.line = line;
			frame.column = Some(column);
		}
		_ => {
			let mut parts = location.trim().rsplitn(2, ':');
			let line = parts.next().and_then(|s| s.parse::<u32>().ok());
			if let (Some(line), Some(file)) = (line, parts.next()) {
				frame.file = file.to_string();
				frame.line = line;
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const SAMPLE: &str = "   0: std::backtrace_rs::backtrace::libunwind::trace
             at /rustc/abc/library/std/src/../../backtrace/src/backtrace/libunwind.rs:116:5
   1: std::backtrace::Backtrace::create
             at /rustc/abc/library/std/src/backtrace.rs:331:13
   2: bugtrail::backtrace::capture_frames
             at ./crates/bugtrail/src/backtrace.rs:30:21
   3: my_app::orders::submit
             at ./src/orders.rs:42:9
   4: my_app::main
             at ./src/main.rs:7
   5: __libc_start_main
";

	#[test]
	fn skips_capture_machinery() {
		let frames = parse_backtrace_string(SAMPLE);
		assert_eq!(frames[0].function.as_deref(), Some("my_app::orders::submit"));
		assert_eq!(frames.len(), 3);
	}

	#[test]
	fn parses_locations() {
		let frames = parse_backtrace_string(SAMPLE);

		assert_eq!(frames[0].file, "./src/orders.rs");
		assert_eq!(frames[0].line, 42);
		assert_eq!(frames[0].column, Some(9));

		assert_eq!(frames[1].file, "./src/main.rs");
		assert_eq!(frames[1].line, 7);
		assert_eq!(frames[1].column, None);
	}

	#[test]
	fn frame_without_location_is_internal() {
		let frames = parse_backtrace_string(SAMPLE);
		let last = frames.last().unwrap();
		assert_eq!(last.file, INTERNAL_FILE);
		assert_eq!(last.line, 0);
	}

	const ADDRESSED: &str = "   0: 0x55dfccb2a43b - std[e28293b1aa0f68bd]::backtrace_rs::backtrace::libunwind::trace::h0a1b2c3d4e5f6a7b
             at /rustc/abc/library/std/src/../../backtrace/src/backtrace/libunwind.rs:116:5
   1: 0x55dfccb2a500 - std[e28293b1aa0f68bd]::backtrace::Backtrace::create::h1111111111111111
   2: 0x55dfcc3722a0 - bugtrail::backtrace::capture_frames::h2c130fd86b57fe36
             at ./crates/bugtrail/src/backtrace.rs:30:21
   3: 0x55dfcc3722f0 - bugtrail::client::AgentClient::capture_message::h77a6000000000000
   4: 0x55dfcc372300 - <my_app[0badc0de1234abcd]::Orders as my_app[0badc0de1234abcd]::Submit>::submit::hfedcba9876543210
             at ./src/orders.rs:42:9
   5: 0x55dfcc372400 - my_app::read::<[u8]>::h0000000000000000
";

	#[test]
	fn addressed_frames_are_normalized_and_skipped() {
		let frames = parse_backtrace_string(ADDRESSED);

		assert_eq!(
			frames[0].function.as_deref(),
			Some("<my_app::Orders as my_app::Submit>::submit")
		);
		assert_eq!(frames[0].file, "./src/orders.rs");
		assert_eq!(frames[1].function.as_deref(), Some("my_app::read::<[u8]>"));
		assert_eq!(frames.len(), 2);
	}

	#[test]
	fn address_without_separator_is_kept() {
		assert_eq!(strip_address("0xzz - f"), "0xzz - f");
		assert_eq!(strip_address("main"), "main");
	}

	#[test]
	fn non_hash_suffix_is_kept() {
		assert_eq!(strip_hash_suffix("app::handler"), "app::handler");
		assert_eq!(strip_hash_suffix("app::hello"), "app::hello");
	}

	fn assert_clean(frames: &[RawFrame]) {
		for name in frames.iter().filter_map(|f| f.function.as_deref()) {
			assert!(!name.contains("0x"), "address left in {name}");
			assert_eq!(strip_hash_suffix(name), name, "hash left in {name}");
		}
	}

	#[test]
	fn live_capture_starts_at_caller() {
		let frames = capture_frames();

		let first = frames[0].function.as_deref().unwrap_or_default();
		assert!(
			first.contains("live_capture_starts_at_caller"),
			"frame 0 was {first}"
		);
		assert_clean(&frames);
	}
}
