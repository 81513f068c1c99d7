// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Runtime information for server events.

use bugtrail_core::RuntimeInfo;

/// SDK identifier sent with every server event.
pub fn sdk_name() -> String {
	format!("bugtrail/{}", env!("CARGO_PKG_VERSION"))
}

/// The machine hostname, if it can be read and is valid UTF-8.
pub fn hostname() -> Option<String> {
	hostname::get().ok().and_then(|h| h.into_string().ok())
}

/// Peak resident set size, where the platform reports one.
#[cfg(target_os = "linux")]
pub fn peak_memory_bytes() -> Option<u64> {
	std::fs::read_to_string("/proc/self/status")
		.ok()
		.and_then(|status| parse_peak_rss(&status))
}

#[cfg(not(target_os = "linux"))]
pub fn peak_memory_bytes() -> Option<u64> {
	None
}

/// Reads the `VmHWM:   1234 kB` line of `/proc/<pid>/status`.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_peak_rss(status: &str) -> Option<u64> {
	let line = status.lines().find_map(|line| line.strip_prefix("VmHWM:"))?;
	let mut parts = line.split_whitespace();
	let value: u64 = parts.next()?.parse().ok()?;
	match parts.next() {
		Some("kB") => value.checked_mul(1024),
		_ => None,
	}
}

/// Describes the current process.
pub fn current() -> RuntimeInfo {
	RuntimeInfo {
		name: "rust".to_string(),
		version: option_env!("CARGO_PKG_RUST_VERSION")
			.filter(|v| !v.is_empty())
			.map(str::to_string),
		os: Some(std::env::consts::OS.to_string()),
		arch: Some(std::env::consts::ARCH.to_string()),
		hostname: hostname(),
		user_agent: None,
		peak_memory_bytes: peak_memory_bytes(),
		sdk: sdk_name(),
	}
}
