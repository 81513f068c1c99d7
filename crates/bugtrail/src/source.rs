// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Source context read from the local filesystem.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::rc::Rc;

use bugtrail_core::{extract_window, SourceProvider, CONTEXT_LINES};
use tracing::trace;

/// Reads frame files from disk, once per file.
///
/// Meant to live for a single normalization pass: the cache is not
/// invalidated and the type is deliberately not `Sync`.
#[derive(Debug, Default)]
pub struct FileSourceProvider {
	cache: RefCell<HashMap<String, Option<Rc<str>>>>,
}

impl FileSourceProvider {
	pub fn new() -> Self {
		Self::default()
	}

	fn contents(&self, file: &str) -> Option<Rc<str>> {
		if let Some(cached) = self.cache.borrow().get(file) {
			return cached.clone();
		}

		let loaded = read_text(Path::new(file));
		self
			.cache
			.borrow_mut()
			.insert(file.to_string(), loaded.clone());
		loaded
	}
}

impl SourceProvider for FileSourceProvider {
	fn context(&self, file: &str, line: u32) -> Option<BTreeMap<u32, String>> {
		let contents = self.contents(file)?;
		extract_window(&contents, line, CONTEXT_LINES)
	}
}

/// Missing, unreadable, and non-UTF-8 files all read as `None`.
fn read_text(path: &Path) -> Option<Rc<str>> {
	if !path.is_file() {
		return None;
	}
	match std::fs::read_to_string(path) {
		Ok(text) => Some(Rc::from(text)),
		Err(e) => {
			trace!(path = %path.display(), error = %e, "source context unavailable");
			None
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	fn source_file(lines: usize) -> tempfile::NamedTempFile {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		for i in 1..=lines {
			writeln!(file, "let line_{i} = {i};").unwrap();
		}
		file
	}

	#[test]
	fn reads_window_around_line() {
		let file = source_file(30);
		let provider = FileSourceProvider::new();

		let context = provider
			.context(file.path().to_str().unwrap(), 12)
			.unwrap();

		assert_eq!(context.len(), 11);
		assert_eq!(context[&7], "let line_7 = 7;");
		assert_eq!(context[&17], "let line_17 = 17;");
	}

	#[test]
	fn missing_file_has_no_context() {
		let provider = FileSourceProvider::new();
		assert!(provider.context("/definitely/not/here.rs", 3).is_none());
	}

	#[test]
	fn binary_file_has_no_context() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		file.write_all(&[0xff, 0xfe, 0x00, 0x81]).unwrap();

		let provider = FileSourceProvider::new();
		assert!(provider.context(file.path().to_str().unwrap(), 1).is_none());
	}

	#[test]
	fn directory_has_no_context() {
		let dir = tempfile::tempdir().unwrap();
		let provider = FileSourceProvider::new();
		assert!(provider.context(dir.path().to_str().unwrap(), 1).is_none());
	}

	#[test]
	fn file_is_read_once() {
		let file = source_file(5);
		let path = file.path().to_str().unwrap().to_string();
		let provider = FileSourceProvider::new();

		assert!(provider.context(&path, 1).is_some());
		std::fs::remove_file(&path).unwrap();
		assert!(provider.context(&path, 2).is_some());
	}
}
