// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Capture gating: enablement, probabilistic sampling, ignored kinds, and the
//! before-send transform.

use bugtrail_core::Event;

use crate::config::AgentConfig;
use crate::reportable::Reportable;

/// Outcome of the pre-payload gates, in the order they are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
	/// No destination key configured.
	Disabled,
	/// Lost the sampling draw.
	SampledOut,
	/// The error is a configured ignored kind.
	Ignored,
	/// Build the payload.
	Capture,
}

/// Source of uniform draws in `[0, 1)`.
pub type RandomSource = fn() -> f64;

/// Decides whether an error proceeds to payload building.
#[derive(Debug, Clone)]
pub struct SamplingFilter {
	enabled: bool,
	sample_rate: f64,
	ignored: Vec<String>,
	random: RandomSource,
}

impl SamplingFilter {
	pub fn new(config: &AgentConfig) -> Self {
		Self {
			enabled: config.is_enabled(),
			sample_rate: config.sample_rate,
			ignored: config.ignored_kinds.clone(),
			random: fastrand::f64,
		}
	}

	/// Replaces the random source, e.g. with a fixed draw in tests.
	pub fn with_random(mut self, random: RandomSource) -> Self {
		self.random = random;
		self
	}

	pub fn sample_rate(&self) -> f64 {
		self.sample_rate
	}

	pub fn decide(&self, error: &dyn Reportable) -> Decision {
		if !self.enabled {
			return Decision::Disabled;
		}
		if !self.passes_sampling() {
			return Decision::SampledOut;
		}
		if self.is_ignored(error) {
			return Decision::Ignored;
		}
		Decision::Capture
	}

	fn passes_sampling(&self) -> bool {
		if self.sample_rate >= 1.0 {
			return true;
		}
		(self.random)() < self.sample_rate
	}

	fn is_ignored(&self, error: &dyn Reportable) -> bool {
		self.ignored.iter().any(|kind| error.is_a(kind))
	}
}

/// User transform applied to every built event before delivery.
///
/// Returning `None` drops the event.
pub trait BeforeSend: Send + Sync {
	fn transform(&self, event: Event, error: &dyn Reportable) -> Option<Event>;
}

impl<F> BeforeSend for F
where
	F: Fn(Event, &dyn Reportable) -> Option<Event> + Send + Sync,
{
	fn transform(&self, event: Event, error: &dyn Reportable) -> Option<Event> {
		self(event, error)
	}
}
