// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Buffered, debounced delivery of page events.
//!
//! Events queue up until the flush timer fires, then go out at most
//! [`MAX_BATCH_EVENTS`] per request. A single event is posted to `/store`,
//! anything else to `/batch`. Nothing is retried.

use std::collections::VecDeque;
use std::time::Duration;

use tracing::{debug, trace};

use bugtrail_core::{BatchEnvelope, BrowserConfig, Event, KEY_HEADER, MAX_BATCH_EVENTS};

use crate::error::Result;

/// Flush scheduling state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushState {
	/// Nothing queued, no timer armed.
	Idle,
	/// Timer armed.
	Pending,
	/// Draining the queue.
	Flushing,
}

/// The page's one-shot timer; firing must call
/// [`BrowserTransport::on_timer_fired`].
pub trait FlushTimer {
	/// Arms the timer, replacing any armed one.
	fn arm(&self, delay: Duration);
	fn cancel(&self);
}

/// The page's fire-and-forget delivery primitives.
pub trait PageNetwork {
	fn beacon_supported(&self) -> bool;

	/// Queues a beacon; `false` when the user agent refused it.
	fn send_beacon(&self, url: &str, body: &str) -> bool;

	/// A keep-alive POST whose response is never awaited.
	fn post_keepalive(&self, url: &str, headers: &[(&str, &str)], body: &str) -> Result<()>;
}

pub struct BrowserTransport<N, T> {
	url: String,
	key: String,
	interval: Duration,
	queue: VecDeque<Event>,
	state: FlushState,
	network: N,
	timer: T,
}

impl<N: PageNetwork, T: FlushTimer> BrowserTransport<N, T> {
	pub fn new(config: &BrowserConfig, network: N, timer: T) -> Self {
		Self {
			url: config.url.trim_end_matches('/').to_string(),
			key: config.dsn.clone(),
			interval: Duration::from_millis(config.batch_interval),
			queue: VecDeque::new(),
			state: FlushState::Idle,
			network,
			timer,
		}
	}

	pub fn state(&self) -> FlushState {
		self.state
	}

	pub fn pending(&self) -> usize {
		self.queue.len()
	}

	pub fn network(&self) -> &N {
		&self.network
	}

	pub fn timer(&self) -> &T {
		&self.timer
	}

	pub fn enqueue(&mut self, event: Event) {
		self.queue.push_back(event);
		self.schedule(self.interval);
	}

	/// Flushes one batch; a spurious firing with nothing pending is ignored.
	pub fn on_timer_fired(&mut self) {
		if self.state != FlushState::Pending {
			trace!(state = ?self.state, "ignoring flush timer");
			return;
		}
		self.flush();
	}

	/// Sends everything now, e.g. when the page is hidden or unloading.
	pub fn force_flush(&mut self) {
		if self.state == FlushState::Pending {
			self.timer.cancel();
		}
		self.state = FlushState::Flushing;
		while !self.queue.is_empty() {
			self.send_next_batch();
		}
		self.state = FlushState::Idle;
	}

	fn schedule(&mut self, delay: Duration) {
		if self.state != FlushState::Idle {
			return;
		}
		self.state = FlushState::Pending;
		self.timer.arm(delay);
	}

	fn flush(&mut self) {
		self.state = FlushState::Flushing;
		self.send_next_batch();
		self.state = FlushState::Idle;
		if !self.queue.is_empty() {
			self.schedule(Duration::ZERO);
		}
	}

	fn send_next_batch(&mut self) {
		let count = self.queue.len().min(MAX_BATCH_EVENTS);
		let mut events: Vec<Event> = self.queue.drain(..count).collect();

		let encoded = match events.len() {
			0 => return,
			1 => events
				.pop()
				.map(|event| (format!("{}/store", self.url), serde_json::to_string(&event))),
			_ => Some((
				format!("{}/batch", self.url),
				serde_json::to_string(&BatchEnvelope { events }),
			)),
		};

		match encoded {
			Some((url, Ok(body))) => {
				debug!(count, "flushing page events");
				self.deliver(&url, &body);
			}
			Some((_, Err(e))) => debug!(error = %e, count, "failed to encode page events"),
			None => {}
		}
	}

	fn deliver(&self, url: &str, body: &str) {
		if self.network.beacon_supported() && self.network.send_beacon(url, body) {
			return;
		}

		let headers = [("Content-Type", "application/json"), (KEY_HEADER, self.key.as_str())];
		if let Err(e) = self.network.post_keepalive(url, &headers, body) {
			debug!(error = %e, "page event delivery failed");
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::BrowserError;
	use crate::testing::{browser_config, sample_event};
	use std::cell::{Cell, RefCell};

	#[derive(Default)]
	struct RecordingNetwork {
		beacon: bool,
		refuse_beacon: bool,
		fail_post: bool,
		beacons: RefCell<Vec<(String, String)>>,
		posts: RefCell<Vec<(String, Vec<(String, String)>, String)>>,
	}

	impl RecordingNetwork {
		fn with_beacon() -> Self {
			Self {
				beacon: true,
				..Default::default()
			}
		}

		fn post_urls(&self) -> Vec<String> {
			self.posts.borrow().iter().map(|(url, _, _)| url.clone()).collect()
		}

		fn posted_body(&self, idx: usize) -> serde_json::Value {
			serde_json::from_str(&self.posts.borrow()[idx].2).unwrap()
		}
	}

	impl PageNetwork for RecordingNetwork {
		fn beacon_supported(&self) -> bool {
			self.beacon
		}

		fn send_beacon(&self, url: &str, body: &str) -> bool {
			if self.refuse_beacon {
				return false;
			}
			self.beacons.borrow_mut().push((url.to_string(), body.to_string()));
			true
		}

		fn post_keepalive(&self, url: &str, headers: &[(&str, &str)], body: &str) -> Result<()> {
			if self.fail_post {
				return Err(BrowserError::Network("offline".to_string()));
			}
			self.posts.borrow_mut().push((
				url.to_string(),
				headers.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
				body.to_string(),
			));
			Ok(())
		}
	}

	#[derive(Default)]
	struct RecordingTimer {
		armed: RefCell<Vec<Duration>>,
		cancels: Cell<usize>,
	}

	impl FlushTimer for RecordingTimer {
		fn arm(&self, delay: Duration) {
			self.armed.borrow_mut().push(delay);
		}

		fn cancel(&self) {
			self.cancels.set(self.cancels.get() + 1);
		}
	}

	fn transport(network: RecordingNetwork) -> BrowserTransport<RecordingNetwork, RecordingTimer> {
		BrowserTransport::new(&browser_config(), network, RecordingTimer::default())
	}

	#[test]
	fn enqueue_arms_timer_once() {
		let mut transport = transport(RecordingNetwork::default());

		transport.enqueue(sample_event("a"));
		transport.enqueue(sample_event("b"));
		transport.enqueue(sample_event("c"));

		assert_eq!(transport.state(), FlushState::Pending);
		assert_eq!(*transport.timer().armed.borrow(), vec![Duration::from_millis(5000)]);
		assert!(transport.network().posts.borrow().is_empty());
	}

	#[test]
	fn single_event_goes_to_store() {
		let mut transport = transport(RecordingNetwork::default());
		transport.enqueue(sample_event("only"));
		transport.on_timer_fired();

		let network = transport.network();
		assert_eq!(network.post_urls(), vec!["https://ingest.test/api/bug-tracking/key_1/store"]);
		assert_eq!(network.posted_body(0)["message"], "only");
		assert_eq!(transport.state(), FlushState::Idle);
	}

	#[test]
	fn fallback_post_carries_key_and_content_type() {
		let mut transport = transport(RecordingNetwork::default());
		transport.enqueue(sample_event("x"));
		transport.on_timer_fired();

		let posts = transport.network().posts.borrow();
		let headers = &posts[0].1;
		assert!(headers.contains(&("Content-Type".to_string(), "application/json".to_string())));
		assert!(headers.contains(&(KEY_HEADER.to_string(), "key_1".to_string())));
	}

	#[test]
	fn thirty_events_flush_as_twenty_five_then_five() {
		let mut transport = transport(RecordingNetwork::default());
		for i in 0..30 {
			transport.enqueue(sample_event(&format!("e{i}")));
		}

		transport.on_timer_fired();
		assert_eq!(transport.pending(), 5);
		assert_eq!(transport.state(), FlushState::Pending);
		assert_eq!(
			*transport.timer().armed.borrow(),
			vec![Duration::from_millis(5000), Duration::ZERO]
		);

		transport.on_timer_fired();
		assert_eq!(transport.pending(), 0);
		assert_eq!(transport.state(), FlushState::Idle);

		let network = transport.network();
		let urls = network.post_urls();
		assert_eq!(urls.len(), 2);
		assert!(urls.iter().all(|u| u.ends_with("/batch")));

		let first = network.posted_body(0);
		let second = network.posted_body(1);
		assert_eq!(first["events"].as_array().unwrap().len(), 25);
		assert_eq!(second["events"].as_array().unwrap().len(), 5);
		assert_eq!(first["events"][0]["message"], "e0");
		assert_eq!(second["events"][4]["message"], "e29");
	}

	#[test]
	fn beacon_is_preferred() {
		let mut transport = transport(RecordingNetwork::with_beacon());
		transport.enqueue(sample_event("x"));
		transport.enqueue(sample_event("y"));
		transport.on_timer_fired();

		let network = transport.network();
		assert!(network.posts.borrow().is_empty());
		let beacons = network.beacons.borrow();
		assert_eq!(beacons.len(), 1);
		assert!(beacons[0].0.ends_with("/batch"));
	}

	#[test]
	fn refused_beacon_falls_back_to_post() {
		let mut transport = transport(RecordingNetwork {
			beacon: true,
			refuse_beacon: true,
			..Default::default()
		});
		transport.enqueue(sample_event("x"));
		transport.on_timer_fired();

		assert_eq!(transport.network().posts.borrow().len(), 1);
	}

	#[test]
	fn delivery_errors_are_swallowed() {
		let mut transport = transport(RecordingNetwork {
			fail_post: true,
			..Default::default()
		});
		transport.enqueue(sample_event("x"));
		transport.on_timer_fired();

		assert_eq!(transport.pending(), 0);
		assert_eq!(transport.state(), FlushState::Idle);
	}

	#[test]
	fn forced_flush_cancels_timer_and_drains_everything() {
		let mut transport = transport(RecordingNetwork::default());
		for i in 0..30 {
			transport.enqueue(sample_event(&format!("e{i}")));
		}

		transport.force_flush();

		assert_eq!(transport.timer().cancels.get(), 1);
		assert_eq!(transport.pending(), 0);
		assert_eq!(transport.state(), FlushState::Idle);
		assert_eq!(transport.network().posts.borrow().len(), 2);

		transport.on_timer_fired();
		assert_eq!(transport.network().posts.borrow().len(), 2);
	}

	#[test]
	fn forced_flush_on_empty_queue_sends_nothing() {
		let mut transport = transport(RecordingNetwork::default());
		transport.force_flush();

		assert_eq!(transport.timer().cancels.get(), 0);
		assert!(transport.network().posts.borrow().is_empty());
	}

	#[test]
	fn enqueue_after_flush_rearms_with_interval() {
		let mut transport = transport(RecordingNetwork::default());
		transport.enqueue(sample_event("a"));
		transport.on_timer_fired();
		transport.enqueue(sample_event("b"));

		assert_eq!(
			*transport.timer().armed.borrow(),
			vec![Duration::from_millis(5000), Duration::from_millis(5000)]
		);
	}
}
