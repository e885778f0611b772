// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The usage tracker: page views, dwell time, and reliable delivery.
//!
//! One tracker is constructed at application start and passed to whatever
//! needs it; it is `Clone` over a shared inner. The host wires its routing
//! layer to [`UsageTracker::record_page_view`] and its teardown and
//! visibility signals to [`UsageTracker::page_unload`],
//! [`UsageTracker::visibility_hidden`], and
//! [`UsageTracker::visibility_visible`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use lyceum_telemetry_core::{classify_page, Metadata, TrackingEvent};

use crate::environment::Environment;
use crate::error::Result;
use crate::queue::RetryQueue;
use crate::session::{resolve_session_id, MemorySessionStore, SessionStore};
use crate::transport::{BeaconTransport, HttpTransport, Transport};

/// Dwell times under this threshold are discarded as noise: double-fires
/// and accidental back/forward bounces never become exit events.
const DWELL_THRESHOLD: Duration = Duration::from_millis(1000);

/// Page name used when no page is open.
const UNKNOWN_PAGE: &str = "unknown";

/// Dwell-time state for the page currently being viewed.
///
/// `Open → Paused` on visibility loss keeps the page identity but stops the
/// clock; `Paused → Open` restarts it from zero so hidden time is never
/// counted.
#[derive(Debug, Clone)]
enum PageTimer {
	Closed,
	Open { name: String, since: Instant },
	Paused { name: String },
}

/// Builder for constructing a [`UsageTracker`].
pub struct UsageTrackerBuilder {
	base_url: Option<String>,
	environment: Option<Arc<dyn Environment>>,
	store: Option<Arc<dyn SessionStore>>,
	transport: Option<Arc<dyn Transport>>,
	beacon: Option<Arc<dyn Transport>>,
	enabled: bool,
}

impl UsageTrackerBuilder {
	/// Creates a new builder with default settings.
	pub fn new() -> Self {
		Self {
			base_url: None,
			environment: None,
			store: None,
			transport: None,
			beacon: None,
			enabled: true,
		}
	}

	/// Sets the collector base URL.
	///
	/// Example: `https://api.lyceum.example`
	pub fn base_url(mut self, url: impl Into<String>) -> Self {
		self.base_url = Some(url.into());
		self
	}

	/// Sets the host environment the tracker reads page context from.
	pub fn environment(mut self, environment: Arc<dyn Environment>) -> Self {
		self.environment = Some(environment);
		self
	}

	/// Sets the session store. Defaults to an in-memory store.
	pub fn session_store(mut self, store: Arc<dyn SessionStore>) -> Self {
		self.store = Some(store);
		self
	}

	/// Overrides the ordinary delivery transport. Intended for tests.
	pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
		self.transport = Some(transport);
		self
	}

	/// Overrides the unload-time beacon transport. Intended for tests.
	pub fn beacon(mut self, beacon: Arc<dyn Transport>) -> Self {
		self.beacon = Some(beacon);
		self
	}

	/// Opts the application in or out of tracking. Defaults to opted in;
	/// the environment's do-not-track signal still wins.
	pub fn enabled(mut self, enabled: bool) -> Self {
		self.enabled = enabled;
		self
	}

	/// Builds the tracker, resolving the session id through the store.
	pub fn build(self) -> Result<UsageTracker> {
		let environment = self
			.environment
			.unwrap_or_else(|| Arc::new(crate::environment::StaticEnvironment::unavailable()));
		let store = self
			.store
			.unwrap_or_else(|| Arc::new(MemorySessionStore::new()));

		let (transport, beacon): (Arc<dyn Transport>, Arc<dyn Transport>) =
			match (self.transport, self.beacon) {
				(Some(transport), Some(beacon)) => (transport, beacon),
				(transport, beacon) => {
					let base = self.base_url.as_deref().unwrap_or_default();
					let transport: Arc<dyn Transport> = match transport {
						Some(t) => t,
						None => Arc::new(HttpTransport::new(base)?),
					};
					let beacon: Arc<dyn Transport> = match beacon {
						Some(b) => b,
						None => Arc::new(BeaconTransport::new(base)?),
					};
					(transport, beacon)
				}
			};

		let session_id = resolve_session_id(store.as_ref());
		let queue = RetryQueue::new(Arc::clone(&transport), Arc::clone(&environment));

		let inner = Arc::new(TrackerInner {
			environment,
			session_id: session_id.clone(),
			transport,
			beacon,
			queue,
			timer: Mutex::new(PageTimer::Closed),
			opted_in: AtomicBool::new(self.enabled),
			enabled: AtomicBool::new(false),
		});
		inner.recompute_enabled();

		info!(
			session_id = %session_id,
			enabled = inner.enabled.load(Ordering::SeqCst),
			"usage tracker initialized"
		);

		Ok(UsageTracker { inner })
	}
}

impl Default for UsageTrackerBuilder {
	fn default() -> Self {
		Self::new()
	}
}

struct TrackerInner {
	environment: Arc<dyn Environment>,
	session_id: String,
	transport: Arc<dyn Transport>,
	beacon: Arc<dyn Transport>,
	queue: Arc<RetryQueue>,
	timer: Mutex<PageTimer>,
	opted_in: AtomicBool,
	enabled: AtomicBool,
}

impl TrackerInner {
	/// Re-derives effective enablement from the opt-in flag and the host
	/// environment. Called at construction and on every explicit toggle.
	fn recompute_enabled(&self) {
		let effective = self.opted_in.load(Ordering::SeqCst)
			&& self.environment.is_available()
			&& self.environment.do_not_track().as_deref() != Some("1");
		self.enabled.store(effective, Ordering::SeqCst);
	}
}

/// Tracks page views and dwell time and delivers events to the collector.
///
/// Every public operation is a silent no-op when tracking is disabled, and
/// no operation ever surfaces an error to the host: failed deliveries are
/// queued for bounded retry (page events) or dropped (custom events).
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use lyceum_telemetry::{StaticEnvironment, UsageTracker};
///
/// let tracker = UsageTracker::builder()
///     .base_url("https://api.lyceum.example")
///     .environment(Arc::new(StaticEnvironment::new("https://lyceum.example/")))
///     .build()?;
///
/// tracker.record_page_view(Some("https://lyceum.example/courses/42")).await;
/// tracker.record_custom_event("chat_opened", None).await;
/// ```
#[derive(Clone)]
pub struct UsageTracker {
	inner: Arc<TrackerInner>,
}

impl UsageTracker {
	/// Creates a new builder for constructing a tracker.
	pub fn builder() -> UsageTrackerBuilder {
		UsageTrackerBuilder::new()
	}

	/// The session id correlating all events from this tracker.
	pub fn session_id(&self) -> &str {
		&self.inner.session_id
	}

	/// Whether tracking is currently effective.
	pub fn is_enabled(&self) -> bool {
		self.inner.enabled.load(Ordering::SeqCst)
	}

	/// Opts tracking in or out. The environment's do-not-track signal and
	/// availability are re-checked on every toggle.
	pub fn set_enabled(&self, enabled: bool) {
		self.inner.opted_in.store(enabled, Ordering::SeqCst);
		self.inner.recompute_enabled();
		debug!(enabled = self.is_enabled(), "tracking enablement updated");
	}

	/// Number of events currently awaiting redelivery.
	pub async fn queued_events(&self) -> usize {
		self.inner.queue.len().await
	}

	/// Records a page view, closing out any previously open page first.
	///
	/// When `url` is `None` the environment's current location is used. The
	/// exit event for the outgoing page is dispatched before the view event
	/// for the incoming page is built, so dwell time is attributed to the
	/// page being left.
	pub async fn record_page_view(&self, url: Option<&str>) {
		if !self.is_enabled() {
			return;
		}
		let Some(page_url) = url
			.map(str::to_string)
			.or_else(|| self.inner.environment.current_url())
		else {
			return;
		};

		let exiting = self.close_open_page().await;
		if let Some((name, elapsed)) = exiting {
			self.record_page_exit(&name, elapsed).await;
		}

		let page_name = classify_page(&page_url);
		{
			let mut timer = self.inner.timer.lock().await;
			*timer = PageTimer::Open {
				name: page_name.clone(),
				since: Instant::now(),
			};
		}

		let environment = &self.inner.environment;
		let mut event = TrackingEvent::new(page_name, page_url, self.inner.session_id.clone())
			.with_metadata(self.view_metadata());
		if let Some(referrer) = environment.referrer() {
			event = event.with_referrer(referrer);
		}
		if let Some(resolution) = environment.screen_resolution() {
			event = event.with_screen_resolution(resolution);
		}

		self.deliver_or_queue(event).await;
	}

	/// Records a best-effort custom event against the currently open page.
	///
	/// Custom events are diagnostic; unlike page events they are never
	/// queued for retry when delivery fails.
	pub async fn record_custom_event(&self, name: &str, data: Option<serde_json::Value>) {
		if !self.is_enabled() {
			return;
		}

		let page_name = {
			let timer = self.inner.timer.lock().await;
			match &*timer {
				PageTimer::Open { name, .. } | PageTimer::Paused { name } => name.clone(),
				PageTimer::Closed => UNKNOWN_PAGE.to_string(),
			}
		};

		let mut metadata = Metadata::new()
			.insert("event_type", "custom")
			.insert("event_name", name)
			.insert("timestamp", Utc::now().to_rfc3339());
		if let Some(data) = data {
			metadata = metadata.insert("event_data", data);
		}

		let page_url = self.inner.environment.current_url().unwrap_or_default();
		let event = TrackingEvent::new(page_name, page_url, self.inner.session_id.clone())
			.with_metadata(metadata);

		if let Err(error) = self.deliver(&event).await {
			debug!(event_name = name, error = %error, "custom event delivery failed");
		}
	}

	/// Treats loss of visibility as a page exit for dwell purposes.
	///
	/// The page stays logically open and only the clock stops, so a later
	/// return to visibility resumes dwell accrual from zero.
	pub async fn visibility_hidden(&self) {
		if !self.is_enabled() {
			return;
		}
		let exiting = {
			let mut timer = self.inner.timer.lock().await;
			if let PageTimer::Open { name, since } = &*timer {
				let out = (name.clone(), since.elapsed());
				*timer = PageTimer::Paused { name: name.clone() };
				Some(out)
			} else {
				None
			}
		};
		if let Some((name, elapsed)) = exiting {
			self.record_page_exit(&name, elapsed).await;
		}
	}

	/// Restarts dwell accrual after the page becomes visible again.
	pub async fn visibility_visible(&self) {
		if !self.is_enabled() {
			return;
		}
		let mut timer = self.inner.timer.lock().await;
		match &*timer {
			PageTimer::Paused { name } | PageTimer::Open { name, .. } => {
				*timer = PageTimer::Open {
					name: name.clone(),
					since: Instant::now(),
				};
			}
			PageTimer::Closed => {}
		}
	}

	/// Sends a final page-exit event through the durable beacon transport.
	///
	/// Called by the host as the page is being torn down. Ordinary requests
	/// are not guaranteed to complete once teardown starts, so this bypasses
	/// the retry queue entirely; the outcome is ignored.
	pub async fn page_unload(&self) {
		if !self.is_enabled() {
			return;
		}
		let Some((name, elapsed)) = self.close_open_page().await else {
			return;
		};
		if elapsed < DWELL_THRESHOLD {
			return;
		}

		let page_url = self.inner.environment.current_url().unwrap_or_default();
		let event = TrackingEvent::new(name, page_url, self.inner.session_id.clone())
			.with_time_on_page(elapsed.as_millis() as u64)
			.with_metadata(
				Metadata::new()
					.insert("exit_type", "unload")
					.insert("timestamp", Utc::now().to_rfc3339()),
			);

		if let Err(error) = self.inner.beacon.deliver(&event, None).await {
			debug!(error = %error, "unload beacon failed");
		}
	}

	/// Takes the open page out of the timer, returning its name and dwell.
	async fn close_open_page(&self) -> Option<(String, Duration)> {
		let mut timer = self.inner.timer.lock().await;
		if let PageTimer::Open { name, since } = &*timer {
			let out = (name.clone(), since.elapsed());
			*timer = PageTimer::Closed;
			Some(out)
		} else {
			None
		}
	}

	/// Builds and delivers the exit event for a page, applying the dwell
	/// suppression threshold.
	async fn record_page_exit(&self, page_name: &str, elapsed: Duration) {
		if elapsed < DWELL_THRESHOLD {
			debug!(
				page = page_name,
				elapsed_ms = elapsed.as_millis() as u64,
				"suppressing sub-threshold dwell"
			);
			return;
		}

		let metadata = Metadata::new().insert("timestamp", Utc::now().to_rfc3339());
		let page_url = self.inner.environment.current_url().unwrap_or_default();
		let event = TrackingEvent::new(page_name, page_url, self.inner.session_id.clone())
			.with_time_on_page(elapsed.as_millis() as u64)
			.with_metadata(metadata);

		self.deliver_or_queue(event).await;
	}

	/// Metadata bundle attached to page-view events.
	fn view_metadata(&self) -> Metadata {
		let environment = &self.inner.environment;
		let mut metadata = Metadata::new().insert("timestamp", Utc::now().to_rfc3339());
		if let Some(user_agent) = environment.user_agent() {
			metadata = metadata.insert("user_agent", user_agent);
		}
		if let Some(language) = environment.language() {
			metadata = metadata.insert("language", language);
		}
		if let Some(timezone) = environment.timezone() {
			metadata = metadata.insert("timezone", timezone);
		}
		if let Some(viewport) = environment.viewport() {
			metadata = metadata.insert("viewport", viewport);
		}
		metadata
	}

	async fn deliver(&self, event: &TrackingEvent) -> Result<()> {
		let identity = self.inner.environment.bearer_token();
		self.inner.transport.deliver(event, identity.as_deref()).await
	}

	/// Delivers a page event, falling back to the retry queue on failure.
	async fn deliver_or_queue(&self, event: TrackingEvent) {
		if let Err(error) = self.deliver(&event).await {
			warn!(
				page = %event.page_name,
				error = %error,
				"delivery failed, queueing for retry"
			);
			self.inner.queue.enqueue(event).await;
		}
	}
}
