// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Bounded redelivery of events that failed the initial delivery attempt.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use lyceum_telemetry_core::TrackingEvent;

use crate::environment::Environment;
use crate::transport::Transport;

/// Maximum number of redelivery attempts before an event is dropped.
const MAX_RETRIES: u32 = 3;

/// Pause before each redelivery attempt within a drain pass, so a burst of
/// queued events does not hammer the collector.
const ATTEMPT_PAUSE: Duration = Duration::from_millis(100);

/// Backoff before the next drain pass when the queue is still non-empty.
const DRAIN_BACKOFF: Duration = Duration::from_secs(5);

/// An event awaiting redelivery, with its attempt counter.
#[derive(Debug, Clone)]
struct QueuedEvent {
	event: TrackingEvent,
	retries: u32,
}

/// In-memory buffer of events awaiting redelivery.
///
/// At most one drain task runs at a time; an enqueue during an active drain
/// is picked up by that pass or the next, never lost. Events that exhaust
/// their retries are dropped silently; telemetry loss must never affect
/// the host.
pub(crate) struct RetryQueue {
	transport: Arc<dyn Transport>,
	environment: Arc<dyn Environment>,
	queue: Mutex<Vec<QueuedEvent>>,
	draining: AtomicBool,
}

impl RetryQueue {
	pub(crate) fn new(transport: Arc<dyn Transport>, environment: Arc<dyn Environment>) -> Arc<Self> {
		Arc::new(Self {
			transport,
			environment,
			queue: Mutex::new(Vec::new()),
			draining: AtomicBool::new(false),
		})
	}

	/// Queues a failed event and ensures a drain task is running.
	pub(crate) async fn enqueue(self: &Arc<Self>, event: TrackingEvent) {
		{
			let mut queue = self.queue.lock().await;
			queue.push(QueuedEvent { event, retries: 0 });
		}
		self.spawn_drain();
	}

	/// Returns the number of events currently queued.
	pub(crate) async fn len(&self) -> usize {
		self.queue.lock().await.len()
	}

	fn spawn_drain(self: &Arc<Self>) {
		if self
			.draining
			.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
			.is_ok()
		{
			let queue = Arc::clone(self);
			tokio::spawn(async move { queue.drain().await });
		}
	}

	async fn drain(self: Arc<Self>) {
		loop {
			let batch = {
				let mut queue = self.queue.lock().await;
				std::mem::take(&mut *queue)
			};
			if batch.is_empty() {
				break;
			}
			debug!(count = batch.len(), "draining retry queue");

			for mut entry in batch {
				tokio::time::sleep(ATTEMPT_PAUSE).await;

				let identity = self.environment.bearer_token();
				match self.transport.deliver(&entry.event, identity.as_deref()).await {
					Ok(()) => {
						debug!(
							page = %entry.event.page_name,
							retries = entry.retries,
							"queued event redelivered"
						);
					}
					Err(error) => {
						entry.retries += 1;
						if entry.retries < MAX_RETRIES {
							self.queue.lock().await.push(entry);
						} else {
							warn!(
								page = %entry.event.page_name,
								retries = entry.retries,
								error = %error,
								"dropping event after exhausting retries"
							);
						}
					}
				}
			}

			if self.queue.lock().await.is_empty() {
				break;
			}
			tokio::time::sleep(DRAIN_BACKOFF).await;
		}

		self.draining.store(false, Ordering::SeqCst);
		// An enqueue may have raced the flag clear; make sure it is not
		// stranded without a drain task.
		if !self.queue.lock().await.is_empty() {
			self.spawn_drain();
		}
	}
}
