// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Usage-telemetry SDK for Lyceum clients.
//!
//! Tracks page views and dwell time and delivers events to the collector's
//! `/track` endpoint with bounded retry. Delivery failures never reach the
//! host application: page events are queued for redelivery (at most three
//! attempts, then dropped), custom events are best-effort, and a final exit
//! event at page teardown goes through a durable beacon-style transport.
//!
//! The tracker is an explicitly constructed service, not a global:
//!
//! ```ignore
//! use std::sync::Arc;
//! use lyceum_telemetry::{StaticEnvironment, UsageTracker};
//!
//! let tracker = UsageTracker::builder()
//!     .base_url("https://api.lyceum.example")
//!     .environment(Arc::new(StaticEnvironment::new("https://lyceum.example/")))
//!     .build()?;
//!
//! tracker.record_page_view(None).await;
//! ```

mod environment;
mod error;
mod queue;
mod session;
mod tracker;
mod transport;

pub use environment::{Environment, StaticEnvironment};
pub use error::{Result, TelemetryError};
pub use session::{resolve_session_id, MemorySessionStore, SessionStore};
pub use tracker::{UsageTracker, UsageTrackerBuilder};
pub use transport::{BeaconTransport, HttpTransport, Transport};

pub use lyceum_telemetry_core::{classify_page, Metadata, TrackingEvent, SESSION_STORAGE_KEY};
