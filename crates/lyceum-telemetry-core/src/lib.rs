// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core types for Lyceum usage telemetry.
//!
//! This crate holds the wire-level event type sent to the collector, the
//! page-classification rules, and session-id generation. It has no I/O;
//! delivery lives in `lyceum-telemetry`.

mod event;
mod page;
mod session;

pub use event::{Metadata, TrackingEvent};
pub use page::classify_page;
pub use session::{generate_session_id, SESSION_STORAGE_KEY};
