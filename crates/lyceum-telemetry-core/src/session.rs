// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Session-id generation.

/// Storage key under which the session id is persisted for the lifetime of
/// a browsing session scope (one browser tab in the web client).
pub const SESSION_STORAGE_KEY: &str = "traffic_session_id";

/// Length of the random suffix appended to the timestamp.
const SUFFIX_LEN: usize = 8;

/// Generates a fresh session id of the form `{unix_millis}-{suffix}`.
///
/// The timestamp prefix keeps ids roughly sortable by session start; the
/// random suffix disambiguates sessions started in the same millisecond.
pub fn generate_session_id() -> String {
	let millis = chrono::Utc::now().timestamp_millis();
	let suffix: String = std::iter::repeat_with(fastrand::alphanumeric)
		.take(SUFFIX_LEN)
		.collect();
	format!("{millis}-{suffix}")
}
