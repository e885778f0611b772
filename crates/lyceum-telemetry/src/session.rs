// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Session persistence.
//!
//! A session id lives as long as its store: the web host backs the store
//! with tab-scoped storage so a reload reuses the id, while a fresh store
//! (a new tab) yields a fresh id.

use std::collections::HashMap;
use std::sync::Mutex;

use lyceum_telemetry_core::{generate_session_id, SESSION_STORAGE_KEY};

/// Scope-persistent string storage supplied by the embedding application.
pub trait SessionStore: Send + Sync {
	/// Reads a stored value.
	fn get(&self, key: &str) -> Option<String>;

	/// Writes a value, replacing any existing one.
	fn set(&self, key: &str, value: &str);
}

/// An in-memory [`SessionStore`] for tests and headless hosts.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
	inner: Mutex<HashMap<String, String>>,
}

impl MemorySessionStore {
	/// Creates an empty store.
	pub fn new() -> Self {
		Self::default()
	}
}

impl SessionStore for MemorySessionStore {
	fn get(&self, key: &str) -> Option<String> {
		self.inner
			.lock()
			.expect("session store poisoned")
			.get(key)
			.cloned()
	}

	fn set(&self, key: &str, value: &str) {
		self.inner
			.lock()
			.expect("session store poisoned")
			.insert(key.to_string(), value.to_string());
	}
}

/// Returns the stored session id, generating and persisting one if absent.
pub fn resolve_session_id(store: &dyn SessionStore) -> String {
	if let Some(existing) = store.get(SESSION_STORAGE_KEY) {
		return existing;
	}
	let id = generate_session_id();
	store.set(SESSION_STORAGE_KEY, &id);
	id
}
