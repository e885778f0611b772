// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The tracking event sent to the collector, and its metadata builder.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single usage-telemetry event.
///
/// This is the JSON body of `POST {collector}/track`. Optional fields are
/// omitted from the payload entirely when absent. `time_on_page` is only
/// present on page-exit events, never on page-view events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingEvent {
	pub page_name: String,
	pub page_url: String,
	pub session_id: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub referrer: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub screen_resolution: Option<String>,
	/// Milliseconds spent on the page being left.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub time_on_page: Option<u64>,
	#[serde(default, skip_serializing_if = "Map::is_empty")]
	pub meta_data: Map<String, Value>,
}

impl TrackingEvent {
	/// Creates an event with the required fields and nothing else.
	pub fn new(
		page_name: impl Into<String>,
		page_url: impl Into<String>,
		session_id: impl Into<String>,
	) -> Self {
		Self {
			page_name: page_name.into(),
			page_url: page_url.into(),
			session_id: session_id.into(),
			referrer: None,
			screen_resolution: None,
			time_on_page: None,
			meta_data: Map::new(),
		}
	}

	/// Sets the referring URL (builder pattern).
	pub fn with_referrer(mut self, referrer: impl Into<String>) -> Self {
		self.referrer = Some(referrer.into());
		self
	}

	/// Sets the screen resolution as `{width}x{height}` (builder pattern).
	pub fn with_screen_resolution(mut self, resolution: impl Into<String>) -> Self {
		self.screen_resolution = Some(resolution.into());
		self
	}

	/// Sets the dwell time in milliseconds (builder pattern).
	pub fn with_time_on_page(mut self, millis: u64) -> Self {
		self.time_on_page = Some(millis);
		self
	}

	/// Sets the free-form metadata map (builder pattern).
	pub fn with_metadata(mut self, metadata: Metadata) -> Self {
		self.meta_data = metadata.into_map();
		self
	}
}

/// A builder for the free-form `meta_data` map on a [`TrackingEvent`].
///
/// # Example
///
/// ```
/// use lyceum_telemetry_core::Metadata;
///
/// let meta = Metadata::new()
///     .insert("event_type", "custom")
///     .insert("event_name", "chat_opened");
/// ```
#[derive(Debug, Clone, Default)]
pub struct Metadata {
	inner: Map<String, Value>,
}

impl Metadata {
	/// Creates a new empty metadata builder.
	pub fn new() -> Self {
		Self { inner: Map::new() }
	}

	/// Inserts a key-value pair.
	///
	/// The value can be any type that implements `Into<serde_json::Value>`,
	/// including strings, numbers, booleans, arrays, and nested objects.
	pub fn insert<K, V>(mut self, key: K, value: V) -> Self
	where
		K: Into<String>,
		V: Into<Value>,
	{
		self.inner.insert(key.into(), value.into());
		self
	}

	/// Merges another metadata map into this one.
	///
	/// If both contain the same key, the value from `other` takes precedence.
	pub fn merge(mut self, other: Metadata) -> Self {
		for (k, v) in other.inner {
			self.inner.insert(k, v);
		}
		self
	}

	/// Returns true if no keys have been set.
	pub fn is_empty(&self) -> bool {
		self.inner.is_empty()
	}

	/// Returns the number of keys.
	pub fn len(&self) -> usize {
		self.inner.len()
	}

	/// Gets a value by key.
	pub fn get(&self, key: &str) -> Option<&Value> {
		self.inner.get(key)
	}

	/// Converts the builder into the underlying map.
	pub fn into_map(self) -> Map<String, Value> {
		self.inner
	}
}

impl From<Metadata> for Value {
	fn from(metadata: Metadata) -> Self {
		Value::Object(metadata.inner)
	}
}

impl From<Map<String, Value>> for Metadata {
	fn from(map: Map<String, Value>) -> Self {
		Self { inner: map }
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	#[test]
	fn test_minimal_event_omits_optional_fields() {
		let event = TrackingEvent::new("home", "https://lyceum.test/", "123-abc");
		let json = serde_json::to_value(&event).unwrap();

		assert_eq!(json["page_name"], "home");
		assert_eq!(json["page_url"], "https://lyceum.test/");
		assert_eq!(json["session_id"], "123-abc");
		assert!(json.get("referrer").is_none());
		assert!(json.get("screen_resolution").is_none());
		assert!(json.get("time_on_page").is_none());
		assert!(json.get("meta_data").is_none());
	}

	#[test]
	fn test_full_event_serializes_all_fields() {
		let event = TrackingEvent::new("course-detail", "https://lyceum.test/courses/42", "s1")
			.with_referrer("https://lyceum.test/")
			.with_screen_resolution("1920x1080")
			.with_time_on_page(2000)
			.with_metadata(Metadata::new().insert("timestamp", "2025-01-01T00:00:00Z"));

		let json = serde_json::to_value(&event).unwrap();
		assert_eq!(json["referrer"], "https://lyceum.test/");
		assert_eq!(json["screen_resolution"], "1920x1080");
		assert_eq!(json["time_on_page"], 2000);
		assert_eq!(json["meta_data"]["timestamp"], "2025-01-01T00:00:00Z");
	}

	#[test]
	fn test_event_deserializes_without_optional_fields() {
		let event: TrackingEvent = serde_json::from_str(
			r#"{"page_name":"home","page_url":"https://x/","session_id":"s"}"#,
		)
		.unwrap();

		assert_eq!(event.page_name, "home");
		assert!(event.referrer.is_none());
		assert!(event.meta_data.is_empty());
	}

	#[test]
	fn test_metadata_insert_and_get() {
		let meta = Metadata::new()
			.insert("event_type", "custom")
			.insert("count", 3)
			.insert("flag", true);

		assert_eq!(meta.len(), 3);
		assert_eq!(meta.get("event_type"), Some(&Value::String("custom".into())));
		assert_eq!(meta.get("count"), Some(&Value::Number(3.into())));
		assert_eq!(meta.get("flag"), Some(&Value::Bool(true)));
	}

	#[test]
	fn test_metadata_merge_other_wins() {
		let base = Metadata::new().insert("a", 1).insert("b", 2);
		let other = Metadata::new().insert("b", 20).insert("c", 3);

		let merged = base.merge(other);
		assert_eq!(merged.len(), 3);
		assert_eq!(merged.get("b"), Some(&Value::Number(20.into())));
	}

	#[test]
	fn test_metadata_new_is_empty() {
		assert!(Metadata::new().is_empty());
	}

	proptest! {
		#[test]
		fn metadata_len_matches_unique_insertions(keys in proptest::collection::vec("[a-z]{1,10}", 0..20)) {
			let unique: std::collections::HashSet<_> = keys.iter().cloned().collect();
			let mut meta = Metadata::new();
			for key in &keys {
				meta = meta.insert(key.clone(), "v");
			}
			prop_assert_eq!(meta.len(), unique.len());
		}

		#[test]
		fn event_roundtrips_through_json(dwell in proptest::option::of(0u64..1_000_000)) {
			let mut event = TrackingEvent::new("page", "https://x/p", "s");
			if let Some(d) = dwell {
				event = event.with_time_on_page(d);
			}
			let json = serde_json::to_string(&event).unwrap();
			let back: TrackingEvent = serde_json::from_str(&json).unwrap();
			prop_assert_eq!(back.time_on_page, dwell);
		}
	}
}
