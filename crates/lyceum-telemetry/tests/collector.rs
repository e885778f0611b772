// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Wire-level tests against a mock collector.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use lyceum_telemetry::{StaticEnvironment, UsageTracker};

fn tracker_for(server: &MockServer, environment: StaticEnvironment) -> UsageTracker {
	UsageTracker::builder()
		.base_url(server.uri())
		.environment(Arc::new(environment))
		.build()
		.expect("tracker should build")
}

async fn wait_for_requests(server: &MockServer, count: usize) {
	for _ in 0..100 {
		let received = server.received_requests().await.unwrap_or_default();
		if received.len() >= count {
			return;
		}
		tokio::time::sleep(Duration::from_millis(50)).await;
	}
	panic!("collector never received {count} requests");
}

#[tokio::test]
async fn page_view_posts_tracking_event_json() {
	let server = MockServer::start().await;
	Mock::given(method("POST"))
		.and(path("/track"))
		.and(header("content-type", "application/json"))
		.respond_with(ResponseTemplate::new(204))
		.expect(1)
		.mount(&server)
		.await;

	let tracker = tracker_for(
		&server,
		StaticEnvironment::new("https://lyceum.test/")
			.with_referrer("https://example.org/")
			.with_screen_resolution("1920x1080"),
	);
	tracker
		.record_page_view(Some("https://lyceum.test/courses/42"))
		.await;

	let received = server.received_requests().await.unwrap();
	assert_eq!(received.len(), 1);

	let body: serde_json::Value = received[0].body_json().unwrap();
	assert_eq!(body["page_name"], "course-detail");
	assert_eq!(body["page_url"], "https://lyceum.test/courses/42");
	assert_eq!(body["session_id"], tracker.session_id());
	assert_eq!(body["referrer"], "https://example.org/");
	assert_eq!(body["screen_resolution"], "1920x1080");
	assert!(body["meta_data"]["timestamp"].is_string());
	// View events never carry dwell time.
	assert!(body.get("time_on_page").is_none());

	assert_eq!(tracker.queued_events().await, 0);
}

#[tokio::test]
async fn signed_in_identity_is_sent_as_bearer_header() {
	let server = MockServer::start().await;
	Mock::given(method("POST"))
		.and(path("/track"))
		.and(header("authorization", "Bearer student-token"))
		.respond_with(ResponseTemplate::new(204))
		.expect(1)
		.mount(&server)
		.await;

	let tracker = tracker_for(
		&server,
		StaticEnvironment::new("https://lyceum.test/").with_bearer_token("student-token"),
	);
	tracker.record_page_view(None).await;

	server.verify().await;
}

#[tokio::test]
async fn failed_page_view_is_redelivered() {
	let server = MockServer::start().await;
	Mock::given(method("POST"))
		.and(path("/track"))
		.respond_with(ResponseTemplate::new(500))
		.up_to_n_times(1)
		.mount(&server)
		.await;
	Mock::given(method("POST"))
		.and(path("/track"))
		.respond_with(ResponseTemplate::new(204))
		.mount(&server)
		.await;

	let tracker = tracker_for(&server, StaticEnvironment::new("https://lyceum.test/"));
	tracker.record_page_view(Some("https://lyceum.test/chat")).await;

	// Initial attempt plus one successful redelivery.
	wait_for_requests(&server, 2).await;
	assert_eq!(tracker.queued_events().await, 0);
}

#[tokio::test]
async fn non_204_success_status_counts_as_failure() {
	let server = MockServer::start().await;
	Mock::given(method("POST"))
		.and(path("/track"))
		.respond_with(ResponseTemplate::new(200))
		.up_to_n_times(1)
		.mount(&server)
		.await;
	Mock::given(method("POST"))
		.and(path("/track"))
		.respond_with(ResponseTemplate::new(204))
		.mount(&server)
		.await;

	let tracker = tracker_for(&server, StaticEnvironment::new("https://lyceum.test/"));
	tracker.record_page_view(Some("https://lyceum.test/chat")).await;

	// The 200 response is not the collector's success contract; the event
	// is queued and redelivered.
	wait_for_requests(&server, 2).await;
}

#[tokio::test]
async fn failed_custom_event_is_not_retried() {
	let server = MockServer::start().await;
	Mock::given(method("POST"))
		.and(path("/track"))
		.respond_with(ResponseTemplate::new(500))
		.mount(&server)
		.await;

	let tracker = tracker_for(&server, StaticEnvironment::new("https://lyceum.test/"));
	tracker
		.record_custom_event("client_error", Some(json!({"message": "boom"})))
		.await;

	tokio::time::sleep(Duration::from_millis(400)).await;
	let received = server.received_requests().await.unwrap();
	assert_eq!(received.len(), 1);
	assert_eq!(tracker.queued_events().await, 0);

	let body: serde_json::Value = received[0].body_json().unwrap();
	assert_eq!(body["meta_data"]["event_type"], "custom");
	assert_eq!(body["meta_data"]["event_name"], "client_error");
	assert_eq!(body["meta_data"]["event_data"]["message"], "boom");
}

#[tokio::test]
async fn unload_beacon_posts_exit_event_without_identity_header() {
	let server = MockServer::start().await;
	Mock::given(method("POST"))
		.and(path("/track"))
		.respond_with(ResponseTemplate::new(204))
		.mount(&server)
		.await;

	let tracker = tracker_for(
		&server,
		StaticEnvironment::new("https://lyceum.test/courses/7")
			.with_bearer_token("student-token"),
	);
	tracker.record_page_view(None).await;
	tokio::time::sleep(Duration::from_millis(1100)).await;
	tracker.page_unload().await;

	let received = server.received_requests().await.unwrap();
	assert_eq!(received.len(), 2);

	let unload = &received[1];
	// The beacon transport does not support custom headers.
	assert!(unload.headers.get("authorization").is_none());

	let body: serde_json::Value = unload.body_json().unwrap();
	assert_eq!(body["page_name"], "course-detail");
	assert_eq!(body["meta_data"]["exit_type"], "unload");
	assert!(body["time_on_page"].as_u64().unwrap() >= 1000);
}

#[tokio::test]
async fn disabled_tracker_sends_nothing() {
	let server = MockServer::start().await;
	Mock::given(method("POST"))
		.and(path("/track"))
		.respond_with(ResponseTemplate::new(204))
		.expect(0)
		.mount(&server)
		.await;

	let tracker = tracker_for(&server, StaticEnvironment::new("https://lyceum.test/"));
	tracker.set_enabled(false);

	tracker.record_page_view(Some("https://lyceum.test/chat")).await;
	tracker.record_custom_event("diag", None).await;
	tracker.page_unload().await;

	server.verify().await;
}
