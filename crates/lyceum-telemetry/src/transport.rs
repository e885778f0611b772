// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Event delivery transports.
//!
//! Two implementations of one seam: [`HttpTransport`] is the ordinary
//! asynchronous path with identity headers and strict success checking;
//! [`BeaconTransport`] is the durable best-effort path used at page unload,
//! which carries no custom headers and ignores the collector's response.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::debug;

use lyceum_telemetry_core::TrackingEvent;

use crate::error::{Result, TelemetryError};

/// Collector route events are posted to.
const TRACK_PATH: &str = "/track";

/// Timeout for the unload-time beacon client. Teardown does not wait long.
const BEACON_TIMEOUT: Duration = Duration::from_secs(5);

/// A single delivery attempt of one event to the collector.
#[async_trait]
pub trait Transport: Send + Sync {
	/// Delivers one event, attaching the identity as a bearer credential
	/// where the transport supports it.
	async fn deliver(&self, event: &TrackingEvent, identity: Option<&str>) -> Result<()>;
}

fn track_endpoint(base_url: &str) -> Result<String> {
	let base = base_url.trim_end_matches('/');
	if base.is_empty() {
		return Err(TelemetryError::InvalidBaseUrl);
	}
	Ok(format!("{base}{TRACK_PATH}"))
}

/// The ordinary asynchronous delivery path.
///
/// Success is exactly `204 No Content`; any other status or transport
/// failure counts as a delivery failure and is the caller's cue to queue
/// the event for retry.
pub struct HttpTransport {
	client: Client,
	endpoint: String,
}

impl HttpTransport {
	/// Creates a transport posting to `{base_url}/track`.
	pub fn new(base_url: &str) -> Result<Self> {
		Ok(Self {
			client: lyceum_common_http::new_client(),
			endpoint: track_endpoint(base_url)?,
		})
	}
}

#[async_trait]
impl Transport for HttpTransport {
	async fn deliver(&self, event: &TrackingEvent, identity: Option<&str>) -> Result<()> {
		let mut request = self.client.post(&self.endpoint).json(event);
		if let Some(token) = identity {
			request = request.bearer_auth(token);
		}

		let response = request.send().await?;
		match response.status() {
			StatusCode::NO_CONTENT => {
				debug!(page = %event.page_name, "event delivered");
				Ok(())
			}
			status => {
				let message = response.text().await.unwrap_or_default();
				Err(TelemetryError::ServerError {
					status: status.as_u16(),
					message,
				})
			}
		}
	}
}

/// The durable best-effort path used while the page is being torn down.
///
/// Beacon-style delivery supports no custom headers and no response
/// handling: the identity is ignored and any response status counts as
/// dispatched. Only a failure to dispatch at all surfaces, and the unload
/// path ignores even that.
pub struct BeaconTransport {
	client: Client,
	endpoint: String,
}

impl BeaconTransport {
	/// Creates a beacon transport posting to `{base_url}/track`.
	pub fn new(base_url: &str) -> Result<Self> {
		Ok(Self {
			client: lyceum_common_http::new_client_with_timeout(BEACON_TIMEOUT),
			endpoint: track_endpoint(base_url)?,
		})
	}
}

#[async_trait]
impl Transport for BeaconTransport {
	async fn deliver(&self, event: &TrackingEvent, _identity: Option<&str>) -> Result<()> {
		let response = self.client.post(&self.endpoint).json(event).send().await?;
		debug!(
			page = %event.page_name,
			status = response.status().as_u16(),
			"beacon dispatched"
		);
		Ok(())
	}
}
