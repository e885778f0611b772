// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the telemetry SDK.

use thiserror::Error;

/// Telemetry delivery errors.
///
/// These never reach the host application: the tracker converts every
/// failure into a retry-queue entry or a log line.
#[derive(Debug, Error)]
pub enum TelemetryError {
	/// Collector base URL is missing or empty.
	#[error("invalid collector base URL")]
	InvalidBaseUrl,

	/// HTTP request failed.
	#[error("HTTP request failed: {0}")]
	RequestFailed(#[from] reqwest::Error),

	/// Collector returned something other than 204 No Content.
	#[error("collector error ({status}): {message}")]
	ServerError { status: u16, message: String },
}

/// Result type alias for telemetry operations.
pub type Result<T> = std::result::Result<T, TelemetryError>;

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_server_error_display_includes_status() {
		let err = TelemetryError::ServerError {
			status: 500,
			message: "boom".to_string(),
		};
		assert!(err.to_string().contains("500"));
		assert!(err.to_string().contains("boom"));
	}
}
