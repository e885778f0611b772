// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The host environment seam.
//!
//! The tracker reads everything it knows about the page context through
//! [`Environment`], so the embedding application decides what is exposed and
//! tests substitute a fixed environment.

/// Ambient reads supplied by the embedding application.
///
/// Only availability and the current URL are required; the optional reads
/// default to `None` and are simply omitted from event payloads.
pub trait Environment: Send + Sync {
	/// Whether a page context exists at all. When this is false every
	/// tracker operation is a no-op.
	fn is_available(&self) -> bool;

	/// The current absolute page URL.
	fn current_url(&self) -> Option<String>;

	/// The referring URL, if any.
	fn referrer(&self) -> Option<String> {
		None
	}

	/// Screen resolution as `{width}x{height}`.
	fn screen_resolution(&self) -> Option<String> {
		None
	}

	/// Viewport dimensions as `{width}x{height}`.
	fn viewport(&self) -> Option<String> {
		None
	}

	/// The user-agent string of the host.
	fn user_agent(&self) -> Option<String> {
		None
	}

	/// BCP 47 language tag of the host.
	fn language(&self) -> Option<String> {
		None
	}

	/// IANA timezone name of the host.
	fn timezone(&self) -> Option<String> {
		None
	}

	/// The host's do-not-track signal. Tracking is disabled when this is
	/// the string `"1"`.
	fn do_not_track(&self) -> Option<String> {
		None
	}

	/// Bearer token for the currently signed-in user, if any. Attached as
	/// an `Authorization` header on ordinary deliveries.
	fn bearer_token(&self) -> Option<String> {
		None
	}
}

/// An [`Environment`] with fixed values.
///
/// Suitable for headless hosts where the page context does not change, and
/// as a test double.
#[derive(Debug, Clone, Default)]
pub struct StaticEnvironment {
	available: bool,
	current_url: Option<String>,
	referrer: Option<String>,
	screen_resolution: Option<String>,
	viewport: Option<String>,
	user_agent: Option<String>,
	language: Option<String>,
	timezone: Option<String>,
	do_not_track: Option<String>,
	bearer_token: Option<String>,
}

impl StaticEnvironment {
	/// Creates an available environment at the given URL.
	pub fn new(current_url: impl Into<String>) -> Self {
		Self {
			available: true,
			current_url: Some(current_url.into()),
			..Self::default()
		}
	}

	/// Creates an unavailable environment (no page context).
	pub fn unavailable() -> Self {
		Self::default()
	}

	/// Sets the referring URL (builder pattern).
	pub fn with_referrer(mut self, referrer: impl Into<String>) -> Self {
		self.referrer = Some(referrer.into());
		self
	}

	/// Sets the screen resolution (builder pattern).
	pub fn with_screen_resolution(mut self, resolution: impl Into<String>) -> Self {
		self.screen_resolution = Some(resolution.into());
		self
	}

	/// Sets the viewport dimensions (builder pattern).
	pub fn with_viewport(mut self, viewport: impl Into<String>) -> Self {
		self.viewport = Some(viewport.into());
		self
	}

	/// Sets the user-agent string (builder pattern).
	pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
		self.user_agent = Some(user_agent.into());
		self
	}

	/// Sets the language tag (builder pattern).
	pub fn with_language(mut self, language: impl Into<String>) -> Self {
		self.language = Some(language.into());
		self
	}

	/// Sets the IANA timezone (builder pattern).
	pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
		self.timezone = Some(timezone.into());
		self
	}

	/// Sets the do-not-track signal (builder pattern).
	pub fn with_do_not_track(mut self, value: impl Into<String>) -> Self {
		self.do_not_track = Some(value.into());
		self
	}

	/// Sets the bearer token for the signed-in user (builder pattern).
	pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
		self.bearer_token = Some(token.into());
		self
	}
}

impl Environment for StaticEnvironment {
	fn is_available(&self) -> bool {
		self.available
	}

	fn current_url(&self) -> Option<String> {
		self.current_url.clone()
	}

	fn referrer(&self) -> Option<String> {
		self.referrer.clone()
	}

	fn screen_resolution(&self) -> Option<String> {
		self.screen_resolution.clone()
	}

	fn viewport(&self) -> Option<String> {
		self.viewport.clone()
	}

	fn user_agent(&self) -> Option<String> {
		self.user_agent.clone()
	}

	fn language(&self) -> Option<String> {
		self.language.clone()
	}

	fn timezone(&self) -> Option<String> {
		self.timezone.clone()
	}

	fn do_not_track(&self) -> Option<String> {
		self.do_not_track.clone()
	}

	fn bearer_token(&self) -> Option<String> {
		self.bearer_token.clone()
	}
}
