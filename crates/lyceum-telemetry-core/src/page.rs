// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! URL-to-page-name classification.
//!
//! Classification is an ordered rule table rather than nested conditionals,
//! so adding a page category is a data change. Rules are checked in order and
//! the first match wins; URLs that match no rule fall back to the path
//! segments joined with hyphens.

use url::Url;

/// A single classification rule: a predicate over the URL's path segments
/// and the page name it yields.
struct PageRule {
	name: &'static str,
	matches: fn(&[&str]) -> bool,
}

/// Ordered rule table. First match wins.
const PAGE_RULES: &[PageRule] = &[
	PageRule {
		name: "home",
		matches: |segments| segments.is_empty(),
	},
	PageRule {
		name: "course-detail",
		matches: |segments| {
			segments
				.iter()
				.position(|s| *s == "courses")
				.is_some_and(|i| i + 1 < segments.len())
		},
	},
	PageRule {
		name: "instructor-dashboard",
		matches: |segments| segments.contains(&"instructor"),
	},
];

/// Classifies an absolute URL into a coarse page name.
///
/// Unparseable URLs classify as `"unknown"`.
pub fn classify_page(url: &str) -> String {
	let parsed = match Url::parse(url) {
		Ok(parsed) => parsed,
		Err(_) => return "unknown".to_string(),
	};

	let segments: Vec<&str> = parsed
		.path_segments()
		.map(|path| path.filter(|s| !s.is_empty()).collect())
		.unwrap_or_default();

	for rule in PAGE_RULES {
		if (rule.matches)(&segments) {
			return rule.name.to_string();
		}
	}

	if segments.is_empty() {
		"unknown".to_string()
	} else {
		segments.join("-")
	}
}
