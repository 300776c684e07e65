use std::{collections::HashSet, sync::LazyLock};

use regex::Regex;

pub const MAX_TAGS: usize = 20;

// Runs longer than 32 characters keep only their first 32.
static HASHTAG: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"#([A-Za-z0-9_]{1,32})").expect("Hashtag pattern must compile."));

/// Derives the searchable tag set of a memo body.
///
/// Tags are lowercased, deduplicated in first-seen order, and capped at [`MAX_TAGS`].
pub fn extract_tags(content: &str) -> Vec<String> {
	let mut seen = HashSet::new();
	let mut out = Vec::new();

	for captures in HASHTAG.captures_iter(content) {
		let Some(raw) = captures.get(1) else {
			continue;
		};
		let tag = raw.as_str().to_ascii_lowercase();

		if !seen.insert(tag.clone()) {
			continue;
		}

		out.push(tag);

		if out.len() >= MAX_TAGS {
			break;
		}
	}

	out
}
