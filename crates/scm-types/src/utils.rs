//! Helper utilities shared across crates.

use chrono::{DateTime, Utc};

/// Current wall-clock time used for order timestamps.
pub fn now() -> DateTime<Utc> {
	Utc::now()
}

/// Shortens an identifier for log output.
///
/// Shows only the first 8 characters followed by ".." for longer strings.
pub fn truncate_id(id: &str) -> String {
	match id.char_indices().nth(8) {
		Some((idx, _)) => format!("{}..", &id[..idx]),
		None => id.to_string(),
	}
}
