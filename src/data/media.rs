//! Media reference normalization
//!
//! Remote content carries its media references in one heterogeneous
//! field: a native list, a single URL, a comma-separated string, or a
//! serialized JSON array. `normalize` turns any of these into one
//! canonical ordered `MediaRef` list.
//!
//! A list containing a malformed entry is rejected as a whole (the
//! result is empty and the item renders as a placeholder). A partially
//! valid gallery is worse than a visible placeholder.

use serde::{Deserialize, Serialize};

use crate::data::models::MediaRef;
use crate::metrics::MEDIA_REJECTED_TOTAL;

/// The raw media field as stored by the remote service.
///
/// Deserializes from either a JSON array of strings or a bare string;
/// the string form may itself be comma-joined or a serialized array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MediaField {
    Many(Vec<String>),
    One(String),
}

impl MediaField {
    /// Convenience constructor for a single-URL field
    pub fn one(url: impl Into<String>) -> Self {
        Self::One(url.into())
    }
}

/// Normalize a raw media field into canonical refs.
///
/// `is_video` is the caller's flag for the whole field; entries are
/// images unless it is set.
///
/// Resolution order:
/// 1. a native list is taken entry by entry;
/// 2. a string shaped like a serialized array is parsed as one, falling
///    through on parse failure;
/// 3. a comma-separated string is split, trimmed, and stripped of empty
///    segments (one survivor is the single-URL case, several are a
///    gallery);
/// 4. anything else is a single URL.
///
/// Any resulting entry that still contains a comma marks the whole list
/// corrupt and the result is empty.
pub fn normalize(raw: &MediaField, is_video: bool) -> Vec<MediaRef> {
    match raw {
        MediaField::Many(entries) => collect(entries.iter().map(String::as_str), is_video),
        MediaField::One(text) => normalize_text(text, is_video),
    }
}

fn normalize_text(text: &str, is_video: bool) -> Vec<MediaRef> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    if trimmed.starts_with('[') {
        if let Ok(parsed) = serde_json::from_str::<Vec<String>>(trimmed) {
            return collect(parsed.iter().map(String::as_str), is_video);
        }
        // Parse failure: keep going with the raw string as-is.
    }

    if trimmed.contains(',') {
        let segments: Vec<&str> = trimmed
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        if segments.is_empty() {
            MEDIA_REJECTED_TOTAL.inc();
            return Vec::new();
        }
        // One survivor is the single-URL case; several are a gallery.
        // Split segments cannot contain commas, so no post-check needed.
        return segments
            .into_iter()
            .map(|url| MediaRef {
                url: url.to_string(),
                is_video,
            })
            .collect();
    }

    vec![MediaRef {
        url: trimmed.to_string(),
        is_video,
    }]
}

/// Collect entries from an already-split source, rejecting the whole
/// list if any entry is empty or comma-corrupted.
fn collect<'a>(entries: impl Iterator<Item = &'a str>, is_video: bool) -> Vec<MediaRef> {
    let mut refs = Vec::new();
    for entry in entries {
        let url = entry.trim();
        if url.is_empty() || url.contains(',') {
            MEDIA_REJECTED_TOTAL.inc();
            return Vec::new();
        }
        refs.push(MediaRef {
            url: url.to_string(),
            is_video,
        });
    }
    refs
}
