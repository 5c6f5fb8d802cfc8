//! Path normalization for the Diff Engine's join key (spec 4.D).

use serde::{Deserialize, Serialize};

/// A site-relative path normalized for comparison: consecutive leading
/// slashes collapsed to one, compared case-insensitively.
///
/// `PathKey` intentionally keeps the original-case display string alongside
/// the lowercased comparison key, since the display path (what gets uploaded
/// and what appears in reports) must retain the author's original casing.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PathKey {
    /// Original, POSIX-style, leading-slash path as stored on a `FileEntry`.
    pub display: String,
    /// Lowercased, single-leading-slash form used for equality/ordering.
    pub normalized: String,
}

impl PathKey {
    /// Normalize a raw path per spec 4.D: collapse consecutive leading
    /// slashes to one, then compare case-insensitively.
    ///
    /// Idempotent: `normalize(normalize(p)) == normalize(p)`.
    pub fn normalize(raw: &str) -> Self {
        let with_leading_slash = if raw.starts_with('/') {
            raw.to_string()
        } else {
            format!("/{raw}")
        };

        let collapsed = {
            let trimmed = with_leading_slash.trim_start_matches('/');
            format!("/{trimmed}")
        };

        PathKey {
            display: collapsed.clone(),
            normalized: collapsed.to_ascii_lowercase(),
        }
    }
}

impl std::fmt::Display for PathKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display)
    }
}
