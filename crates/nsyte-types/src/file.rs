//! `FileEntry` — spec §3.

use serde::{Deserialize, Serialize};

/// A semantic record identifying one site file.
///
/// Invariant: the pair (`path`, `digest`) uniquely identifies a file
/// version; identical `digest` on identical `path` means "unchanged".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Site-relative, POSIX-style path, always with a leading `/`.
    pub path: String,
    /// MIME type, derived from extension, `application/octet-stream` default.
    pub content_type: String,
    /// Size in bytes; `None` until hashed.
    pub size: Option<u64>,
    /// Lowercase hex SHA-256; `None` until hashed.
    pub digest: Option<String>,
    /// Payload bytes; only populated when loaded for upload. Never
    /// serialized — this field exists purely to move bytes from the
    /// loader to the uploader without a second read.
    #[serde(skip)]
    pub bytes: Option<Vec<u8>>,
    /// Source event id, when this entry came from a remote manifest.
    pub source_event_id: Option<String>,
    /// Relays the source event was seen on, when this entry came from a
    /// remote manifest (spec 4.C).
    #[serde(default)]
    pub found_on_relays: Vec<String>,
}

impl FileEntry {
    /// Construct a bare entry from a scan (no digest yet).
    pub fn from_scan(path: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content_type: content_type.into(),
            size: None,
            digest: None,
            bytes: None,
            source_event_id: None,
            found_on_relays: Vec::new(),
        }
    }

    /// Construct an entry from a remote manifest event (spec 4.C): only
    /// `path` and `digest` are known, plus provenance.
    pub fn from_remote(
        path: impl Into<String>,
        digest: impl Into<String>,
        source_event_id: impl Into<String>,
        found_on_relays: Vec<String>,
    ) -> Self {
        Self {
            path: path.into(),
            content_type: String::new(),
            size: None,
            digest: Some(digest.into()),
            bytes: None,
            source_event_id: Some(source_event_id.into()),
            found_on_relays,
        }
    }

    /// Release the payload bytes promptly after upload, per spec 4.B
    /// ("callers are responsible for releasing `bytes` promptly").
    pub fn release_bytes(&mut self) {
        self.bytes = None;
    }
}

/// Derive a MIME content type from a file extension, per spec 4.A.
/// Defaults to `application/octet-stream` for unknown or missing extensions.
pub fn content_type_for_path(path: &str) -> &'static str {
    let ext = path.rsplit('.').next().unwrap_or("").to_ascii_lowercase();
    match ext.as_str() {
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" | "mjs" => "application/javascript",
        "json" => "application/json",
        "xml" => "application/xml",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "txt" => "text/plain",
        "md" => "text/markdown",
        "pdf" => "application/pdf",
        "wasm" => "application/wasm",
        "webmanifest" => "application/manifest+json",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_extension_defaults_to_octet_stream() {
        assert_eq!(content_type_for_path("/site/file.unknownext"), "application/octet-stream");
        assert_eq!(content_type_for_path("/no-extension"), "application/octet-stream");
    }

    #[test]
    fn known_extensions_map_correctly() {
        assert_eq!(content_type_for_path("/index.html"), "text/html");
        assert_eq!(content_type_for_path("/app.js"), "application/javascript");
        assert_eq!(content_type_for_path("/style.CSS"), "text/css");
    }

    #[test]
    fn bytes_field_is_not_serialized() {
        let mut entry = FileEntry::from_scan("/a.txt", "text/plain");
        entry.bytes = Some(vec![1, 2, 3]);
        let json = serde_json::to_string(&entry).expect("serialize");
        assert!(!json.contains("bytes"));
    }

    #[test]
    fn release_bytes_clears_payload() {
        let mut entry = FileEntry::from_scan("/a.txt", "text/plain");
        entry.bytes = Some(vec![1, 2, 3]);
        entry.release_bytes();
        assert!(entry.bytes.is_none());
    }
}
