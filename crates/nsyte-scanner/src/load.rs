//! Hasher/Loader — spec 4.B.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use sha2::{Digest, Sha256};
use thiserror::Error;

use nsyte_types::FileEntry;

/// Fixed-size read buffer: the file is streamed through this rather than
/// read fully before hashing, so `size` is known without a second pass
/// (spec 4.B implementation note).
const CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug, Error)]
pub enum ReadError {
    #[error("failed to open {path}: {source}")]
    Open { path: String, #[source] source: std::io::Error },
    #[error("failed to read {path}: {source}")]
    Read { path: String, #[source] source: std::io::Error },
}

/// Read `fs_path`'s bytes, compute its lowercase hex SHA-256, and return
/// a new [`FileEntry`] carrying `bytes`, `size`, and `digest` stamped in
/// (spec 4.B). `entry` supplies `path`/`content_type`; this never
/// mutates `entry` in place, it returns a fresh value.
///
/// Fails with [`ReadError`] on I/O issues; never returns a partially
/// complete entry.
pub fn load(entry: &FileEntry, fs_path: &Path) -> Result<FileEntry, ReadError> {
    let file = File::open(fs_path).map_err(|source| ReadError::Open {
        path: fs_path.display().to_string(),
        source,
    })?;
    let mut reader = BufReader::new(file);

    let mut hasher = Sha256::new();
    let mut bytes = Vec::new();
    let mut buf = [0u8; CHUNK_SIZE];

    loop {
        let read = reader.read(&mut buf).map_err(|source| ReadError::Read {
            path: fs_path.display().to_string(),
            source,
        })?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
        bytes.extend_from_slice(&buf[..read]);
    }

    let digest = hex::encode(hasher.finalize());
    let size = bytes.len() as u64;

    Ok(FileEntry {
        path: entry.path.clone(),
        content_type: entry.content_type.clone(),
        size: Some(size),
        digest: Some(digest),
        bytes: Some(bytes),
        source_event_id: entry.source_event_id.clone(),
        found_on_relays: entry.found_on_relays.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn hashes_and_stamps_size() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("a.txt");
        std::fs::write(&path, b"hello world").unwrap();

        let entry = FileEntry::from_scan("/a.txt", "text/plain");
        let loaded = load(&entry, &path).expect("load");

        assert_eq!(loaded.size, Some(11));
        assert_eq!(
            loaded.digest.as_deref(),
            Some("b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9")
        );
        assert_eq!(loaded.bytes.as_deref(), Some(b"hello world".as_slice()));
    }

    #[test]
    fn empty_file_hashes_to_the_well_known_empty_digest() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("empty.txt");
        std::fs::write(&path, b"").unwrap();

        let entry = FileEntry::from_scan("/empty.txt", "text/plain");
        let loaded = load(&entry, &path).expect("load");
        assert_eq!(
            loaded.digest.as_deref(),
            Some("e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855")
        );
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let entry = FileEntry::from_scan("/missing.txt", "text/plain");
        let err = load(&entry, Path::new("/no/such/file")).unwrap_err();
        assert!(matches!(err, ReadError::Open { .. }));
    }
}
