//! Package artifact downloads for dockpin.
//!
//! This crate fetches pinned `.deb` files over HTTP into an apt-style archive
//! cache. Each download is written to an exclusively created placeholder in
//! `partial/`, checked against the pinned size and MD5 digest, and only then
//! renamed into place. Artifacts already present in the cache are reused.

pub mod cache;
pub mod http;

pub use cache::{CacheLayout, DEFAULT_CACHE_DIR};
pub use http::Fetcher;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("refusing to fetch '{0}': not a plain file name")]
    InvalidFilename(String),
    #[error("download of '{filename}' already in progress ({path} exists)")]
    AlreadyInProgress { filename: String, path: String },
    #[error("failed to download {url:?}: HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("failed to download {url:?}: {message}")]
    Network { url: String, message: String },
    #[error("failed to download {url:?}: {source}")]
    Transfer {
        url: String,
        source: std::io::Error,
    },
    #[error("size mismatch for {url:?}: got {actual} bytes, expected {expected}")]
    SizeMismatch {
        url: String,
        expected: u64,
        actual: u64,
    },
    #[error("hash mismatch for {url:?}: got MD5 {actual}, expected {expected}")]
    HashMismatch {
        url: String,
        expected: String,
        actual: String,
    },
}

impl FetchError {
    /// Size and hash mismatches: the artifact is corrupt, tampered with, or the
    /// lock entry is stale. These are never retried.
    pub fn is_integrity_failure(&self) -> bool {
        matches!(
            self,
            FetchError::SizeMismatch { .. } | FetchError::HashMismatch { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integrity_failures_are_classified() {
        let size = FetchError::SizeMismatch {
            url: "http://x/a.deb".to_owned(),
            expected: 10,
            actual: 9,
        };
        let status = FetchError::Status {
            url: "http://x/a.deb".to_owned(),
            status: 404,
        };
        assert!(size.is_integrity_failure());
        assert!(!status.is_integrity_failure());
    }

    #[test]
    fn hash_mismatch_message_has_both_digests() {
        let e = FetchError::HashMismatch {
            url: "http://x/a.deb".to_owned(),
            expected: "aa".repeat(16),
            actual: "bb".repeat(16),
        };
        let msg = e.to_string();
        assert!(msg.contains(&"aa".repeat(16)));
        assert!(msg.contains(&"bb".repeat(16)));
        assert!(msg.contains("http://x/a.deb"));
    }
}
