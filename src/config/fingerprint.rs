//! File fingerprints for polling-based change detection.
//!
//! The watch loop only compares fingerprints for equality, so a strategy can
//! be swapped without touching the loop.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use sha2::{Digest, Sha256};

use crate::config::schema::FingerprintKind;

/// Stamp of a single file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileStamp {
    Metadata { modified_ns: u128, len: u64 },
    Digest(String),
}

/// Combined stamps of every watched file, in order. Absent files are `None`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Fingerprint(Vec<Option<FileStamp>>);

impl Fingerprint {
    pub fn stamps(&self) -> &[Option<FileStamp>] {
        &self.0
    }
}

pub trait Fingerprinter: Send + Sync {
    /// Stamp one file, or `None` when it cannot be read.
    fn stamp(&self, path: &Path) -> Option<FileStamp>;

    fn fingerprint(&self, paths: &[PathBuf]) -> Fingerprint {
        Fingerprint(paths.iter().map(|p| self.stamp(p)).collect())
    }
}

/// Modification time plus size. Cheap; never reads file contents.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetadataFingerprinter;

impl Fingerprinter for MetadataFingerprinter {
    fn stamp(&self, path: &Path) -> Option<FileStamp> {
        let metadata = fs::metadata(path).ok()?;
        let modified_ns = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_nanos())
            .unwrap_or_default();

        Some(FileStamp::Metadata {
            modified_ns,
            len: metadata.len(),
        })
    }
}

/// SHA-256 of the contents. Ignores touches that leave the bytes unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentFingerprinter;

impl Fingerprinter for ContentFingerprinter {
    fn stamp(&self, path: &Path) -> Option<FileStamp> {
        let bytes = fs::read(path).ok()?;
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        Some(FileStamp::Digest(hex::encode(hasher.finalize())))
    }
}

pub fn for_kind(kind: FingerprintKind) -> Box<dyn Fingerprinter> {
    match kind {
        FingerprintKind::Metadata => Box::new(MetadataFingerprinter),
        FingerprintKind::Content => Box::new(ContentFingerprinter),
    }
}
