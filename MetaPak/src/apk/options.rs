//! Options and results for APK operations

use std::path::PathBuf;

use super::ArchiveEntry;

/// Options for unpacking an archive
#[derive(Debug, Clone, Default)]
pub struct UnpackOptions {
    /// Keep extracting after an entry fails, reporting all failures at the end
    pub keep_going: bool,
}

impl UnpackOptions {
    /// Fail-fast defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether one entry's failure stops the run
    #[must_use]
    pub fn with_keep_going(mut self, keep_going: bool) -> Self {
        self.keep_going = keep_going;
        self
    }
}

/// Options for packing a directory
#[derive(Debug, Clone, Default)]
pub struct PackOptions {
    /// Compress entries on the rayon thread pool
    pub parallel: bool,
    /// Leading 8 bytes to write instead of `PACK` + version
    pub signature: Option<[u8; 8]>,
}

impl PackOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    #[must_use]
    pub fn with_signature(mut self, signature: [u8; 8]) -> Self {
        self.signature = Some(signature);
        self
    }
}

/// Outcome of a successful unpack
#[derive(Debug, Clone)]
pub struct UnpackResult {
    /// Directory the entries were written to
    pub output_dir: PathBuf,
    /// Path of the written manifest
    pub manifest_path: PathBuf,
    /// Index entries, in archive order
    pub entries: Vec<ArchiveEntry>,
}

/// Outcome of a successful pack
#[derive(Debug, Clone)]
pub struct PackResult {
    /// Path of the written archive
    pub output_path: PathBuf,
    /// Index entries as written
    pub entries: Vec<ArchiveEntry>,
}

/// Outcome of verifying an archive
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyReport {
    /// Number of entries decoded
    pub entries: usize,
    /// Sum of decompressed sizes
    pub decompressed_bytes: u64,
}
