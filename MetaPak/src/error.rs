//! Error types for `MetaPak`

use std::path::PathBuf;

use thiserror::Error;

/// The error type for `MetaPak` operations.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum Error {
    // ==================== IO Errors ====================
    /// IO error from file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Directory traversal error.
    #[error("directory walk error: {0}")]
    WalkDirError(String),

    // ==================== Container Errors ====================
    /// The container is shorter than its header or declared index requires.
    #[error("truncated APK header: need {expected} bytes, file has {actual}")]
    TruncatedHeader {
        /// Bytes required by the header and declared index.
        expected: u64,
        /// Bytes actually available.
        actual: u64,
    },

    /// The header declares a negative entry count.
    #[error("invalid entry count: {0}")]
    InvalidEntryCount(i32),

    /// An index record carries a value that cannot describe a block.
    #[error("invalid index entry {name}: {message}")]
    InvalidEntry {
        /// The entry name.
        name: String,
        /// What is wrong with the record.
        message: String,
    },

    /// An entry's block extends past the end of the container.
    #[error("entry {name} at offset {offset:#010X} needs {size} bytes but the file ends at {file_len:#010X}")]
    TruncatedEntry {
        /// The entry name.
        name: String,
        /// Absolute offset of the block.
        offset: u64,
        /// Stored size of the block.
        size: u64,
        /// Length of the container file.
        file_len: u64,
    },

    /// Two entries claim overlapping byte ranges, or an entry overlaps the index.
    #[error("entry {name} at offset {offset:#010X} overlaps {other}")]
    LayoutOverlap {
        /// The entry whose range starts inside another region.
        name: String,
        /// Absolute offset of the entry's block.
        offset: u64,
        /// The region it collides with.
        other: String,
    },

    /// The archive would grow past what 32-bit offsets can address.
    #[error("archive too large: offset {offset:#X} does not fit in a 32-bit field")]
    ArchiveTooLarge {
        /// The offending position.
        offset: u64,
    },

    /// No entry with the requested name.
    #[error("entry not found: {0}")]
    EntryNotFound(String),

    /// A single entry failed; wraps the underlying error with its location.
    #[error("entry {name} (offset {offset:#010X}): {source}")]
    EntryFailed {
        /// The entry name.
        name: String,
        /// Absolute offset of the entry's block.
        offset: u64,
        /// The underlying failure.
        #[source]
        source: Box<Error>,
    },

    // ==================== Compressed Block Errors ====================
    /// The compressed block is shorter than its header says.
    #[error("truncated compressed block: need {expected} bytes, block has {actual}")]
    TruncatedBlock {
        /// Bytes required by the block header.
        expected: u64,
        /// Bytes actually present.
        actual: u64,
    },

    /// LZ4 decompression failed or produced the wrong length.
    #[error("LZ4 decompression failed: {message}")]
    DecompressionFailed {
        /// The error message.
        message: String,
    },

    /// A payload is too large for the block header's 32-bit size fields.
    #[error("payload too large for a compressed block: {size} bytes")]
    BlockTooLarge {
        /// The payload size.
        size: usize,
    },

    // ==================== Entry Name Errors ====================
    /// Entry name does not fit the 256-byte name field with a terminator.
    #[error("entry name too long ({len} bytes, max 255): {name}")]
    NameTooLong {
        /// The offending name.
        name: String,
        /// Its encoded length.
        len: usize,
    },

    /// Entry name contains characters outside ASCII.
    #[error("entry name is not ASCII: {name}")]
    NonAsciiName {
        /// The offending name.
        name: String,
    },

    /// Entry name cannot be mapped to a path inside the output directory.
    #[error("invalid entry name {name:?}: {reason}")]
    InvalidEntryName {
        /// The offending name.
        name: String,
        /// Why the name was rejected.
        reason: &'static str,
    },

    /// Two entries in one archive share a name.
    #[error("duplicate entry name in archive: {name}")]
    DuplicateEntryName {
        /// The repeated name.
        name: String,
    },

    // ==================== Manifest Errors ====================
    /// The input directory has files but no manifest.
    #[error("manifest not found: {path}")]
    ManifestNotFound {
        /// Where the manifest was expected.
        path: PathBuf,
    },

    /// The manifest lists a file that is not in the directory.
    #[error("manifest lists {name} but it is missing from the directory")]
    MissingManifestEntry {
        /// The listed name.
        name: String,
    },

    /// The directory contains a file that the manifest does not list.
    #[error("file {name} is not listed in the manifest")]
    UnlistedFile {
        /// The unlisted file, relative to the input directory.
        name: String,
    },

    /// The manifest lists the same name twice.
    #[error("manifest lists {name} more than once (line {line})")]
    DuplicateManifestEntry {
        /// The repeated name.
        name: String,
        /// 1-based line of the repeat.
        line: usize,
    },

    // ==================== Run Errors ====================
    /// Extraction finished but some entries failed.
    #[error("extraction failed for {failed} of {total} entries: {first_error}")]
    PartialExtraction {
        /// Total number of entries in the archive.
        total: usize,
        /// Number of failed entries.
        failed: usize,
        /// The first error message encountered.
        first_error: String,
    },
}

impl Error {
    /// Attach an entry's name and offset to an error.
    pub(crate) fn in_entry(self, name: &str, offset: u64) -> Self {
        Error::EntryFailed {
            name: name.to_string(),
            offset,
            source: Box::new(self),
        }
    }
}

impl From<walkdir::Error> for Error {
    fn from(err: walkdir::Error) -> Self {
        Error::WalkDirError(err.to_string())
    }
}

/// A specialized Result type for `MetaPak` operations.
pub type Result<T> = std::result::Result<T, Error>;
