//! Types for APK container handling

use serde::Serialize;

use crate::error::{Error, Result};

use super::block;
use super::names::{decode_name, encode_name};
use super::schema::{self, CONTAINER_HEADER, FixedRecord, INDEX_RECORD};
use super::{MAGIC, VERSION};

/// Header of an APK container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApkHeader {
    /// Leading magic + version bytes, kept verbatim
    pub signature: [u8; 8],
    /// Number of index records
    pub entry_count: i32,
    /// Unknown field at 0x0C, kept verbatim
    pub reserved: i32,
}

impl Default for ApkHeader {
    fn default() -> Self {
        let mut signature = [0u8; 8];
        signature[..4].copy_from_slice(&MAGIC);
        signature[4..].copy_from_slice(&VERSION.to_le_bytes());
        Self {
            signature,
            entry_count: 0,
            reserved: 0,
        }
    }
}

impl ApkHeader {
    #[must_use]
    pub fn magic(&self) -> [u8; 4] {
        [self.signature[0], self.signature[1], self.signature[2], self.signature[3]]
    }

    #[must_use]
    pub fn version(&self) -> u32 {
        u32::from_le_bytes([self.signature[4], self.signature[5], self.signature[6], self.signature[7]])
    }

    pub(crate) fn from_record(record: &FixedRecord) -> Self {
        let mut signature = [0u8; 8];
        signature.copy_from_slice(record.get_bytes(&schema::container::SIGNATURE));
        Self {
            signature,
            entry_count: record.get_i32(&schema::container::ENTRY_COUNT),
            reserved: record.get_i32(&schema::container::RESERVED),
        }
    }

    pub(crate) fn to_record(self) -> FixedRecord {
        let mut record = FixedRecord::zeroed(&CONTAINER_HEADER);
        record.set_bytes(&schema::container::SIGNATURE, &self.signature);
        record.set_i32(&schema::container::ENTRY_COUNT, self.entry_count);
        record.set_i32(&schema::container::RESERVED, self.reserved);
        record
    }
}

/// One record of the container index
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveEntry {
    /// Entry name with the NUL padding removed
    pub name: String,
    /// Size of the stored block, inner header and padding included
    pub stored_size: i32,
    /// Absolute offset of the stored block
    pub offset: i32,
    /// Unknown fields, in on-disk order, kept verbatim
    pub reserved: [i32; 6],
}

impl ArchiveEntry {
    #[must_use]
    pub fn new(name: impl Into<String>, stored_size: i32, offset: i32) -> Self {
        Self {
            name: name.into(),
            stored_size,
            offset,
            reserved: [0; 6],
        }
    }

    /// Offset and size of the stored block as unsigned file positions
    ///
    /// # Errors
    /// Returns [`Error::InvalidEntry`] if either value is negative.
    pub fn block_range(&self) -> Result<(u64, u64)> {
        let offset = u64::try_from(self.offset).map_err(|_| Error::InvalidEntry {
            name: self.name.clone(),
            message: format!("negative offset {}", self.offset),
        })?;
        let size = u64::try_from(self.stored_size).map_err(|_| Error::InvalidEntry {
            name: self.name.clone(),
            message: format!("negative stored size {}", self.stored_size),
        })?;
        Ok((offset, size))
    }

    pub(crate) fn from_record(record: &FixedRecord) -> Self {
        let mut reserved = [0i32; 6];
        for (value, field) in reserved.iter_mut().zip(schema::index::RESERVED.iter()) {
            *value = record.get_i32(field);
        }
        Self {
            name: decode_name(record.get_bytes(&schema::index::NAME)),
            stored_size: record.get_i32(&schema::index::STORED_SIZE),
            offset: record.get_i32(&schema::index::OFFSET),
            reserved,
        }
    }

    pub(crate) fn to_record(&self) -> Result<FixedRecord> {
        let mut record = FixedRecord::zeroed(&INDEX_RECORD);
        record.set_bytes(&schema::index::NAME, &encode_name(&self.name)?);
        record.set_i32(&schema::index::STORED_SIZE, self.stored_size);
        record.set_i32(&schema::index::OFFSET, self.offset);
        for (value, field) in self.reserved.iter().zip(schema::index::RESERVED.iter()) {
            record.set_i32(field, *value);
        }
        Ok(record)
    }
}

/// A framed entry on its way into an archive
#[derive(Debug, Clone)]
pub struct CompressedBlock {
    pub name: String,
    pub decompressed_size: u32,
    /// LZ4 payload length before padding
    pub compressed_size: u32,
    /// Block header + padded payload, exactly as stored
    pub data: Vec<u8>,
    /// Absolute position in the archive, known once written
    pub offset: Option<u64>,
}

impl CompressedBlock {
    /// Compress and frame `contents` under `name`
    ///
    /// # Errors
    /// Returns an error if the payload is too large for the block header.
    pub fn encode(name: impl Into<String>, contents: &[u8]) -> Result<Self> {
        let (header, data) = block::frame(contents)?;
        Ok(Self {
            name: name.into(),
            decompressed_size: header.decompressed_size,
            compressed_size: header.compressed_size,
            data,
            offset: None,
        })
    }

    /// Stored size in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Recover the original contents
    ///
    /// # Errors
    /// Returns an error if the block is malformed.
    pub fn decode(&self) -> Result<Vec<u8>> {
        block::decode(&self.data)
    }
}

/// Progress information during APK operations
#[derive(Debug, Clone)]
pub struct ApkProgress {
    /// Current operation phase
    pub phase: ApkPhase,
    /// Current item number (1-indexed)
    pub current: usize,
    /// Total number of items
    pub total: usize,
    /// Current entry being processed (if applicable)
    pub current_file: Option<String>,
}

impl ApkProgress {
    /// Create a new progress update
    #[must_use]
    pub fn new(phase: ApkPhase, current: usize, total: usize) -> Self {
        Self {
            phase,
            current,
            total,
            current_file: None,
        }
    }

    /// Create a progress update with an entry name
    #[must_use]
    pub fn with_file(phase: ApkPhase, current: usize, total: usize, file: impl Into<String>) -> Self {
        Self {
            phase,
            current,
            total,
            current_file: Some(file.into()),
        }
    }

    /// Get the progress percentage (0.0 - 1.0)
    #[must_use]
    pub fn percentage(&self) -> f32 {
        if self.total == 0 {
            1.0
        } else {
            self.current as f32 / self.total as f32
        }
    }
}

/// Phase of an APK operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApkPhase {
    /// Reading the container header and index
    ReadingIndex,
    /// Decompressing entries and writing them to disk
    ExtractingFiles,
    /// Writing the manifest
    WritingManifest,
    /// Scanning the input directory
    ScanningFiles,
    /// Compressing files into blocks
    CompressingFiles,
    /// Writing blocks into the archive
    WritingBlocks,
    /// Backfilling the index
    WritingIndex,
    /// Decoding entries to check them
    Verifying,
    /// Operation complete
    Complete,
}

impl ApkPhase {
    /// Get a human-readable description of this phase
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ReadingIndex => "Reading index",
            Self::ExtractingFiles => "Extracting files",
            Self::WritingManifest => "Writing manifest",
            Self::ScanningFiles => "Scanning files",
            Self::CompressingFiles => "Compressing files",
            Self::WritingBlocks => "Writing blocks",
            Self::WritingIndex => "Writing index",
            Self::Verifying => "Verifying",
            Self::Complete => "Complete",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_header_signature() {
        let header = ApkHeader::default();
        assert_eq!(&header.magic(), b"PACK");
        assert_eq!(header.version(), 0x10000);
        assert_eq!(
            header.to_record().as_bytes(),
            &[b'P', b'A', b'C', b'K', 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0]
        );
    }

    #[test]
    fn test_entry_record_preserves_reserved_fields() {
        let mut entry = ArchiveEntry::new("ui/a.dds", 0x40, 0x130);
        entry.reserved = [1, 2, 3, 4, 5, -6];

        let record = entry.to_record().unwrap();
        let bytes = record.as_bytes();
        assert_eq!(&bytes[0x100..0x104], &0x40i32.to_le_bytes());
        assert_eq!(&bytes[0x104..0x108], &1i32.to_le_bytes());
        assert_eq!(&bytes[0x114..0x118], &5i32.to_le_bytes());
        assert_eq!(&bytes[0x118..0x11C], &0x130i32.to_le_bytes());
        assert_eq!(&bytes[0x11C..0x120], &(-6i32).to_le_bytes());

        assert_eq!(ArchiveEntry::from_record(&record), entry);
    }

    #[test]
    fn test_block_range_rejects_negative_values() {
        let entry = ArchiveEntry::new("a.dds", -1, 0x10);
        assert!(matches!(entry.block_range(), Err(Error::InvalidEntry { .. })));
        let entry = ArchiveEntry::new("a.dds", 0x40, 0x130);
        assert_eq!(entry.block_range().unwrap(), (0x130, 0x40));
    }

    #[test]
    fn test_compressed_block_encode() {
        let contents = b"DDS payload".repeat(20);
        let block = CompressedBlock::encode("a.dds", &contents).unwrap();
        assert_eq!(block.decompressed_size as usize, contents.len());
        assert_eq!(block.offset, None);
        assert_eq!(block.decode().unwrap(), contents);
        assert_eq!(block.len() % 16, 0);
    }

    #[test]
    fn test_progress_percentage() {
        assert!((ApkProgress::new(ApkPhase::Complete, 0, 0).percentage() - 1.0).abs() < f32::EPSILON);
        let progress = ApkProgress::with_file(ApkPhase::ExtractingFiles, 1, 4, "a.dds");
        assert!((progress.percentage() - 0.25).abs() < f32::EPSILON);
        assert_eq!(progress.current_file.as_deref(), Some("a.dds"));
    }
}
