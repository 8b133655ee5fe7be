//! APK container writer
//!
//! Writing is two-pass: the header and a zero-filled index go out first,
//! then every block in order, and finally the index is rewritten in place
//! once each block's offset is known.

use std::io::{Seek, SeekFrom, Write};

use crate::error::{Error, Result};

use super::names::encode_name;
use super::{
    ApkHeader, ApkPhase, ApkProgress, ArchiveEntry, CompressedBlock, HEADER_SIZE,
    INDEX_RECORD_SIZE, ProgressCallback,
};

/// APK container writer
pub struct ApkWriter<W: Write + Seek> {
    writer: W,
    header: ApkHeader,
}

impl<W: Write + Seek> ApkWriter<W> {
    /// Create a writer that emits the default `PACK` signature
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            header: ApkHeader::default(),
        }
    }

    /// Set the 8-byte leading signature (magic + version)
    #[must_use]
    pub fn with_signature(mut self, signature: [u8; 8]) -> Self {
        self.header.signature = signature;
        self
    }

    /// Write a complete container holding `blocks` in the given order
    ///
    /// Each block's `offset` is filled in as it is written. Names are
    /// validated before the first byte is written.
    ///
    /// # Errors
    /// Returns a name error for any invalid entry name,
    /// [`Error::ArchiveTooLarge`] if a block would start past `i32::MAX`, or
    /// [`Error::BlockTooLarge`] if a stored block does not fit an `i32`.
    pub fn write_blocks(
        &mut self,
        blocks: &mut [CompressedBlock],
        progress: ProgressCallback,
    ) -> Result<Vec<ArchiveEntry>> {
        for block in blocks.iter() {
            encode_name(&block.name)?;
        }

        let total = blocks.len();
        let index_len = total as u64 * INDEX_RECORD_SIZE as u64;
        let entry_count = i32::try_from(total).map_err(|_| Error::ArchiveTooLarge {
            offset: HEADER_SIZE as u64 + index_len,
        })?;

        let header = ApkHeader {
            entry_count,
            ..self.header
        };

        self.writer.seek(SeekFrom::Start(0))?;
        header.to_record().write_to(&mut self.writer)?;

        // Reserve the index; the real records are backfilled below.
        self.writer.write_all(&vec![0u8; total * INDEX_RECORD_SIZE])?;

        let mut expected = HEADER_SIZE as u64 + index_len;
        for (i, block) in blocks.iter_mut().enumerate() {
            progress(&ApkProgress::with_file(ApkPhase::WritingBlocks, i + 1, total, &block.name));

            let pointer = self.writer.stream_position()?;
            debug_assert_eq!(pointer, expected, "block {} starts off layout", block.name);

            check_placement(pointer, block.len())?;

            self.writer.write_all(&block.data)?;
            block.offset = Some(pointer);
            expected = pointer + block.len() as u64;

            tracing::debug!(
                "Wrote {} at {:#010X} ({} bytes, {} decompressed)",
                block.name,
                pointer,
                block.len(),
                block.decompressed_size
            );
        }

        progress(&ApkProgress::new(ApkPhase::WritingIndex, total, total));
        self.writer.seek(SeekFrom::Start(HEADER_SIZE as u64))?;

        let mut entries = Vec::with_capacity(total);
        for block in blocks.iter() {
            let offset = block.offset.unwrap_or_default();
            let entry = ArchiveEntry {
                name: block.name.clone(),
                stored_size: block.len() as i32,
                offset: offset as i32,
                reserved: [0; 6],
            };
            entry.to_record()?.write_to(&mut self.writer)?;
            entries.push(entry);
        }

        self.writer.seek(SeekFrom::Start(expected))?;
        self.writer.flush()?;

        Ok(entries)
    }

    /// Consume the writer and return the underlying sink
    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Both index fields of a block, its offset and stored size, are 32-bit signed
fn check_placement(offset: u64, len: usize) -> Result<()> {
    if i32::try_from(offset).is_err() {
        return Err(Error::ArchiveTooLarge { offset });
    }
    if i32::try_from(len).is_err() {
        return Err(Error::BlockTooLarge { size: len });
    }
    Ok(())
}
