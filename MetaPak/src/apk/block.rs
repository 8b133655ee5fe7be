//! `ZZZ0` compressed block framing
//!
//! Every stored entry is a 48-byte header followed by a raw LZ4 block,
//! zero padded up to the next 16-byte boundary. The header records both
//! the exact compressed length and the decompressed length, so padding
//! never reaches the decompressor.

use crate::compression;
use crate::error::{Error, Result};

use super::schema::{self, BLOCK_HEADER, FixedRecord};
use super::{BLOCK_ALIGNMENT, BLOCK_FLAGS, BLOCK_HEADER_SIZE, BLOCK_MAGIC};

/// Parsed view of a compressed block header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    pub magic: u32,
    /// Opaque bitfield, carried through untouched
    pub flags: u32,
    pub decompressed_size: u32,
    /// Header plus padded payload
    pub total_block_size: u32,
    /// Payload length before padding
    pub compressed_size: u32,
    pub header_size: u32,
}

impl BlockHeader {
    /// Header for a freshly compressed payload
    fn for_payload(decompressed_size: usize, compressed_size: usize) -> Result<Self> {
        let padded = compressed_size + padding_for(compressed_size);
        let to_field = |size: usize| -> Result<u32> {
            i32::try_from(size)
                .map(|v| v as u32)
                .map_err(|_| Error::BlockTooLarge { size })
        };

        Ok(Self {
            magic: BLOCK_MAGIC,
            flags: BLOCK_FLAGS,
            decompressed_size: to_field(decompressed_size)?,
            total_block_size: to_field(BLOCK_HEADER_SIZE + padded)?,
            compressed_size: to_field(compressed_size)?,
            header_size: BLOCK_HEADER_SIZE as u32,
        })
    }

    /// Parse the header at the start of a stored block
    ///
    /// # Errors
    /// Returns [`Error::TruncatedBlock`] if `block` is shorter than a header.
    pub fn parse(block: &[u8]) -> Result<Self> {
        let record = FixedRecord::from_bytes(&BLOCK_HEADER, block).ok_or(Error::TruncatedBlock {
            expected: BLOCK_HEADER_SIZE as u64,
            actual: block.len() as u64,
        })?;

        Ok(Self {
            magic: record.get_u32(&schema::block::MAGIC),
            flags: record.get_u32(&schema::block::FLAGS),
            decompressed_size: record.get_u32(&schema::block::DECOMPRESSED_SIZE),
            total_block_size: record.get_u32(&schema::block::TOTAL_BLOCK_SIZE),
            compressed_size: record.get_u32(&schema::block::COMPRESSED_SIZE),
            header_size: record.get_u32(&schema::block::HEADER_SIZE),
        })
    }

    fn to_record(self) -> FixedRecord {
        let mut record = FixedRecord::zeroed(&BLOCK_HEADER);
        record.set_u32(&schema::block::MAGIC, self.magic);
        record.set_u32(&schema::block::FLAGS, self.flags);
        record.set_u32(&schema::block::DECOMPRESSED_SIZE, self.decompressed_size);
        record.set_u32(&schema::block::TOTAL_BLOCK_SIZE, self.total_block_size);
        record.set_u32(&schema::block::COMPRESSED_SIZE, self.compressed_size);
        record.set_u32(&schema::block::HEADER_SIZE, self.header_size);
        record
    }
}

/// Zero bytes needed to bring `len` up to the block alignment
#[must_use]
pub fn padding_for(len: usize) -> usize {
    (BLOCK_ALIGNMENT - len % BLOCK_ALIGNMENT) % BLOCK_ALIGNMENT
}

/// Compress `data` and frame it, returning the header alongside the block bytes
pub(crate) fn frame(data: &[u8]) -> Result<(BlockHeader, Vec<u8>)> {
    let compressed = compression::compress(data)?;
    let header = BlockHeader::for_payload(data.len(), compressed.len())?;

    let mut block = Vec::with_capacity(header.total_block_size as usize);
    block.extend_from_slice(header.to_record().as_bytes());
    block.extend_from_slice(&compressed);
    block.resize(header.total_block_size as usize, 0);

    Ok((header, block))
}

/// Compress and frame a payload
///
/// The result is always `48 + n * 16` bytes long.
///
/// # Errors
/// Returns [`Error::BlockTooLarge`] if a size does not fit the header fields.
pub fn encode(data: &[u8]) -> Result<Vec<u8>> {
    frame(data).map(|(_, block)| block)
}

/// Decompress a stored block back into the original bytes
///
/// Trailing bytes after the compressed payload (the alignment padding) are ignored.
///
/// # Errors
/// Returns [`Error::TruncatedBlock`] if the block is shorter than its header
/// claims, or [`Error::DecompressionFailed`] if LZ4 rejects the payload.
pub fn decode(block: &[u8]) -> Result<Vec<u8>> {
    let header = BlockHeader::parse(block)?;

    if header.magic != BLOCK_MAGIC {
        tracing::warn!(
            "Unexpected block magic {:#010X} (expected {:#010X}), decoding anyway",
            header.magic,
            BLOCK_MAGIC
        );
    }
    if header.header_size as usize != BLOCK_HEADER_SIZE {
        tracing::warn!(
            "Block header declares size {:#X}, payload read from {:#X}",
            header.header_size,
            BLOCK_HEADER_SIZE
        );
    }

    let payload_end = BLOCK_HEADER_SIZE as u64 + u64::from(header.compressed_size);
    if payload_end > block.len() as u64 {
        return Err(Error::TruncatedBlock {
            expected: payload_end,
            actual: block.len() as u64,
        });
    }

    if header.decompressed_size == 0 {
        return Ok(Vec::new());
    }

    let payload = &block[BLOCK_HEADER_SIZE..payload_end as usize];
    compression::decompress(payload, header.decompressed_size as usize)
}
