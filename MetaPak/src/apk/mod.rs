//! APK texture container reader/writer
//!
//! An APK is a flat container: a 16-byte header, a fixed-size index of
//! 0x120-byte records, then one LZ4 compressed block per entry. Each block
//! carries its own 48-byte `ZZZ0` header in front of the compressed bytes.

pub mod block;
mod manifest;
mod names;
mod operations;
mod options;
pub mod schema;
mod reader;
mod types;
mod writer;

pub use manifest::{Manifest, MANIFEST_FILE_NAME};
pub use names::{decode_name, encode_name, entry_relative_path};
pub use operations::ApkOperations;
pub use options::{PackOptions, PackResult, UnpackOptions, UnpackResult, VerifyReport};
pub use reader::ApkReader;
pub use types::*;
pub use writer::ApkWriter;

/// Default leading signature written by the packer ("PACK")
pub const MAGIC: [u8; 4] = *b"PACK";

/// Default container version written by the packer
pub const VERSION: u32 = 0x10000;

/// Size of the container header
pub const HEADER_SIZE: usize = 0x10;

/// Size of one index record
pub const INDEX_RECORD_SIZE: usize = 0x120;

/// Length of the null-padded name field in an index record
pub const NAME_LENGTH: usize = 0x100;

/// Magic of a compressed block header ("ZZZ0")
pub const BLOCK_MAGIC: u32 = 0x305A5A5A;

/// Flags written into every compressed block header
pub const BLOCK_FLAGS: u32 = 0x00010001;

/// Size of the compressed block header
pub const BLOCK_HEADER_SIZE: usize = 0x30;

/// Compressed payloads are zero padded to this alignment
pub const BLOCK_ALIGNMENT: usize = 0x10;

/// Progress callback for APK operations.
///
/// Receives an [`ApkProgress`] with phase, current/total counts, and optional entry name.
/// Must be `Sync + Send` so compression can report from worker threads.
pub type ProgressCallback<'a> = &'a (dyn Fn(&ApkProgress) + Sync + Send);
