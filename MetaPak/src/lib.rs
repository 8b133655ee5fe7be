//! # MetaPak
//!
//! A pure-Rust library for the APK texture container (magic `PACK`).
//!
//! An archive holds a flat index of named entries, each stored as an LZ4
//! block behind a small `ZZZ0` header. `MetaPak` unpacks an archive into a
//! directory of plain files plus a `FileList.txt` manifest recording entry
//! order, and packs such a directory back into an archive.
//!
//! ## Quick Start
//!
//! ```no_run
//! use metapak::apk::ApkOperations;
//!
//! // List contents of an archive
//! let entries = ApkOperations::list("ui_tex.apk")?;
//! println!("Found {} entries", entries.len());
//!
//! // Unpack, then pack the directory back up
//! ApkOperations::unpack("ui_tex.apk", "ui_tex/")?;
//! ApkOperations::pack("ui_tex/", "ui_tex_new.apk")?;
//!
//! // Read a specific entry without extracting
//! let data = ApkOperations::read_entry_bytes("ui_tex.apk", "tex0.dds")?;
//! # Ok::<(), metapak::Error>(())
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` - Enables the `metapak` command-line binary

pub mod apk;
pub mod compression;
pub mod error;

// Re-exports for convenience
pub use error::{Error, Result};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::apk::{
        ApkHeader, ApkOperations, ApkPhase, ApkProgress, ApkReader, ApkWriter, ArchiveEntry,
        CompressedBlock, Manifest, PackOptions, PackResult, UnpackOptions, UnpackResult,
        VerifyReport,
    };
    pub use crate::error::{Error, Result};
}

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// CLI module (feature-gated)
#[cfg(feature = "cli")]
pub mod cli;
