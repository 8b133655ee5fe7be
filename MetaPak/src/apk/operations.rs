//! Core APK archive operations

use std::collections::HashSet;
use std::fs::File;
use std::io::{self, BufWriter, Read, Seek};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;
use walkdir::WalkDir;

use crate::error::{Error, Result};

use super::manifest::is_manifest_name;
use super::names::{encode_name, entry_relative_path, normalize};
use super::{
    ApkPhase, ApkProgress, ApkReader, ApkWriter, ArchiveEntry, CompressedBlock,
    MANIFEST_FILE_NAME, Manifest, PackOptions, PackResult, ProgressCallback, UnpackOptions,
    UnpackResult, VerifyReport,
};

/// A file found while scanning a directory to pack
struct SourceFile {
    /// Path relative to the input directory, `/` separated
    name: String,
    path: PathBuf,
}

/// High-level APK archive operations.
pub struct ApkOperations;

impl ApkOperations {
    /// Directory an archive unpacks into by default: `<dir>/<stem>/` next to the archive
    #[must_use]
    pub fn default_unpack_dir(apk_path: &Path) -> PathBuf {
        let stem = apk_path.file_stem().unwrap_or(apk_path.as_os_str());
        apk_path.with_file_name(stem)
    }

    /// Archive a directory packs into by default: `<dir>.apk` next to the directory
    ///
    /// # Errors
    /// Returns an IO error if the directory has no usable name.
    pub fn default_pack_path(input_dir: &Path) -> Result<PathBuf> {
        let dir = if input_dir.file_name().is_some() {
            input_dir.to_path_buf()
        } else {
            input_dir.canonicalize()?
        };
        let name = dir.file_name().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("cannot derive an archive name from {}", input_dir.display()),
            )
        })?;

        let mut file_name = name.to_os_string();
        file_name.push(".apk");
        Ok(dir.with_file_name(file_name))
    }

    /// List the index of an archive
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be opened.
    /// Returns [`Error::TruncatedHeader`] if the header or index is cut short.
    ///
    /// [`Error::Io`]: crate::Error::Io
    /// [`Error::TruncatedHeader`]: crate::Error::TruncatedHeader
    pub fn list<P: AsRef<Path>>(apk_path: P) -> Result<Vec<ArchiveEntry>> {
        let mut reader = ApkReader::new(File::open(apk_path.as_ref())?);
        reader.list_entries()
    }

    /// Read and decompress one entry without extracting anything
    ///
    /// Separators are compared loosely, so `ui/a.dds` finds `ui\a.dds`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EntryNotFound`] if no entry has that name.
    ///
    /// [`Error::EntryNotFound`]: crate::Error::EntryNotFound
    pub fn read_entry_bytes<P: AsRef<Path>>(apk_path: P, name: &str) -> Result<Vec<u8>> {
        let mut reader = ApkReader::new(File::open(apk_path.as_ref())?);
        let wanted = normalize(name);
        let entry = reader
            .list_entries()?
            .into_iter()
            .find(|e| normalize(&e.name) == wanted)
            .ok_or_else(|| Error::EntryNotFound(name.to_string()))?;
        reader.decompress_entry(&entry)
    }

    /// Unpack an archive into a directory, writing `FileList.txt` alongside
    ///
    /// # Errors
    ///
    /// Returns the first entry failure; see [`Self::unpack_with_options`].
    pub fn unpack<P: AsRef<Path>>(apk_path: P, output_dir: P) -> Result<UnpackResult> {
        Self::unpack_with_options(apk_path, output_dir, &UnpackOptions::default(), &|_| {})
    }

    /// Unpack an archive with options and a progress callback
    ///
    /// Entry names are validated before anything is written. Each entry is
    /// decoded and written in archive order; the manifest is written last.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEntryName`] or [`Error::DuplicateEntryName`] if
    /// an entry cannot be placed on disk.
    /// Returns [`Error::EntryFailed`] for the first failing entry, unless
    /// `keep_going` is set, in which case [`Error::PartialExtraction`] is
    /// returned after every entry has been attempted.
    ///
    /// [`Error::InvalidEntryName`]: crate::Error::InvalidEntryName
    /// [`Error::DuplicateEntryName`]: crate::Error::DuplicateEntryName
    /// [`Error::EntryFailed`]: crate::Error::EntryFailed
    /// [`Error::PartialExtraction`]: crate::Error::PartialExtraction
    pub fn unpack_with_options<P: AsRef<Path>>(
        apk_path: P,
        output_dir: P,
        options: &UnpackOptions,
        progress: ProgressCallback,
    ) -> Result<UnpackResult> {
        let apk_path = apk_path.as_ref();
        let output_dir = output_dir.as_ref();

        progress(&ApkProgress::new(ApkPhase::ReadingIndex, 1, 1));
        let mut reader = ApkReader::new(File::open(apk_path)?);
        let entries = reader.list_entries()?;

        tracing::info!(
            "Unpacking {} entries from {} into {}",
            entries.len(),
            apk_path.display(),
            output_dir.display()
        );

        let targets = Self::plan_targets(&entries, output_dir)?;
        std::fs::create_dir_all(output_dir)?;

        let total = entries.len();
        let mut failures: Vec<String> = Vec::new();

        for (i, (entry, target)) in entries.iter().zip(&targets).enumerate() {
            progress(&ApkProgress::with_file(ApkPhase::ExtractingFiles, i + 1, total, &entry.name));

            match Self::extract_entry(&mut reader, entry, target) {
                Ok(size) => {
                    tracing::debug!("Saved {} ({size} bytes) to {}", entry.name, target.display());
                }
                Err(e) if options.keep_going => {
                    tracing::warn!("Failed to extract {}: {}", entry.name, e);
                    failures.push(e.to_string());
                }
                Err(e) => return Err(e),
            }
        }

        progress(&ApkProgress::new(ApkPhase::WritingManifest, total, total));
        let manifest = Manifest::from_names(entries.iter().map(|e| e.name.clone()))?;
        let manifest_path = output_dir.join(MANIFEST_FILE_NAME);
        manifest.save(&manifest_path)?;

        if let Some(first_error) = failures.first() {
            return Err(Error::PartialExtraction {
                total,
                failed: failures.len(),
                first_error: first_error.clone(),
            });
        }

        progress(&ApkProgress::new(ApkPhase::Complete, total, total));
        tracing::info!("Unpacked {} entries", total);

        Ok(UnpackResult {
            output_dir: output_dir.to_path_buf(),
            manifest_path,
            entries,
        })
    }

    /// Map every entry to its output path, rejecting names that cannot be written safely
    fn plan_targets(entries: &[ArchiveEntry], output_dir: &Path) -> Result<Vec<PathBuf>> {
        let mut seen = HashSet::with_capacity(entries.len());
        let mut targets = Vec::with_capacity(entries.len());

        for entry in entries {
            let relative = entry_relative_path(&entry.name)?;
            if is_manifest_name(relative.as_os_str()) {
                return Err(Error::InvalidEntryName {
                    name: entry.name.clone(),
                    reason: "collides with the manifest file",
                });
            }
            if !seen.insert(normalize(&entry.name)) {
                return Err(Error::DuplicateEntryName {
                    name: entry.name.clone(),
                });
            }
            targets.push(output_dir.join(relative));
        }

        Ok(targets)
    }

    fn extract_entry<R: Read + Seek>(
        reader: &mut ApkReader<R>,
        entry: &ArchiveEntry,
        target: &Path,
    ) -> Result<usize> {
        let data = reader.decompress_entry(entry)?;
        let write = || -> io::Result<()> {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(target, &data)
        };
        write().map_err(|e| Error::Io(e).in_entry(&entry.name, entry.offset as u32 as u64))?;
        Ok(data.len())
    }

    /// Pack a directory into an archive using its `FileList.txt` for ordering
    ///
    /// # Errors
    ///
    /// See [`Self::pack_with_options`].
    pub fn pack<P: AsRef<Path>>(input_dir: P, output_path: P) -> Result<PackResult> {
        Self::pack_with_options(input_dir, output_path, &PackOptions::default(), &|_| {})
    }

    /// Pack a directory with options and a progress callback
    ///
    /// All validation, reading and compression happen before the output is
    /// touched, and the archive is staged in a temporary file that only
    /// replaces `output_path` once complete.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ManifestNotFound`] if files exist but no manifest does.
    /// Returns [`Error::UnlistedFile`] or [`Error::MissingManifestEntry`] if the
    /// manifest and directory disagree.
    /// Returns [`Error::NameTooLong`] or [`Error::NonAsciiName`] for names the
    /// index cannot hold.
    ///
    /// [`Error::ManifestNotFound`]: crate::Error::ManifestNotFound
    /// [`Error::UnlistedFile`]: crate::Error::UnlistedFile
    /// [`Error::MissingManifestEntry`]: crate::Error::MissingManifestEntry
    /// [`Error::NameTooLong`]: crate::Error::NameTooLong
    /// [`Error::NonAsciiName`]: crate::Error::NonAsciiName
    pub fn pack_with_options<P: AsRef<Path>>(
        input_dir: P,
        output_path: P,
        options: &PackOptions,
        progress: ProgressCallback,
    ) -> Result<PackResult> {
        let input_dir = input_dir.as_ref();
        let output_path = output_path.as_ref();

        progress(&ApkProgress::new(ApkPhase::ScanningFiles, 0, 1));
        let files = Self::scan_directory(input_dir)?;

        let manifest_path = input_dir.join(MANIFEST_FILE_NAME);
        let manifest = if manifest_path.is_file() {
            Manifest::load(&manifest_path)?
        } else if files.is_empty() {
            Manifest::new()
        } else {
            return Err(Error::ManifestNotFound {
                path: manifest_path,
            });
        };

        let ordered = manifest.order(files, |f| f.name.as_str())?;
        for (name, _) in &ordered {
            encode_name(name)?;
        }

        tracing::info!(
            "Packing {} files from {} into {}",
            ordered.len(),
            input_dir.display(),
            output_path.display()
        );

        let total = ordered.len();
        let compressed = AtomicUsize::new(0);
        let encode = |(name, file): &(String, SourceFile)| -> Result<CompressedBlock> {
            let current = compressed.fetch_add(1, Ordering::SeqCst) + 1;
            progress(&ApkProgress::with_file(ApkPhase::CompressingFiles, current, total, name));

            let contents = std::fs::read(&file.path)?;
            let block = CompressedBlock::encode(name.clone(), &contents)?;
            tracing::debug!(
                "Compressed {} ({} -> {} bytes)",
                name,
                block.decompressed_size,
                block.compressed_size
            );
            Ok(block)
        };

        let mut blocks = if options.parallel {
            ordered.par_iter().map(encode).collect::<Result<Vec<_>>>()?
        } else {
            ordered.iter().map(encode).collect::<Result<Vec<_>>>()?
        };

        let parent = output_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        std::fs::create_dir_all(parent)?;

        let mut staging = tempfile::NamedTempFile::new_in(parent)?;
        let entries = {
            let mut writer = ApkWriter::new(BufWriter::new(staging.as_file_mut()));
            if let Some(signature) = options.signature {
                writer = writer.with_signature(signature);
            }
            writer.write_blocks(&mut blocks, progress)?
        };
        staging.persist(output_path).map_err(|e| Error::Io(e.error))?;

        progress(&ApkProgress::new(ApkPhase::Complete, total, total));
        tracing::info!("APK created: {}", output_path.display());

        Ok(PackResult {
            output_path: output_path.to_path_buf(),
            entries,
        })
    }

    /// Collect packable files below `input_dir`, skipping the manifest itself
    fn scan_directory(input_dir: &Path) -> Result<Vec<SourceFile>> {
        let mut files = Vec::new();

        for entry in WalkDir::new(input_dir).min_depth(1).sort_by_file_name() {
            let entry = entry?;

            // Symlinks and directories are not entries
            if !entry.file_type().is_file() {
                continue;
            }
            if entry.file_name() == ".DS_Store" {
                continue;
            }
            if entry.depth() == 1 && is_manifest_name(entry.file_name()) {
                continue;
            }

            let relative = entry
                .path()
                .strip_prefix(input_dir)
                .map_err(|e| Error::WalkDirError(e.to_string()))?;

            let mut parts = Vec::new();
            for component in relative.components() {
                let part = component.as_os_str();
                let Some(part) = part.to_str() else {
                    return Err(Error::NonAsciiName {
                        name: relative.to_string_lossy().into_owned(),
                    });
                };
                parts.push(part);
            }

            files.push(SourceFile {
                name: parts.join("/"),
                path: entry.path().to_path_buf(),
            });
        }

        Ok(files)
    }

    /// Check an archive's layout and decode every entry
    ///
    /// # Errors
    ///
    /// Returns the first layout violation or entry failure.
    pub fn verify<P: AsRef<Path>>(apk_path: P) -> Result<VerifyReport> {
        Self::verify_with_progress(apk_path, &|_| {})
    }

    /// Verify with a progress callback
    ///
    /// # Errors
    ///
    /// Returns [`Error::LayoutOverlap`] or [`Error::TruncatedEntry`] for a bad
    /// layout, or [`Error::EntryFailed`] for an entry that does not decode.
    ///
    /// [`Error::LayoutOverlap`]: crate::Error::LayoutOverlap
    /// [`Error::TruncatedEntry`]: crate::Error::TruncatedEntry
    /// [`Error::EntryFailed`]: crate::Error::EntryFailed
    pub fn verify_with_progress<P: AsRef<Path>>(
        apk_path: P,
        progress: ProgressCallback,
    ) -> Result<VerifyReport> {
        progress(&ApkProgress::new(ApkPhase::ReadingIndex, 1, 1));
        let mut reader = ApkReader::new(File::open(apk_path.as_ref())?);
        let entries = reader.list_entries()?;
        reader.check_layout()?;

        let total = entries.len();
        let mut report = VerifyReport::default();
        for (i, entry) in entries.iter().enumerate() {
            progress(&ApkProgress::with_file(ApkPhase::Verifying, i + 1, total, &entry.name));
            let data = reader.decompress_entry(entry)?;
            report.entries += 1;
            report.decompressed_bytes += data.len() as u64;
        }

        progress(&ApkProgress::new(ApkPhase::Complete, total, total));
        Ok(report)
    }
}
