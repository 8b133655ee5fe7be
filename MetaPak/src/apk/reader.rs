//! APK container reader

use std::io::{BufReader, Read, Seek, SeekFrom};

use crate::error::{Error, Result};

use super::block;
use super::schema::{CONTAINER_HEADER, FixedRecord, INDEX_RECORD};
use super::{ApkHeader, ArchiveEntry, HEADER_SIZE, INDEX_RECORD_SIZE, MAGIC};

/// APK container reader
pub struct ApkReader<R: Read + Seek> {
    reader: BufReader<R>,
    header: Option<ApkHeader>,
    entries: Vec<ArchiveEntry>,
    index_loaded: bool,
    file_len: u64,
}

impl<R: Read + Seek> ApkReader<R> {
    /// Create a new reader from a Read + Seek source
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            header: None,
            entries: Vec::new(),
            index_loaded: false,
            file_len: 0,
        }
    }

    /// Read and parse the container header
    ///
    /// The leading signature is not validated; only its presence is required.
    ///
    /// # Errors
    /// Returns [`Error::TruncatedHeader`] if the source is shorter than a header.
    pub fn read_header(&mut self) -> Result<ApkHeader> {
        self.file_len = self.reader.seek(SeekFrom::End(0))?;
        if self.file_len < HEADER_SIZE as u64 {
            return Err(Error::TruncatedHeader {
                expected: HEADER_SIZE as u64,
                actual: self.file_len,
            });
        }

        self.reader.seek(SeekFrom::Start(0))?;
        let record = FixedRecord::read_from(&CONTAINER_HEADER, &mut self.reader)?;
        let header = ApkHeader::from_record(&record);

        if header.magic() != MAGIC {
            tracing::debug!(
                "Unexpected container magic {:02X?}, continuing",
                header.magic()
            );
        }

        self.header = Some(header);
        Ok(header)
    }

    /// Read the full index, in on-disk order
    ///
    /// # Errors
    /// Returns [`Error::InvalidEntryCount`] for a negative count, or
    /// [`Error::TruncatedHeader`] if the file cannot hold the declared index.
    pub fn read_index(&mut self) -> Result<&[ArchiveEntry]> {
        let header = match self.header {
            Some(header) => header,
            None => self.read_header()?,
        };

        let count = usize::try_from(header.entry_count)
            .map_err(|_| Error::InvalidEntryCount(header.entry_count))?;

        let index_end = HEADER_SIZE as u64 + count as u64 * INDEX_RECORD_SIZE as u64;
        if self.file_len < index_end {
            return Err(Error::TruncatedHeader {
                expected: index_end,
                actual: self.file_len,
            });
        }

        self.reader.seek(SeekFrom::Start(HEADER_SIZE as u64))?;
        let mut table = vec![0u8; count * INDEX_RECORD_SIZE];
        self.reader.read_exact(&mut table)?;

        self.entries = table
            .chunks_exact(INDEX_RECORD_SIZE)
            .filter_map(|chunk| FixedRecord::from_bytes(&INDEX_RECORD, chunk))
            .map(|record| ArchiveEntry::from_record(&record))
            .collect();
        self.index_loaded = true;

        for entry in &self.entries {
            tracing::debug!(
                "Name: {}, FileSize: {:#010X}, Offset: {:#010X}",
                entry.name,
                entry.stored_size,
                entry.offset
            );
        }

        Ok(&self.entries)
    }

    /// List entries, reading the header and index on first use
    ///
    /// # Errors
    /// Returns an error if the header or index cannot be read.
    pub fn list_entries(&mut self) -> Result<Vec<ArchiveEntry>> {
        if !self.index_loaded {
            self.read_index()?;
        }
        Ok(self.entries.clone())
    }

    /// Read an entry's stored block (inner header and padding included)
    ///
    /// # Errors
    /// Returns [`Error::InvalidEntry`] or [`Error::TruncatedEntry`] if the
    /// index record points outside the file.
    pub fn read_block(&mut self, entry: &ArchiveEntry) -> Result<Vec<u8>> {
        if self.header.is_none() {
            self.read_header()?;
        }

        let (offset, size) = entry.block_range()?;
        if offset + size > self.file_len {
            return Err(Error::TruncatedEntry {
                name: entry.name.clone(),
                offset,
                size,
                file_len: self.file_len,
            });
        }

        self.reader.seek(SeekFrom::Start(offset))?;
        let mut data = vec![0u8; size as usize];
        self.reader.read_exact(&mut data)?;
        Ok(data)
    }

    /// Read and decompress a single entry
    ///
    /// # Errors
    /// Returns [`Error::EntryFailed`] naming the entry and its offset.
    pub fn decompress_entry(&mut self, entry: &ArchiveEntry) -> Result<Vec<u8>> {
        self.read_block(entry)
            .and_then(|data| block::decode(&data))
            .map_err(|e| e.in_entry(&entry.name, entry.offset as u32 as u64))
    }

    /// Check that every block sits after the index, inside the file, and
    /// does not overlap any other block
    ///
    /// # Errors
    /// Returns [`Error::LayoutOverlap`], [`Error::TruncatedEntry`] or
    /// [`Error::InvalidEntry`] for the first violation found.
    pub fn check_layout(&mut self) -> Result<()> {
        let entries = self.list_entries()?;
        let index_end = HEADER_SIZE as u64 + entries.len() as u64 * INDEX_RECORD_SIZE as u64;

        let mut ranges = Vec::with_capacity(entries.len());
        for entry in &entries {
            let (offset, size) = entry.block_range()?;
            if offset < index_end {
                return Err(Error::LayoutOverlap {
                    name: entry.name.clone(),
                    offset,
                    other: "the index".to_string(),
                });
            }
            if offset + size > self.file_len {
                return Err(Error::TruncatedEntry {
                    name: entry.name.clone(),
                    offset,
                    size,
                    file_len: self.file_len,
                });
            }
            ranges.push((offset, offset + size, &entry.name));
        }

        ranges.sort_by_key(|&(start, end, _)| (start, end));
        for pair in ranges.windows(2) {
            let (_, prev_end, prev_name) = pair[0];
            let (start, _, name) = pair[1];
            if start < prev_end {
                return Err(Error::LayoutOverlap {
                    name: name.clone(),
                    offset: start,
                    other: prev_name.clone(),
                });
            }
        }

        Ok(())
    }

    /// Get the header, if read
    pub fn header(&self) -> Option<&ApkHeader> {
        self.header.as_ref()
    }

    /// Get the number of entries, if the header has been read
    pub fn entry_count(&self) -> Option<i32> {
        self.header.as_ref().map(|h| h.entry_count)
    }

    /// Length of the underlying source, once the header has been read
    pub fn file_len(&self) -> u64 {
        self.file_len
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn header_bytes(count: i32) -> Vec<u8> {
        let mut bytes = b"PACK\0\0\x01\0".to_vec();
        bytes.extend_from_slice(&count.to_le_bytes());
        bytes.extend_from_slice(&0i32.to_le_bytes());
        bytes
    }

    fn record_bytes(name: &str, size: i32, offset: i32) -> Vec<u8> {
        let mut bytes = vec![0u8; INDEX_RECORD_SIZE];
        bytes[..name.len()].copy_from_slice(name.as_bytes());
        bytes[0x100..0x104].copy_from_slice(&size.to_le_bytes());
        bytes[0x118..0x11C].copy_from_slice(&offset.to_le_bytes());
        bytes
    }

    #[test]
    fn test_short_file_is_truncated_header() {
        let mut reader = ApkReader::new(Cursor::new(vec![0u8; 12]));
        let err = reader.read_header().unwrap_err();
        assert!(matches!(err, Error::TruncatedHeader { expected: 16, actual: 12 }));
    }

    #[test]
    fn test_index_shorter_than_declared() {
        let mut bytes = header_bytes(2);
        bytes.extend(record_bytes("tex0.dds", 0, 0));
        let mut reader = ApkReader::new(Cursor::new(bytes));
        let err = reader.read_index().unwrap_err();
        assert!(matches!(
            err,
            Error::TruncatedHeader { expected: 0x250, actual: 0x130 }
        ));
    }

    #[test]
    fn test_negative_count() {
        let mut reader = ApkReader::new(Cursor::new(header_bytes(-3)));
        assert!(matches!(reader.read_index(), Err(Error::InvalidEntryCount(-3))));
    }

    #[test]
    fn test_empty_container() {
        let mut reader = ApkReader::new(Cursor::new(header_bytes(0)));
        assert!(reader.list_entries().unwrap().is_empty());
        assert_eq!(reader.entry_count(), Some(0));
        reader.check_layout().unwrap();
    }

    #[test]
    fn test_reads_entries_in_disk_order() {
        let data = block::encode(b"second texture").unwrap();
        let first = block::encode(b"first texture").unwrap();
        let base = 0x10 + 2 * INDEX_RECORD_SIZE;

        let mut bytes = header_bytes(2);
        bytes.extend(record_bytes("z.dds", first.len() as i32, base as i32));
        bytes.extend(record_bytes("a.dds", data.len() as i32, (base + first.len()) as i32));
        bytes.extend(&first);
        bytes.extend(&data);

        let mut reader = ApkReader::new(Cursor::new(bytes));
        let entries = reader.list_entries().unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["z.dds", "a.dds"]);

        reader.check_layout().unwrap();
        assert_eq!(reader.decompress_entry(&entries[0]).unwrap(), b"first texture");
        assert_eq!(reader.decompress_entry(&entries[1]).unwrap(), b"second texture");
    }

    #[test]
    fn test_block_past_eof() {
        let mut bytes = header_bytes(1);
        bytes.extend(record_bytes("a.dds", 0x100, 0x130));
        bytes.extend(vec![0u8; 0x20]);

        let mut reader = ApkReader::new(Cursor::new(bytes));
        let entries = reader.list_entries().unwrap();
        let err = reader.decompress_entry(&entries[0]).unwrap_err();
        match err {
            Error::EntryFailed { name, offset, source } => {
                assert_eq!(name, "a.dds");
                assert_eq!(offset, 0x130);
                assert!(matches!(*source, Error::TruncatedEntry { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_overlapping_entries() {
        let block = block::encode(&[9u8; 64]).unwrap();
        let base = (0x10 + 2 * INDEX_RECORD_SIZE) as i32;

        let mut bytes = header_bytes(2);
        bytes.extend(record_bytes("a.dds", block.len() as i32, base));
        bytes.extend(record_bytes("b.dds", block.len() as i32, base + 16));
        bytes.extend(&block);
        bytes.extend(vec![0u8; 16]);

        let mut reader = ApkReader::new(Cursor::new(bytes));
        let err = reader.check_layout().unwrap_err();
        assert!(matches!(err, Error::LayoutOverlap { ref name, .. } if name == "b.dds"));
    }

    #[test]
    fn test_entry_inside_index() {
        let mut bytes = header_bytes(1);
        bytes.extend(record_bytes("a.dds", 0x10, 0x20));
        let mut reader = ApkReader::new(Cursor::new(bytes));
        assert!(matches!(reader.check_layout(), Err(Error::LayoutOverlap { .. })));
    }
}
