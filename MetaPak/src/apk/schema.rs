//! Fixed-layout record schemas
//!
//! Every on-disk structure in an APK has a fixed size. Each one is declared
//! here once as an ordered list of `(offset, width, name)` fields, and
//! [`FixedRecord`] reads and writes values through those declarations, so no
//! other module spells out a byte offset.

use std::io::{self, Read, Write};
use std::ops::Range;

use byteorder::{ByteOrder, LittleEndian};

use super::{BLOCK_HEADER_SIZE, HEADER_SIZE, INDEX_RECORD_SIZE, NAME_LENGTH};

/// One field of a fixed-size record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub offset: usize,
    pub width: usize,
}

impl Field {
    #[must_use]
    pub const fn new(name: &'static str, offset: usize, width: usize) -> Self {
        Self { name, offset, width }
    }

    /// Offset one past the last byte of this field
    #[must_use]
    pub const fn end(&self) -> usize {
        self.offset + self.width
    }

    fn range(&self) -> Range<usize> {
        self.offset..self.end()
    }
}

/// Layout of a fixed-size record
#[derive(Debug, PartialEq, Eq)]
pub struct RecordSchema {
    pub name: &'static str,
    pub size: usize,
    pub fields: &'static [Field],
}

impl RecordSchema {
    /// Look up a field by name
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Check that fields are ordered, contiguous, and cover exactly `size` bytes
    ///
    /// # Errors
    /// Returns a description of the first gap, overlap or overrun found.
    pub fn validate(&self) -> std::result::Result<(), String> {
        let mut cursor = 0;
        for field in self.fields {
            if field.offset != cursor {
                return Err(format!(
                    "{}: field {} starts at {:#X}, expected {cursor:#X}",
                    self.name, field.name, field.offset
                ));
            }
            cursor = field.end();
        }
        if cursor != self.size {
            return Err(format!(
                "{}: fields cover {cursor:#X} bytes, record is {:#X}",
                self.name, self.size
            ));
        }
        Ok(())
    }
}

/// Container header fields
pub mod container {
    use super::Field;

    /// Magic + version. Opaque, preserved verbatim.
    pub const SIGNATURE: Field = Field::new("signature", 0x00, 8);
    pub const ENTRY_COUNT: Field = Field::new("entry_count", 0x08, 4);
    pub const RESERVED: Field = Field::new("reserved", 0x0C, 4);
}

/// Index record fields
pub mod index {
    use super::{Field, NAME_LENGTH};

    pub const NAME: Field = Field::new("name", 0x000, NAME_LENGTH);
    pub const STORED_SIZE: Field = Field::new("stored_size", 0x100, 4);
    pub const RESERVED_1: Field = Field::new("reserved_1", 0x104, 4);
    pub const RESERVED_2: Field = Field::new("reserved_2", 0x108, 4);
    pub const RESERVED_3: Field = Field::new("reserved_3", 0x10C, 4);
    pub const RESERVED_4: Field = Field::new("reserved_4", 0x110, 4);
    pub const RESERVED_5: Field = Field::new("reserved_5", 0x114, 4);
    pub const OFFSET: Field = Field::new("offset", 0x118, 4);
    pub const RESERVED_6: Field = Field::new("reserved_6", 0x11C, 4);

    /// Reserved fields in on-disk order
    pub const RESERVED: [Field; 6] =
        [RESERVED_1, RESERVED_2, RESERVED_3, RESERVED_4, RESERVED_5, RESERVED_6];
}

/// Compressed block header fields
pub mod block {
    use super::Field;

    pub const MAGIC: Field = Field::new("magic", 0x00, 4);
    pub const FLAGS: Field = Field::new("flags", 0x04, 4);
    pub const RESERVED_08: Field = Field::new("reserved_08", 0x08, 4);
    pub const DECOMPRESSED_SIZE: Field = Field::new("decompressed_size", 0x0C, 4);
    pub const TOTAL_BLOCK_SIZE: Field = Field::new("total_block_size", 0x10, 4);
    pub const RESERVED_14: Field = Field::new("reserved_14", 0x14, 12);
    pub const COMPRESSED_SIZE: Field = Field::new("compressed_size", 0x20, 4);
    pub const HEADER_SIZE: Field = Field::new("header_size", 0x24, 4);
    pub const RESERVED_28: Field = Field::new("reserved_28", 0x28, 8);
}

pub static CONTAINER_HEADER: RecordSchema = RecordSchema {
    name: "container header",
    size: HEADER_SIZE,
    fields: &[container::SIGNATURE, container::ENTRY_COUNT, container::RESERVED],
};

pub static INDEX_RECORD: RecordSchema = RecordSchema {
    name: "index record",
    size: INDEX_RECORD_SIZE,
    fields: &[
        index::NAME,
        index::STORED_SIZE,
        index::RESERVED_1,
        index::RESERVED_2,
        index::RESERVED_3,
        index::RESERVED_4,
        index::RESERVED_5,
        index::OFFSET,
        index::RESERVED_6,
    ],
};

pub static BLOCK_HEADER: RecordSchema = RecordSchema {
    name: "block header",
    size: BLOCK_HEADER_SIZE,
    fields: &[
        block::MAGIC,
        block::FLAGS,
        block::RESERVED_08,
        block::DECOMPRESSED_SIZE,
        block::TOTAL_BLOCK_SIZE,
        block::RESERVED_14,
        block::COMPRESSED_SIZE,
        block::HEADER_SIZE,
        block::RESERVED_28,
    ],
};

/// A record buffer laid out by a [`RecordSchema`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedRecord {
    schema: &'static RecordSchema,
    bytes: Vec<u8>,
}

impl FixedRecord {
    /// An all-zero record
    #[must_use]
    pub fn zeroed(schema: &'static RecordSchema) -> Self {
        Self {
            schema,
            bytes: vec![0u8; schema.size],
        }
    }

    /// Copy a record out of the front of `bytes`, or `None` if it is too short
    #[must_use]
    pub fn from_bytes(schema: &'static RecordSchema, bytes: &[u8]) -> Option<Self> {
        let bytes = bytes.get(..schema.size)?;
        Some(Self {
            schema,
            bytes: bytes.to_vec(),
        })
    }

    /// Read exactly one record
    pub fn read_from<R: Read>(schema: &'static RecordSchema, reader: &mut R) -> io::Result<Self> {
        let mut record = Self::zeroed(schema);
        reader.read_exact(&mut record.bytes)?;
        Ok(record)
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&self.bytes)
    }

    #[must_use]
    pub fn schema(&self) -> &'static RecordSchema {
        self.schema
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    #[must_use]
    pub fn get_bytes(&self, field: &Field) -> &[u8] {
        self.check(field);
        &self.bytes[field.range()]
    }

    /// Store `value` in `field`, zero filling the rest. Excess bytes are dropped.
    pub fn set_bytes(&mut self, field: &Field, value: &[u8]) {
        self.check(field);
        let slot = &mut self.bytes[field.range()];
        let len = value.len().min(slot.len());
        slot[..len].copy_from_slice(&value[..len]);
        slot[len..].fill(0);
    }

    #[must_use]
    pub fn get_i32(&self, field: &Field) -> i32 {
        debug_assert_eq!(field.width, 4, "{} is not a 32-bit field", field.name);
        LittleEndian::read_i32(self.get_bytes(field))
    }

    #[must_use]
    pub fn get_u32(&self, field: &Field) -> u32 {
        debug_assert_eq!(field.width, 4, "{} is not a 32-bit field", field.name);
        LittleEndian::read_u32(self.get_bytes(field))
    }

    pub fn set_i32(&mut self, field: &Field, value: i32) {
        debug_assert_eq!(field.width, 4, "{} is not a 32-bit field", field.name);
        self.check(field);
        LittleEndian::write_i32(&mut self.bytes[field.range()], value);
    }

    pub fn set_u32(&mut self, field: &Field, value: u32) {
        debug_assert_eq!(field.width, 4, "{} is not a 32-bit field", field.name);
        self.check(field);
        LittleEndian::write_u32(&mut self.bytes[field.range()], value);
    }

    fn check(&self, field: &Field) {
        debug_assert!(
            self.schema.fields.contains(field),
            "{} does not belong to {}",
            field.name,
            self.schema.name
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schemas_cover_their_records() {
        for schema in [&CONTAINER_HEADER, &INDEX_RECORD, &BLOCK_HEADER] {
            schema.validate().unwrap();
        }
    }

    #[test]
    fn test_index_record_layout() {
        assert_eq!(INDEX_RECORD.size, 0x120);
        assert_eq!(INDEX_RECORD.field("stored_size"), Some(&index::STORED_SIZE));
        assert_eq!(index::STORED_SIZE.offset, NAME_LENGTH);
        assert_eq!(index::OFFSET.offset, NAME_LENGTH + 0x18);
        assert_eq!(INDEX_RECORD.field("missing"), None);
    }

    #[test]
    fn test_validate_reports_gaps() {
        static GAPPY: RecordSchema = RecordSchema {
            name: "gappy",
            size: 8,
            fields: &[Field::new("a", 0, 2), Field::new("b", 4, 4)],
        };
        let err = GAPPY.validate().unwrap_err();
        assert!(err.contains("field b"), "{err}");
    }

    #[test]
    fn test_record_field_access() {
        let mut record = FixedRecord::zeroed(&BLOCK_HEADER);
        record.set_u32(&block::MAGIC, 0x305A5A5A);
        record.set_u32(&block::COMPRESSED_SIZE, 0x1234);
        assert_eq!(&record.as_bytes()[..4], b"ZZZ0");
        assert_eq!(&record.as_bytes()[0x20..0x24], &[0x34, 0x12, 0, 0]);
        assert_eq!(record.get_u32(&block::COMPRESSED_SIZE), 0x1234);

        let mut header = FixedRecord::zeroed(&CONTAINER_HEADER);
        header.set_i32(&container::ENTRY_COUNT, -1);
        assert_eq!(header.get_i32(&container::ENTRY_COUNT), -1);
    }

    #[test]
    fn test_set_bytes_pads_and_truncates() {
        let mut record = FixedRecord::zeroed(&CONTAINER_HEADER);
        record.set_bytes(&container::SIGNATURE, b"PACKxxxxOVERFLOW");
        assert_eq!(record.get_bytes(&container::SIGNATURE), b"PACKxxxx");
        record.set_bytes(&container::SIGNATURE, b"AB");
        assert_eq!(record.get_bytes(&container::SIGNATURE), b"AB\0\0\0\0\0\0");
        assert_eq!(record.get_i32(&container::ENTRY_COUNT), 0);
    }

    #[test]
    fn test_from_bytes_requires_full_record() {
        assert!(FixedRecord::from_bytes(&CONTAINER_HEADER, &[0u8; 15]).is_none());
        let record = FixedRecord::from_bytes(&CONTAINER_HEADER, &[1u8; 20]).unwrap();
        assert_eq!(record.as_bytes().len(), 16);
    }
}
