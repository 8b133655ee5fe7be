//! Entry name handling
//!
//! Names live in a 256-byte null-padded ASCII field. They may contain `/`
//! or `\` separators, which map to subdirectories on disk.

use std::path::PathBuf;

use crate::error::{Error, Result};

use super::NAME_LENGTH;

/// Encode a name into the fixed name field
///
/// At least one trailing NUL must fit, so the longest accepted name is 255 bytes.
///
/// # Errors
/// Returns [`Error::NonAsciiName`], [`Error::NameTooLong`] or
/// [`Error::InvalidEntryName`] (empty, embedded NUL or other control character).
pub fn encode_name(name: &str) -> Result<[u8; NAME_LENGTH]> {
    if name.is_empty() {
        return Err(Error::InvalidEntryName {
            name: name.to_string(),
            reason: "name is empty",
        });
    }
    if !name.is_ascii() {
        return Err(Error::NonAsciiName {
            name: name.to_string(),
        });
    }
    if name.len() >= NAME_LENGTH {
        return Err(Error::NameTooLong {
            name: name.to_string(),
            len: name.len(),
        });
    }
    if name.contains('\0') {
        return Err(Error::InvalidEntryName {
            name: name.to_string(),
            reason: "contains a NUL byte",
        });
    }
    if has_control_char(name) {
        return Err(Error::InvalidEntryName {
            name: name.to_string(),
            reason: "contains a control character",
        });
    }

    let mut field = [0u8; NAME_LENGTH];
    field[..name.len()].copy_from_slice(name.as_bytes());
    Ok(field)
}

/// Decode a name field, dropping the trailing NUL padding
pub fn decode_name(field: &[u8]) -> String {
    let end = field.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    String::from_utf8_lossy(&field[..end]).into_owned()
}

/// Control characters (line breaks included) cannot round-trip through the manifest
fn has_control_char(name: &str) -> bool {
    name.bytes().any(|b| b.is_ascii_control())
}

/// Split a name on either separator style
pub(crate) fn components(name: &str) -> impl Iterator<Item = &str> {
    name.split(['/', '\\'])
}

/// Name with `\` separators rewritten to `/`
pub(crate) fn normalize(name: &str) -> String {
    name.replace('\\', "/")
}

/// Map an entry name to a relative path that cannot escape the output directory
///
/// # Errors
/// Returns [`Error::InvalidEntryName`] for empty, absolute, or parent-relative names.
pub fn entry_relative_path(name: &str) -> Result<PathBuf> {
    let reject = |reason| Error::InvalidEntryName {
        name: name.to_string(),
        reason,
    };

    if name.is_empty() {
        return Err(reject("name is empty"));
    }
    if name.contains(':') {
        return Err(reject("contains a drive or stream separator"));
    }
    if has_control_char(name) {
        return Err(reject("contains a control character"));
    }

    let mut path = PathBuf::new();
    for component in components(name) {
        match component {
            "" => return Err(reject("empty path component")),
            "." | ".." => return Err(reject("relative path component")),
            _ => path.push(component),
        }
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_roundtrip() {
        let field = encode_name("tex0.dds").unwrap();
        assert_eq!(&field[..8], b"tex0.dds");
        assert!(field[8..].iter().all(|&b| b == 0));
        assert_eq!(decode_name(&field), "tex0.dds");
    }

    #[test]
    fn test_name_length_boundary() {
        let longest = "a".repeat(255);
        let field = encode_name(&longest).unwrap();
        assert_eq!(decode_name(&field), longest);

        let too_long = "a".repeat(256);
        assert!(matches!(
            encode_name(&too_long),
            Err(Error::NameTooLong { len: 256, .. })
        ));
    }

    #[test]
    fn test_name_rejects_non_ascii_and_nul() {
        assert!(matches!(encode_name("tëx.dds"), Err(Error::NonAsciiName { .. })));
        assert!(matches!(encode_name("a\0b"), Err(Error::InvalidEntryName { .. })));
        assert!(matches!(encode_name(""), Err(Error::InvalidEntryName { .. })));
    }

    #[test]
    fn test_control_characters_rejected() {
        for bad in ["b\nc.dds", "b\r.dds", "tab\there.dds", "del\x7f.dds"] {
            assert!(
                matches!(encode_name(bad), Err(Error::InvalidEntryName { .. })),
                "{bad:?} encoded"
            );
            assert!(
                matches!(entry_relative_path(bad), Err(Error::InvalidEntryName { .. })),
                "{bad:?} accepted"
            );
        }
        assert!(encode_name("plain name.dds").is_ok());
    }

    #[test]
    fn test_decode_full_width_name() {
        // A field with no terminator at all still decodes.
        let field = [b'x'; NAME_LENGTH];
        assert_eq!(decode_name(&field).len(), NAME_LENGTH);
        assert_eq!(decode_name(&[0u8; NAME_LENGTH]), "");
    }

    #[test]
    fn test_relative_paths() {
        assert_eq!(
            entry_relative_path("ui\\icons/a.dds").unwrap(),
            PathBuf::from("ui").join("icons").join("a.dds")
        );
        for bad in ["", "../x.dds", "a/../../x", "/abs.dds", "a//b", "C:\\x.dds", "./x"] {
            assert!(
                matches!(entry_relative_path(bad), Err(Error::InvalidEntryName { .. })),
                "{bad:?} accepted"
            );
        }
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("a\\b/c"), "a/b/c");
    }
}
