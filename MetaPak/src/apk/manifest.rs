//! Entry order manifest
//!
//! Unpacking writes every entry name, in archive order, to `FileList.txt`.
//! Packing reads it back to restore that order, since directory listing
//! order says nothing about the original layout.

use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::Path;

use crate::error::{Error, Result};

use super::names::normalize;

/// File name of the manifest inside an unpacked directory
pub const MANIFEST_FILE_NAME: &str = "FileList.txt";

/// Whether a root-level file name would land on the manifest, ignoring case
pub(crate) fn is_manifest_name(name: &OsStr) -> bool {
    name.to_str()
        .is_some_and(|n| n.eq_ignore_ascii_case(MANIFEST_FILE_NAME))
}

/// Ordered list of entry names
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    names: Vec<String>,
    /// Normalized name -> position in `names`
    ranks: HashMap<String, usize>,
}

impl Manifest {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a manifest from names in order
    ///
    /// # Errors
    /// Returns [`Error::DuplicateManifestEntry`] if a name repeats.
    pub fn from_names<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut manifest = Self::new();
        for name in names {
            manifest.push(name.into())?;
        }
        Ok(manifest)
    }

    fn push(&mut self, name: String) -> Result<()> {
        let key = normalize(&name);
        if self.ranks.contains_key(&key) {
            return Err(Error::DuplicateManifestEntry {
                name,
                line: self.names.len() + 1,
            });
        }
        self.ranks.insert(key, self.names.len());
        self.names.push(name);
        Ok(())
    }

    /// Parse manifest text: one name per line, blank lines ignored
    ///
    /// # Errors
    /// Returns [`Error::DuplicateManifestEntry`] if a name repeats.
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.strip_prefix('\u{FEFF}').unwrap_or(text);
        let mut manifest = Self::new();
        for (i, line) in text.lines().enumerate() {
            let name = line.strip_suffix('\r').unwrap_or(line);
            if name.trim().is_empty() {
                continue;
            }
            manifest.push(name.to_string()).map_err(|e| match e {
                Error::DuplicateManifestEntry { name, .. } => {
                    Error::DuplicateManifestEntry { name, line: i + 1 }
                }
                other => other,
            })?;
        }
        Ok(manifest)
    }

    /// Load a manifest file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or holds duplicate names.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::parse(&std::fs::read_to_string(path)?)
    }

    /// Render as text, one `\n`-terminated line per name
    #[must_use]
    pub fn to_text(&self) -> String {
        let mut text = String::with_capacity(self.names.iter().map(|n| n.len() + 1).sum());
        for name in &self.names {
            text.push_str(name);
            text.push('\n');
        }
        text
    }

    /// Write the manifest file
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_text())?;
        Ok(())
    }

    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Position of `name` in the manifest; `\` and `/` compare equal
    #[must_use]
    pub fn rank(&self, name: &str) -> Option<usize> {
        self.ranks.get(&normalize(name)).copied()
    }

    /// Put `items` into manifest order, pairing each with its manifest spelling
    ///
    /// Every item must be listed and every listed name must have an item.
    ///
    /// # Errors
    /// Returns [`Error::UnlistedFile`] for an item the manifest does not list,
    /// [`Error::MissingManifestEntry`] for a listed name with no item, and
    /// [`Error::DuplicateEntryName`] if two items map to the same name.
    pub fn order<T>(&self, items: Vec<T>, key: impl Fn(&T) -> &str) -> Result<Vec<(String, T)>> {
        let mut slots: Vec<Option<T>> = std::iter::repeat_with(|| None).take(self.names.len()).collect();

        for item in items {
            let name = key(&item);
            let Some(rank) = self.rank(name) else {
                return Err(Error::UnlistedFile {
                    name: name.to_string(),
                });
            };
            if slots[rank].is_some() {
                return Err(Error::DuplicateEntryName {
                    name: name.to_string(),
                });
            }
            slots[rank] = Some(item);
        }

        self.names
            .iter()
            .zip(slots)
            .map(|(name, slot)| {
                slot.map(|item| (name.clone(), item))
                    .ok_or_else(|| Error::MissingManifestEntry { name: name.clone() })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_and_render() {
        let manifest = Manifest::parse("\u{FEFF}tex0.dds\r\ntex1.dds\r\n\r\nui\\icon.dds\n").unwrap();
        assert_eq!(manifest.names(), ["tex0.dds", "tex1.dds", "ui\\icon.dds"]);
        assert_eq!(manifest.to_text(), "tex0.dds\ntex1.dds\nui\\icon.dds\n");
        assert_eq!(Manifest::parse(&manifest.to_text()).unwrap(), manifest);
    }

    #[test]
    fn test_empty_manifest() {
        let manifest = Manifest::parse("").unwrap();
        assert!(manifest.is_empty());
        assert_eq!(manifest.to_text(), "");
    }

    #[test]
    fn test_duplicates_rejected() {
        let err = Manifest::parse("a.dds\nb.dds\na.dds\n").unwrap_err();
        assert!(matches!(err, Error::DuplicateManifestEntry { ref name, line: 3 } if name == "a.dds"));

        let err = Manifest::from_names(["ui/a.dds", "ui\\a.dds"]).unwrap_err();
        assert!(matches!(err, Error::DuplicateManifestEntry { line: 2, .. }));
    }

    #[test]
    fn test_rank_normalizes_separators() {
        let manifest = Manifest::from_names(["b.dds", "ui\\a.dds"]).unwrap();
        assert_eq!(manifest.rank("b.dds"), Some(0));
        assert_eq!(manifest.rank("ui/a.dds"), Some(1));
        assert_eq!(manifest.rank("c.dds"), None);
    }

    #[test]
    fn test_order_follows_manifest() {
        let manifest = Manifest::from_names(["tex1.dds", "ui\\tex0.dds", "tex2.dds"]).unwrap();
        let on_disk = vec!["tex2.dds", "ui/tex0.dds", "tex1.dds"];
        let ordered = manifest.order(on_disk, |s| *s).unwrap();
        assert_eq!(
            ordered,
            vec![
                ("tex1.dds".to_string(), "tex1.dds"),
                ("ui\\tex0.dds".to_string(), "ui/tex0.dds"),
                ("tex2.dds".to_string(), "tex2.dds"),
            ]
        );
    }

    #[test]
    fn test_manifest_name_ignores_case() {
        assert!(is_manifest_name(OsStr::new("FileList.txt")));
        assert!(is_manifest_name(OsStr::new("filelist.TXT")));
        assert!(!is_manifest_name(OsStr::new("FileList.txt.bak")));
        assert!(!is_manifest_name(OsStr::new("ui/FileList.txt")));
    }

    #[test]
    fn test_order_mismatch() {
        let manifest = Manifest::from_names(["a.dds", "b.dds"]).unwrap();

        let err = manifest.order(vec!["a.dds", "b.dds", "c.dds"], |s| *s).unwrap_err();
        assert!(matches!(err, Error::UnlistedFile { ref name } if name == "c.dds"));

        let err = manifest.order(vec!["a.dds"], |s| *s).unwrap_err();
        assert!(matches!(err, Error::MissingManifestEntry { ref name } if name == "b.dds"));
    }
}
