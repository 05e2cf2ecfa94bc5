//! Legacy line-oriented footprint library files.
//!
//! The format is a flat text file: a `PCBNEW-LibModule-V1` header line, an
//! `$INDEX`..`$EndINDEX` name list, then one `$MODULE name`..`$EndMODULE`
//! block per footprint, closed by `$EndLIBRARY`. Footprint blocks are kept
//! verbatim; this module manages the container, not the block contents,
//! so libraries written by other tools survive an edit untouched.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{FormatError, ParseError};

const HEADER: &str = "PCBNEW-LibModule-V1";

/// One footprint entry: its name and its raw block lines, without the
/// `$MODULE`/`$EndMODULE` brackets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryEntry {
    pub name: String,
    pub lines: Vec<String>,
}

/// An editable legacy footprint library.
#[derive(Debug, Clone)]
pub struct FootprintLibrary {
    path: PathBuf,
    entries: Vec<LibraryEntry>,
}

impl FootprintLibrary {
    /// An empty library that will be written to `path`.
    pub fn create(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: Vec::new(),
        }
    }

    /// Reads and indexes an existing library file.
    pub fn read(path: impl Into<PathBuf>) -> Result<Self, FormatError> {
        let path = path.into();
        let text = fs::read_to_string(&path)?;
        let source_name = path.display().to_string();
        let mut entries = Vec::new();

        let error = |line: usize, message: &str| {
            FormatError::Parse(ParseError {
                source_name: source_name.clone(),
                line: line as u32,
                column: 1,
                message: message.to_string(),
            })
        };

        let mut lines = text.lines().enumerate();
        match lines.next() {
            Some((_, first)) if first.starts_with(HEADER) => {}
            _ => return Err(error(1, &format!("missing {HEADER} header"))),
        }

        let mut current: Option<LibraryEntry> = None;
        for (index, line) in lines {
            let lineno = index + 1;
            let trimmed = line.trim_end();
            if current.is_some() {
                if let Some(name) = trimmed.strip_prefix("$EndMODULE") {
                    let name = name.trim();
                    let mut done = match current.take() {
                        Some(entry) => entry,
                        None => continue,
                    };
                    if !name.is_empty() && name != done.name {
                        return Err(error(
                            lineno,
                            &format!("$EndMODULE {name} closes $MODULE {}", done.name),
                        ));
                    }
                    done.lines.shrink_to_fit();
                    entries.push(done);
                } else if let Some(entry) = &mut current {
                    entry.lines.push(trimmed.to_string());
                }
                continue;
            }
            if let Some(name) = trimmed.strip_prefix("$MODULE") {
                let name = name.trim();
                if name.is_empty() {
                    return Err(error(lineno, "$MODULE without a footprint name"));
                }
                current = Some(LibraryEntry {
                    name: name.to_string(),
                    lines: Vec::new(),
                });
            }
            // Everything else outside a block (the index, blank lines, the
            // end marker) is regenerated on save and skipped here.
        }
        if let Some(entry) = current {
            return Err(error(
                text.lines().count(),
                &format!("$MODULE {} is never closed", entry.name),
            ));
        }

        debug!(path = %source_name, footprints = entries.len(), "footprint library read");
        Ok(Self { path, entries })
    }

    /// Rewrites the whole file: header, a fresh index, then the blocks.
    pub fn save(&self) -> Result<(), FormatError> {
        let mut out = String::new();
        out.push_str(HEADER);
        out.push('\n');
        out.push_str("$INDEX\n");
        for entry in &self.entries {
            out.push_str(&entry.name);
            out.push('\n');
        }
        out.push_str("$EndINDEX\n");
        for entry in &self.entries {
            out.push_str(&format!("$MODULE {}\n", entry.name));
            for line in &entry.lines {
                out.push_str(line);
                out.push('\n');
            }
            out.push_str(&format!("$EndMODULE {}\n", entry.name));
        }
        out.push_str("$EndLIBRARY\n");
        fs::write(&self.path, out)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&LibraryEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Inserts a footprint block, replacing any entry of the same name in
    /// place so the library order stays stable.
    pub fn insert(&mut self, name: &str, lines: Vec<String>) {
        let entry = LibraryEntry {
            name: name.to_string(),
            lines,
        };
        match self.entries.iter_mut().find(|e| e.name == name) {
            Some(slot) => *slot = entry,
            None => self.entries.push(entry),
        }
    }

    /// Removes a footprint; returns whether it existed.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.name != name);
        self.entries.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_blocks_and_ignores_stale_index() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("discrete.mod");
        fs::write(
            &path,
            "PCBNEW-LibModule-V1 Thu 01 Jan 2015\n\
             $INDEX\nSTALE_NAME\n$EndINDEX\n\
             $MODULE R_0805\nPo 0 0\n$EndMODULE R_0805\n\
             $MODULE C_0603\nPo 1 1\n$EndMODULE C_0603\n\
             $EndLIBRARY\n",
        )
        .unwrap();

        let lib = FootprintLibrary::read(&path).unwrap();
        let names: Vec<&str> = lib.names().collect();
        assert_eq!(names, ["R_0805", "C_0603"]);
        assert_eq!(lib.get("R_0805").unwrap().lines, ["Po 0 0"]);
    }

    #[test]
    fn missing_header_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.mod");
        fs::write(&path, "$INDEX\n$EndINDEX\n$EndLIBRARY\n").unwrap();
        let err = FootprintLibrary::read(&path).unwrap_err();
        assert!(err.to_string().contains("PCBNEW-LibModule-V1"));
    }

    #[test]
    fn replace_keeps_position_and_save_rebuilds_index() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lib.mod");
        let mut lib = FootprintLibrary::create(&path);
        lib.insert("A", vec!["a1".into()]);
        lib.insert("B", vec!["b1".into()]);
        lib.insert("A", vec!["a2".into()]);
        assert_eq!(lib.len(), 2);
        let names: Vec<&str> = lib.names().collect();
        assert_eq!(names, ["A", "B"]);
        lib.save().unwrap();

        let reread = FootprintLibrary::read(&path).unwrap();
        assert_eq!(reread.get("A").unwrap().lines, ["a2"]);

        assert!(lib.remove("B"));
        assert!(!lib.remove("B"));
        assert!(!lib.contains("B"));
    }

    #[test]
    fn unclosed_module_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trunc.mod");
        fs::write(&path, "PCBNEW-LibModule-V1\n$MODULE R1\nPo 0 0\n").unwrap();
        let err = FootprintLibrary::read(&path).unwrap_err();
        assert!(err.to_string().contains("never closed"));
    }
}
