//! Module source resolution
//!
//! A dotted name `pkg.sub.mod` maps to `<dir>/pkg/sub/mod.<ext>` for each
//! search path entry in order; the first existing candidate wins.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use tracing::trace;

use crate::error::{AmatakError, Result};

/// Source text found for a module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleSource {
    /// Where the text was found
    pub path: PathBuf,
    /// Module source text
    pub text: String,
}

/// Locates and reads module source text.
pub trait ModuleLoader: Send + Sync {
    /// Find `name` on `search_path`. `Ok(None)` means no candidate exists.
    fn load(&self, search_path: &[PathBuf], name: &str, extension: &str)
        -> Result<Option<ModuleSource>>;
}

/// Check that `name` is a dotted sequence of identifiers.
pub fn validate_module_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name.split('.').all(|part| {
            let mut chars = part.chars();
            matches!(chars.next(), Some(c) if c == '_' || c.is_ascii_alphabetic())
                && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
        });
    if valid {
        Ok(())
    } else {
        Err(AmatakError::Import(format!("invalid module name '{}'", name)))
    }
}

/// Candidate file paths for `name`, in search order.
pub fn candidate_paths(search_path: &[PathBuf], name: &str, extension: &str) -> Vec<PathBuf> {
    let mut relative: PathBuf = name.split('.').collect();
    relative.set_extension(extension);
    search_path.iter().map(|dir| dir.join(&relative)).collect()
}

/// Reads modules from the file system.
#[derive(Debug, Clone, Default)]
pub struct FileSystemLoader;

impl ModuleLoader for FileSystemLoader {
    fn load(
        &self,
        search_path: &[PathBuf],
        name: &str,
        extension: &str,
    ) -> Result<Option<ModuleSource>> {
        for path in candidate_paths(search_path, name, extension) {
            trace!(module = name, candidate = %path.display(), "probing");
            if !path.is_file() {
                continue;
            }
            let text = std::fs::read_to_string(&path).map_err(|e| {
                AmatakError::Import(format!("cannot read {}: {}", path.display(), e))
            })?;
            return Ok(Some(ModuleSource { path, text }));
        }
        Ok(None)
    }
}

/// Serves modules from an in-memory table of path to text.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLoader {
    files: IndexMap<PathBuf, String>,
}

impl InMemoryLoader {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file (builder pattern).
    pub fn with_file(mut self, path: impl AsRef<Path>, text: impl Into<String>) -> Self {
        self.insert(path, text);
        self
    }

    /// Add or replace a file.
    pub fn insert(&mut self, path: impl AsRef<Path>, text: impl Into<String>) {
        self.files.insert(path.as_ref().to_path_buf(), text.into());
    }
}

impl ModuleLoader for InMemoryLoader {
    fn load(
        &self,
        search_path: &[PathBuf],
        name: &str,
        extension: &str,
    ) -> Result<Option<ModuleSource>> {
        Ok(candidate_paths(search_path, name, extension)
            .into_iter()
            .find_map(|path| {
                self.files.get(&path).map(|text| ModuleSource {
                    text: text.clone(),
                    path,
                })
            }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dotted_name_maps_to_nested_path() {
        let paths = candidate_paths(&[PathBuf::from("/lib")], "pkg.sub.mod", "amatak");
        assert_eq!(paths, vec![PathBuf::from("/lib/pkg/sub/mod.amatak")]);
    }

    #[test]
    fn test_invalid_names() {
        for name in ["", "a..b", "1abc", "a.b-c", ".a"] {
            assert!(validate_module_name(name).is_err(), "{:?} should be rejected", name);
        }
        assert!(validate_module_name("pkg._private.mod2").is_ok());
    }

    #[test]
    fn test_in_memory_first_match_wins() {
        let loader = InMemoryLoader::new()
            .with_file("/a/m.amatak", "1")
            .with_file("/b/m.amatak", "2");
        let found = loader
            .load(&[PathBuf::from("/a"), PathBuf::from("/b")], "m", "amatak")
            .unwrap()
            .unwrap();
        assert_eq!(found.text, "1");
        assert_eq!(found.path, PathBuf::from("/a/m.amatak"));
    }
}
