//! Document store: flat directory of markdown notes
//!
//! `FsStore` writes through a temp file + rename so an interrupted run never
//! leaves a truncated note behind.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use walkdir::WalkDir;

use crate::error::{Result, VaultError};

/// Suffix of the temp file written next to the target during atomic writes
pub const TEMP_SUFFIX: &str = ".tagvault-tmp";

pub trait DocumentStore: Send + Sync {
    /// Markdown filenames at the store root, sorted. Not recursive.
    fn list(&self) -> Result<Vec<String>>;
    /// Read a document by store-relative path
    fn read(&self, name: &str) -> Result<String>;
    /// Replace a document's full content
    fn write(&self, name: &str, content: &str) -> Result<()>;
}

/// Atomic file write: write to a temp file in the same directory, then rename.
pub fn atomic_write_file(path: &Path, content: &[u8]) -> io::Result<()> {
    let file_name = path.file_name().unwrap_or_default().to_string_lossy();
    let temp_path = path.with_file_name(format!("{}{}", file_name, TEMP_SUFFIX));

    let mut file = fs::File::create(&temp_path)?;
    if let Err(e) = file.write_all(content).and_then(|_| file.sync_all()) {
        drop(file);
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }
    drop(file);

    fs::rename(&temp_path, path)
}

pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, name: &str) -> PathBuf {
        name.split('/')
            .filter(|s| !s.is_empty())
            .fold(self.root.clone(), |path, segment| path.join(segment))
    }
}

impl DocumentStore for FsStore {
    fn list(&self) -> Result<Vec<String>> {
        let unreadable = |source: io::Error| VaultError::StoreUnreadable {
            path: self.root.clone(),
            source,
        };

        if !self.root.is_dir() {
            return Err(unreadable(io::Error::new(
                io::ErrorKind::NotFound,
                "not a directory",
            )));
        }

        let mut names = Vec::new();
        for entry in WalkDir::new(&self.root).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| unreadable(e.into()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with('.') || !name.ends_with(".md") {
                continue;
            }
            names.push(name);
        }
        names.sort();
        Ok(names)
    }

    fn read(&self, name: &str) -> Result<String> {
        fs::read_to_string(self.resolve(name)).map_err(|source| VaultError::Read {
            name: name.to_string(),
            source,
        })
    }

    fn write(&self, name: &str, content: &str) -> Result<()> {
        let path = self.resolve(name);
        let write_err = |source: io::Error| VaultError::Write {
            name: name.to_string(),
            source,
        };

        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).map_err(write_err)?;
            }
        }
        atomic_write_file(&path, content.as_bytes()).map_err(write_err)
    }
}

/// In-memory store, mainly for tests and embedding
#[derive(Default)]
pub struct MemoryStore {
    docs: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_documents<I, K, V>(docs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map = docs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            docs: RwLock::new(map),
        }
    }

    /// Current content of a document, if present
    pub fn get(&self, name: &str) -> Option<String> {
        self.docs.read().ok()?.get(name).cloned()
    }

    /// Every stored path, including nested index documents
    pub fn paths(&self) -> Vec<String> {
        self.docs
            .read()
            .map(|docs| docs.keys().cloned().collect())
            .unwrap_or_default()
    }
}

fn poisoned(name: &str) -> io::Error {
    io::Error::new(io::ErrorKind::Other, format!("store lock poisoned at {}", name))
}

impl DocumentStore for MemoryStore {
    fn list(&self) -> Result<Vec<String>> {
        let docs = self.docs.read().map_err(|_| VaultError::StoreUnreadable {
            path: PathBuf::from("<memory>"),
            source: poisoned("<list>"),
        })?;
        Ok(docs
            .keys()
            .filter(|k| !k.contains('/') && k.ends_with(".md") && !k.starts_with('.'))
            .cloned()
            .collect())
    }

    fn read(&self, name: &str) -> Result<String> {
        let docs = self.docs.read().map_err(|_| VaultError::Read {
            name: name.to_string(),
            source: poisoned(name),
        })?;
        docs.get(name).cloned().ok_or_else(|| VaultError::Read {
            name: name.to_string(),
            source: io::Error::new(io::ErrorKind::NotFound, "no such document"),
        })
    }

    fn write(&self, name: &str, content: &str) -> Result<()> {
        let mut docs = self.docs.write().map_err(|_| VaultError::Write {
            name: name.to_string(),
            source: poisoned(name),
        })?;
        docs.insert(name.to_string(), content.to_string());
        Ok(())
    }
}
