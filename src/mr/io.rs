//! Named blob storage used by workers and the sequential runner.
//!
//! The coordinator has no storage of its own; everything it schedules is
//! expressed in blob names, so any backend that can read and write by name
//! works. Concurrent writes to the same blob are last-writer-wins, which is
//! safe because blob names are deterministic and contents are a pure
//! function of task inputs.

use std::collections::HashMap;
use std::fs;
use std::sync::Mutex;

use anyhow::{bail, Context as _, Result};

/// Read/write access to named blobs. `read` fails when the blob does not
/// exist; `write` overwrites.
pub trait Blobstore: Send + Sync {
    fn read(&self, name: &str) -> Result<String>;
    fn write(&self, name: &str, content: &str) -> Result<()>;
}

/// Blobs as plain files, names interpreted as paths.
#[derive(Debug, Default)]
pub struct DiskBlobstore;

impl Blobstore for DiskBlobstore {
    fn read(&self, name: &str) -> Result<String> {
        fs::read_to_string(name).with_context(|| format!("failed to read {name}"))
    }

    fn write(&self, name: &str, content: &str) -> Result<()> {
        fs::write(name, content).with_context(|| format!("failed to write {name}"))
    }
}

/// In-memory store shared by every worker within a test process. All access
/// is serialized behind a single mutex.
#[derive(Debug, Default)]
pub struct MemoryBlobstore {
    blobs: Mutex<HashMap<String, String>>,
}

impl MemoryBlobstore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a blob, typically an input file for a test run.
    pub fn insert(&self, name: impl Into<String>, content: impl Into<String>) {
        self.blobs
            .lock()
            .unwrap()
            .insert(name.into(), content.into());
    }

    pub fn exists(&self, name: &str) -> bool {
        self.blobs.lock().unwrap().contains_key(name)
    }
}

impl Blobstore for MemoryBlobstore {
    fn read(&self, name: &str) -> Result<String> {
        match self.blobs.lock().unwrap().get(name) {
            Some(content) => Ok(content.clone()),
            None => bail!("no such blob: {name}"),
        }
    }

    fn write(&self, name: &str, content: &str) -> Result<()> {
        self.blobs
            .lock()
            .unwrap()
            .insert(name.to_owned(), content.to_owned());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disk_round_trip_and_missing_read() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskBlobstore;
        let name = dir.path().join("blob").to_str().unwrap().to_owned();

        store.write(&name, "hello\n").unwrap();
        assert_eq!(store.read(&name).unwrap(), "hello\n");

        store.write(&name, "overwritten\n").unwrap();
        assert_eq!(store.read(&name).unwrap(), "overwritten\n");

        let missing = dir.path().join("nope").to_str().unwrap().to_owned();
        assert!(store.read(&missing).is_err());
    }

    #[test]
    fn memory_overwrites_and_reports_existence() {
        let store = MemoryBlobstore::new();
        assert!(!store.exists("a"));
        assert!(store.read("a").is_err());

        store.write("a", "1").unwrap();
        assert!(store.exists("a"));
        assert_eq!(store.read("a").unwrap(), "1");

        store.write("a", "2").unwrap();
        assert_eq!(store.read("a").unwrap(), "2");
    }
}
