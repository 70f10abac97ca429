use std::collections::hash_map::DefaultHasher;
use std::ffi::OsString;
use std::fs;
use std::hash::{Hash, Hasher};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use fs2::FileExt;
use log::debug;
use tempfile::NamedTempFile;

use crate::backend::interface::{LedgerStore, Result, Revision, Snapshot, StoreError};
use crate::core::Ledger;

/// Keeps the ledger as one JSON document on disk.
///
/// Writes go to a fresh temporary file in the same directory which is then
/// renamed over the document, so a reader sees either the old or the new
/// ledger. The revision is a hash of the document bytes. Replacing checks
/// it while holding an exclusive lock on a sibling `.lock` file, so a
/// write made by another handle or process (e.g. the CLI) between a load
/// and a replace is reported as a conflict rather than overwritten.
pub struct JsonStore {
    path: PathBuf,
    lock_path: PathBuf,
    closed: AtomicBool
}

impl JsonStore {
    /// Opens the store, creating the parent directory if needed, and reads
    /// the current document once so a corrupt file is reported at startup.
    pub fn open(path: impl AsRef<Path>) -> Result<JsonStore> {
        let path = path.as_ref().to_path_buf();
        fs::create_dir_all(directory_of(&path))?;
        let lock_path = sibling(&path, ".lock");
        let store = JsonStore { path, lock_path, closed: AtomicBool::new(false) };
        store.lock()?;
        store.load()?;
        debug!("opened ledger store at {}", store.path.display());
        return Ok(store);
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }

    /// Blocks until this handle is the only writer. Released when the
    /// returned file is dropped.
    fn lock(&self) -> Result<fs::File> {
        let file = fs::OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&self.lock_path)?;
        file.lock_exclusive()?;
        Ok(file)
    }

    fn read_bytes(&self) -> Result<Vec<u8>> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(err.into())
        }
    }

    fn write_atomically(&self, bytes: &[u8]) -> Result<()> {
        let mut temp = NamedTempFile::new_in(directory_of(&self.path))?;
        temp.write_all(bytes)?;
        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|err| err.error)?;
        Ok(())
    }
}

fn directory_of(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new(".")
    }
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_else(|| OsString::from("ledger"));
    name.push(suffix);
    path.with_file_name(name)
}

fn revision_of(bytes: &[u8]) -> Revision {
    let mut hasher = DefaultHasher::new();
    bytes.hash(&mut hasher);
    Revision(hasher.finish())
}

/// Empty documents and a bare `null` both mean nothing has been saved yet.
fn parse_ledger(bytes: &[u8]) -> Result<Ledger> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Ledger::default());
    }
    let ledger: Option<Ledger> = serde_json::from_slice(bytes)?;
    Ok(ledger.unwrap_or_default())
}

impl LedgerStore for JsonStore {
    fn load(&self) -> Result<Snapshot> {
        self.ensure_open()?;
        let bytes = self.read_bytes()?;
        let ledger = parse_ledger(&bytes)?;
        Ok(Snapshot { ledger, revision: revision_of(&bytes) })
    }

    fn replace(&self, ledger: &Ledger, expected: Revision) -> Result<Revision> {
        self.ensure_open()?;
        let _guard = self.lock()?;
        let current = revision_of(&self.read_bytes()?);
        if current != expected {
            return Err(StoreError::Conflict);
        }
        let bytes = serde_json::to_vec_pretty(ledger)?;
        self.write_atomically(&bytes)?;
        Ok(revision_of(&bytes))
    }

    fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::Release);
        debug!("closed ledger store at {}", self.path.display());
        Ok(())
    }
}
