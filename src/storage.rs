//! Durable key-value slots backing the task store.
//!
//! The store only ever talks to a [`Storage`]; which backend sits behind it
//! is decided by the caller:
//! - [`FileStorage`]: one JSON file per key inside a data directory
//! - [`MemoryStorage`]: shared in-process map, used by tests
//! - [`BackgroundStorage`]: moves writes of any backend onto a writer thread

use crate::error::{Result, StorageError};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

pub trait Storage: Send {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>>;
    fn write(&mut self, key: &str, bytes: &[u8]) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

impl<S: Storage + ?Sized> Storage for Box<S> {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        (**self).read(key)
    }

    fn write(&mut self, key: &str, bytes: &[u8]) -> Result<()> {
        (**self).write(key, bytes)
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        (**self).remove(key)
    }
}

#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty() || key.contains(['/', '\\']) || key.starts_with('.') {
            return Err(StorageError::Unavailable(format!("invalid key '{key}'")));
        }
        Ok(self.root.join(format!("{key}.json")))
    }
}

impl Storage for FileStorage {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&mut self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.root)?;

        // Write to a sibling then rename so readers never see a torn file.
        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, bytes)?;
        fs::rename(&temp_path, &path)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[derive(Debug, Default)]
struct MemoryInner {
    slots: HashMap<String, Vec<u8>>,
    fail_writes: bool,
    fail_reads: bool,
    writes: usize,
}

/// In-process slots. Clones share the same map, so a test can keep one
/// handle while the store owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.lock().slots.get(key).cloned()
    }

    pub fn insert(&self, key: &str, bytes: impl Into<Vec<u8>>) {
        self.lock().slots.insert(key.to_string(), bytes.into());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().slots.contains_key(key)
    }

    /// Number of successful writes so far.
    pub fn write_count(&self) -> usize {
        self.lock().writes
    }

    pub fn fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    pub fn fail_reads(&self, fail: bool) {
        self.lock().fail_reads = fail;
    }
}

impl Storage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let inner = self.lock();
        if inner.fail_reads {
            return Err(StorageError::Unavailable("reads disabled".into()));
        }
        Ok(inner.slots.get(key).cloned())
    }

    fn write(&mut self, key: &str, bytes: &[u8]) -> Result<()> {
        let mut inner = self.lock();
        if inner.fail_writes {
            return Err(StorageError::Unavailable("quota exceeded".into()));
        }
        inner.slots.insert(key.to_string(), bytes.to_vec());
        inner.writes += 1;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let mut inner = self.lock();
        if inner.fail_writes {
            return Err(StorageError::Unavailable("quota exceeded".into()));
        }
        inner.slots.remove(key);
        Ok(())
    }
}

enum Command {
    Write(String, Vec<u8>),
    Remove(String),
    Read(String, Sender<Result<Option<Vec<u8>>>>),
    Flush(Sender<()>),
}

/// Fire-and-forget writes on a dedicated thread.
///
/// `write` and `remove` return as soon as the operation is queued; the
/// worker applies them in order and logs failures. `read` is answered after
/// everything queued before it.
pub struct BackgroundStorage {
    sender: Option<Sender<Command>>,
    worker: Option<JoinHandle<()>>,
}

impl BackgroundStorage {
    pub fn spawn<S: Storage + 'static>(inner: S) -> Result<Self> {
        let (sender, receiver) = mpsc::channel();
        let worker = thread::Builder::new()
            .name("taskflow-writer".into())
            .spawn(move || run_writer(inner, receiver))?;
        Ok(Self {
            sender: Some(sender),
            worker: Some(worker),
        })
    }

    fn send(&self, command: Command) -> Result<()> {
        self.sender
            .as_ref()
            .ok_or_else(|| StorageError::Unavailable("writer stopped".into()))?
            .send(command)
            .map_err(|_| StorageError::Unavailable("writer stopped".into()))
    }

    /// Blocks until every queued operation has been applied.
    pub fn flush(&self) -> Result<()> {
        let (ack, done) = mpsc::channel();
        self.send(Command::Flush(ack))?;
        done.recv()
            .map_err(|_| StorageError::Unavailable("writer stopped".into()))
    }
}

fn run_writer<S: Storage>(mut inner: S, receiver: Receiver<Command>) {
    for command in receiver {
        match command {
            Command::Write(key, bytes) => {
                if let Err(e) = inner.write(&key, &bytes) {
                    tracing::warn!("Background write of '{}' failed: {}", key, e);
                }
            }
            Command::Remove(key) => {
                if let Err(e) = inner.remove(&key) {
                    tracing::warn!("Background remove of '{}' failed: {}", key, e);
                }
            }
            Command::Read(key, reply) => {
                let _ = reply.send(inner.read(&key));
            }
            Command::Flush(ack) => {
                let _ = ack.send(());
            }
        }
    }
    tracing::debug!("Writer thread finished");
}

impl Storage for BackgroundStorage {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let (reply, response) = mpsc::channel();
        self.send(Command::Read(key.to_string(), reply))?;
        response
            .recv()
            .map_err(|_| StorageError::Unavailable("writer stopped".into()))?
    }

    fn write(&mut self, key: &str, bytes: &[u8]) -> Result<()> {
        self.send(Command::Write(key.to_string(), bytes.to_vec()))
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.send(Command::Remove(key.to_string()))
    }
}

impl Drop for BackgroundStorage {
    fn drop(&mut self) {
        // Closing the channel lets the worker drain the queue and exit.
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::error!("Writer thread panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn file_storage_round_trip() {
        let dir = TempDir::new().unwrap();
        let mut storage = FileStorage::new(dir.path().join("data"));

        assert_eq!(storage.read("slot").unwrap(), None);
        storage.write("slot", b"[1,2,3]").unwrap();
        assert_eq!(storage.read("slot").unwrap(), Some(b"[1,2,3]".to_vec()));
        assert!(dir.path().join("data/slot.json").exists());
        assert!(!dir.path().join("data/slot.json.tmp").exists());

        storage.write("slot", b"[]").unwrap();
        assert_eq!(storage.read("slot").unwrap(), Some(b"[]".to_vec()));
    }

    #[test]
    fn file_storage_remove_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let mut storage = FileStorage::new(dir.path());
        storage.write("slot", b"x").unwrap();
        storage.remove("slot").unwrap();
        storage.remove("slot").unwrap();
        assert_eq!(storage.read("slot").unwrap(), None);
    }

    #[test]
    fn file_storage_rejects_path_keys() {
        let dir = TempDir::new().unwrap();
        let mut storage = FileStorage::new(dir.path());
        assert!(storage.write("../escape", b"x").is_err());
        assert!(storage.read("").is_err());
    }

    #[test]
    fn memory_storage_failures() {
        let storage = MemoryStorage::new();
        let mut handle = storage.clone();
        storage.fail_writes(true);
        assert!(handle.write("k", b"v").is_err());
        assert!(!storage.contains("k"));

        storage.fail_writes(false);
        handle.write("k", b"v").unwrap();
        assert_eq!(storage.get("k"), Some(b"v".to_vec()));
        assert_eq!(storage.write_count(), 1);

        storage.fail_reads(true);
        assert!(handle.read("k").is_err());
    }

    #[test]
    fn background_storage_applies_in_order() {
        let memory = MemoryStorage::new();
        let mut background = BackgroundStorage::spawn(memory.clone()).unwrap();

        background.write("k", b"first").unwrap();
        background.write("k", b"second").unwrap();
        assert_eq!(background.read("k").unwrap(), Some(b"second".to_vec()));

        background.remove("k").unwrap();
        background.flush().unwrap();
        assert!(!memory.contains("k"));
    }

    #[test]
    fn background_storage_swallows_write_failures() {
        let memory = MemoryStorage::new();
        memory.fail_writes(true);
        let mut background = BackgroundStorage::spawn(memory.clone()).unwrap();

        assert!(background.write("k", b"v").is_ok());
        background.flush().unwrap();
        assert!(!memory.contains("k"));
    }

    #[test]
    fn background_storage_drains_on_drop() {
        let memory = MemoryStorage::new();
        {
            let mut background = BackgroundStorage::spawn(memory.clone()).unwrap();
            for i in 0..50u8 {
                background.write("k", &[i]).unwrap();
            }
        }
        assert_eq!(memory.get("k"), Some(vec![49]));
        assert_eq!(memory.write_count(), 50);
    }
}
