//! Flat log-structured file driver.
//!
//! On-disk layout, one directory per logical database:
//!
//! ```text
//! <path>/<name>/
//! ├─ <store_name>.LOCK   # advisory lock, one connection per store
//! └─ <store_name>.log    # append-only record log
//! ```
//!
//! Each mutation appends a length-prefixed record; the full key/value
//! index is rebuilt in memory when the store is opened. A torn trailing
//! record (interrupted write) is discarded at replay and the log is
//! truncated back to its last complete record.

use crate::driver::{Connection, Driver, IterVisitor, StoreSettings};
use crate::error::{BackendError, BackendResult};
use async_trait::async_trait;
use fs2::FileExt;
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::ops::ControlFlow;
use std::path::PathBuf;
use std::sync::Arc;

/// Identifier the log driver registers under.
pub const LOG_DRIVER_ID: &str = "level-store";

/// Record tags in the log file.
const RECORD_SET: u8 = 1;
const RECORD_REMOVE: u8 = 2;

/// A flat log-structured key-value driver.
///
/// This is the backend meant for server and desktop processes, where a
/// real filesystem is available and the browser-oriented stores are
/// not. It is registered explicitly (it is not native to the engine)
/// and selected under the `leveldatastore` name.
#[derive(Debug, Default)]
pub struct LogDriver;

impl LogDriver {
    /// Creates a new log driver.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Driver for LogDriver {
    fn id(&self) -> &str {
        LOG_DRIVER_ID
    }

    async fn probe(&self) -> bool {
        // The probe must be side-effect free; path validation happens
        // at open. A filesystem is assumed to exist wherever this
        // driver is compiled in.
        true
    }

    async fn open(&self, settings: &StoreSettings) -> BackendResult<Arc<dyn Connection>> {
        let conn = LogConnection::open(settings)?;
        Ok(Arc::new(conn))
    }
}

/// A connection to one log-backed store.
#[derive(Debug)]
pub struct LogConnection {
    log_path: PathBuf,
    lock_path: PathBuf,
    file: Mutex<File>,
    entries: RwLock<BTreeMap<String, Vec<u8>>>,
    closed: RwLock<bool>,
    _lock_file: File,
}

impl LogConnection {
    fn open(settings: &StoreSettings) -> BackendResult<Self> {
        let dir = settings.path.join(&settings.name);
        fs::create_dir_all(&dir)?;

        // One connection per store at a time
        let lock_path = dir.join(format!("{}.LOCK", settings.store_name));
        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;
        if lock_file.try_lock_exclusive().is_err() {
            return Err(BackendError::Locked);
        }

        let log_path = dir.join(format!("{}.log", settings.store_name));
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&log_path)?;

        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer)?;

        let (entries, valid_len) = replay(&buffer)?;
        if (valid_len as u64) < buffer.len() as u64 {
            tracing::warn!(
                path = %log_path.display(),
                discarded = buffer.len() - valid_len,
                "discarding torn trailing record"
            );
            file.set_len(valid_len as u64)?;
            file.sync_all()?;
        }

        Ok(Self {
            log_path,
            lock_path,
            file: Mutex::new(file),
            entries: RwLock::new(entries),
            closed: RwLock::new(false),
            _lock_file: lock_file,
        })
    }

    /// Returns the path of the underlying log file.
    #[must_use]
    pub fn path(&self) -> &PathBuf {
        &self.log_path
    }

    fn ensure_open(&self) -> BackendResult<()> {
        if *self.closed.read() {
            Err(BackendError::Closed)
        } else {
            Ok(())
        }
    }
}

fn append(file: &mut File, record: &[u8]) -> BackendResult<()> {
    file.seek(SeekFrom::End(0))?;
    file.write_all(record)?;
    file.flush()?;
    Ok(())
}

/// Rebuilds the key/value index from raw log bytes.
///
/// Returns the index together with the length of the valid prefix; a
/// record cut short by an interrupted write ends the replay without an
/// error. An unknown record tag means the file is not a record log at
/// all and is reported as corruption.
fn replay(buffer: &[u8]) -> BackendResult<(BTreeMap<String, Vec<u8>>, usize)> {
    let mut entries = BTreeMap::new();
    let mut pos = 0usize;

    while pos < buffer.len() {
        let record_start = pos;
        let tag = buffer[pos];
        pos += 1;

        match tag {
            RECORD_SET => {
                let Some((key, value, next)) = read_set_body(buffer, pos) else {
                    return Ok((entries, record_start));
                };
                entries.insert(key, value);
                pos = next;
            }
            RECORD_REMOVE => {
                let Some((key, next)) = read_remove_body(buffer, pos) else {
                    return Ok((entries, record_start));
                };
                entries.remove(&key);
                pos = next;
            }
            other => {
                return Err(BackendError::corrupted(format!(
                    "unknown record tag {other} at offset {record_start}"
                )));
            }
        }
    }

    Ok((entries, pos))
}

fn read_u32(buffer: &[u8], pos: usize) -> Option<(u32, usize)> {
    let bytes = buffer.get(pos..pos + 4)?;
    Some((u32::from_le_bytes(bytes.try_into().ok()?), pos + 4))
}

fn read_set_body(buffer: &[u8], pos: usize) -> Option<(String, Vec<u8>, usize)> {
    let (key_len, pos) = read_u32(buffer, pos)?;
    let (value_len, pos) = read_u32(buffer, pos)?;
    let key_end = pos.checked_add(key_len as usize)?;
    let value_end = key_end.checked_add(value_len as usize)?;
    let key_bytes = buffer.get(pos..key_end)?;
    let value = buffer.get(key_end..value_end)?.to_vec();
    let key = String::from_utf8_lossy(key_bytes).into_owned();
    Some((key, value, value_end))
}

fn read_remove_body(buffer: &[u8], pos: usize) -> Option<(String, usize)> {
    let (key_len, pos) = read_u32(buffer, pos)?;
    let key_end = pos.checked_add(key_len as usize)?;
    let key_bytes = buffer.get(pos..key_end)?;
    Some((String::from_utf8_lossy(key_bytes).into_owned(), key_end))
}

fn encode_set(key: &str, value: &[u8]) -> Vec<u8> {
    let mut record = Vec::with_capacity(9 + key.len() + value.len());
    record.push(RECORD_SET);
    record.extend_from_slice(&(key.len() as u32).to_le_bytes());
    record.extend_from_slice(&(value.len() as u32).to_le_bytes());
    record.extend_from_slice(key.as_bytes());
    record.extend_from_slice(value);
    record
}

fn encode_remove(key: &str) -> Vec<u8> {
    let mut record = Vec::with_capacity(5 + key.len());
    record.push(RECORD_REMOVE);
    record.extend_from_slice(&(key.len() as u32).to_le_bytes());
    record.extend_from_slice(key.as_bytes());
    record
}

#[async_trait]
impl Connection for LogConnection {
    async fn get(&self, key: &str) -> BackendResult<Option<Vec<u8>>> {
        self.ensure_open()?;
        Ok(self.entries.read().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &[u8]) -> BackendResult<()> {
        self.ensure_open()?;
        // Log append and index update form one critical section; a
        // concurrent writer must not be able to interleave between
        // them, or the live index and the replayed index diverge.
        let mut file = self.file.lock();
        append(&mut file, &encode_set(key, value))?;
        self.entries.write().insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn remove(&self, key: &str) -> BackendResult<()> {
        self.ensure_open()?;
        let mut file = self.file.lock();
        let mut entries = self.entries.write();
        if !entries.contains_key(key) {
            return Ok(());
        }
        append(&mut file, &encode_remove(key))?;
        entries.remove(key);
        Ok(())
    }

    async fn clear(&self) -> BackendResult<()> {
        self.ensure_open()?;
        let file = self.file.lock();
        file.set_len(0)?;
        file.sync_all()?;
        self.entries.write().clear();
        Ok(())
    }

    async fn len(&self) -> BackendResult<usize> {
        self.ensure_open()?;
        Ok(self.entries.read().len())
    }

    async fn keys(&self) -> BackendResult<Vec<String>> {
        self.ensure_open()?;
        Ok(self.entries.read().keys().cloned().collect())
    }

    async fn iterate(&self, visit: IterVisitor<'_>) -> BackendResult<()> {
        self.ensure_open()?;
        let entries = self.entries.read();
        for (ordinal, (key, value)) in entries.iter().enumerate() {
            if let ControlFlow::Break(()) = visit(value, key, ordinal) {
                break;
            }
        }
        Ok(())
    }

    async fn drop_instance(&self) -> BackendResult<()> {
        self.ensure_open()?;
        *self.closed.write() = true;
        self.entries.write().clear();

        for path in [&self.log_path, &self.lock_path] {
            match fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn settings(path: &std::path::Path, store_name: &str) -> StoreSettings {
        StoreSettings {
            path: path.to_path_buf(),
            store_name: store_name.to_string(),
            ..StoreSettings::default()
        }
    }

    #[tokio::test]
    async fn set_get_round_trip() {
        let temp = tempdir().unwrap();
        let driver = LogDriver::new();
        let conn = driver.open(&settings(temp.path(), "kv")).await.unwrap();

        conn.set("alpha", b"one").await.unwrap();
        assert_eq!(conn.get("alpha").await.unwrap(), Some(b"one".to_vec()));
        assert_eq!(conn.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn data_survives_reopen() {
        let temp = tempdir().unwrap();
        let driver = LogDriver::new();

        {
            let conn = driver.open(&settings(temp.path(), "kv")).await.unwrap();
            conn.set("a", b"1").await.unwrap();
            conn.set("b", b"2").await.unwrap();
            conn.remove("a").await.unwrap();
        }

        let conn = driver.open(&settings(temp.path(), "kv")).await.unwrap();
        assert_eq!(conn.get("a").await.unwrap(), None);
        assert_eq!(conn.get("b").await.unwrap(), Some(b"2".to_vec()));
        assert_eq!(conn.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn overwrite_keeps_latest_after_reopen() {
        let temp = tempdir().unwrap();
        let driver = LogDriver::new();

        {
            let conn = driver.open(&settings(temp.path(), "kv")).await.unwrap();
            conn.set("k", b"first").await.unwrap();
            conn.set("k", b"second").await.unwrap();
        }

        let conn = driver.open(&settings(temp.path(), "kv")).await.unwrap();
        assert_eq!(conn.get("k").await.unwrap(), Some(b"second".to_vec()));
    }

    #[tokio::test]
    async fn clear_truncates_log() {
        let temp = tempdir().unwrap();
        let driver = LogDriver::new();
        let conn = driver.open(&settings(temp.path(), "kv")).await.unwrap();

        conn.set("a", b"1").await.unwrap();
        conn.clear().await.unwrap();
        assert_eq!(conn.len().await.unwrap(), 0);

        let log = temp.path().join("_omnistore").join("kv.log");
        assert_eq!(fs::metadata(&log).unwrap().len(), 0);
    }

    #[tokio::test]
    async fn torn_trailing_record_is_discarded() {
        let temp = tempdir().unwrap();
        let driver = LogDriver::new();

        {
            let conn = driver.open(&settings(temp.path(), "kv")).await.unwrap();
            conn.set("kept", b"value").await.unwrap();
        }

        // Simulate a crash mid-append: a record header without its body
        let log = temp.path().join("_omnistore").join("kv.log");
        let mut file = OpenOptions::new().append(true).open(&log).unwrap();
        file.write_all(&[RECORD_SET, 9, 0, 0]).unwrap();
        drop(file);

        let conn = driver.open(&settings(temp.path(), "kv")).await.unwrap();
        assert_eq!(conn.get("kept").await.unwrap(), Some(b"value".to_vec()));
        assert_eq!(conn.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn unknown_record_tag_is_corruption() {
        let temp = tempdir().unwrap();
        let driver = LogDriver::new();

        let log_dir = temp.path().join("_omnistore");
        fs::create_dir_all(&log_dir).unwrap();
        fs::write(log_dir.join("kv.log"), [0xFFu8, 1, 2, 3]).unwrap();

        let result = driver.open(&settings(temp.path(), "kv")).await;
        assert!(matches!(result, Err(BackendError::Corrupted(_))));
    }

    #[tokio::test]
    async fn lock_prevents_second_connection() {
        let temp = tempdir().unwrap();
        let driver = LogDriver::new();

        let _first = driver.open(&settings(temp.path(), "kv")).await.unwrap();
        let second = driver.open(&settings(temp.path(), "kv")).await;
        assert!(matches!(second, Err(BackendError::Locked)));
    }

    #[tokio::test]
    async fn lock_released_on_drop() {
        let temp = tempdir().unwrap();
        let driver = LogDriver::new();

        {
            let _conn = driver.open(&settings(temp.path(), "kv")).await.unwrap();
        }
        let _again = driver.open(&settings(temp.path(), "kv")).await.unwrap();
    }

    #[tokio::test]
    async fn sibling_stores_are_isolated() {
        let temp = tempdir().unwrap();
        let driver = LogDriver::new();

        let first = driver.open(&settings(temp.path(), "first")).await.unwrap();
        let second = driver.open(&settings(temp.path(), "second")).await.unwrap();

        first.set("k", b"one").await.unwrap();
        second.set("k", b"two").await.unwrap();

        first.clear().await.unwrap();
        assert_eq!(first.len().await.unwrap(), 0);
        assert_eq!(second.get("k").await.unwrap(), Some(b"two".to_vec()));
        assert_eq!(second.keys().await.unwrap(), vec!["k".to_string()]);
    }

    #[tokio::test]
    async fn drop_instance_deletes_log_and_closes() {
        let temp = tempdir().unwrap();
        let driver = LogDriver::new();
        let conn = driver.open(&settings(temp.path(), "kv")).await.unwrap();

        conn.set("k", b"v").await.unwrap();
        let log = temp.path().join("_omnistore").join("kv.log");
        assert!(log.exists());

        conn.drop_instance().await.unwrap();
        assert!(!log.exists());
        assert!(matches!(conn.get("k").await, Err(BackendError::Closed)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_writers_agree_with_replay() {
        let temp = tempdir().unwrap();
        let driver = LogDriver::new();

        let live = {
            let conn = driver.open(&settings(temp.path(), "kv")).await.unwrap();

            // Contend on one key from parallel tasks; whichever write
            // lands last must win both in memory and on disk
            let mut tasks = Vec::new();
            for i in 0..16 {
                let conn = Arc::clone(&conn);
                tasks.push(tokio::spawn(async move {
                    let value = format!("v{i}").into_bytes();
                    conn.set("contended", &value).await.unwrap();
                    conn.remove("other").await.unwrap();
                    conn.set("other", &value).await.unwrap();
                }));
            }
            for task in tasks {
                task.await.unwrap();
            }

            conn.get("contended").await.unwrap()
        };

        let reopened = driver.open(&settings(temp.path(), "kv")).await.unwrap();
        assert_eq!(reopened.get("contended").await.unwrap(), live);
        assert!(reopened.get("other").await.unwrap().is_some());
        assert_eq!(reopened.len().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn empty_value_round_trips() {
        let temp = tempdir().unwrap();
        let driver = LogDriver::new();

        {
            let conn = driver.open(&settings(temp.path(), "kv")).await.unwrap();
            conn.set("empty", b"").await.unwrap();
        }

        let conn = driver.open(&settings(temp.path(), "kv")).await.unwrap();
        assert_eq!(conn.get("empty").await.unwrap(), Some(Vec::new()));
    }
}
