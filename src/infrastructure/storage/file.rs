//! File-backed record store
//!
//! Layout of the data directory:
//!
//! ```text
//! data_dir/
//!   manifest.json    {"version": 1, "dimensions": D}
//!   records.jsonl    one JSON record per line, append-only
//! ```
//!
//! An insert is acknowledged only after its line has been `sync_data`ed. A
//! crash mid-append leaves an unterminated final line, which `load` drops.
//! A failed append is truncated away before the writer lock is released, and
//! the lock travels with the blocking task so a timed-out write still
//! excludes every other writer until it finishes.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{info, warn};

use super::in_memory::{check_memory, RecordTable};
use super::run_blocking;
use crate::domain::record::{NewRecord, Record, RecordId, RecordStore};
use crate::domain::DomainError;

const MANIFEST_FILE: &str = "manifest.json";
const RECORDS_FILE: &str = "records.jsonl";
const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct Manifest {
    version: u32,
    dimensions: usize,
}

/// Result of replaying the record log
#[derive(Debug)]
struct Replay {
    records: Vec<Record>,
    /// Length of the log up to the last complete line
    valid_len: u64,
    torn: bool,
}

/// Parse the record log, tolerating only a torn final line
fn replay(contents: &[u8], dimensions: usize) -> Result<Replay, DomainError> {
    let mut records = Vec::new();
    let mut offset = 0;
    let mut line_no = 0;

    while offset < contents.len() {
        let rest = &contents[offset..];

        let Some(end) = rest.iter().position(|&b| b == b'\n') else {
            return Ok(Replay {
                records,
                valid_len: offset as u64,
                torn: true,
            });
        };

        line_no += 1;
        let line = &rest[..end];

        if !line.iter().all(|b| b.is_ascii_whitespace()) {
            let record: Record = serde_json::from_slice(line).map_err(|e| {
                DomainError::storage_io(format!("{} line {} is corrupt: {}", RECORDS_FILE, line_no, e))
            })?;

            if record.vector().len() != dimensions {
                return Err(DomainError::storage_io(format!(
                    "{} line {} has {} dimensions, expected {}",
                    RECORDS_FILE,
                    line_no,
                    record.vector().len(),
                    dimensions
                )));
            }

            records.push(record);
        }

        offset += end + 1;
    }

    Ok(Replay {
        records,
        valid_len: offset as u64,
        torn: false,
    })
}

/// Operations the append log needs from its file
trait LogFile {
    fn len(&self) -> io::Result<u64>;
    fn append(&self, bytes: &[u8]) -> io::Result<()>;
    fn sync(&self) -> io::Result<()>;
    /// Cut the log back to `len` bytes and sync
    fn truncate(&self, len: u64) -> io::Result<()>;
}

impl LogFile for File {
    fn len(&self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }

    fn append(&self, bytes: &[u8]) -> io::Result<()> {
        let mut file = self;
        file.write_all(bytes)
    }

    fn sync(&self) -> io::Result<()> {
        self.sync_data()
    }

    fn truncate(&self, len: u64) -> io::Result<()> {
        self.set_len(len)?;
        self.sync_all()
    }
}

const PENDING: u8 = 0;
const COMPLETED: u8 = 1;
const ABANDONED: u8 = 2;

/// Decides whether a blocking log write or its timed-out caller wins
#[derive(Debug, Default)]
struct Handoff(AtomicU8);

impl Handoff {
    /// Claimed by the blocking task; false once the caller has given up
    fn complete(&self) -> bool {
        self.0
            .compare_exchange(PENDING, COMPLETED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Claimed by the caller on timeout; false once the task has completed
    fn abandon(&self) -> bool {
        self.0
            .compare_exchange(PENDING, ABANDONED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// Append one line and sync it, truncating back on failure
///
/// Returns the log length before the append.
fn append_line<L: LogFile>(log: &L, line: &[u8]) -> Result<u64, DomainError> {
    let start = log.len()?;

    if let Err(e) = log.append(line).and_then(|()| log.sync()) {
        if let Err(undo) = log.truncate(start) {
            return Err(DomainError::storage_io(format!(
                "append failed ({}) and could not be rolled back: {}",
                e, undo
            )));
        }
        return Err(e.into());
    }

    Ok(start)
}

/// Append a record line, undoing it if the caller timed out meanwhile
fn append_record<L: LogFile>(log: &L, line: &[u8], handoff: &Handoff) -> Result<(), DomainError> {
    let start = append_line(log, line)?;

    if handoff.complete() {
        return Ok(());
    }

    log.truncate(start)?;
    warn!("Rolled back record append abandoned after timeout");
    Err(DomainError::internal("record append abandoned"))
}

/// Empty the log unless the caller timed out before the work began
fn truncate_log<L: LogFile>(log: &L, handoff: &Handoff) -> Result<(), DomainError> {
    if !handoff.complete() {
        return Err(DomainError::internal("log truncation abandoned"));
    }

    log.truncate(0)?;
    Ok(())
}

/// Run `work` on the blocking pool while it owns the writer lock
///
/// The lock is handed back on success, so the caller still excludes other
/// writers while it updates in-memory state. On timeout the lock stays with
/// the task and is released only once the file work has finished or been
/// rolled back.
async fn with_log<L, T, F>(
    operation: &'static str,
    timeout: Duration,
    log: OwnedMutexGuard<L>,
    work: F,
) -> Result<(OwnedMutexGuard<L>, T), DomainError>
where
    L: Send + 'static,
    T: Send + 'static,
    F: FnOnce(&L, &Handoff) -> Result<T, DomainError> + Send + 'static,
{
    let handoff = Arc::new(Handoff::default());
    let task_handoff = Arc::clone(&handoff);

    let mut task = tokio::task::spawn_blocking(move || {
        work(&*log, &task_handoff).map(|value| (log, value))
    });

    let waited = tokio::time::timeout(timeout, &mut task).await;
    let joined = match waited {
        Ok(joined) => joined,
        Err(_) if handoff.abandon() => return Err(DomainError::timeout(operation, timeout)),
        // The task finished first; its result is authoritative
        Err(_) => task.await,
    };

    joined.map_err(|e| DomainError::internal(format!("{} task failed: {}", operation, e)))?
}

fn read_or_create_manifest(dir: &Path, dimensions: usize) -> Result<(), DomainError> {
    let path = dir.join(MANIFEST_FILE);

    if path.exists() {
        let contents = std::fs::read(&path)?;
        let manifest: Manifest = serde_json::from_slice(&contents).map_err(|e| {
            DomainError::storage_io(format!("{} is corrupt: {}", path.display(), e))
        })?;

        if manifest.version != FORMAT_VERSION {
            return Err(DomainError::configuration(format!(
                "unsupported store format version {}",
                manifest.version
            )));
        }

        if manifest.dimensions != dimensions {
            return Err(DomainError::configuration(format!(
                "store at {} holds {}-dimensional vectors, configured for {}",
                dir.display(),
                manifest.dimensions,
                dimensions
            )));
        }

        return Ok(());
    }

    let manifest = Manifest {
        version: FORMAT_VERSION,
        dimensions,
    };
    let body = serde_json::to_vec_pretty(&manifest)
        .map_err(|e| DomainError::internal(format!("Failed to serialize manifest: {}", e)))?;

    let mut file = File::create(&path)?;
    file.write_all(&body)?;
    file.sync_all()?;
    Ok(())
}

/// Durable record store on the local filesystem
#[derive(Debug)]
pub struct FileRecordStore {
    dir: PathBuf,
    dimensions: usize,
    io_timeout: Duration,
    memory_limit: Option<usize>,
    table: RwLock<RecordTable>,
    /// Append handle; holding the lock makes the caller the single writer
    log: Arc<Mutex<File>>,
}

impl FileRecordStore {
    /// Open (or create) a store in `dir` fixed to `dimensions`
    pub async fn open(
        dir: impl Into<PathBuf>,
        dimensions: usize,
        io_timeout: Duration,
    ) -> Result<Self, DomainError> {
        let dir = dir.into();
        let setup_dir = dir.clone();

        let log = run_blocking("open record store", io_timeout, move || {
            std::fs::create_dir_all(&setup_dir)?;
            read_or_create_manifest(&setup_dir, dimensions)?;

            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .read(true)
                .open(setup_dir.join(RECORDS_FILE))?;
            Ok(file)
        })
        .await?;

        Ok(Self {
            dir,
            dimensions,
            io_timeout,
            memory_limit: None,
            table: RwLock::new(RecordTable::default()),
            log: Arc::new(Mutex::new(log)),
        })
    }

    /// Cap the approximate memory held by records
    pub fn with_memory_limit(mut self, limit: Option<usize>) -> Self {
        self.memory_limit = limit;
        self
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, RecordTable>, DomainError> {
        self.table
            .read()
            .map_err(|e| DomainError::internal(format!("Failed to acquire read lock: {}", e)))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, RecordTable>, DomainError> {
        self.table
            .write()
            .map_err(|e| DomainError::internal(format!("Failed to acquire write lock: {}", e)))
    }
}

#[async_trait]
impl RecordStore for FileRecordStore {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn load(&self) -> Result<usize, DomainError> {
        let log = Arc::clone(&self.log).lock_owned().await;
        let path = self.dir.join(RECORDS_FILE);
        let dimensions = self.dimensions;

        let (_log, replayed) = with_log("load records", self.io_timeout, log, move |file, _| {
            let contents = std::fs::read(&path)?;
            let replayed = replay(&contents, dimensions)?;

            if replayed.torn {
                file.truncate(replayed.valid_len)?;
            }

            Ok(replayed)
        })
        .await?;

        if replayed.torn {
            warn!(
                path = %self.dir.display(),
                "Dropped torn final line from record log"
            );
        }

        let table = RecordTable::from_records(replayed.records)?;
        let count = table.len();
        *self.write()? = table;

        info!(path = %self.dir.display(), records = count, "Loaded record store");
        Ok(count)
    }

    async fn insert(&self, record: NewRecord) -> Result<Record, DomainError> {
        record.validate(self.dimensions)?;

        let log = Arc::clone(&self.log).lock_owned().await;
        check_memory(&*self.read()?, &record, self.memory_limit)?;

        let record = record.commit();
        let mut line = serde_json::to_vec(&record)
            .map_err(|e| DomainError::internal(format!("Failed to serialize record: {}", e)))?;
        line.push(b'\n');

        let (_log, ()) = with_log("append record", self.io_timeout, log, move |file, handoff| {
            append_record(file, &line, handoff)
        })
        .await?;

        self.write()?.push(record.clone());
        Ok(record)
    }

    async fn get(&self, id: &RecordId) -> Result<Option<Record>, DomainError> {
        Ok(self.read()?.get(id).cloned())
    }

    async fn export_all(&self) -> Result<Vec<Record>, DomainError> {
        Ok(self.read()?.records().to_vec())
    }

    async fn clear(&self) -> Result<usize, DomainError> {
        let log = Arc::clone(&self.log).lock_owned().await;
        let (_log, ()) =
            with_log("clear records", self.io_timeout, log, truncate_log::<File>).await?;

        let removed = self.write()?.clear();
        info!(path = %self.dir.display(), removed, "Cleared record store");
        Ok(removed)
    }

    async fn count(&self) -> Result<usize, DomainError> {
        Ok(self.read()?.len())
    }
}
