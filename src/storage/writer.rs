//! Journal writer
//!
//! - Append-only, no in-place updates
//! - One record per committed snapshot
//! - With `fsync` enabled a write is not acknowledged until `sync_data`
//!   returns
//! - A failed append is truncated away before the error is returned; if
//!   the truncation fails too, the writer refuses every later append

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::errors::{AdapterError, AdapterResult};
use super::record;
use crate::mvcc::Snapshot;

/// File name of the journal inside the data directory.
pub const JOURNAL_FILE: &str = "journal.log";

/// Appends snapshot records to the journal file.
pub struct JournalWriter {
    path: PathBuf,
    file: File,
    current_offset: u64,
    fsync: bool,
    poisoned: bool,
}

impl JournalWriter {
    /// Opens or creates `<data_dir>/journal.log`, creating the directory
    /// if needed.
    pub fn open(data_dir: &Path, fsync: bool) -> AdapterResult<Self> {
        if !data_dir.exists() {
            fs::create_dir_all(data_dir).map_err(|e| {
                AdapterError::io(
                    format!("failed to create data directory {}", data_dir.display()),
                    e,
                )
            })?;
        }

        let path = data_dir.join(JOURNAL_FILE);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| AdapterError::io(format!("failed to open journal {}", path.display()), e))?;

        let current_offset = file
            .metadata()
            .map_err(|e| AdapterError::io("failed to read journal metadata", e))?
            .len();

        Ok(Self {
            path,
            file,
            current_offset,
            fsync,
            poisoned: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn current_offset(&self) -> u64 {
        self.current_offset
    }

    /// True once a failed append could not be rolled back.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Appends one snapshot, returning the offset it was written at.
    ///
    /// On error the journal is left exactly `current_offset` bytes long,
    /// so a write the caller saw fail is never replayed.
    pub fn append(&mut self, snapshot: &Snapshot) -> AdapterResult<u64> {
        if self.poisoned {
            return Err(AdapterError::JournalPoisoned(format!(
                "refusing to append {} to {}",
                snapshot.uri(),
                self.path.display()
            )));
        }

        let bytes = record::encode(snapshot)?;
        let offset = self.current_offset;

        if let Err(e) = self.write_record(&bytes, snapshot.uri()) {
            self.rollback(offset)?;
            return Err(e);
        }

        self.current_offset += bytes.len() as u64;
        Ok(offset)
    }

    fn write_record(&mut self, bytes: &[u8], uri: &str) -> AdapterResult<()> {
        self.file
            .write_all(bytes)
            .map_err(|e| AdapterError::io(format!("failed to append {}", uri), e))?;

        if self.fsync {
            self.file.sync_data().map_err(|e| {
                AdapterError::io(format!("fsync failed after appending {}", uri), e)
            })?;
        }
        Ok(())
    }

    /// Cuts the file back to `offset`, discarding a partial or unsynced
    /// record.
    fn rollback(&mut self, offset: u64) -> AdapterResult<()> {
        let truncated = self.file.set_len(offset).and_then(|()| {
            if self.fsync {
                self.file.sync_data()
            } else {
                Ok(())
            }
        });

        match truncated {
            Ok(()) => {
                self.current_offset = offset;
                Ok(())
            }
            Err(e) => {
                self.poisoned = true;
                Err(AdapterError::JournalPoisoned(format!(
                    "failed to truncate {} back to {} bytes: {}",
                    self.path.display(),
                    offset,
                    e
                )))
            }
        }
    }

    /// Forces buffered data to disk.
    pub fn sync(&mut self) -> AdapterResult<()> {
        self.file.flush().map_err(|e| AdapterError::io("journal flush failed", e))?;
        self.file
            .sync_all()
            .map_err(|e| AdapterError::io("journal fsync failed", e))
    }
}
