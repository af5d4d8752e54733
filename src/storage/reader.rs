//! Journal reader with strict corruption detection
//!
//! - Every record's checksum is validated
//! - A torn tail or a bad checksum is never skipped: replay stops with
//!   `Corruption` and the store refuses to open

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use super::errors::{AdapterError, AdapterResult};
use super::record::{self, MIN_RECORD_SIZE};
use crate::mvcc::Snapshot;

/// Sequential reader over a journal file.
pub struct JournalReader {
    path: PathBuf,
    reader: BufReader<File>,
    current_offset: u64,
    file_size: u64,
}

impl JournalReader {
    /// Opens the journal for reading.
    pub fn open(path: &Path) -> AdapterResult<Self> {
        let file = File::open(path).map_err(|e| {
            AdapterError::io(format!("failed to open journal {}", path.display()), e)
        })?;

        let file_size = file
            .metadata()
            .map_err(|e| AdapterError::io("failed to read journal metadata", e))?
            .len();

        Ok(Self {
            path: path.to_path_buf(),
            reader: BufReader::new(file),
            current_offset: 0,
            file_size,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn current_offset(&self) -> u64 {
        self.current_offset
    }

    /// Reads the next snapshot.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(snapshot))` if a record was read
    /// - `Ok(None)` at end of file
    /// - `Err(Corruption)` on a torn or damaged record
    pub fn read_next(&mut self) -> AdapterResult<Option<Snapshot>> {
        if self.current_offset >= self.file_size {
            return Ok(None);
        }

        let remaining = self.file_size - self.current_offset;
        if remaining < MIN_RECORD_SIZE as u64 {
            return Err(AdapterError::corruption(
                self.current_offset,
                format!(
                    "truncated journal: {} bytes remaining, minimum record size is {}",
                    remaining, MIN_RECORD_SIZE
                ),
            ));
        }

        let mut len_buf = [0u8; 4];
        self.reader.read_exact(&mut len_buf).map_err(|e| {
            AdapterError::corruption(
                self.current_offset,
                format!("failed to read record length: {}", e),
            )
        })?;
        let record_length = u32::from_le_bytes(len_buf) as u64;

        if record_length > remaining {
            return Err(AdapterError::corruption(
                self.current_offset,
                format!(
                    "record length {} exceeds remaining journal size {}",
                    record_length, remaining
                ),
            ));
        }
        if record_length < MIN_RECORD_SIZE as u64 {
            return Err(AdapterError::corruption(
                self.current_offset,
                format!("invalid record length: {}", record_length),
            ));
        }

        let mut record_buf = vec![0u8; record_length as usize];
        record_buf[..4].copy_from_slice(&len_buf);
        self.reader.read_exact(&mut record_buf[4..]).map_err(|e| {
            AdapterError::corruption(
                self.current_offset,
                format!("failed to read record body: {}", e),
            )
        })?;

        let (snapshot, consumed) = record::decode(&record_buf, self.current_offset)?;
        self.current_offset += consumed as u64;

        Ok(Some(snapshot))
    }

    /// Reads every remaining snapshot in journal order.
    pub fn read_all(&mut self) -> AdapterResult<Vec<Snapshot>> {
        let mut snapshots = Vec::new();
        while let Some(snapshot) = self.read_next()? {
            snapshots.push(snapshot);
        }
        Ok(snapshots)
    }
}
