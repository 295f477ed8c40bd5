// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Write-ahead log for durable storage

use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;
use suds_core::Operation;
use thiserror::Error;

/// Errors that can occur in WAL operations
#[derive(Debug, Error)]
pub enum WalError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("corrupt WAL entry at line {line}: {source}")]
    Corrupt {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed append could not be rolled back: {source} (rollback: {rollback})")]
    RollbackFailed {
        #[source]
        source: io::Error,
        rollback: io::Error,
    },
    #[error("WAL is unusable after a failed rollback")]
    Poisoned,
}

/// File operations the WAL needs to append and undo an append
trait LogFile: Write + Send {
    fn len(&self) -> io::Result<u64>;
    fn sync(&mut self) -> io::Result<()>;
    /// Cut the file back to `len` bytes and sync
    fn truncate(&mut self, len: u64) -> io::Result<()>;
}

impl LogFile for File {
    fn len(&self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }

    fn sync(&mut self) -> io::Result<()> {
        self.sync_all()
    }

    fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)?;
        self.sync_all()
    }
}

/// Write-ahead log for durable operation storage
pub struct Wal {
    file: Box<dyn LogFile>,
    sequence: u64,
    /// Set when a failed append left bytes that could not be removed
    poisoned: bool,
}

impl Wal {
    /// Open or create a WAL at the given path
    ///
    /// A torn final entry left by a crash is cut off so new appends start on a
    /// clean line.
    pub fn open(path: &Path) -> Result<Self, WalError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .read(true)
            .open(path)?;

        let scan = scan(path)?;
        let len = file.metadata()?.len();
        if scan.valid_len < len {
            tracing::warn!(
                path = %path.display(),
                dropped_bytes = len - scan.valid_len,
                "truncating torn WAL tail"
            );
            file.set_len(scan.valid_len)?;
        }
        if scan.missing_newline {
            writeln!(file)?;
        }

        Ok(Self {
            file: Box::new(file),
            sequence: scan.ops.len() as u64,
            poisoned: false,
        })
    }

    /// Append an operation and sync it to disk before returning
    ///
    /// On failure the file is cut back to its previous length so a rejected
    /// operation never reappears on replay. If that cut fails too, every later
    /// append is refused.
    pub fn append(&mut self, op: &Operation) -> Result<u64, WalError> {
        if self.poisoned {
            return Err(WalError::Poisoned);
        }
        let entry = WalEntry {
            seq: self.sequence + 1,
            op: op.clone(),
        };
        let mut line = serde_json::to_vec(&entry)?;
        line.push(b'\n');

        let start = self.file.len()?;
        let written = self
            .file
            .write_all(&line)
            .and_then(|()| self.file.sync());
        if let Err(source) = written {
            return match self.file.truncate(start) {
                Ok(()) => Err(WalError::Io(source)),
                Err(rollback) => {
                    tracing::error!(error = %source, %rollback, "WAL rollback failed");
                    self.poisoned = true;
                    Err(WalError::RollbackFailed { source, rollback })
                }
            };
        }

        self.sequence = entry.seq;
        Ok(self.sequence)
    }

    /// Get the current sequence number
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Replay all operations from the log
    ///
    /// An unparseable final line is treated as an interrupted write and
    /// skipped. Anything unparseable before the end is corruption.
    pub fn replay(path: &Path) -> Result<Vec<Operation>, WalError> {
        Ok(scan(path)?.ops)
    }
}

struct Scan {
    ops: Vec<Operation>,
    /// Bytes up to and including the last good entry
    valid_len: u64,
    /// Last good entry has no trailing newline
    missing_newline: bool,
}

fn scan(path: &Path) -> Result<Scan, WalError> {
    let mut scan = Scan {
        ops: Vec::new(),
        valid_len: 0,
        missing_newline: false,
    };
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(scan),
        Err(e) => return Err(e.into()),
    };

    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();
    let mut offset = 0u64;
    let mut line_no = 0usize;
    let mut torn: Option<(usize, serde_json::Error)> = None;

    loop {
        buf.clear();
        let read = reader.read_until(b'\n', &mut buf)?;
        if read == 0 {
            break;
        }
        line_no += 1;
        offset += read as u64;

        let text = trim_line(&buf);
        if text.is_empty() {
            if torn.is_none() {
                scan.valid_len = offset;
            }
            continue;
        }
        if let Some((line, source)) = torn.take() {
            return Err(WalError::Corrupt { line, source });
        }
        match serde_json::from_slice::<WalEntry>(text) {
            Ok(entry) => {
                scan.ops.push(entry.op);
                scan.valid_len = offset;
                scan.missing_newline = !buf.ends_with(b"\n");
            }
            Err(source) => torn = Some((line_no, source)),
        }
    }

    if let Some((line, source)) = torn {
        tracing::warn!(line, error = %source, "ignoring torn final WAL entry");
    }
    Ok(scan)
}

fn trim_line(buf: &[u8]) -> &[u8] {
    let mut end = buf.len();
    while end > 0 && matches!(buf[end - 1], b'\n' | b'\r') {
        end -= 1;
    }
    &buf[..end]
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct WalEntry {
    seq: u64,
    op: Operation,
}

#[cfg(test)]
#[path = "wal_tests.rs"]
mod tests;
