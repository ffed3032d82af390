//! JSONL run log - append-only writer
//!
//! Files are organised by day: `<audit_dir>/2026-10-14.jsonl`

use super::RunRecord;
use crate::error::PersistenceResult;
use chrono::Utc;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Run log - appends one record per reconciliation run.
pub struct RunLog {
    base_path: PathBuf,
    /// Records written by this handle
    written: AtomicU64,
    current_writer: Mutex<Option<DayWriter>>,
}

struct DayWriter {
    date: String,
    writer: BufWriter<File>,
}

impl RunLog {
    /// Open (creating the directory if needed)
    pub fn new<P: AsRef<Path>>(base_path: P) -> PersistenceResult<Self> {
        let base_path = base_path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path)?;

        Ok(Self {
            base_path,
            written: AtomicU64::new(0),
            current_writer: Mutex::new(None),
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn written(&self) -> u64 {
        self.written.load(Ordering::SeqCst)
    }

    fn file_path(&self, date: &str) -> PathBuf {
        self.base_path.join(format!("{}.jsonl", date))
    }

    fn current_date() -> String {
        Utc::now().format("%Y-%m-%d").to_string()
    }

    /// Append a run record and flush
    pub fn append(&self, record: &RunRecord) -> PersistenceResult<()> {
        let date = Self::current_date();
        let json = serde_json::to_string(record)?;

        let mut guard = self
            .current_writer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let needs_new_file = guard.as_ref().map_or(true, |w| w.date != date);
        if needs_new_file {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(self.file_path(&date))?;
            *guard = Some(DayWriter {
                date,
                writer: BufWriter::new(file),
            });
        }

        if let Some(ref mut w) = *guard {
            writeln!(w.writer, "{}", json)?;
            w.writer.flush()?;
        }

        self.written.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    /// All log files, oldest first
    pub fn list_files(&self) -> PersistenceResult<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.base_path)? {
            let path = entry?.path();
            if path.extension().map_or(false, |ext| ext == "jsonl") {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    pub fn flush(&self) -> PersistenceResult<()> {
        let mut guard = self
            .current_writer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(ref mut w) = *guard {
            w.writer.flush()?;
        }
        Ok(())
    }
}

impl Drop for RunLog {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}
