//! Run log reader - replay logged runs from JSONL files

use super::{RunKind, RunRecord};
use crate::error::PersistenceResult;
use chrono::NaiveDate;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Reads run records written by [`super::RunLog`]
pub struct RunLogReader {
    base_path: PathBuf,
}

impl RunLogReader {
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    /// Every record in one file
    pub fn read_file(&self, file_path: &Path) -> PersistenceResult<Vec<RunRecord>> {
        let reader = BufReader::new(File::open(file_path)?);
        let mut records = Vec::new();

        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            records.push(serde_json::from_str(&line)?);
        }

        Ok(records)
    }

    /// Every record, oldest first
    pub fn read_all(&self) -> PersistenceResult<Vec<RunRecord>> {
        let mut all = Vec::new();
        if !self.base_path.exists() {
            return Ok(all);
        }

        let mut files: Vec<PathBuf> = std::fs::read_dir(&self.base_path)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().map_or(false, |ext| ext == "jsonl"))
            .collect();
        files.sort();

        for file_path in files {
            all.extend(self.read_file(&file_path)?);
        }
        Ok(all)
    }

    /// Records matching the filter, newest first
    pub fn query(&self, filter: &RunFilter) -> PersistenceResult<Vec<RunRecord>> {
        let mut records: Vec<RunRecord> = self
            .read_all()?
            .into_iter()
            .filter(|r| filter.matches(r))
            .collect();
        records.reverse();
        if let Some(limit) = filter.limit {
            records.truncate(limit);
        }
        Ok(records)
    }

    /// Most recent record
    pub fn latest(&self) -> PersistenceResult<Option<RunRecord>> {
        Ok(self.read_all()?.pop())
    }
}

/// Run record filter
#[derive(Debug, Clone, Default)]
pub struct RunFilter {
    pub kind: Option<RunKind>,
    /// Runs started on or after this day
    pub since: Option<NaiveDate>,
    /// Only runs that left items for review
    pub only_needs_review: bool,
    pub limit: Option<usize>,
}

impl RunFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn kind(mut self, kind: RunKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn since(mut self, date: NaiveDate) -> Self {
        self.since = Some(date);
        self
    }

    pub fn only_needs_review(mut self) -> Self {
        self.only_needs_review = true;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, record: &RunRecord) -> bool {
        if let Some(kind) = self.kind {
            if record.kind != kind {
                return false;
            }
        }
        if let Some(since) = self.since {
            if record.started_at.date_naive() < since {
                return false;
            }
        }
        if self.only_needs_review && record.summary.total_needs_review == 0 {
            return false;
        }
        true
    }
}
