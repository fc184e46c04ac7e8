//! Append-only CSV training log.
//!
//! The file is opened in append mode on every write, so an operator can
//! rotate or delete it while the controller runs.  A header row is
//! written when the file is new or empty.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use log::info;

use crate::app::ports::RecordSink;
use crate::app::record::CycleRecord;
use crate::error::StorageError;

pub struct CsvRecordLog {
    path: PathBuf,
}

impl CsvRecordLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordSink for CsvRecordLog {
    fn append(&mut self, record: &CycleRecord) -> Result<(), StorageError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        if file.metadata()?.len() == 0 {
            writeln!(file, "{}", CycleRecord::csv_header())?;
            info!("Storage: started {}", self.path.display());
        }
        writeln!(file, "{}", record.to_csv_row())?;
        Ok(())
    }
}

/// Sink used when recording is disabled.
#[derive(Debug, Default)]
pub struct NullRecordSink;

impl RecordSink for NullRecordSink {
    fn append(&mut self, _record: &CycleRecord) -> Result<(), StorageError> {
        Ok(())
    }
}
