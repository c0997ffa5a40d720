//! Trade file reader
//!
//! Yields one [`RawRow`] per data line, keyed by the header row, in file
//! order. A malformed line ends iteration with an error instead of being
//! skipped.

use crate::config::SourceConfig;
use crate::error::{IngestError, Result};
use csv::{Reader, ReaderBuilder, StringRecord};
use std::fs::File;
use std::path::PathBuf;
use tradefeed_common::RawRow;

/// Single-pass reader over a delimited trade file
pub struct RecordSource {
    path: PathBuf,
    reader: Reader<File>,
    headers: StringRecord,
    record: StringRecord,
    finished: bool,
}

impl RecordSource {
    /// Open the file and read its header row
    pub fn open(config: &SourceConfig) -> Result<Self> {
        let path = config.path.clone();

        let mut reader = ReaderBuilder::new()
            .delimiter(config.delimiter)
            .has_headers(true)
            .from_path(&path)
            .map_err(|e| IngestError::source_read(&path, e))?;

        let headers = reader
            .headers()
            .map_err(|e| IngestError::source_read(&path, e))?
            .clone();

        Ok(Self {
            path,
            reader,
            headers,
            record: StringRecord::new(),
            finished: false,
        })
    }

    pub fn headers(&self) -> &StringRecord {
        &self.headers
    }
}

impl Iterator for RecordSource {
    type Item = Result<RawRow>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        match self.reader.read_record(&mut self.record) {
            Ok(true) => Some(Ok(self
                .headers
                .iter()
                .zip(self.record.iter())
                .map(|(column, value)| (column.to_string(), value.to_string()))
                .collect())),
            Ok(false) => {
                self.finished = true;
                None
            },
            Err(e) => {
                self.finished = true;
                Some(Err(IngestError::source_read(&self.path, e)))
            },
        }
    }
}
