//! Append-only CSV log of newly persisted listings.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use crate::listing::NormalizedListing;

#[derive(thiserror::Error, Debug)]
pub enum ExportError {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Column order of the export file.
pub const CSV_HEADER: &[&str] = &[
    "id",
    "title",
    "price",
    "location",
    "posted_at",
    "region",
    "url",
    "inserted_at",
];

pub struct CsvExport {
    path: PathBuf,
}

impl CsvExport {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, source: std::io::Error) -> ExportError {
        ExportError::Io {
            path: self.path.clone(),
            source,
        }
    }

    /// Appends one row, writing the header first if the file is new or empty.
    pub fn append(&self, listing: &NormalizedListing) -> Result<(), ExportError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.io_err(e))?;
        }
        let needs_header = match fs::metadata(&self.path) {
            Ok(meta) => meta.len() == 0,
            Err(_) => true,
        };
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.io_err(e))?;

        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if needs_header {
            wtr.write_record(CSV_HEADER)?;
        }
        wtr.serialize(listing)?;
        wtr.flush().map_err(|e| self.io_err(e))?;
        Ok(())
    }

    /// Reads every row back. A missing file reads as empty.
    pub fn read_all(&self) -> Result<Vec<NormalizedListing>, ExportError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut rdr = csv::Reader::from_path(&self.path)?;
        let mut rows = Vec::new();
        for row in rdr.deserialize() {
            rows.push(row?);
        }
        Ok(rows)
    }
}
