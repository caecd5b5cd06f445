use std::io::{
    Cursor,
    Write,
};

use chrono::{
    DateTime,
    Utc,
};
use zip::{
    write::SimpleFileOptions,
    CompressionMethod,
    ZipWriter,
};

use crate::core::PackError;

/// Sink for the files of a batch. Errors are fatal to the whole run.
pub trait ArchiveWriter {
    fn add_entry(&mut self, path: &str, bytes: &[u8]) -> Result<(), PackError>;

    fn entry_count(&self) -> usize;

    fn serialize(self) -> Result<Vec<u8>, PackError>
    where
        Self: Sized;
}

pub struct ZipArchiveWriter {
    zip: ZipWriter<Cursor<Vec<u8>>>,
    options: SimpleFileOptions,
    entries: usize,
}

impl ZipArchiveWriter {
    pub fn new() -> Self {
        Self {
            zip: ZipWriter::new(Cursor::new(Vec::new())),
            options: SimpleFileOptions::default().compression_method(CompressionMethod::Deflated),
            entries: 0,
        }
    }
}

impl Default for ZipArchiveWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchiveWriter for ZipArchiveWriter {
    fn add_entry(&mut self, path: &str, bytes: &[u8]) -> Result<(), PackError> {
        self.zip
            .start_file(path, self.options)
            .map_err(|e| PackError::Archive(format!("Failed to create {}: {}", path, e)))?;
        self.zip
            .write_all(bytes)
            .map_err(|e| PackError::Archive(format!("Failed to write {}: {}", path, e)))?;
        self.entries += 1;
        Ok(())
    }

    fn entry_count(&self) -> usize {
        self.entries
    }

    fn serialize(self) -> Result<Vec<u8>, PackError> {
        let cursor =
            self.zip.finish().map_err(|e| PackError::Archive(format!("Failed to finalize ZIP: {}", e)))?;
        Ok(cursor.into_inner())
    }
}

/// `converted_images_20250101T120000.zip`
pub fn archive_file_name(now: DateTime<Utc>) -> String {
    format!("converted_images_{}.zip", now.format("%Y%m%dT%H%M%S"))
}
