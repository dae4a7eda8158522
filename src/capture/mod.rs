//! # Capture Module
//!
//! Records decoded input states to JSONL files with rotation.
//!
//! This module handles:
//! - Formatting each state as one JSON object per line
//! - Writing to rotating capture files (max N records per file)
//! - Retaining only the last M capture files
//!
//! Each line has the shape
//! `{"timestamp": "<RFC 3339>", "connection": "usb", "state": {...}}`.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::report::protocol::Connection;
use crate::report::state::InputState;

const FILE_PREFIX: &str = "ds5w_capture_";
const FILE_EXTENSION: &str = "jsonl";

#[derive(Serialize)]
struct CaptureRecord<'a> {
    timestamp: String,
    connection: Connection,
    state: &'a InputState,
}

/// Rotating JSONL writer of input snapshots
pub struct InputRecorder {
    directory: PathBuf,
    max_records_per_file: usize,
    max_files_to_keep: usize,
    writer: Option<BufWriter<File>>,
    current_path: Option<PathBuf>,
    records_in_file: usize,
    file_counter: u32,
}

impl InputRecorder {
    /// Create a recorder writing into `directory` (created if missing)
    ///
    /// # Errors
    ///
    /// Returns `Io` if the directory cannot be created.
    pub fn new(
        directory: impl AsRef<Path>,
        max_records_per_file: usize,
        max_files_to_keep: usize,
    ) -> Result<Self> {
        let directory = directory.as_ref().to_path_buf();
        fs::create_dir_all(&directory)?;

        Ok(Self {
            directory,
            max_records_per_file: max_records_per_file.max(1),
            max_files_to_keep: max_files_to_keep.max(1),
            writer: None,
            current_path: None,
            records_in_file: 0,
            file_counter: 0,
        })
    }

    /// Append one snapshot, rotating first if the current file is full
    ///
    /// # Errors
    ///
    /// Returns `Io` on any file system failure.
    pub fn record(&mut self, connection: Connection, state: &InputState) -> Result<()> {
        if self.writer.is_none() || self.records_in_file >= self.max_records_per_file {
            self.rotate()?;
        }

        let record = CaptureRecord {
            timestamp: Utc::now().to_rfc3339(),
            connection,
            state,
        };

        if let Some(writer) = self.writer.as_mut() {
            serde_json::to_writer(&mut *writer, &record).map_err(std::io::Error::from)?;
            writer.write_all(b"\n")?;
        }
        self.records_in_file += 1;
        Ok(())
    }

    /// Flush buffered records to disk
    pub fn flush(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.as_mut() {
            writer.flush()?;
        }
        Ok(())
    }

    /// File currently being written, if any
    pub fn current_file(&self) -> Option<&Path> {
        self.current_path.as_deref()
    }

    fn rotate(&mut self) -> Result<()> {
        self.flush()?;
        self.writer = None;

        let name = format!(
            "{}{}_{:04}.{}",
            FILE_PREFIX,
            Utc::now().format("%Y%m%d_%H%M%S"),
            self.file_counter,
            FILE_EXTENSION
        );
        self.file_counter = self.file_counter.wrapping_add(1);

        let path = self.directory.join(name);
        let file = File::create(&path)?;
        info!("Capturing input to {}", path.display());

        self.writer = Some(BufWriter::new(file));
        self.current_path = Some(path);
        self.records_in_file = 0;

        self.prune()
    }

    /// Delete the oldest capture files beyond the retention limit
    fn prune(&self) -> Result<()> {
        let mut files = self.capture_files()?;
        if files.len() <= self.max_files_to_keep {
            return Ok(());
        }

        files.sort();
        let excess = files.len() - self.max_files_to_keep;
        for path in files.into_iter().take(excess) {
            match fs::remove_file(&path) {
                Ok(()) => debug!("Removed old capture {}", path.display()),
                Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
            }
        }
        Ok(())
    }

    fn capture_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.directory)? {
            let path = entry?.path();
            let is_capture = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with(FILE_PREFIX) && n.ends_with(FILE_EXTENSION))
                .unwrap_or(false);
            if is_capture {
                files.push(path);
            }
        }
        Ok(files)
    }
}

impl Drop for InputRecorder {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            warn!("Failed to flush capture file: {}", e);
        }
    }
}
