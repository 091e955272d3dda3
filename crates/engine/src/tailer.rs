// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Incremental file readout.
//!
//! The watched file is a stream of `\n`-separated chunks which, decoded as
//! UTF-8, are log lines carrying a timestamp. Each readout memory-maps the
//! unread region `[cursor, size)`, feeds complete lines to the parser, and
//! advances the cursor to the last accepted line boundary. A trailing
//! partial line stays in the file for the next readout, and a throttling
//! parser (`Ok(None)`) stops the readout without consuming the line, so
//! the same bytes are offered again.

use crate::error::TailError;
use memmap2::Mmap;
use pulse_core::{event, LineParser};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

/// Starting line buffer capacity; tuned to the average log line
const LINE_BUFFER_SIZE: usize = 512;

/// Tails a single file through a resumable byte cursor
pub struct FileTailer<P: LineParser> {
    path: PathBuf,
    parent: PathBuf,
    offset: u64,
    line_buf: Vec<u8>,
    parser: P,
}

impl<P: LineParser> FileTailer<P> {
    pub fn new(path: impl Into<PathBuf>, parser: P) -> Self {
        let path = path.into();
        let parent = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        Self {
            path,
            parent,
            offset: 0,
            line_buf: vec![0; LINE_BUFFER_SIZE],
            parser,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parent folder of the watched file
    pub fn parent(&self) -> &Path {
        &self.parent
    }

    /// Current read offset: the start of the next line to be parsed
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// True when `other`, resolved against the parent folder, is the
    /// watched file. Accepts bare file names and full paths.
    pub fn file_matches(&self, other: &Path) -> bool {
        other
            .file_name()
            .is_some_and(|name| self.parent.join(name) == self.path)
    }

    /// Rewind the cursor to the beginning of the file
    pub fn move_to_start(&mut self) {
        self.offset = 0;
        tracing::debug!("moved to start");
    }

    /// Move the cursor to the current end of the file. Returns false (and
    /// rewinds to 0) when the file does not exist yet.
    pub fn move_to_end(&mut self) -> bool {
        match std::fs::metadata(&self.path) {
            Ok(meta) => {
                self.offset = meta.len();
                tracing::debug!(offset = self.offset, "moved to end");
                true
            }
            Err(_) => {
                self.offset = 0;
                tracing::info!("file does not exist yet, offset set to 0");
                false
            }
        }
    }

    /// Read and parse every complete line appended since the last call.
    ///
    /// The returned batch is sorted ascending by timestamp; external
    /// producers may write slightly out of order.
    pub fn fetch_available_lines(&mut self) -> Result<Vec<P::Event>, TailError> {
        let file = File::open(&self.path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                TailError::FileVanished(self.path.clone())
            } else {
                TailError::Io(e)
            }
        })?;
        let size = file.metadata()?.len();
        if size <= self.offset {
            // a shrunk file is truncation; rotation arrives as CREATE/DELETE
            self.offset = size;
            return Ok(Vec::new());
        }
        // SAFETY: the mapping is read-only and only accessed through the
        // slice below while `mmap` is live
        let mmap = unsafe { Mmap::map(&file)? };
        let data = &mmap[self.offset as usize..size as usize];
        tracing::debug!(bytes = data.len(), offset = self.offset, "reading appended bytes");

        let mut events = Vec::new();
        let mut line_start = 0usize;
        'readout: for i in 0..data.len() {
            if data[i] != b'\n' {
                continue;
            }
            if line_start != i {
                let mut line_len = i - line_start;
                if data[i - 1] == b'\r' {
                    line_len -= 1;
                }
                if line_len > self.line_buf.len() {
                    let grown = (line_len as f64 * 1.5).ceil() as usize;
                    tracing::debug!(from = self.line_buf.len(), to = grown, "resizing line buffer");
                    self.line_buf = vec![0; grown];
                }
                self.line_buf[..line_len].copy_from_slice(&data[line_start..line_start + line_len]);
                let line = String::from_utf8_lossy(&self.line_buf[..line_len]);
                match self.parser.parse_line(&line) {
                    Ok(Some(event)) => events.push(event),
                    Ok(None) => {
                        tracing::debug!("parser throttled, interrupting readout");
                        break 'readout;
                    }
                    Err(e) => {
                        tracing::warn!(
                            offset = self.offset + line_start as u64,
                            line = %line,
                            error = %e,
                            "ignoring malformed line"
                        );
                    }
                }
            }
            line_start = i + 1;
        }
        self.offset += line_start as u64;

        event::sort_by_timestamp(&mut events);
        Ok(events)
    }
}

#[cfg(test)]
#[path = "tailer_tests.rs"]
mod tests;
