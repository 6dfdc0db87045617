// src/hal/serial_driver.rs
//! Line-oriented sample transports: serial device nodes, recorded CSV files and in-memory readers
//!
//! Records are decoded as Latin-1 so a corrupted byte never aborts a read; the
//! record is simply rejected later by the sample parser.

use crate::config::SerialConfig;
use crate::hal::traits::{LineRead, SampleTransport, TransportError};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Per-transport counters
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TransportStats {
    pub lines_read: u64,
    pub bytes_read: u64,
    pub lines_skipped: u64,
    pub oversized_lines: u64,
}

/// Reads newline-terminated records from any buffered reader
pub struct LineTransport<R> {
    reader: Option<R>,
    description: String,
    pending: Vec<u8>,
    /// Inside an oversized record; bytes are dropped up to the next newline
    discarding: bool,
    skip_remaining: usize,
    max_line_bytes: usize,
    stats: TransportStats,
}

/// Serial device node opened as a file; line discipline and baud rate come from the OS
pub type SerialLineTransport = LineTransport<BufReader<File>>;

impl<R: BufRead + Send> LineTransport<R> {
    pub fn from_reader(reader: R, description: impl Into<String>) -> Self {
        Self {
            reader: Some(reader),
            description: description.into(),
            pending: Vec::new(),
            discarding: false,
            skip_remaining: 0,
            max_line_bytes: crate::config::constants::serial::MAX_LINE_BYTES,
            stats: TransportStats::default(),
        }
    }

    /// Discard the first `count` complete lines
    pub fn skip_initial_lines(mut self, count: usize) -> Self {
        self.skip_remaining = count;
        self
    }

    /// Lines longer than this are dropped
    pub fn with_max_line_bytes(mut self, max_line_bytes: usize) -> Self {
        self.max_line_bytes = max_line_bytes.max(1);
        self
    }

    pub fn stats(&self) -> &TransportStats {
        &self.stats
    }

    pub fn is_open(&self) -> bool {
        self.reader.is_some()
    }

    fn take_line(&mut self) -> String {
        let mut bytes = std::mem::take(&mut self.pending);
        while matches!(bytes.last(), Some(b'\n') | Some(b'\r')) {
            bytes.pop();
        }
        bytes.iter().map(|&b| b as char).collect()
    }
}

impl SerialLineTransport {
    /// Open the configured device node and wait for the board to settle
    pub fn open(config: &SerialConfig) -> Result<Self, TransportError> {
        let mut options = OpenOptions::new();
        options.read(true);
        // Reads on a silent device return WouldBlock so the loop can observe stop requests
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.custom_flags(libc::O_NONBLOCK | libc::O_NOCTTY);
        }
        let file = options
            .open(&config.port_name)
            .map_err(|source| TransportError::Open {
                port: config.port_name.clone(),
                source,
            })?;

        if config.settle_delay_ms > 0 {
            debug!(port = %config.port_name, delay_ms = config.settle_delay_ms, "waiting for device to settle");
            std::thread::sleep(Duration::from_millis(config.settle_delay_ms));
        }

        info!(port = %config.port_name, baud = config.baud_rate, "serial transport opened");
        Ok(Self::from_reader(BufReader::new(file), config.port_name.clone())
            .skip_initial_lines(config.skip_initial_lines)
            .with_max_line_bytes(config.max_line_bytes))
    }

    /// Replay a recorded CSV capture; its header line is rejected by the parser like any non-numeric record
    pub fn open_replay<P: AsRef<Path>>(path: P) -> Result<Self, TransportError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| TransportError::Open {
            port: path.display().to_string(),
            source,
        })?;
        Ok(Self::from_reader(BufReader::new(file), path.display().to_string()))
    }
}

impl<R: BufRead + Send> SampleTransport for LineTransport<R> {
    fn read_line(&mut self) -> Result<LineRead, TransportError> {
        loop {
            let reader = self.reader.as_mut().ok_or(TransportError::Closed)?;

            let available = match reader.fill_buf() {
                Ok(available) => available,
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted) => {
                    return Ok(LineRead::Pending);
                }
                Err(source) => {
                    return Err(TransportError::Read {
                        port: self.description.clone(),
                        source,
                    });
                }
            };

            if available.is_empty() {
                if self.discarding {
                    self.discarding = false;
                    self.pending.clear();
                }
                if self.pending.is_empty() {
                    return Ok(LineRead::Closed);
                }
                // Final record without terminator
            } else {
                let (taken, terminated) = match available.iter().position(|&b| b == b'\n') {
                    Some(index) => (index + 1, true),
                    None => (available.len(), false),
                };
                if !self.discarding {
                    self.pending.extend_from_slice(&available[..taken]);
                }
                reader.consume(taken);
                self.stats.bytes_read += taken as u64;

                if self.discarding {
                    self.discarding = !terminated;
                    continue;
                }
                if self.pending.len() > self.max_line_bytes {
                    self.stats.oversized_lines += 1;
                    debug!(port = %self.description, bytes = self.pending.len(), "dropping oversized line");
                    self.pending.clear();
                    self.discarding = !terminated;
                    continue;
                }
                if !terminated {
                    continue;
                }
            }

            let line = self.take_line();
            if self.skip_remaining > 0 {
                self.skip_remaining -= 1;
                self.stats.lines_skipped += 1;
                continue;
            }

            self.stats.lines_read += 1;
            return Ok(LineRead::Line(line));
        }
    }

    fn close(&mut self) -> Result<(), TransportError> {
        match self.reader.take() {
            Some(_) => {
                debug!(port = %self.description, lines = self.stats.lines_read, "transport closed");
                Ok(())
            }
            None => Err(TransportError::Closed),
        }
    }

    fn describe(&self) -> String {
        self.description.clone()
    }
}
