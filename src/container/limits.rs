//! Decompression-bomb guard for ZIP-based containers.

use crate::error::{LimitKind, ParseError};
use serde::{Deserialize, Serialize};
use std::io::{self, Read, Write};
use std::path::Path;

const MIB: u64 = 1024 * 1024;
const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Caps applied while unpacking a container.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ContainerLimits {
    /// Maximum number of entries in the central directory.
    pub max_entries: usize,
    /// Maximum decompressed size of one entry, in bytes.
    pub max_entry_size: u64,
    /// Maximum decompressed size of all written entries, in bytes.
    pub max_total_size: u64,
    /// Maximum uncompressed:compressed ratio.
    pub max_compression_ratio: u64,
    /// Entries at or below this size skip the ratio check.
    pub ratio_threshold: u64,
}

impl Default for ContainerLimits {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            max_entry_size: 100 * MIB,
            max_total_size: 512 * MIB,
            max_compression_ratio: 200,
            ratio_threshold: MIB,
        }
    }
}

impl ContainerLimits {
    pub fn check_entry_count(&self, path: &Path, count: usize) -> Result<(), ParseError> {
        if count > self.max_entries {
            return Err(exceeded(path, LimitKind::EntryCount, count as u64, self.max_entries as u64));
        }
        Ok(())
    }

    /// Start tracking the bytes written for one container.
    pub(crate) fn budget(&self, path: &Path) -> Budget<'_> {
        Budget {
            limits: self,
            path: path.display().to_string(),
            total: 0,
        }
    }

    fn check_ratio(&self, path: &str, size: u64, compressed: u64) -> Result<(), ParseError> {
        if size <= self.ratio_threshold {
            return Ok(());
        }
        let ratio = if compressed == 0 { u64::MAX } else { size / compressed };
        if ratio > self.max_compression_ratio {
            return Err(ParseError::ContainerLimitExceeded {
                path: path.to_string(),
                limit: LimitKind::CompressionRatio,
                actual: ratio,
                max: self.max_compression_ratio,
            });
        }
        Ok(())
    }
}

fn exceeded(path: &Path, limit: LimitKind, actual: u64, max: u64) -> ParseError {
    ParseError::ContainerLimitExceeded {
        path: path.display().to_string(),
        limit,
        actual,
        max,
    }
}

/// Why copying an entry stopped.
#[derive(Debug)]
pub(crate) enum CopyError {
    /// The entry stream failed (bad header, corrupt data, CRC mismatch).
    Read(io::Error),
    /// The scratch file could not be written.
    Write(io::Error),
    Limit(ParseError),
}

/// Running byte count for one container.
pub(crate) struct Budget<'a> {
    limits: &'a ContainerLimits,
    path: String,
    total: u64,
}

impl Budget<'_> {
    /// Check the sizes an entry declares before any byte is decompressed.
    pub fn check_declared(&self, size: u64, compressed: u64) -> Result<(), ParseError> {
        let limits = self.limits;
        if size > limits.max_entry_size {
            return Err(self.exceeded(LimitKind::EntrySize, size, limits.max_entry_size));
        }
        if self.total.saturating_add(size) > limits.max_total_size {
            return Err(self.exceeded(
                LimitKind::TotalSize,
                self.total.saturating_add(size),
                limits.max_total_size,
            ));
        }
        limits.check_ratio(&self.path, size, compressed)
    }

    /// Copy an entry stream, enforcing the limits on the bytes actually
    /// produced rather than the sizes the archive claims.
    pub fn copy_entry<R: Read, W: Write>(
        &mut self,
        reader: &mut R,
        writer: &mut W,
        compressed: u64,
    ) -> Result<u64, CopyError> {
        let limits = self.limits;
        let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
        let mut written = 0u64;

        loop {
            let n = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(CopyError::Read(e)),
            };

            written += n as u64;
            self.total += n as u64;

            if written > limits.max_entry_size {
                return Err(CopyError::Limit(self.exceeded(
                    LimitKind::EntrySize,
                    written,
                    limits.max_entry_size,
                )));
            }
            if self.total > limits.max_total_size {
                return Err(CopyError::Limit(self.exceeded(
                    LimitKind::TotalSize,
                    self.total,
                    limits.max_total_size,
                )));
            }
            limits
                .check_ratio(&self.path, written, compressed)
                .map_err(CopyError::Limit)?;

            writer.write_all(&buffer[..n]).map_err(CopyError::Write)?;
        }

        writer.flush().map_err(CopyError::Write)?;
        Ok(written)
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    fn exceeded(&self, limit: LimitKind, actual: u64, max: u64) -> ParseError {
        ParseError::ContainerLimitExceeded {
            path: self.path.clone(),
            limit,
            actual,
            max,
        }
    }
}
