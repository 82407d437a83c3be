// CLASSIFICATION: COMMUNITY
// Filename: flash.rs v0.2
// Author: Lukas Bower
// Date Modified: 2027-08-19

//! Block-storage abstraction over one boot-config flash partition.
//!
//! Real devices back this with NOR MTD partitions; hosts and tests use
//! [`FileFlash`], which models the one NOR property the record log relies on:
//! an erased partition reads as all 0xFF.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Byte value NOR flash reads as after an erase.
pub const ERASED_BYTE: u8 = 0xff;

/// Errors surfaced by partition reads, writes and erases.
#[derive(Debug, thiserror::Error)]
pub enum FlashError {
    /// The underlying device failed or is absent.
    #[error("flash io: {0}")]
    Io(#[from] std::io::Error),
    /// The partition refused the write.
    #[error("partition {0} is write-protected")]
    WriteProtected(String),
    /// The backing file disagrees with the configured partition size.
    #[error("partition {name} backing is {actual} bytes, configured size is {expected}")]
    GeometryMismatch {
        /// Partition name.
        name: String,
        /// Configured partition size.
        expected: u64,
        /// Actual backing file length.
        actual: u64,
    },
    /// An access ran past the end of the partition.
    #[error("access beyond end of {name}: offset {offset} len {len} size {size}")]
    OutOfBounds {
        /// Partition name.
        name: String,
        /// Requested byte offset.
        offset: u64,
        /// Requested length.
        len: usize,
        /// Partition size.
        size: u64,
    },
}

/// One fixed-size flash partition holding a whole number of records.
///
/// All operations block; erase in particular may take milliseconds on real
/// hardware and there is no asynchronous variant.
pub trait FlashPartition {
    /// Stable partition name for logs and errors.
    fn name(&self) -> &str;

    /// Partition size in bytes.
    fn len(&self) -> u64;

    /// Whether the partition holds no bytes at all.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read `buf.len()` bytes starting at `offset`.
    fn read(&mut self, offset: u64, buf: &mut [u8]) -> Result<(), FlashError>;

    /// Write `bytes` starting at `offset`.
    fn write(&mut self, offset: u64, bytes: &[u8]) -> Result<(), FlashError>;

    /// Erase the whole partition back to 0xFF.
    fn erase(&mut self) -> Result<(), FlashError>;
}

/// File-backed partition with NOR erase semantics.
pub struct FileFlash {
    name: String,
    path: PathBuf,
    size: u64,
    write_protected: bool,
}

impl FileFlash {
    /// Open a file-backed partition, creating and pre-erasing the backing
    /// file when absent or empty.
    ///
    /// An existing populated file whose length disagrees with `size` is
    /// refused rather than re-provisioned: re-erasing it over a geometry
    /// change would silently destroy the durable boot history.
    pub fn open(name: &str, path: &Path, size: u64) -> Result<Self, FlashError> {
        let existing = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        if existing != size {
            if existing != 0 {
                return Err(FlashError::GeometryMismatch {
                    name: name.to_string(),
                    expected: size,
                    actual: existing,
                });
            }
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let mut file = File::create(path)?;
            write_erased(&mut file, size)?;
        }
        Ok(Self {
            name: name.to_string(),
            path: path.to_path_buf(),
            size,
            write_protected: false,
        })
    }

    /// Toggle write protection; protected partitions reject writes and erases.
    pub fn set_write_protected(&mut self, protected: bool) {
        self.write_protected = protected;
    }

    fn check_bounds(&self, offset: u64, len: usize) -> Result<(), FlashError> {
        let end = offset.saturating_add(len as u64);
        if end > self.size {
            return Err(FlashError::OutOfBounds {
                name: self.name.clone(),
                offset,
                len,
                size: self.size,
            });
        }
        Ok(())
    }
}

impl FlashPartition for FileFlash {
    fn name(&self) -> &str {
        &self.name
    }

    fn len(&self) -> u64 {
        self.size
    }

    fn read(&mut self, offset: u64, buf: &mut [u8]) -> Result<(), FlashError> {
        self.check_bounds(offset, buf.len())?;
        let mut file = File::open(&self.path)?;
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(buf)?;
        Ok(())
    }

    fn write(&mut self, offset: u64, bytes: &[u8]) -> Result<(), FlashError> {
        if self.write_protected {
            return Err(FlashError::WriteProtected(self.name.clone()));
        }
        self.check_bounds(offset, bytes.len())?;
        let mut file = OpenOptions::new().write(true).open(&self.path)?;
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(bytes)?;
        file.sync_data()?;
        Ok(())
    }

    fn erase(&mut self) -> Result<(), FlashError> {
        if self.write_protected {
            return Err(FlashError::WriteProtected(self.name.clone()));
        }
        let mut file = OpenOptions::new().write(true).open(&self.path)?;
        write_erased(&mut file, self.size)?;
        Ok(())
    }
}

fn write_erased(file: &mut File, size: u64) -> Result<(), FlashError> {
    file.seek(SeekFrom::Start(0))?;
    file.write_all(&vec![ERASED_BYTE; size as usize])?;
    file.sync_data()?;
    Ok(())
}
