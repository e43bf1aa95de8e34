//! Fixed-capacity RHST output stream
//!
//! The backing file is created (or truncated) and sized to the stream capacity
//! when the stream opens. Bytes are staged in memory and may never run past
//! that capacity; on close the staged bytes are written out and the file is
//! trimmed to the written length.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{Result, RhstError};

/// Position-tracked writer over a fixed-capacity backing store.
pub struct StreamWriter {
    path: PathBuf,
    file: Option<File>,
    buffer: Vec<u8>,
    capacity: usize,
    /// Set when close failed to get the staged bytes onto disk.
    flush_failed: bool,
}

impl StreamWriter {
    /// Create or truncate `path` and reserve `capacity` bytes for it.
    pub fn open(path: impl AsRef<Path>, capacity: usize) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|e| RhstError::io(path, e))?;
        file.set_len(capacity as u64)
            .map_err(|e| RhstError::io(path, e))?;

        tracing::debug!("Opened RHST stream {:?} (capacity {} bytes)", path, capacity);

        Ok(Self {
            path: path.to_path_buf(),
            file: Some(file),
            buffer: Vec::new(),
            capacity,
            flush_failed: false,
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Maximum number of bytes this stream accepts.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current write position.
    #[inline]
    pub fn tell(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_closed(&self) -> bool {
        self.file.is_none()
    }

    /// Append `data` at the current position.
    ///
    /// Fails with [`RhstError::BufferOverflow`] instead of writing past the
    /// capacity; nothing is written in that case.
    pub fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        if self.file.is_none() {
            return Err(RhstError::StreamClosed);
        }
        let position = self.buffer.len();
        let end = position.checked_add(data.len());
        if end.is_none_or(|end| end > self.capacity) {
            return Err(RhstError::BufferOverflow {
                position,
                len: data.len(),
                capacity: self.capacity,
            });
        }
        self.buffer.extend_from_slice(data);
        Ok(())
    }

    /// Write an i32 (little-endian).
    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    /// Write an f32 (little-endian).
    pub fn write_f32(&mut self, value: f32) -> Result<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    /// Pad with zero bytes until the position is a multiple of `alignment`.
    pub fn align(&mut self, alignment: usize) -> Result<()> {
        if alignment <= 1 {
            return Ok(());
        }
        let padding = (alignment - self.tell() % alignment) % alignment;
        const ZEROS: [u8; 16] = [0; 16];
        let mut remaining = padding;
        while remaining > 0 {
            let chunk = remaining.min(ZEROS.len());
            self.write_bytes(&ZEROS[..chunk])?;
            remaining -= chunk;
        }
        Ok(())
    }

    /// Flush the written bytes to disk and release the file handle.
    ///
    /// Returns the number of bytes in the stream. Closing an already closed
    /// stream does nothing, unless the first close failed: every later close
    /// then reports [`RhstError::Unflushed`].
    pub fn close(&mut self) -> Result<usize> {
        let Some(mut file) = self.file.take() else {
            if self.flush_failed {
                return Err(RhstError::Unflushed {
                    path: self.path.clone(),
                });
            }
            return Ok(self.buffer.len());
        };

        if let Err(e) = write_out(&mut file, &self.buffer) {
            self.flush_failed = true;
            return Err(RhstError::io(&self.path, e));
        }

        tracing::debug!(
            "Closed RHST stream {:?} ({} bytes)",
            self.path,
            self.buffer.len()
        );
        Ok(self.buffer.len())
    }
}

fn write_out(file: &mut File, data: &[u8]) -> std::io::Result<()> {
    file.write_all(data)?;
    file.set_len(data.len() as u64)?;
    file.flush()
}

impl std::fmt::Debug for StreamWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamWriter")
            .field("path", &self.path)
            .field("position", &self.tell())
            .field("capacity", &self.capacity)
            .field("closed", &self.is_closed())
            .finish()
    }
}
