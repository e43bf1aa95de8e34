//! Registry of open RHST streams
//!
//! One registry is owned by each export. Every stream opened through it stays
//! reachable until it is closed, so a failed export can force-close whatever
//! an aborted encode left open. Dropping the registry closes all streams.

use std::path::Path;

use crate::error::{Result, RhstError};
use crate::stream::StreamWriter;

/// Handle to a stream owned by a [`WriterRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WriterId(usize);

#[derive(Debug, Default)]
pub struct WriterRegistry {
    writers: Vec<Option<StreamWriter>>,
}

impl WriterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a stream at `path` and register it.
    pub fn open(&mut self, path: impl AsRef<Path>, capacity: usize) -> Result<WriterId> {
        let writer = StreamWriter::open(path, capacity)?;
        self.writers.push(Some(writer));
        Ok(WriterId(self.writers.len() - 1))
    }

    /// Mutable access to an open stream.
    pub fn get_mut(&mut self, id: WriterId) -> Result<&mut StreamWriter> {
        self.writers
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(RhstError::StreamClosed)
    }

    /// Close one stream and remove it from the registry.
    ///
    /// Returns the number of bytes written. Closing an unknown or already
    /// closed id is a no-op returning 0.
    pub fn close(&mut self, id: WriterId) -> Result<usize> {
        match self.writers.get_mut(id.0).and_then(Option::take) {
            Some(mut writer) => writer.close(),
            None => Ok(0),
        }
    }

    /// Number of streams still open.
    pub fn open_count(&self) -> usize {
        self.writers.iter().filter(|w| w.is_some()).count()
    }

    /// Force-close every open stream.
    ///
    /// Close failures are logged, not returned: this runs on the failure path
    /// of an export whose result is already decided. Returns how many streams
    /// were closed.
    pub fn close_all(&mut self) -> usize {
        let mut closed = 0;
        for mut writer in self.writers.iter_mut().filter_map(Option::take) {
            if let Err(e) = writer.close() {
                tracing::warn!("Failed to close RHST stream {:?}: {}", writer.path(), e);
            }
            closed += 1;
        }
        closed
    }
}

impl Drop for WriterRegistry {
    fn drop(&mut self) {
        let closed = self.close_all();
        if closed > 0 {
            tracing::debug!("Registry dropped with {} open stream(s)", closed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_and_close() {
        let dir = tempdir().unwrap();
        let mut registry = WriterRegistry::new();
        let id = registry.open(dir.path().join("a.rhst"), 32).unwrap();
        assert_eq!(registry.open_count(), 1);

        registry.get_mut(id).unwrap().write_i32(5).unwrap();
        assert_eq!(registry.close(id).unwrap(), 4);
        assert_eq!(registry.open_count(), 0);

        // Second close is harmless; access afterwards is an error
        assert_eq!(registry.close(id).unwrap(), 0);
        assert!(matches!(registry.get_mut(id), Err(RhstError::StreamClosed)));
    }

    #[test]
    fn test_close_all_flushes_outstanding_streams() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.rhst");
        let b = dir.path().join("b.rhst");
        let mut registry = WriterRegistry::new();

        let id_a = registry.open(&a, 32).unwrap();
        let id_b = registry.open(&b, 32).unwrap();
        registry.get_mut(id_a).unwrap().write_bytes(b"aa").unwrap();
        registry.get_mut(id_b).unwrap().write_bytes(b"bbb").unwrap();

        assert_eq!(registry.close_all(), 2);
        assert_eq!(registry.open_count(), 0);
        assert_eq!(std::fs::read(&a).unwrap(), b"aa");
        assert_eq!(std::fs::read(&b).unwrap(), b"bbb");
    }

    #[test]
    fn test_drop_closes_streams() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dropped.rhst");
        {
            let mut registry = WriterRegistry::new();
            let id = registry.open(&path, 4096).unwrap();
            registry.get_mut(id).unwrap().write_bytes(b"RHST").unwrap();
        }
        // Trimmed from 4096 to the written length on close
        assert_eq!(std::fs::read(&path).unwrap(), b"RHST");
    }
}
