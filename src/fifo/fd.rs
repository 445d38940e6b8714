/*!
 * Pipe Descriptors
 *
 * Owned descriptor for one open end of a FIFO, closed on drop
 */

use super::types::AccessMode;
use std::fs::File;
use std::io::{self, Read, Write};
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, RawFd};
use std::path::{Path, PathBuf};
use tracing::trace;

/// Open end of a named pipe
///
/// Ownership of the OS descriptor moves to whoever holds this value; it is
/// released exactly once when the value drops, on success and error paths alike.
///
/// # Example
///
/// ```ignore
/// let mut fd = opener.open(&handle, OpenRequest::write_only()).await?;
/// fd.write_all(b"hello\n")?;
/// // closed here
/// ```
pub struct PipeFd {
    file: File,
    path: PathBuf,
    mode: AccessMode,
}

impl PipeFd {
    pub(crate) fn new(file: File, path: PathBuf, mode: AccessMode) -> Self {
        trace!(fd = file.as_raw_fd(), path = %path.display(), %mode, "pipe fd opened");
        Self { file, path, mode }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    /// Read everything currently buffered in the pipe
    ///
    /// Stops at end of stream (no writers left) or when a non-blocking read
    /// would block. An empty pipe yields an empty vector, never an error.
    pub fn drain(&mut self, chunk_size: usize) -> io::Result<Vec<u8>> {
        let mut out = Vec::new();
        let mut chunk = vec![0u8; chunk_size.max(1)];
        loop {
            match self.file.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => out.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(out)
    }
}

impl Read for PipeFd {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

impl Write for PipeFd {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl AsFd for PipeFd {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.file.as_fd()
    }
}

impl AsRawFd for PipeFd {
    fn as_raw_fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }
}

impl std::fmt::Debug for PipeFd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipeFd")
            .field("fd", &self.file.as_raw_fd())
            .field("path", &self.path)
            .field("mode", &self.mode)
            .finish()
    }
}

impl Drop for PipeFd {
    fn drop(&mut self) {
        trace!(fd = self.file.as_raw_fd(), path = %self.path.display(), "pipe fd closed");
    }
}
