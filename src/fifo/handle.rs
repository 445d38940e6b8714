/*!
 * Pipe Handle
 * Lifecycle of one FIFO node: create, destroy, path resolution
 */

use super::types::PipeState;
use crate::core::limits::PIPE_MODE;
use crate::core::{PipeError, PipeResult};
use nix::errno::Errno;
use nix::sys::stat::Mode;
use parking_lot::Mutex;
use std::fmt;
use std::fs;
use std::io;
use std::os::unix::fs::{FileTypeExt, PermissionsExt};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Owner of one named pipe node
///
/// The handle never removes its node implicitly; call [`PipeHandle::destroy`].
/// Share it behind an `Arc` when a watcher and a writer both need it.
pub struct PipeHandle {
    path: PathBuf,
    state: Mutex<PipeState>,
}

impl PipeHandle {
    /// Handle for a pipe that does not exist yet
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            state: Mutex::new(PipeState::Uncreated),
        }
    }

    /// Create the node at `path` and return its handle
    pub fn create_at(path: impl Into<PathBuf>) -> PipeResult<Self> {
        let handle = Self::new(path);
        handle.create()?;
        Ok(handle)
    }

    /// Adopt a FIFO that another process created
    pub fn open_existing(path: impl Into<PathBuf>) -> PipeResult<Self> {
        let path = path.into();
        let metadata = match fs::metadata(&path) {
            Ok(m) => m,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(PipeError::NotFound(path))
            }
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                return Err(PipeError::PermissionDenied(path))
            }
            Err(e) => return Err(e.into()),
        };

        if !metadata.file_type().is_fifo() {
            return Err(PipeError::NotAFifo(path));
        }

        debug!(path = %path.display(), "Attached to existing named pipe");
        Ok(Self {
            path,
            state: Mutex::new(PipeState::Created),
        })
    }

    /// Path as supplied by the caller
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> PipeState {
        *self.state.lock()
    }

    pub fn is_created(&self) -> bool {
        self.state() == PipeState::Created
    }

    /// Make the FIFO node with mode 0600
    pub fn create(&self) -> PipeResult<()> {
        let mut state = self.state.lock();
        match *state {
            PipeState::Uncreated => {}
            PipeState::Created => return Err(PipeError::AlreadyExists(self.path.clone())),
            PipeState::Destroyed => {
                return Err(PipeError::InvalidState {
                    path: self.path.clone(),
                    state: *state,
                })
            }
        }

        let mode = Mode::S_IRUSR | Mode::S_IWUSR;
        nix::unistd::mkfifo(self.path.as_path(), mode).map_err(|errno| match errno {
            Errno::EEXIST => PipeError::AlreadyExists(self.path.clone()),
            Errno::EACCES | Errno::EPERM | Errno::EROFS => {
                PipeError::PermissionDenied(self.path.clone())
            }
            Errno::ENOENT => PipeError::NotFound(self.path.clone()),
            other => PipeError::Io(io::Error::from(other)),
        })?;

        // mkfifo is filtered through the umask
        apply_mode(&self.path, |path| {
            fs::set_permissions(path, fs::Permissions::from_mode(PIPE_MODE))
        })?;

        *state = PipeState::Created;
        info!(path = %self.path.display(), mode = %format_args!("{:o}", PIPE_MODE), "Created named pipe");
        Ok(())
    }

    /// Unlink the FIFO node
    ///
    /// Only a node this handle created or adopted is removed, and only while
    /// it is still a FIFO.
    pub fn destroy(&self) -> PipeResult<()> {
        let mut state = self.state.lock();
        if *state != PipeState::Created {
            return Err(PipeError::NotFound(self.path.clone()));
        }

        match fs::symlink_metadata(&self.path) {
            Ok(metadata) if metadata.file_type().is_fifo() => {}
            Ok(_) => return Err(PipeError::NotAFifo(self.path.clone())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(PipeError::NotFound(self.path.clone()))
            }
            Err(e) => return Err(e.into()),
        }

        fs::remove_file(&self.path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => PipeError::NotFound(self.path.clone()),
            io::ErrorKind::PermissionDenied => PipeError::PermissionDenied(self.path.clone()),
            _ => PipeError::Io(e),
        })?;

        *state = PipeState::Destroyed;
        info!(path = %self.path.display(), "Destroyed named pipe");
        Ok(())
    }

    /// Absolute, lexically cleaned form of the path
    pub fn absolute_path(&self) -> PipeResult<PathBuf> {
        absolute(&self.path)
    }

    /// Directory holding the pipe node
    pub fn parent_directory(&self) -> PipeResult<PathBuf> {
        let absolute = self.absolute_path()?;
        absolute
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| PipeError::PathResolution {
                path: self.path.clone(),
                source: io::Error::new(io::ErrorKind::InvalidInput, "path has no parent directory"),
            })
    }

    /// Fail unless the node exists through this handle
    pub(crate) fn ensure_created(&self) -> PipeResult<()> {
        match self.state() {
            PipeState::Created => Ok(()),
            _ => Err(PipeError::NotFound(self.path.clone())),
        }
    }
}

impl fmt::Debug for PipeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipeHandle")
            .field("path", &self.path)
            .field("state", &self.state())
            .finish()
    }
}

impl fmt::Display for PipeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

/// Force the mode of a freshly made node, removing the node if that fails
fn apply_mode<F>(path: &Path, set_mode: F) -> PipeResult<()>
where
    F: FnOnce(&Path) -> io::Result<()>,
{
    let Err(e) = set_mode(path) else {
        return Ok(());
    };

    if let Err(cleanup) = fs::remove_file(path) {
        warn!(path = %path.display(), error = %cleanup, "Failed to remove pipe after mode change failed");
    }
    Err(match e.kind() {
        io::ErrorKind::PermissionDenied => PipeError::PermissionDenied(path.to_path_buf()),
        _ => PipeError::Io(e),
    })
}

/// Resolve `path` against the current directory and clean it lexically
///
/// Symlinks are not followed; two spellings of the same node through a
/// symlink resolve to different paths.
pub fn absolute(path: &Path) -> PipeResult<PathBuf> {
    if path.is_absolute() {
        return Ok(path_clean::clean(path));
    }

    let cwd = std::env::current_dir().map_err(|source| PipeError::PathResolution {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(path_clean::clean(cwd.join(path)))
}
