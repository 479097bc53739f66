//! Writing outputs without ever leaving a partial file behind.
//!
//! Bytes are staged into a temporary file next to the target, flushed and
//! synced, then renamed into place. A staged file that is never committed is
//! deleted when dropped, which also covers cancelled runs.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::PackError;

const PUBLIC_MODE: u32 = 0o644;
const SECRET_MODE: u32 = 0o600;

/// Write `bytes` to `path` atomically.
///
/// # Errors
///
/// Returns [`PackError::Io`] if staging or renaming fails; in that case
/// `path` is untouched and no temporary file remains.
pub fn write(path: &Path, bytes: &[u8]) -> Result<(), PackError> {
    let mut set = OutputSet::new();
    set.stage(path, bytes)?;
    set.commit()?;
    Ok(())
}

/// A group of outputs that become visible together.
///
/// Either every staged file is committed, or (on failure) the ones already
/// renamed into place are removed again.
#[derive(Debug, Default)]
pub struct OutputSet {
    staged: Vec<(PathBuf, NamedTempFile)>,
}

impl OutputSet {
    /// An empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Write `bytes` to a temporary file beside `path`, readable by all.
    ///
    /// # Errors
    ///
    /// Returns [`PackError::Io`] if the temporary file cannot be created,
    /// written, or synced.
    pub fn stage(&mut self, path: &Path, bytes: &[u8]) -> Result<(), PackError> {
        self.stage_with_mode(path, bytes, PUBLIC_MODE)
    }

    /// Like [`OutputSet::stage`], but readable by the owner only.
    ///
    /// # Errors
    ///
    /// As [`OutputSet::stage`].
    pub fn stage_secret(&mut self, path: &Path, bytes: &[u8]) -> Result<(), PackError> {
        self.stage_with_mode(path, bytes, SECRET_MODE)
    }

    fn stage_with_mode(&mut self, path: &Path, bytes: &[u8], mode: u32) -> Result<(), PackError> {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };

        let mut tmp = tempfile::Builder::new()
            .prefix(".crxpack-")
            .tempfile_in(dir)
            .map_err(|e| PackError::io(path, e))?;
        tmp.write_all(bytes).map_err(|e| PackError::io(path, e))?;
        tmp.flush().map_err(|e| PackError::io(path, e))?;
        set_mode(tmp.as_file(), mode).map_err(|e| PackError::io(path, e))?;
        tmp.as_file()
            .sync_all()
            .map_err(|e| PackError::io(path, e))?;

        self.staged.push((path.to_path_buf(), tmp));
        Ok(())
    }

    /// Number of staged outputs.
    pub fn len(&self) -> usize {
        self.staged.len()
    }

    /// Whether nothing has been staged.
    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    /// Rename every staged file into place, in staging order.
    ///
    /// # Errors
    ///
    /// Returns [`PackError::Io`] for the first rename that fails, after
    /// removing the targets committed before it.
    pub fn commit(self) -> Result<Vec<PathBuf>, PackError> {
        let mut committed: Vec<PathBuf> = Vec::with_capacity(self.staged.len());

        for (path, tmp) in self.staged {
            match tmp.persist(&path) {
                Ok(_) => {
                    tracing::debug!(path = %path.display(), "wrote output");
                    committed.push(path);
                }
                Err(err) => {
                    for done in &committed {
                        if let Err(e) = std::fs::remove_file(done) {
                            tracing::warn!(path = %done.display(), "rollback failed: {e}");
                        }
                    }
                    // `err.file` is dropped here, deleting its temp file.
                    return Err(PackError::io(&path, err.error));
                }
            }
        }

        Ok(committed)
    }
}

#[cfg(unix)]
fn set_mode(file: &std::fs::File, mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(std::fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_mode(_file: &std::fs::File, _mode: u32) -> std::io::Result<()> {
    Ok(())
}
