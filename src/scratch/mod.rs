//! Scratch file lifecycle.
//!
//! Every temporary file a job creates (the uploaded video, the extracted
//! audio) is a [`ScratchFile`].  The guard owns its path and deletes it
//! exactly once: either through [`ScratchFile::release`] or, on any other
//! exit path (`?`, panic unwinding, a dropped future), in `Drop`.
//!
//! ```
//! use video_transcriber::scratch::acquire_scratch_path_in;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let path = {
//!     let scratch = acquire_scratch_path_in(dir.path(), ".wav").unwrap();
//!     assert_eq!(std::fs::metadata(scratch.path()).unwrap().len(), 0);
//!     scratch.path().to_path_buf()
//! }; // dropped → released
//! assert!(!path.exists());
//! ```

use std::io;
use std::path::{Path, PathBuf};

const PREFIX: &str = "vt-";
const JOB_DIR_PREFIX: &str = "vt-job-";

// ---------------------------------------------------------------------------
// ScratchFile
// ---------------------------------------------------------------------------

/// A uniquely named, job-owned temporary file.
#[derive(Debug)]
pub struct ScratchFile {
    /// `None` once released.
    path: Option<PathBuf>,
}

impl ScratchFile {
    pub fn path(&self) -> &Path {
        // Only `release` clears the path, and it consumes `self`.
        self.path.as_deref().unwrap_or_else(|| Path::new(""))
    }

    /// Size of the file on disk, `0` when it no longer exists.
    pub fn len(&self) -> u64 {
        std::fs::metadata(self.path()).map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Delete the file now and report the outcome.
    pub fn release(mut self) -> io::Result<()> {
        match self.path.take() {
            Some(path) => release(&path),
            None => Ok(()),
        }
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            if let Err(e) = release(&path) {
                log::warn!("scratch: failed to release {}: {e}", path.display());
            }
        }
    }
}

// ---------------------------------------------------------------------------
// acquire / release
// ---------------------------------------------------------------------------

/// Create an empty, uniquely named file with `suffix` in the system temp dir.
pub fn acquire_scratch_path(suffix: &str) -> io::Result<ScratchFile> {
    acquire_scratch_path_in(&std::env::temp_dir(), suffix)
}

/// Create an empty, uniquely named file with `suffix` inside `dir`.
///
/// `dir` is created if missing.
pub fn acquire_scratch_path_in(dir: &Path, suffix: &str) -> io::Result<ScratchFile> {
    std::fs::create_dir_all(dir)?;

    // `tempfile` guarantees the name was unused (O_EXCL); `keep` hands the
    // deletion duty over to our guard.
    let path = tempfile::Builder::new()
        .prefix(PREFIX)
        .suffix(suffix)
        .tempfile_in(dir)?
        .into_temp_path()
        .keep()
        .map_err(|e| e.error)?;

    log::debug!("scratch: acquired {}", path.display());
    Ok(ScratchFile { path: Some(path) })
}

/// Create a private, uniquely named directory inside `dir` for one job.
///
/// Everything a job leaves in it goes away when the returned guard drops.
pub fn acquire_scratch_dir_in(dir: &Path) -> io::Result<tempfile::TempDir> {
    std::fs::create_dir_all(dir)?;
    let job_dir = tempfile::Builder::new().prefix(JOB_DIR_PREFIX).tempdir_in(dir)?;
    log::debug!("scratch: acquired job dir {}", job_dir.path().display());
    Ok(job_dir)
}

/// Delete `path` if it exists.  Idempotent: an already-absent path is `Ok`.
pub fn release(path: &Path) -> io::Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            log::debug!("scratch: released {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Build a scratch suffix (`".mp4"`) from a file extension (`"mp4"`).
pub fn suffix_for_extension(extension: &str) -> String {
    let ext = extension.trim_start_matches('.');
    if ext.is_empty() {
        String::new()
    } else {
        format!(".{ext}")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
