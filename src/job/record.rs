//! Per-request records: the uploaded video and the job that processes it.

use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::time::{Duration, Instant};

// ---------------------------------------------------------------------------
// VideoUpload
// ---------------------------------------------------------------------------

/// An uploaded video: bytes plus the caller's declared filename.
#[derive(Debug, Clone, Copy)]
pub struct VideoUpload<'a> {
    pub bytes: &'a [u8],
    pub filename: &'a str,
    default_extension: &'a str,
}

impl<'a> VideoUpload<'a> {
    pub fn new(bytes: &'a [u8], filename: &'a str, default_extension: &'a str) -> Self {
        Self {
            bytes,
            filename,
            default_extension,
        }
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Final path component of the declared filename; directories are
    /// ignored so a filename can never point outside the output directory.
    fn base_name(&self) -> &'a Path {
        Path::new(self.filename)
            .file_name()
            .map(Path::new)
            .unwrap_or_else(|| Path::new(""))
    }

    /// Container extension from the filename, or the default.
    ///
    /// ```
    /// use video_transcriber::job::VideoUpload;
    ///
    /// assert_eq!(VideoUpload::new(b"x", "clip.MP4", "webm").extension(), "MP4");
    /// assert_eq!(VideoUpload::new(b"x", "recording", "webm").extension(), "webm");
    /// ```
    pub fn extension(&self) -> &'a str {
        self.base_name()
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| !e.is_empty())
            .unwrap_or(self.default_extension)
    }

    /// File stem used to name the transcript; `"upload"` when there is none.
    pub fn stem(&self) -> &'a str {
        self.base_name()
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .unwrap_or("upload")
    }
}

// ---------------------------------------------------------------------------
// JobRecord
// ---------------------------------------------------------------------------

/// Book-keeping for one child process run.  Lives only as long as the
/// request; never persisted.
#[derive(Debug)]
pub struct JobRecord {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub started_at: Instant,
    pub deadline: Instant,
    /// `None` while running, or when the child was killed on timeout.
    pub exit_status: Option<ExitStatus>,
    pub captured_stdout: String,
    pub captured_stderr: String,
}

impl JobRecord {
    pub fn new(input_path: PathBuf, output_path: PathBuf, timeout: Duration) -> Self {
        let started_at = Instant::now();
        Self {
            input_path,
            output_path,
            started_at,
            deadline: started_at + timeout,
            exit_status: None,
            captured_stdout: String::new(),
            captured_stderr: String::new(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub fn budget(&self) -> Duration {
        self.deadline.saturating_duration_since(self.started_at)
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.exit_status.and_then(|s| s.code())
    }

    /// Both captured streams, labelled; `None` when the child printed nothing.
    pub fn diagnostics(&self) -> Option<String> {
        let mut parts = Vec::new();
        if !self.captured_stderr.trim().is_empty() {
            parts.push(format!("stderr:\n{}", self.captured_stderr.trim_end()));
        }
        if !self.captured_stdout.trim().is_empty() {
            parts.push(format!("stdout:\n{}", self.captured_stdout.trim_end()));
        }
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("\n"))
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
