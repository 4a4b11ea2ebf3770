//! Process boundary runner.
//!
//! [`TranscriptionRunner::run`] is the caller-side half of a transcription
//! request.  It persists the upload to a scratch file, spawns the `job`
//! child under a deadline, and converts whatever happens to the child into
//! a [`TranscribeResponse`].
//!
//! ```text
//! bytes ──▶ job dir/video ──▶ spawn `<exe> job <in> <out> ...` ─┬─ exit 0 + file   → success
//!                                  │                             ├─ exit 0, no file → OutputMissing
//!                                  │ stdout/stderr               ├─ exit 2..6       → ErrorKind
//!                                  ▼ (bounded tails)             ├─ other exit      → JobCrashed
//!                              diagnostics                       └─ deadline        → kill group, Timeout
//! ```
//!
//! Each run owns a private scratch directory holding the uploaded video and
//! everything the child creates (`--scratch-dir`).  It is removed on every
//! path, including timeout and a dropped `run` future.  On unix the child
//! leads its own process group, so a deadline kill also reaches the tools it
//! started.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tokio::task::JoinHandle;

use crate::config::JobConfig;
use crate::error::{ErrorKind, JobError};
use crate::scratch::{
    acquire_scratch_dir_in, acquire_scratch_path_in, suffix_for_extension, ScratchFile,
};

use super::capture::{drain, BoundedCapture};
use super::record::{JobRecord, VideoUpload};
use super::response::TranscribeResponse;

/// How long to wait for the capture tasks once the child is gone.  A
/// grandchild can keep a pipe open after the child was killed.
const DRAIN_GRACE: Duration = Duration::from_millis(500);

// ---------------------------------------------------------------------------
// JobCommand
// ---------------------------------------------------------------------------

/// The program that runs one job.  Appended after `args`:
/// `<input> <output> --scratch-dir <dir>`.
#[derive(Debug, Clone)]
pub struct JobCommand {
    program: PathBuf,
    args: Vec<OsString>,
}

impl JobCommand {
    pub fn new<I, S>(program: impl Into<PathBuf>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// `<current exe> [--config <path>] job`.
    pub fn current_exe(config_path: Option<&Path>) -> std::io::Result<Self> {
        let mut args: Vec<OsString> = Vec::new();
        if let Some(path) = config_path {
            args.push("--config".into());
            args.push(path.as_os_str().to_owned());
        }
        args.push("job".into());
        Ok(Self {
            program: std::env::current_exe()?,
            args,
        })
    }

    fn build(&self, input: &Path, output: &Path, scratch_dir: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg(input)
            .arg(output)
            .arg("--scratch-dir")
            .arg(scratch_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);
        cmd
    }
}

// ---------------------------------------------------------------------------
// TranscriptionRunner
// ---------------------------------------------------------------------------

/// Runs transcription jobs in isolated child processes.
///
/// `Send + Sync`; share one runner behind an `Arc` to serve concurrent
/// requests.
///
/// ```rust,no_run
/// use video_transcriber::config::JobConfig;
/// use video_transcriber::job::{JobCommand, TranscriptionRunner};
///
/// # async fn example() -> std::io::Result<()> {
/// let runner = TranscriptionRunner::new(JobCommand::current_exe(None)?, JobConfig::default());
/// let bytes = std::fs::read("clip.mp4")?;
/// let response = runner.run(&bytes, "clip.mp4").await;
/// println!("{}", response.to_json().unwrap());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct TranscriptionRunner {
    command: JobCommand,
    config: JobConfig,
    timeout: Duration,
}

impl TranscriptionRunner {
    pub fn new(command: JobCommand, config: JobConfig) -> Self {
        let timeout = config.timeout();
        Self {
            command,
            config,
            timeout,
        }
    }

    /// Override the deadline with a finer-grained duration than
    /// `JobConfig::timeout_secs`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// `<output_dir>/<stem>.txt`.  Identical stems overwrite each other.
    pub fn output_path_for(&self, filename: &str) -> PathBuf {
        let upload = VideoUpload::new(&[], filename, &self.config.default_extension);
        self.config
            .output_dir()
            .join(format!("{}.txt", upload.stem()))
    }

    /// Transcribe one uploaded video.  Never panics; every fault becomes a
    /// failure response.
    pub async fn run(&self, video_bytes: &[u8], filename: &str) -> TranscribeResponse {
        let upload = VideoUpload::new(video_bytes, filename, &self.config.default_extension);
        log::info!(
            "job: received '{}' ({} bytes)",
            upload.filename,
            upload.size()
        );

        if upload.size() == 0 {
            return TranscribeResponse::failure(
                ErrorKind::InvalidInput,
                Some("uploaded file is empty".into()),
            );
        }

        let job_dir = match acquire_scratch_dir_in(&self.config.scratch_dir()) {
            Ok(dir) => dir,
            Err(e) => {
                return TranscribeResponse::failure(
                    ErrorKind::Internal,
                    Some(format!("scratch dir: {e}")),
                )
            }
        };

        let output = self.output_path_for(filename);
        let result = match self.persist(&upload, job_dir.path()).await {
            Ok(video) => {
                let result = self.supervise(video.path(), &output, job_dir.path()).await;
                if let Err(e) = video.release() {
                    log::warn!("job: failed to release scratch video: {e}");
                }
                result
            }
            Err(e) => Err(e),
        };

        let job_dir_path = job_dir.path().to_path_buf();
        if let Err(e) = job_dir.close() {
            log::warn!(
                "job: failed to remove scratch dir {}: {e}",
                job_dir_path.display()
            );
        }

        match result {
            Ok(transcript) => TranscribeResponse::success(transcript, output),
            Err(e) => {
                log::warn!("job: {} failed: {}", upload.filename, e.kind);
                TranscribeResponse::failure(e.kind, Some(e.message))
            }
        }
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    async fn persist(
        &self,
        upload: &VideoUpload<'_>,
        job_dir: &Path,
    ) -> Result<ScratchFile, JobError> {
        let suffix = suffix_for_extension(upload.extension());
        let video = acquire_scratch_path_in(job_dir, &suffix)
            .map_err(|e| JobError::new(ErrorKind::Internal, format!("scratch video: {e}")))?;

        tokio::fs::write(video.path(), upload.bytes)
            .await
            .map_err(|e| JobError::new(ErrorKind::Internal, format!("write scratch video: {e}")))?;

        Ok(video)
    }

    /// Spawn the child, wait under the deadline and interpret the result.
    async fn supervise(
        &self,
        input: &Path,
        output: &Path,
        scratch_dir: &Path,
    ) -> Result<String, JobError> {
        let mut record = JobRecord::new(input.to_path_buf(), output.to_path_buf(), self.timeout);

        let mut child = self.command.build(input, output, scratch_dir).spawn().map_err(|e| {
            JobError::new(
                ErrorKind::Internal,
                format!("failed to spawn {}: {e}", self.command.program.display()),
            )
        })?;

        let limit = self.config.capture_limit_bytes;
        let stdout = child.stdout.take().map(|s| tokio::spawn(drain(s, limit)));
        let stderr = child.stderr.take().map(|s| tokio::spawn(drain(s, limit)));

        let waited = tokio::time::timeout(record.budget(), child.wait()).await;

        let status = match waited {
            Ok(Ok(status)) => Some(status),
            Ok(Err(e)) => {
                return Err(JobError::new(
                    ErrorKind::Internal,
                    format!("waiting for job: {e}"),
                ));
            }
            Err(_) => {
                log::warn!(
                    "job: deadline of {:?} exceeded, killing child",
                    record.budget()
                );
                kill_process_group(&child);
                if let Err(e) = child.kill().await {
                    log::warn!("job: kill failed: {e}");
                }
                None
            }
        };

        record.captured_stdout = collect(stdout).await;
        record.captured_stderr = collect(stderr).await;
        record.exit_status = status;

        log::info!(
            "job: child finished in {} ms with {:?}",
            record.elapsed().as_millis(),
            record.exit_status
        );

        interpret(&record).await
    }
}

/// SIGKILL the child's process group, reaching the tools it spawned.  The
/// child itself is reaped by the caller.
#[cfg(unix)]
fn kill_process_group(child: &tokio::process::Child) {
    let Some(pid) = child.id() else {
        return;
    };
    let Ok(pgid) = libc::pid_t::try_from(pid) else {
        return;
    };
    // SAFETY: `kill` has no memory-safety preconditions; the group was
    // created for this child by `process_group(0)` and it is not reaped yet.
    if unsafe { libc::kill(-pgid, libc::SIGKILL) } != 0 {
        log::warn!(
            "job: killing process group {pgid}: {}",
            std::io::Error::last_os_error()
        );
    }
}

#[cfg(not(unix))]
fn kill_process_group(_child: &tokio::process::Child) {}

async fn collect(handle: Option<JoinHandle<BoundedCapture>>) -> String {
    let Some(mut handle) = handle else {
        return String::new();
    };
    match tokio::time::timeout(DRAIN_GRACE, &mut handle).await {
        Ok(Ok(capture)) => capture.to_text(),
        Ok(Err(e)) => {
            log::debug!("job: capture task failed: {e}");
            String::new()
        }
        Err(_) => {
            handle.abort();
            String::new()
        }
    }
}

/// Map a finished (or killed) child to the transcript or a [`JobError`].
async fn interpret(record: &JobRecord) -> Result<String, JobError> {
    let with_diagnostics = |summary: String| match record.diagnostics() {
        Some(diag) => format!("{summary}\n{diag}"),
        None => summary,
    };

    let Some(status) = record.exit_status else {
        // Killed on deadline: whatever is at the output path is not trusted.
        return Err(JobError::new(
            ErrorKind::Timeout,
            with_diagnostics(format!("job exceeded {:?}", record.budget())),
        ));
    };

    if !status.success() {
        let kind = record
            .exit_code()
            .and_then(ErrorKind::from_exit_code)
            .unwrap_or(ErrorKind::JobCrashed);
        return Err(JobError::new(
            kind,
            with_diagnostics(format!("job exited with {status}")),
        ));
    }

    match tokio::fs::read_to_string(&record.output_path).await {
        Ok(transcript) => Ok(transcript),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(JobError::new(
            ErrorKind::OutputMissing,
            with_diagnostics(format!(
                "job succeeded but {} does not exist",
                record.output_path.display()
            )),
        )),
        Err(e) => Err(JobError::new(
            ErrorKind::Internal,
            format!("reading {}: {e}", record.output_path.display()),
        )),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Instant;

    use tempfile::{tempdir, TempDir};

    struct Fixture {
        _dir: TempDir,
        scratch: PathBuf,
        output: PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempdir().unwrap();
            let scratch = dir.path().join("scratch");
            let output = dir.path().join("transcripts");
            Self {
                _dir: dir,
                scratch,
                output,
            }
        }

        /// A runner whose job is `sh -c <script> sh <input> <output>`.
        fn runner(&self, script: &str) -> TranscriptionRunner {
            let config = JobConfig {
                output_dir: Some(self.output.clone()),
                scratch_dir: Some(self.scratch.clone()),
                capture_limit_bytes: 1_024,
                ..JobConfig::default()
            };
            TranscriptionRunner::new(JobCommand::new("/bin/sh", ["-c", script, "sh"]), config)
        }

        fn scratch_is_clean(&self) -> bool {
            match std::fs::read_dir(&self.scratch) {
                Ok(entries) => entries.count() == 0,
                Err(_) => true,
            }
        }
    }

    const WRITE_TWO_LINES: &str = r#"mkdir -p "$(dirname "$2")" && printf 'hello\nworld\n' > "$2""#;

    #[tokio::test]
    async fn success_returns_transcript_and_path() {
        let fx = Fixture::new();
        let resp = fx.runner(WRITE_TWO_LINES).run(b"video", "clip.mp4").await;

        assert!(resp.success, "{resp:?}");
        assert_eq!(resp.transcript.as_deref(), Some("hello\nworld\n"));
        assert_eq!(resp.output_path, Some(fx.output.join("clip.txt")));
        assert!(resp.message.is_none());
        assert!(fx.scratch_is_clean());
    }

    #[tokio::test]
    async fn empty_transcript_reports_no_speech() {
        let fx = Fixture::new();
        let script = r#"mkdir -p "$(dirname "$2")" && : > "$2""#;
        let resp = fx.runner(script).run(b"video", "clip.mp4").await;

        assert!(resp.success);
        assert_eq!(resp.transcript.as_deref(), Some(""));
        assert_eq!(resp.message.as_deref(), Some("no speech detected"));
        assert!(fx.output.join("clip.txt").exists());
    }

    #[tokio::test]
    async fn extension_is_preserved_or_defaulted() {
        let fx = Fixture::new();
        let script = r#"case "$1" in *.mkv|*.webm) mkdir -p "$(dirname "$2")" && : > "$2";; *) exit 2;; esac"#;
        let runner = fx.runner(script);

        assert!(runner.run(b"video", "talk.mkv").await.success);
        let resp = runner.run(b"video", "recording").await;
        assert!(resp.success, "{resp:?}");
        assert_eq!(resp.output_path, Some(fx.output.join("recording.txt")));
    }

    #[tokio::test]
    async fn empty_upload_is_invalid_input_without_spawning() {
        let fx = Fixture::new();
        let marker = fx._dir.path().join("spawned");
        let script = format!("touch {}", marker.display());
        let resp = fx.runner(&script).run(b"", "clip.mp4").await;

        assert_eq!(resp.error, Some(ErrorKind::InvalidInput));
        assert!(!marker.exists());
    }

    #[tokio::test]
    async fn clean_exit_without_output_is_output_missing() {
        let fx = Fixture::new();
        let resp = fx.runner("exit 0").run(b"video", "clip.mp4").await;
        assert_eq!(resp.error, Some(ErrorKind::OutputMissing));
        assert!(fx.scratch_is_clean());
    }

    #[tokio::test]
    async fn exit_codes_map_to_error_kinds_with_diagnostics() {
        let fx = Fixture::new();
        let resp = fx
            .runner("echo 'no extractor worked' >&2; exit 4")
            .run(b"video", "clip.mp4")
            .await;

        assert!(!resp.success);
        assert_eq!(resp.error, Some(ErrorKind::ExtractionFailed));
        assert!(resp.details.unwrap().contains("no extractor worked"));
    }

    #[tokio::test]
    async fn unknown_exit_code_is_job_crashed() {
        let fx = Fixture::new();
        let resp = fx.runner("exit 101").run(b"video", "clip.mp4").await;
        assert_eq!(resp.error, Some(ErrorKind::JobCrashed));
    }

    #[tokio::test]
    async fn deadline_kills_child_and_cleans_up() {
        let fx = Fixture::new();
        let script = r#"mkdir -p "$(dirname "$2")" && echo partial > "$2"; exec sleep 30"#;
        let runner = fx.runner(script).with_timeout(Duration::from_millis(300));

        let started = Instant::now();
        let resp = runner.run(b"video", "clip.mp4").await;

        assert_eq!(resp.error, Some(ErrorKind::Timeout));
        assert!(resp.transcript.is_none());
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(fx.scratch_is_clean());
    }

    #[tokio::test]
    async fn deadline_removes_child_scratch_and_kills_its_helpers() {
        let fx = Fixture::new();
        let marker = fx._dir.path().join("helper-ran");
        // $4 is the job's scratch dir; the subshell stands in for ffmpeg.
        let script = format!(
            r#"touch "$4/vt-child-audio.wav"; (sleep 1; touch {}) & wait"#,
            marker.display()
        );
        let runner = fx.runner(&script).with_timeout(Duration::from_millis(300));

        let resp = runner.run(b"video", "clip.mp4").await;
        assert_eq!(resp.error, Some(ErrorKind::Timeout));
        assert!(fx.scratch_is_clean());

        tokio::time::sleep(Duration::from_millis(1_500)).await;
        assert!(!marker.exists(), "helper outlived the deadline");
        assert!(fx.scratch_is_clean());
    }

    #[tokio::test]
    async fn child_receives_private_scratch_dir() {
        let fx = Fixture::new();
        let script = r#"[ "$3" = --scratch-dir ] && [ -d "$4" ] && [ "$(dirname "$1")" = "$4" ] || exit 2
touch "$4/vt-child-audio.wav"
mkdir -p "$(dirname "$2")" && : > "$2""#;
        let resp = fx.runner(script).run(b"video", "clip.mp4").await;

        assert!(resp.success, "{resp:?}");
        assert!(fx.scratch_is_clean());
    }

    #[tokio::test]
    async fn diagnostics_are_bounded() {
        let fx = Fixture::new();
        let script = "head -c 100000 /dev/zero | tr '\\0' x >&2; exit 5";
        let resp = fx.runner(script).run(b"video", "clip.mp4").await;

        assert_eq!(resp.error, Some(ErrorKind::TranscriptionFailed));
        let details = resp.details.unwrap();
        assert!(details.contains("bytes truncated"));
        assert!(details.len() < 2_048, "details were {} bytes", details.len());
    }

    #[tokio::test]
    async fn spawn_failure_is_internal() {
        let fx = Fixture::new();
        let config = JobConfig {
            output_dir: Some(fx.output.clone()),
            scratch_dir: Some(fx.scratch.clone()),
            ..JobConfig::default()
        };
        let runner = TranscriptionRunner::new(
            JobCommand::new("/nonexistent/video-transcriber", ["job"]),
            config,
        );

        let resp = runner.run(b"video", "clip.mp4").await;
        assert_eq!(resp.error, Some(ErrorKind::Internal));
        assert!(fx.scratch_is_clean());
    }

    #[tokio::test]
    async fn concurrent_requests_are_isolated() {
        let fx = Fixture::new();
        let runner = Arc::new(fx.runner(r#"mkdir -p "$(dirname "$2")" && basename "$2" > "$2""#));

        let a = tokio::spawn({
            let runner = runner.clone();
            async move { runner.run(b"a", "first.mp4").await }
        });
        let b = tokio::spawn({
            let runner = runner.clone();
            async move { runner.run(b"b", "second.mp4").await }
        });

        let (a, b) = (a.await.unwrap(), b.await.unwrap());
        assert_eq!(a.transcript.as_deref(), Some("first.txt\n"));
        assert_eq!(b.transcript.as_deref(), Some("second.txt\n"));
        assert!(fx.scratch_is_clean());
    }

    #[test]
    fn output_path_uses_stem() {
        let fx = Fixture::new();
        let runner = fx.runner("true");
        assert_eq!(runner.output_path_for("clip.mp4"), fx.output.join("clip.txt"));
        assert_eq!(runner.output_path_for("dir/clip.webm"), fx.output.join("clip.txt"));
    }
}
