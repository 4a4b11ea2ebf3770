//! Pipeline orchestrator: drives one video → transcript job.
//!
//! [`PipelineOrchestrator`] owns the extractor and a shared engine handle.
//! Each [`run`](PipelineOrchestrator::run) is strictly sequential and
//! returns a [`JobReport`] instead of an error, so every stage fault ends in
//! a terminal status.
//!
//! # Pipeline flow
//!
//! ```text
//! input ──validate──▶ extractor ──Extracted──▶ engine.transcribe ──▶ write
//!                         │                                         ▲
//!                         └──NoAudio / empty audio──▶ EmptyOk ──────┘
//! any stage ──fault──▶ JobError
//! always   ──▶ release scratch audio
//! ```
//!
//! Extraction and inference are blocking; [`run_blocking`] pushes the whole
//! job onto `tokio::task::spawn_blocking` so an async caller never stalls.
//!
//! [`run_blocking`]: PipelineOrchestrator::run_blocking

use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::audio::{AudioExtractor, ExtractionOutcome};
use crate::error::{ErrorKind, JobError};
use crate::scratch::{acquire_scratch_path_in, ScratchFile};
use crate::stt::EngineHandle;

use super::state::{JobState, JobTrail};

// ---------------------------------------------------------------------------
// Report types
// ---------------------------------------------------------------------------

/// Why a successful job produced an empty transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyReason {
    /// The container has no audio track.
    NoAudioTrack,
    /// Extraction produced a zero-byte audio file.
    EmptyAudio,
    /// Audio was transcribed but contained no speech.
    NoSpeech,
}

/// What a successful job produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSummary {
    /// `None` when the engine was never run.
    pub detected_language: Option<String>,
    pub segment_count: usize,
    pub output_path: PathBuf,
    pub empty_reason: Option<EmptyReason>,
}

/// Full record of one [`PipelineOrchestrator::run`].
#[derive(Debug, Clone)]
pub struct JobReport {
    pub trail: Vec<JobState>,
    pub outcome: Result<JobSummary, JobError>,
}

impl JobReport {
    /// Process exit code for the `job` subcommand: `0` on success, the
    /// kind's code on failure, `1` for kinds with no code of their own.
    pub fn exit_code(&self) -> i32 {
        match &self.outcome {
            Ok(_) => 0,
            Err(e) => e.kind.exit_code().unwrap_or(1),
        }
    }
}

// ---------------------------------------------------------------------------
// PipelineOrchestrator
// ---------------------------------------------------------------------------

/// Drives the complete extraction → transcription → write pipeline.
///
/// ```rust,no_run
/// use std::path::Path;
/// use video_transcriber::audio::build_extractor;
/// use video_transcriber::config::AppConfig;
/// use video_transcriber::pipeline::PipelineOrchestrator;
/// use video_transcriber::stt::load_engine;
///
/// let config = AppConfig::default();
/// let engine = load_engine(&config.stt).unwrap();
/// let orchestrator = PipelineOrchestrator::new(
///     build_extractor(&config.extract),
///     engine,
///     config.stt.language.clone(),
///     config.job.scratch_dir(),
/// );
/// let report = orchestrator.run(Path::new("clip.mp4"), Path::new("clip.txt"));
/// std::process::exit(report.exit_code());
/// ```
pub struct PipelineOrchestrator {
    extractor: AudioExtractor,
    engine: EngineHandle,
    language: String,
    scratch_dir: PathBuf,
}

impl std::fmt::Debug for PipelineOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineOrchestrator")
            .field("extractor", &self.extractor)
            .field("language", &self.language)
            .field("scratch_dir", &self.scratch_dir)
            .finish_non_exhaustive()
    }
}

impl PipelineOrchestrator {
    /// * `extractor`  : ordered extraction strategies.
    /// * `engine`     : loaded once per process and shared.
    /// * `language`   : fixed transcription language.
    /// * `scratch_dir`: where the intermediate WAV is created.
    pub fn new(
        extractor: AudioExtractor,
        engine: EngineHandle,
        language: impl Into<String>,
        scratch_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            extractor,
            engine,
            language: language.into(),
            scratch_dir: scratch_dir.into(),
        }
    }

    /// Run one job: `input` video → `output` transcript.
    ///
    /// Cleanup runs on every path; the returned trail always ends in
    /// `Cleanup` followed by a terminal state.
    pub fn run(&self, input: &Path, output: &Path) -> JobReport {
        let mut trail = JobTrail::new();
        let mut scratch: Option<ScratchFile> = None;

        let outcome = self.stages(input, output, &mut trail, &mut scratch);

        trail.enter(JobState::Cleanup);
        if let Some(audio) = scratch.take() {
            if let Err(e) = audio.release() {
                log::warn!("pipeline: failed to release scratch audio: {e}");
            }
        }

        match &outcome {
            Ok(summary) => {
                trail.enter(JobState::Success);
                log::info!(
                    "pipeline: done, {} segment(s) → {}",
                    summary.segment_count,
                    summary.output_path.display()
                );
            }
            Err(e) => {
                trail.enter(JobState::Failed);
                log::error!("pipeline: {e}");
            }
        }

        JobReport {
            trail: trail.into_states(),
            outcome,
        }
    }

    /// [`run`](Self::run) on the blocking thread pool.
    pub async fn run_blocking(self: Arc<Self>, input: PathBuf, output: PathBuf) -> JobReport {
        match tokio::task::spawn_blocking(move || self.run(&input, &output)).await {
            Ok(report) => report,
            Err(e) => JobReport {
                trail: vec![JobState::Start, JobState::Failed],
                outcome: Err(JobError::new(
                    ErrorKind::Internal,
                    format!("job task failed: {e}"),
                )),
            },
        }
    }

    // -----------------------------------------------------------------------
    // Stages
    // -----------------------------------------------------------------------

    fn stages(
        &self,
        input: &Path,
        output: &Path,
        trail: &mut JobTrail,
        scratch: &mut Option<ScratchFile>,
    ) -> Result<JobSummary, JobError> {
        // ── 1. Validate ──────────────────────────────────────────────────
        trail.enter(JobState::ValidateInput);
        let size = validate_input(input)?;
        log::info!("pipeline: input {} ({size} bytes)", input.display());

        // ── 2. Extract ───────────────────────────────────────────────────
        trail.enter(JobState::ExtractAudio);
        let audio = acquire_scratch_path_in(&self.scratch_dir, ".wav")
            .map_err(|e| JobError::extraction(format!("cannot create scratch audio: {e}")))?;
        let audio = scratch.insert(audio);

        let empty_reason = match self
            .extractor
            .extract(input, audio.path())
            .map_err(|e| JobError::configuration(e.to_string()))?
        {
            ExtractionOutcome::Extracted { .. } if audio.is_empty() => Some(EmptyReason::EmptyAudio),
            ExtractionOutcome::Extracted { bytes } => {
                log::info!("pipeline: extracted audio ({bytes} bytes)");
                None
            }
            ExtractionOutcome::NoAudio => Some(EmptyReason::NoAudioTrack),
            ExtractionOutcome::ToolUnavailable => {
                return Err(JobError::configuration("no extraction tool could run"));
            }
            ExtractionOutcome::Failed(reason) => return Err(JobError::extraction(reason)),
        };

        // ── 3. Transcribe (or skip) ──────────────────────────────────────
        let (lines, detected_language, empty_reason) = match empty_reason {
            Some(reason) => {
                trail.enter(JobState::EmptyOk);
                log::warn!("pipeline: {reason:?}, writing empty transcript");
                (Vec::new(), None, Some(reason))
            }
            None => {
                trail.enter(JobState::Transcribe);
                let result = self
                    .engine
                    .transcribe(audio.path(), &self.language)
                    .map_err(|e| JobError::transcription(e.to_string()))?;

                log::info!(
                    "pipeline: detected language '{}' (requested '{}'), {} ms",
                    result.detected_language,
                    self.language,
                    result.duration_ms
                );
                for line in result.lines() {
                    log::debug!("pipeline: segment: {line}");
                }

                let reason = result.is_empty().then_some(EmptyReason::NoSpeech);
                let lines: Vec<String> = result.lines().map(str::to_owned).collect();
                (lines, Some(result.detected_language), reason)
            }
        };

        // ── 4. Write ─────────────────────────────────────────────────────
        trail.enter(JobState::WriteOutput);
        let written = write_transcript(output, &lines)?;
        log::info!(
            "pipeline: wrote {} ({written} bytes)",
            output.display()
        );

        Ok(JobSummary {
            detected_language,
            segment_count: lines.len(),
            output_path: output.to_path_buf(),
            empty_reason,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Input must exist, be a file and be non-empty.  Returns its size.
fn validate_input(input: &Path) -> Result<u64, JobError> {
    let meta = std::fs::metadata(input)
        .map_err(|e| JobError::invalid_input(format!("{}: {e}", input.display())))?;
    if !meta.is_file() {
        return Err(JobError::invalid_input(format!(
            "{} is not a file",
            input.display()
        )));
    }
    if meta.len() == 0 {
        return Err(JobError::invalid_input(format!(
            "{} is empty",
            input.display()
        )));
    }
    Ok(meta.len())
}

/// Write one line per segment, `\n`-terminated, via a sibling temp file
/// renamed into place.  Returns the size of the written file.
fn write_transcript(output: &Path, lines: &[String]) -> Result<u64, JobError> {
    let parent = match output.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    if !parent.exists() {
        std::fs::create_dir_all(parent).map_err(|e| {
            JobError::output_write(format!("cannot create {}: {e}", parent.display()))
        })?;
        log::info!("pipeline: created output directory {}", parent.display());
    }

    let mut tmp = tempfile::Builder::new()
        .prefix(".vt-")
        .suffix(".partial")
        .tempfile_in(parent)
        .map_err(|e| JobError::output_write(format!("temp file in {}: {e}", parent.display())))?;

    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        for line in lines {
            writeln!(writer, "{line}").map_err(|e| JobError::output_write(e.to_string()))?;
        }
        writer
            .flush()
            .map_err(|e| JobError::output_write(e.to_string()))?;
    }
    tmp.as_file()
        .sync_all()
        .map_err(|e| JobError::output_write(e.to_string()))?;

    tmp.persist(output)
        .map_err(|e| JobError::output_write(format!("{}: {}", output.display(), e.error)))?;

    std::fs::metadata(output)
        .map(|m| m.len())
        .map_err(|e| JobError::output_write(format!("{} missing after write: {e}", output.display())))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
