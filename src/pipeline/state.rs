//! Job state machine.
//!
//! [`JobState`] names each stage a single job passes through.  The
//! orchestrator records every state it enters in a [`JobTrail`], which is
//! returned to the caller as part of the report and makes the path a job
//! took observable in tests and logs.

// ---------------------------------------------------------------------------
// JobState
// ---------------------------------------------------------------------------

/// States of one transcription job.
///
/// ```text
/// Start ─▶ ValidateInput ─▶ ExtractAudio ─┬─▶ Transcribe ─┬─▶ WriteOutput ─▶ Cleanup ─▶ Success
///                │               │        └─▶ EmptyOk ────┘        │
///                └───────────────┴──────── (failure) ──────────────┴──▶ Cleanup ─▶ Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobState {
    #[default]
    Start,
    /// Input path must exist and be non-empty.
    ValidateInput,
    /// Video → scratch WAV through the extractor.
    ExtractAudio,
    /// Audio was extracted; the engine is running.
    Transcribe,
    /// No audio track or empty audio; the transcript will be empty.
    EmptyOk,
    /// Transcript is being written to the output path.
    WriteOutput,
    /// Scratch audio is being released.  Entered on every path.
    Cleanup,
    Success,
    Failed,
}

impl JobState {
    /// `true` for [`Success`](Self::Success) and [`Failed`](Self::Failed).
    ///
    /// ```
    /// use video_transcriber::pipeline::JobState;
    ///
    /// assert!(JobState::Success.is_terminal());
    /// assert!(JobState::Failed.is_terminal());
    /// assert!(!JobState::Cleanup.is_terminal());
    /// ```
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Success | JobState::Failed)
    }

    /// A short human-readable label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            JobState::Start => "start",
            JobState::ValidateInput => "validate-input",
            JobState::ExtractAudio => "extract-audio",
            JobState::Transcribe => "transcribe",
            JobState::EmptyOk => "empty-ok",
            JobState::WriteOutput => "write-output",
            JobState::Cleanup => "cleanup",
            JobState::Success => "success",
            JobState::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// JobTrail
// ---------------------------------------------------------------------------

/// Ordered record of the states a job entered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobTrail {
    states: Vec<JobState>,
}

impl JobTrail {
    pub fn new() -> Self {
        Self {
            states: vec![JobState::Start],
        }
    }

    pub fn enter(&mut self, state: JobState) {
        log::debug!("pipeline: → {state}");
        self.states.push(state);
    }

    pub fn current(&self) -> JobState {
        self.states.last().copied().unwrap_or_default()
    }

    pub fn contains(&self, state: JobState) -> bool {
        self.states.contains(&state)
    }

    pub fn into_states(self) -> Vec<JobState> {
        self.states
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state_is_start() {
        assert_eq!(JobState::default(), JobState::Start);
    }

    #[test]
    fn labels_are_unique() {
        let all = [
            JobState::Start,
            JobState::ValidateInput,
            JobState::ExtractAudio,
            JobState::Transcribe,
            JobState::EmptyOk,
            JobState::WriteOutput,
            JobState::Cleanup,
            JobState::Success,
            JobState::Failed,
        ];
        let mut labels: Vec<_> = all.iter().map(|s| s.label()).collect();
        labels.sort_unstable();
        labels.dedup();
        assert_eq!(labels.len(), all.len());
    }

    #[test]
    fn trail_starts_at_start_and_records_in_order() {
        let mut trail = JobTrail::new();
        assert_eq!(trail.current(), JobState::Start);

        trail.enter(JobState::ValidateInput);
        trail.enter(JobState::Cleanup);
        trail.enter(JobState::Failed);

        assert_eq!(trail.current(), JobState::Failed);
        assert!(!trail.contains(JobState::ExtractAudio));
        assert_eq!(
            trail.into_states(),
            vec![
                JobState::Start,
                JobState::ValidateInput,
                JobState::Cleanup,
                JobState::Failed
            ]
        );
    }
}
