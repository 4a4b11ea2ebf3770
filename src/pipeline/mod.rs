//! Pipeline orchestrator module.
//!
//! Runs inside the `job` child process and turns one input video into one
//! transcript file.
//!
//! # Architecture
//!
//! ```text
//! job <input> <output>
//!        │
//!        ▼
//! PipelineOrchestrator::run()  ← spawn_blocking
//!        │
//!        ├─ ValidateInput   exists, non-empty         → InvalidInput
//!        ├─ ExtractAudio    AudioExtractor            → ConfigurationError / ExtractionFailed
//!        ├─ Transcribe      SttEngine::transcribe     → TranscriptionFailed
//!        │  or EmptyOk      no audio / empty audio
//!        ├─ WriteOutput     temp file + rename        → OutputWriteFailed
//!        └─ Cleanup         release scratch audio (always)
//!        │
//!        ▼
//! JobReport { trail, outcome } ──▶ process exit code
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::path::PathBuf;
//! use std::sync::Arc;
//! use video_transcriber::audio::build_extractor;
//! use video_transcriber::config::AppConfig;
//! use video_transcriber::pipeline::PipelineOrchestrator;
//! use video_transcriber::stt::load_engine;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::default();
//!     let orchestrator = Arc::new(PipelineOrchestrator::new(
//!         build_extractor(&config.extract),
//!         load_engine(&config.stt).unwrap(),
//!         config.stt.language.clone(),
//!         config.job.scratch_dir(),
//!     ));
//!
//!     let report = orchestrator
//!         .run_blocking(PathBuf::from("clip.mp4"), PathBuf::from("clip.txt"))
//!         .await;
//!     println!("{:?}", report.trail);
//! }
//! ```

pub mod orchestrator;
pub mod state;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use orchestrator::{EmptyReason, JobReport, JobSummary, PipelineOrchestrator};
pub use state::{JobState, JobTrail};
