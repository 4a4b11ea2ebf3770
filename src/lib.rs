//! Video → transcript pipeline.
//!
//! A video is handed to [`job::TranscriptionRunner`], which runs the
//! [`pipeline::PipelineOrchestrator`] in an isolated child process:
//! [`audio`] extracts 16 kHz mono PCM, [`stt`] transcribes it with Whisper,
//! and the transcript is written next to the other outputs.  [`scratch`]
//! owns every temporary file along the way.

pub mod audio;
pub mod config;
pub mod error;
pub mod job;
pub mod pipeline;
pub mod scratch;
pub mod stt;
