//! Process boundary between a transcription request and the job that
//! serves it.
//!
//! Every request runs the pipeline in its own child process (the same
//! binary, `job` subcommand).  The runner owns the deadline, the bounded
//! diagnostics and the scratch copy of the upload; the child owns
//! everything else.
//!
//! ```text
//! TranscriptionRunner::run(bytes, filename)
//!        │
//!        ├─ VideoUpload    → scratch video (extension kept)
//!        ├─ JobCommand     → tokio::process child, kill_on_drop
//!        ├─ BoundedCapture ← stdout / stderr tails
//!        ├─ JobRecord      ← exit status, diagnostics
//!        └─ TranscribeResponse (JSON)
//! ```

pub mod capture;
pub mod record;
pub mod response;
pub mod runner;

pub use capture::BoundedCapture;
pub use record::{JobRecord, VideoUpload};
pub use response::{TranscribeResponse, NO_SPEECH_MESSAGE};
pub use runner::{JobCommand, TranscriptionRunner};
