//! STT (Speech-to-Text) engine module.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                  SttEngine (trait)                    │
//! │                                                      │
//! │   ┌─────────────┐    ┌──────────────┐               │
//! │   │  ModelPaths  │    │ WhisperEngine│               │
//! │   │ - resolve    │───▶│ - ctx        │               │
//! │   │ - exists?    │    │ - params     │               │
//! │   └─────────────┘    └──────┬───────┘               │
//! │                              │                       │
//! │                              ▼                       │
//! │                    ┌──────────────────┐              │
//! │                    │  transcribe()    │              │
//! │                    │  wav → segments  │              │
//! │                    └──────────────────┘              │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::path::Path;
//! use video_transcriber::config::SttConfig;
//! use video_transcriber::stt::load_engine;
//!
//! let engine = load_engine(&SttConfig::default())
//!     .expect("model not found in the models directory");
//!
//! // audio: 16 kHz, mono, 16-bit WAV from the audio module
//! let result = engine.transcribe(Path::new("/tmp/clip.wav"), "ar").unwrap();
//! for line in result.lines() {
//!     println!("{line}");
//! }
//! ```

pub mod engine;
pub mod model;
pub mod transcribe;

use std::sync::Arc;

use crate::config::SttConfig;

// ── Public re-exports ──────────────────────────────────────────────────────

pub use engine::{SttEngine, SttError, WhisperEngine};
pub use model::{find_model_by_id, ModelInfo, ModelPaths, ModelSize, WHISPER_MODELS};
pub use transcribe::{Device, EngineParams, Precision, Segment, TranscriptionResult};

#[cfg(test)]
pub use engine::MockSttEngine;

/// Shared, process-wide engine handle.
pub type EngineHandle = Arc<dyn SttEngine>;

/// Translate the string-typed config into [`EngineParams`].
pub fn engine_params(config: &SttConfig) -> Result<EngineParams, SttError> {
    let mut params = EngineParams {
        device: config.device.parse()?,
        precision: config.precision.parse()?,
        ..EngineParams::default()
    };
    if let Some(n) = config.n_threads {
        if n < 1 {
            return Err(SttError::InvalidParams(format!("n_threads must be >= 1, got {n}")));
        }
        params.n_threads = n;
    }
    Ok(params)
}

/// Resolve the configured model file and load it once.
///
/// A missing model file is reported here, before any job runs.
pub fn load_engine(config: &SttConfig) -> Result<EngineHandle, SttError> {
    let params = engine_params(config)?;
    let paths = ModelPaths::new(config.models_dir());
    let model_path = paths.resolve(&config.model, params.precision);

    match find_model_by_id(&config.model) {
        Some(model) => {
            log::info!(
                "stt: loading {} from {}",
                model.display_name,
                model_path.display()
            );
            if !paths.is_available(model, params.precision) {
                log::error!(
                    "stt: {} is not in {}; {}",
                    model.display_name,
                    paths.models_dir.display(),
                    model.download_hint(params.precision)
                );
            }
        }
        None => log::info!(
            "stt: loading custom model '{}' from {}",
            config.model,
            model_path.display()
        ),
    }

    let engine = WhisperEngine::load(&model_path, params)?;
    Ok(Arc::new(engine))
}
