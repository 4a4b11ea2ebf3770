//! Core STT engine trait and implementations.
//!
//! # Overview
//!
//! [`SttEngine`] is the interface used by the pipeline.  It is object-safe
//! and `Send + Sync` so it can be held behind an `Arc<dyn SttEngine>`.
//!
//! [`WhisperEngine`] is the production implementation that wraps a
//! `whisper_rs::WhisperContext`.  Construct it with [`WhisperEngine::load`].
//!
//! [`MockSttEngine`] (available under `#[cfg(test)]`) returns pre-configured
//! segments without loading a GGML model file.

use std::path::Path;
use std::sync::Mutex;
use std::time::Instant;

use thiserror::Error;
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use crate::audio::format::read_wav_f32;
use crate::stt::transcribe::{collect_segments, Device, EngineParams, Segment, TranscriptionResult};

// ---------------------------------------------------------------------------
// SttError
// ---------------------------------------------------------------------------

/// All errors that can arise from the STT subsystem.
#[derive(Debug, Clone, Error)]
pub enum SttError {
    /// The GGML model file was not found at the given path.
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// `whisper_rs` failed to initialise a `WhisperContext` or `WhisperState`.
    #[error("Whisper context initialisation failed: {0}")]
    ContextInit(String),

    /// Device, precision or model name could not be understood.
    #[error("Invalid engine parameters: {0}")]
    InvalidParams(String),

    /// The audio file is missing, unreadable or not 16 kHz mono 16-bit PCM.
    #[error("Unsupported audio: {0}")]
    UnsupportedAudio(String),

    /// An error occurred during the inference pass.
    #[error("Transcription error: {0}")]
    Transcription(String),
}

// ---------------------------------------------------------------------------
// SttEngine trait
// ---------------------------------------------------------------------------

/// Object-safe, thread-safe interface for speech-to-text engines.
///
/// # Contract
///
/// - `audio_path` must point at a 16 kHz mono 16-bit PCM WAV file.
/// - `language` is an ISO-639-1 code, or `"auto"` to let the engine decide.
/// - The returned segments are trimmed, non-empty and in temporal order.
///   An empty list is a valid result.
pub trait SttEngine: Send + Sync {
    fn transcribe(&self, audio_path: &Path, language: &str)
        -> Result<TranscriptionResult, SttError>;
}

// Compile-time assertion: Box<dyn SttEngine> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn SttEngine>) {}
};

// ---------------------------------------------------------------------------
// WhisperEngine
// ---------------------------------------------------------------------------

/// Production STT engine that wraps a `whisper_rs::WhisperContext`.
///
/// The model is loaded once and reused.  A fresh `WhisperState` is created
/// per call; calls are serialised through `inference` so concurrent callers
/// sharing one engine never run the model at the same time.
pub struct WhisperEngine {
    ctx: WhisperContext,
    params: EngineParams,
    inference: Mutex<()>,
}

impl std::fmt::Debug for WhisperEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhisperEngine")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

// SAFETY: WhisperContext is Send+Sync as declared by whisper-rs; the model
// weights are read-only after loading.
unsafe impl Send for WhisperEngine {}
unsafe impl Sync for WhisperEngine {}

impl WhisperEngine {
    /// Load a GGML model from `model_path` and prepare it for inference.
    ///
    /// # Errors
    ///
    /// - [`SttError::ModelNotFound`]: `model_path` does not exist.
    /// - [`SttError::ContextInit`]: whisper-rs failed to load the file.
    pub fn load(model_path: impl AsRef<Path>, params: EngineParams) -> Result<Self, SttError> {
        let path = model_path.as_ref();

        if !path.exists() {
            return Err(SttError::ModelNotFound(path.display().to_string()));
        }

        let path_str = path.to_str().ok_or_else(|| {
            SttError::ModelNotFound(format!(
                "model path contains non-UTF-8 characters: {}",
                path.display()
            ))
        })?;

        let mut ctx_params = WhisperContextParameters::default();
        ctx_params.use_gpu(params.device == Device::Gpu);

        let started = Instant::now();
        let ctx = WhisperContext::new_with_params(path_str, ctx_params)
            .map_err(|e| SttError::ContextInit(e.to_string()))?;

        log::info!(
            "stt: loaded {} ({:?}, {:?}) in {} ms",
            path.display(),
            params.device,
            params.precision,
            started.elapsed().as_millis()
        );

        Ok(Self {
            ctx,
            params,
            inference: Mutex::new(()),
        })
    }

    /// `language` is borrowed for the lifetime of the returned params; whisper
    /// itself understands `"auto"`.
    fn full_params<'a>(&self, language: &'a str) -> FullParams<'a, 'a> {
        let strategy = if self.params.beam_size > 1 {
            SamplingStrategy::BeamSearch {
                beam_size: self.params.beam_size,
                patience: -1.0,
            }
        } else {
            SamplingStrategy::Greedy { best_of: 1 }
        };

        let mut fp = FullParams::new(strategy);
        fp.set_n_threads(self.params.n_threads);
        fp.set_translate(false);
        fp.set_language(Some(language));

        if self.params.suppress_progress {
            fp.set_print_progress(false);
            fp.set_print_realtime(false);
            fp.set_print_special(false);
            fp.set_print_timestamps(false);
        }
        fp
    }
}

impl SttEngine for WhisperEngine {
    fn transcribe(
        &self,
        audio_path: &Path,
        language: &str,
    ) -> Result<TranscriptionResult, SttError> {
        let audio = read_wav_f32(audio_path).map_err(SttError::UnsupportedAudio)?;

        if audio.is_empty() {
            return Ok(TranscriptionResult {
                detected_language: language.to_string(),
                segments: Vec::new(),
                duration_ms: 0,
            });
        }

        let fp = self.full_params(language);

        let _guard = self
            .inference
            .lock()
            .map_err(|_| SttError::Transcription("engine lock poisoned".into()))?;

        let mut state = self
            .ctx
            .create_state()
            .map_err(|e| SttError::ContextInit(e.to_string()))?;

        let wall_start = Instant::now();

        state
            .full(fp, &audio)
            .map_err(|e| SttError::Transcription(e.to_string()))?;

        let n_segments = state
            .full_n_segments()
            .map_err(|e| SttError::Transcription(e.to_string()))?;

        let mut raw: Vec<Segment> = Vec::with_capacity(n_segments.max(0) as usize);
        for i in 0..n_segments {
            let text = state
                .full_get_segment_text(i)
                .map_err(|e| SttError::Transcription(format!("segment {i}: {e}")))?;

            // Timestamps are in centiseconds.
            let t0 = state.full_get_segment_t0(i).unwrap_or(0).max(0) as u64 * 10;
            let t1 = state.full_get_segment_t1(i).unwrap_or(0).max(0) as u64 * 10;

            raw.push(Segment {
                text,
                start_ms: t0,
                end_ms: t1,
            });
        }

        let detected_language = state
            .full_lang_id_from_state()
            .ok()
            .and_then(whisper_rs::get_lang_str)
            .unwrap_or(language)
            .to_string();

        Ok(TranscriptionResult {
            detected_language,
            segments: collect_segments(raw),
            duration_ms: wall_start.elapsed().as_millis(),
        })
    }
}

// ---------------------------------------------------------------------------
// MockSttEngine  (test-only)
// ---------------------------------------------------------------------------

/// A test double that returns pre-configured segments without loading any
/// model file.  It still requires `audio_path` to exist.
#[cfg(test)]
pub struct MockSttEngine {
    response: Result<Vec<String>, SttError>,
    language: String,
    calls: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl MockSttEngine {
    /// Create a mock that always returns one segment per line.
    pub fn ok<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            response: Ok(lines.into_iter().map(Into::into).collect()),
            language: "ar".into(),
            calls: Default::default(),
        }
    }

    /// Create a mock that always returns zero segments.
    pub fn silent() -> Self {
        Self::ok(Vec::<String>::new())
    }

    /// Create a mock that always returns `Err(error)`.
    pub fn err(error: SttError) -> Self {
        Self {
            response: Err(error),
            language: "ar".into(),
            calls: Default::default(),
        }
    }

    pub fn detecting(mut self, language: &str) -> Self {
        self.language = language.into();
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
impl SttEngine for MockSttEngine {
    fn transcribe(
        &self,
        audio_path: &Path,
        _language: &str,
    ) -> Result<TranscriptionResult, SttError> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if !audio_path.exists() {
            return Err(SttError::UnsupportedAudio(format!(
                "{} does not exist",
                audio_path.display()
            )));
        }
        let lines = self.response.clone()?;
        let raw = lines.into_iter().enumerate().map(|(i, text)| Segment {
            text,
            start_ms: i as u64 * 1_000,
            end_ms: (i as u64 + 1) * 1_000,
        });
        Ok(TranscriptionResult {
            detected_language: self.language.clone(),
            segments: collect_segments(raw),
            duration_ms: 0,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn audio_file(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("audio.wav");
        crate::audio::format::write_wav(&path, &[0i16; 1_600]).unwrap();
        path
    }

    // --- MockSttEngine ---

    #[test]
    fn mock_ok_returns_trimmed_segments() {
        let dir = tempdir().unwrap();
        let engine = MockSttEngine::ok([" مرحبا ", "  ", "بكم"]);
        let result = engine.transcribe(&audio_file(dir.path()), "ar").unwrap();
        assert_eq!(result.lines().collect::<Vec<_>>(), vec!["مرحبا", "بكم"]);
        assert_eq!(result.detected_language, "ar");
        assert_eq!(engine.calls(), 1);
    }

    #[test]
    fn mock_err_returns_configured_error() {
        let dir = tempdir().unwrap();
        let engine = MockSttEngine::err(SttError::Transcription("boom".into()));
        let err = engine.transcribe(&audio_file(dir.path()), "ar").unwrap_err();
        assert!(matches!(err, SttError::Transcription(_)));
    }

    #[test]
    fn mock_missing_audio_is_unsupported() {
        let engine = MockSttEngine::ok(["text"]);
        let err = engine
            .transcribe(Path::new("/nonexistent/audio.wav"), "ar")
            .unwrap_err();
        assert!(matches!(err, SttError::UnsupportedAudio(_)));
    }

    // --- WhisperEngine::load missing path ---

    #[test]
    fn load_missing_model_returns_model_not_found() {
        let result = WhisperEngine::load("/nonexistent/model.bin", EngineParams::default());
        assert!(
            matches!(result, Err(SttError::ModelNotFound(_))),
            "expected ModelNotFound, got: {result:?}"
        );
    }

    // --- SttEngine object safety ---

    #[test]
    fn arc_dyn_stt_engine_is_shareable() {
        let dir = tempdir().unwrap();
        let audio = audio_file(dir.path());
        let engine: std::sync::Arc<dyn SttEngine> =
            std::sync::Arc::new(MockSttEngine::ok(["ok"]).detecting("en"));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let engine = engine.clone();
                let audio = audio.clone();
                std::thread::spawn(move || engine.transcribe(&audio, "ar").unwrap())
            })
            .collect();

        for h in handles {
            assert_eq!(h.join().unwrap().detected_language, "en");
        }
    }

    // --- SttError display ---

    #[test]
    fn stt_error_display_model_not_found() {
        let e = SttError::ModelNotFound("/some/path.bin".into());
        assert!(e.to_string().contains("/some/path.bin"));
    }

    #[test]
    fn stt_error_display_unsupported_audio() {
        let e = SttError::UnsupportedAudio("44100 Hz".into());
        assert!(e.to_string().contains("44100"));
    }
}
