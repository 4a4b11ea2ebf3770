//! Model registry, metadata and path resolution.
//!
//! [`WHISPER_MODELS`] lists the multilingual Whisper GGML models the engine
//! knows how to load.  [`ModelPaths`] resolves the on-disk file for a model
//! id and precision.

use std::path::PathBuf;

use super::transcribe::Precision;

// ---------------------------------------------------------------------------
// ModelSize
// ---------------------------------------------------------------------------

/// Approximate capacity tier of a Whisper GGML model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelSize {
    /// ~466 MB file, fastest, lowest accuracy.
    Small,
    /// ~1.5 GB file, balanced.
    Medium,
    /// ~3.1 GB file (f16), ~1.7 GB at q8_0; highest accuracy.
    Large,
}

// ---------------------------------------------------------------------------
// ModelInfo
// ---------------------------------------------------------------------------

/// Static metadata for a Whisper model.
#[derive(Debug)]
pub struct ModelInfo {
    /// Identifier used in `SttConfig::model` (e.g. `"large-v3"`).
    pub id: &'static str,
    /// Human-readable name for logs.
    pub display_name: &'static str,
    pub size: ModelSize,
    /// File stem under the models directory, before the precision suffix.
    pub file_stem: &'static str,
    /// Source URL for downloading the GGML files.
    pub source_url: &'static str,
}

impl ModelInfo {
    /// File name of the variant for `precision`
    /// (e.g. `ggml-large-v3-q8_0.bin`).
    pub fn file_name(&self, precision: Precision) -> String {
        format!("{}{}.bin", self.file_stem, precision.ggml_suffix())
    }

    /// Remedy shown when the variant for `precision` is not on disk.
    pub fn download_hint(&self, precision: Precision) -> String {
        format!("download {} from {}", self.file_name(precision), self.source_url)
    }
}

/// Standard multilingual Whisper models.
pub const WHISPER_MODELS: &[ModelInfo] = &[
    ModelInfo {
        id: "small",
        display_name: "Whisper Small (Multilingual)",
        size: ModelSize::Small,
        file_stem: "ggml-small",
        source_url: "https://huggingface.co/ggerganov/whisper.cpp",
    },
    ModelInfo {
        id: "medium",
        display_name: "Whisper Medium (Multilingual)",
        size: ModelSize::Medium,
        file_stem: "ggml-medium",
        source_url: "https://huggingface.co/ggerganov/whisper.cpp",
    },
    ModelInfo {
        id: "large-v3",
        display_name: "Whisper Large-v3 (Multilingual)",
        size: ModelSize::Large,
        file_stem: "ggml-large-v3",
        source_url: "https://huggingface.co/ggerganov/whisper.cpp",
    },
];

/// Find a [`ModelInfo`] by its `id` string.
pub fn find_model_by_id(id: &str) -> Option<&'static ModelInfo> {
    WHISPER_MODELS.iter().find(|m| m.id == id)
}

// ---------------------------------------------------------------------------
// ModelPaths
// ---------------------------------------------------------------------------

/// Resolves the on-disk location of model files.
#[derive(Debug, Clone)]
pub struct ModelPaths {
    /// Directory that contains GGML `.bin` files.
    pub models_dir: PathBuf,
}

impl ModelPaths {
    pub fn new(models_dir: impl Into<PathBuf>) -> Self {
        Self {
            models_dir: models_dir.into(),
        }
    }

    /// Full path to the GGML file for the given model and precision.
    pub fn model_path(&self, model: &ModelInfo, precision: Precision) -> PathBuf {
        self.models_dir.join(model.file_name(precision))
    }

    /// Resolve a model id.  Unknown ids are treated as a literal file stem
    /// so custom GGML files can be dropped into the models directory.
    pub fn resolve(&self, id: &str, precision: Precision) -> PathBuf {
        match find_model_by_id(id) {
            Some(model) => self.model_path(model, precision),
            None => self
                .models_dir
                .join(format!("{id}{}.bin", precision.ggml_suffix())),
        }
    }

    /// Returns `true` if the model file exists on disk.
    pub fn is_available(&self, model: &ModelInfo, precision: Precision) -> bool {
        self.model_path(model, precision).exists()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
