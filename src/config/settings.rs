//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across threads.
//! Missing keys fall back to their defaults, so a settings file only needs
//! the values it overrides.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

// ---------------------------------------------------------------------------
// SttConfig
// ---------------------------------------------------------------------------

/// Settings for the Whisper STT engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SttConfig {
    /// Model id from the registry (e.g. `"large-v3"`).
    pub model: String,
    /// `"cpu"` or `"gpu"`.
    pub device: String,
    /// `"int8"`, `"float16"` or `"float32"`; picks the GGML quantisation.
    pub precision: String,
    /// Fixed transcription language as an ISO-639-1 code.  Never
    /// auto-detected; the engine still reports what it detected.
    pub language: String,
    /// Inference threads.  `None` uses the available parallelism, capped at 8.
    pub n_threads: Option<i32>,
    /// Override for the models directory.  `None` uses [`AppPaths::models_dir`].
    pub models_dir: Option<PathBuf>,
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            model: "large-v3".into(),
            device: "cpu".into(),
            precision: "int8".into(),
            language: "ar".into(),
            n_threads: None,
            models_dir: None,
        }
    }
}

impl SttConfig {
    /// Effective models directory.
    pub fn models_dir(&self) -> PathBuf {
        self.models_dir
            .clone()
            .unwrap_or_else(|| AppPaths::new().models_dir)
    }
}

// ---------------------------------------------------------------------------
// ExtractConfig
// ---------------------------------------------------------------------------

/// Settings for audio extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// Name or path of the ffmpeg executable.
    pub ffmpeg_binary: String,
    /// Allow the in-process demux fallback (only effective when the crate is
    /// built with the `demux-fallback` feature).
    pub fallback_enabled: bool,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            ffmpeg_binary: "ffmpeg".into(),
            fallback_enabled: true,
        }
    }
}

// ---------------------------------------------------------------------------
// JobConfig
// ---------------------------------------------------------------------------

/// Settings for the out-of-process job boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    /// Wall-clock budget for one job, in seconds.
    pub timeout_secs: u64,
    /// Where transcripts are written.  `None` uses
    /// [`AppPaths::transcripts_dir`].
    pub output_dir: Option<PathBuf>,
    /// Where scratch files are created.  `None` uses the system temp dir.
    pub scratch_dir: Option<PathBuf>,
    /// Extension given to uploads whose filename has none.
    pub default_extension: String,
    /// Maximum bytes retained per captured child stream (tail is kept).
    pub capture_limit_bytes: usize,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 600,
            output_dir: None,
            scratch_dir: None,
            default_extension: "webm".into(),
            capture_limit_bytes: 64 * 1024,
        }
    }
}

impl JobConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Effective transcript directory.
    pub fn output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| AppPaths::new().transcripts_dir)
    }

    /// Effective scratch directory.
    pub fn scratch_dir(&self) -> PathBuf {
        self.scratch_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// ```rust,no_run
/// use video_transcriber::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
/// assert_eq!(config.stt.model, "large-v3");
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// STT engine settings.
    pub stt: SttConfig,
    /// Audio extraction settings.
    pub extract: ExtractConfig,
    /// Job boundary settings.
    pub job: JobConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    /// Pretty TOML rendering of the configuration.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Returns `true` when no `settings.toml` file exists yet.
    pub fn is_first_run() -> bool {
        !AppPaths::new().settings_file.exists()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
