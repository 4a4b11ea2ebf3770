//! Extraction strategies and the ordered extractor that routes between them.
//!
//! Each strategy reports an [`ExtractionOutcome`] instead of an error so the
//! pipeline can branch on data:
//!
//! ```text
//! for strategy in [ffmpeg, demux]:
//!     unavailable / Failed  → try next
//!     Extracted / NoAudio   → stop
//! none available            → ExtractError::NoToolAvailable
//! all available failed      → Failed(reasons)
//! ```

use std::path::Path;

use thiserror::Error;

// ---------------------------------------------------------------------------
// ExtractionOutcome
// ---------------------------------------------------------------------------

/// Result of one extraction attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionOutcome {
    /// Normalised audio was written; `bytes` is the file size on disk.
    Extracted { bytes: u64 },
    /// The container was read and has no audio track.
    NoAudio,
    /// The strategy cannot run in this environment.
    ToolUnavailable,
    /// The strategy ran and could not produce audio.
    Failed(String),
}

impl ExtractionOutcome {
    /// `true` only for [`Extracted`](Self::Extracted).
    pub fn succeeded(&self) -> bool {
        matches!(self, ExtractionOutcome::Extracted { .. })
    }

    /// `true` when another strategy is worth trying.
    fn should_fall_through(&self) -> bool {
        matches!(
            self,
            ExtractionOutcome::ToolUnavailable | ExtractionOutcome::Failed(_)
        )
    }
}

// ---------------------------------------------------------------------------
// ExtractError
// ---------------------------------------------------------------------------

/// Configuration-level extraction errors, distinct from per-video failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error(
        "no audio extraction tool available: install ffmpeg or build with the \
         `demux-fallback` feature and enable `extract.fallback_enabled` (tried: {tried})"
    )]
    NoToolAvailable { tried: String },
}

// ---------------------------------------------------------------------------
// ExtractionStrategy trait
// ---------------------------------------------------------------------------

/// A single way of turning a video file into normalised audio.
pub trait ExtractionStrategy: Send + Sync {
    /// Short name used in logs and error messages.
    fn name(&self) -> &'static str;

    /// Cheap probe deciding whether [`attempt`](Self::attempt) can run at all.
    fn is_available(&self) -> bool;

    /// Write 16 kHz mono 16-bit PCM WAV audio from `video` to `output`.
    fn attempt(&self, video: &Path, output: &Path) -> ExtractionOutcome;
}

// ---------------------------------------------------------------------------
// AudioExtractor
// ---------------------------------------------------------------------------

/// Tries an ordered list of strategies until one settles the outcome.
pub struct AudioExtractor {
    strategies: Vec<Box<dyn ExtractionStrategy>>,
}

impl std::fmt::Debug for AudioExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<_> = self.strategies.iter().map(|s| s.name()).collect();
        f.debug_struct("AudioExtractor")
            .field("strategies", &names)
            .finish()
    }
}

impl AudioExtractor {
    pub fn new(strategies: Vec<Box<dyn ExtractionStrategy>>) -> Self {
        Self { strategies }
    }

    /// Names of the configured strategies, in order.
    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Fail fast when no strategy can run in this environment.
    pub fn ensure_available(&self) -> Result<(), ExtractError> {
        if self.strategies.iter().any(|s| s.is_available()) {
            Ok(())
        } else {
            Err(self.no_tool())
        }
    }

    /// Extract audio from `video` into `output`.
    ///
    /// `output` is left empty after any unsuccessful attempt so downstream
    /// code never reads a partially written file.
    pub fn extract(&self, video: &Path, output: &Path) -> Result<ExtractionOutcome, ExtractError> {
        let mut failures: Vec<String> = Vec::new();
        let mut any_available = false;

        for strategy in &self.strategies {
            if !strategy.is_available() {
                log::info!("extract: {} unavailable, skipping", strategy.name());
                continue;
            }
            any_available = true;

            log::info!("extract: trying {}", strategy.name());
            let outcome = strategy.attempt(video, output);

            match &outcome {
                ExtractionOutcome::Extracted { bytes } => {
                    log::info!("extract: {} produced {bytes} bytes", strategy.name());
                }
                ExtractionOutcome::NoAudio => {
                    log::warn!("extract: {} found no audio track", strategy.name());
                    truncate(output);
                }
                ExtractionOutcome::ToolUnavailable => {
                    log::warn!("extract: {} became unavailable", strategy.name());
                    truncate(output);
                }
                ExtractionOutcome::Failed(reason) => {
                    log::warn!("extract: {} failed: {reason}", strategy.name());
                    failures.push(format!("{}: {reason}", strategy.name()));
                    truncate(output);
                }
            }

            if !outcome.should_fall_through() {
                return Ok(outcome);
            }
        }

        if !any_available || failures.is_empty() {
            return Err(self.no_tool());
        }

        Ok(ExtractionOutcome::Failed(failures.join("; ")))
    }

    fn no_tool(&self) -> ExtractError {
        ExtractError::NoToolAvailable {
            tried: self.strategy_names().join(", "),
        }
    }
}

/// Reset `path` to zero bytes if it exists.
fn truncate(path: &Path) {
    if path.exists() {
        if let Err(e) = std::fs::File::create(path) {
            log::warn!("extract: could not truncate {}: {e}", path.display());
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
