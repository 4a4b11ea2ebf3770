//! Audio extraction from a container → 16 kHz mono 16-bit PCM WAV.
//!
//! # Pipeline
//!
//! ```text
//! video ──▶ AudioExtractor
//!             ├─ FfmpegStrategy  (ffmpeg -vn -acodec pcm_s16le -ar 16000 -ac 1)
//!             └─ DemuxStrategy   (symphonia → downmix → rubato → hound)
//!           ──▶ ExtractionOutcome { Extracted | NoAudio | ToolUnavailable | Failed }
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//! use video_transcriber::audio::build_extractor;
//! use video_transcriber::config::ExtractConfig;
//!
//! let extractor = build_extractor(&ExtractConfig::default());
//! let outcome = extractor
//!     .extract(Path::new("clip.mp4"), Path::new("/tmp/clip.wav"))
//!     .unwrap();
//! println!("{outcome:?}");
//! ```

#[cfg(feature = "demux-fallback")]
pub mod demux;
pub mod extract;
pub mod ffmpeg;
pub mod format;
#[cfg(feature = "demux-fallback")]
pub mod resample;

#[cfg(feature = "demux-fallback")]
pub use demux::DemuxStrategy;
pub use extract::{AudioExtractor, ExtractError, ExtractionOutcome, ExtractionStrategy};
pub use ffmpeg::FfmpegStrategy;

use crate::config::ExtractConfig;

/// Build the ordered strategy list from configuration: ffmpeg first, then the
/// demux fallback when compiled in and enabled.
pub fn build_extractor(config: &ExtractConfig) -> AudioExtractor {
    let mut strategies: Vec<Box<dyn ExtractionStrategy>> =
        vec![Box::new(FfmpegStrategy::new(config.ffmpeg_binary.clone()))];
    push_fallback(&mut strategies, config);
    AudioExtractor::new(strategies)
}

#[cfg(feature = "demux-fallback")]
fn push_fallback(strategies: &mut Vec<Box<dyn ExtractionStrategy>>, config: &ExtractConfig) {
    if config.fallback_enabled {
        strategies.push(Box::new(DemuxStrategy::new()));
    }
}

#[cfg(not(feature = "demux-fallback"))]
fn push_fallback(_strategies: &mut Vec<Box<dyn ExtractionStrategy>>, config: &ExtractConfig) {
    if config.fallback_enabled {
        log::debug!("audio: demux fallback requested but not compiled in");
    }
}
