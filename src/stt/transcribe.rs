//! Engine parameter types and result types.
//!
//! [`EngineParams`] carries everything fixed at model-load time.
//! [`TranscriptionResult`] is returned by [`SttEngine::transcribe`].
//!
//! [`SttEngine::transcribe`]: crate::stt::SttEngine::transcribe

use std::str::FromStr;

use super::engine::SttError;

// ---------------------------------------------------------------------------
// Device / Precision
// ---------------------------------------------------------------------------

/// Where inference runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Device {
    #[default]
    Cpu,
    Gpu,
}

impl FromStr for Device {
    type Err = SttError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cpu" => Ok(Device::Cpu),
            "gpu" | "cuda" => Ok(Device::Gpu),
            other => Err(SttError::InvalidParams(format!("unknown device: {other}"))),
        }
    }
}

/// Numeric precision of the model weights.
///
/// For GGML models this selects the quantised file variant, so the same
/// model id maps to different files per precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Precision {
    #[default]
    Int8,
    Float16,
    Float32,
}

impl Precision {
    /// File-name suffix of the GGML variant (`""` for the plain f16 file).
    pub fn ggml_suffix(self) -> &'static str {
        match self {
            Precision::Int8 => "-q8_0",
            Precision::Float16 => "",
            Precision::Float32 => "-f32",
        }
    }
}

impl FromStr for Precision {
    type Err = SttError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "int8" | "q8_0" => Ok(Precision::Int8),
            "float16" | "f16" => Ok(Precision::Float16),
            "float32" | "f32" => Ok(Precision::Float32),
            other => Err(SttError::InvalidParams(format!("unknown precision: {other}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// EngineParams
// ---------------------------------------------------------------------------

/// Parameters fixed for the lifetime of a loaded engine.
#[derive(Debug, Clone)]
pub struct EngineParams {
    pub device: Device,
    pub precision: Precision,

    /// Number of CPU threads handed to Whisper.  Defaults to
    /// [`optimal_threads()`], capped at 8.
    pub n_threads: i32,

    /// Beam width; `1` selects greedy decoding.
    pub beam_size: i32,

    /// Suppress Whisper's progress output to stderr.
    pub suppress_progress: bool,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            device: Device::default(),
            precision: Precision::default(),
            n_threads: optimal_threads(),
            beam_size: 5,
            suppress_progress: true,
        }
    }
}

/// Returns the number of CPU threads to use for inference, capped at 8.
pub(crate) fn optimal_threads() -> i32 {
    std::thread::available_parallelism()
        .map(|n| n.get().min(8) as i32)
        .unwrap_or(4)
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// The output of a successful transcription.
///
/// An empty `segments` list is a valid result (silence, music, no speech).
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptionResult {
    /// Language the engine detected, independent of the language it was
    /// asked to transcribe in.
    pub detected_language: String,

    /// Non-empty, trimmed segments in temporal order.
    pub segments: Vec<Segment>,

    /// Wall-clock time the inference took, in milliseconds.
    pub duration_ms: u128,
}

impl TranscriptionResult {
    /// Transcript lines, one per segment.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().map(|s| s.text.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

/// A single time-aligned text chunk produced by Whisper.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub text: String,
    /// Start time in milliseconds from the start of the audio.
    pub start_ms: u64,
    /// End time in milliseconds from the start of the audio.
    pub end_ms: u64,
}

/// Drain `raw` to completion, trimming each segment and dropping those that
/// are empty or whitespace-only.  Order is preserved.
///
/// Line breaks inside a segment collapse to a single space: one segment is
/// always one transcript line.
pub fn collect_segments(raw: impl IntoIterator<Item = Segment>) -> Vec<Segment> {
    raw.into_iter()
        .filter_map(|s| {
            let text = single_line(&s.text);
            if text.is_empty() {
                None
            } else {
                Some(Segment { text, ..s })
            }
        })
        .collect()
}

/// Trim `text` and replace each run of `\r`/`\n` (with the whitespace around
/// it) by one space.
fn single_line(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for (i, part) in text
        .split(['\r', '\n'])
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .enumerate()
    {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(part);
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(text: &str, start_ms: u64) -> Segment {
        Segment {
            text: text.into(),
            start_ms,
            end_ms: start_ms + 1_000,
        }
    }

    #[test]
    fn collect_drops_whitespace_only_and_keeps_order() {
        let out = collect_segments(vec![
            seg(" مرحبا ", 0),
            seg("   ", 1_000),
            seg("", 2_000),
            seg("\tبكم\n", 3_000),
        ]);

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].text, "مرحبا");
        assert_eq!(out[1].text, "بكم");
        assert_eq!(out[1].start_ms, 3_000);
    }

    #[test]
    fn embedded_line_breaks_become_one_space() {
        let out = collect_segments(vec![
            seg("first\nsecond", 0),
            seg(" a \r\n\n b ", 1_000),
            seg("\n\r\n", 2_000),
            seg("third", 3_000),
        ]);

        let texts: Vec<_> = out.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["first second", "a b", "third"]);
        assert!(out.iter().all(|s| !s.text.contains(['\r', '\n'])));
    }

    #[test]
    fn collect_consumes_lazy_iterators_fully() {
        let produced = std::cell::Cell::new(0);
        let lazy = (0..5).map(|i| {
            produced.set(produced.get() + 1);
            seg(&format!("line {i}"), i * 1_000)
        });

        let out = collect_segments(lazy);
        assert_eq!(produced.get(), 5);
        assert_eq!(out.len(), 5);
    }

    #[test]
    fn device_and_precision_parse() {
        assert_eq!("cpu".parse::<Device>().unwrap(), Device::Cpu);
        assert_eq!("GPU".parse::<Device>().unwrap(), Device::Gpu);
        assert_eq!("int8".parse::<Precision>().unwrap(), Precision::Int8);
        assert_eq!("float16".parse::<Precision>().unwrap(), Precision::Float16);
        assert!("tpu".parse::<Device>().is_err());
        assert!("int4".parse::<Precision>().is_err());
    }

    #[test]
    fn defaults_are_cpu_int8() {
        let p = EngineParams::default();
        assert_eq!(p.device, Device::Cpu);
        assert_eq!(p.precision, Precision::Int8);
        assert!(p.n_threads >= 1 && p.n_threads <= 8);
    }

    #[test]
    fn lines_follow_segment_order() {
        let result = TranscriptionResult {
            detected_language: "ar".into(),
            segments: vec![seg("a", 0), seg("b", 1)],
            duration_ms: 0,
        };
        assert_eq!(result.lines().collect::<Vec<_>>(), vec!["a", "b"]);
        assert!(!result.is_empty());
    }
}
