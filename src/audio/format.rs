//! The normalised audio format shared by the extractor and the STT engine.
//!
//! 16 kHz, mono, 16-bit signed little-endian PCM in a WAV container.

use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

pub const SAMPLE_RATE: u32 = 16_000;
pub const CHANNELS: u16 = 1;
pub const BITS_PER_SAMPLE: u16 = 16;

/// The WAV header every extracted audio file carries.
pub fn wav_spec() -> WavSpec {
    WavSpec {
        channels: CHANNELS,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: BITS_PER_SAMPLE,
        sample_format: SampleFormat::Int,
    }
}

/// `true` when `spec` matches the normalised format exactly.
pub fn is_normalized(spec: &WavSpec) -> bool {
    spec.channels == CHANNELS
        && spec.sample_rate == SAMPLE_RATE
        && spec.bits_per_sample == BITS_PER_SAMPLE
        && spec.sample_format == SampleFormat::Int
}

/// Write `samples` as a normalised WAV file, replacing `path`.
pub fn write_wav(path: &Path, samples: &[i16]) -> Result<(), hound::Error> {
    let mut writer = WavWriter::create(path, wav_spec())?;
    for &s in samples {
        writer.write_sample(s)?;
    }
    writer.finalize()
}

/// Read a normalised WAV file into `f32` samples in `[-1.0, 1.0)`.
///
/// Returns an error naming the actual format when the file is not
/// 16 kHz / mono / 16-bit.
pub fn read_wav_f32(path: &Path) -> Result<Vec<f32>, String> {
    let mut reader = WavReader::open(path).map_err(|e| e.to_string())?;
    let spec = reader.spec();
    if !is_normalized(&spec) {
        return Err(format!(
            "expected {SAMPLE_RATE}Hz mono {BITS_PER_SAMPLE}bit, got {}Hz {}ch {}bit",
            spec.sample_rate, spec.channels, spec.bits_per_sample
        ));
    }

    reader
        .samples::<i16>()
        .map(|s| s.map(|v| v as f32 / 32_768.0))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| e.to_string())
}

/// Convert `f32` samples to 16-bit PCM with clamping.
pub fn f32_to_i16(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16)
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
