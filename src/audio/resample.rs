//! Channel mixing and sample-rate conversion for the demux fallback.
//!
//! The STT engine requires **16 kHz mono** audio:
//!
//! 1. [`downmix_to_mono`]: average any number of interleaved channels.
//! 2. [`resample_to_16k`]: windowed-sinc resampling via `rubato`.

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

use super::format::SAMPLE_RATE;

const CHUNK_SIZE: usize = 1024;

// ---------------------------------------------------------------------------
// downmix_to_mono
// ---------------------------------------------------------------------------

/// Mix interleaved multi-channel audio down to mono by averaging all channels.
///
/// * `channels == 1` returns the input unchanged.
/// * `channels == 0` returns an empty vector.
///
/// ```rust
/// use video_transcriber::audio::resample::downmix_to_mono;
///
/// let stereo = vec![0.5_f32, -0.5, 0.2, 0.4]; // L R L R
/// let mono = downmix_to_mono(&stereo, 2);
/// assert_eq!(mono.len(), 2);
/// assert!((mono[0] - 0.0).abs() < 1e-6);
/// assert!((mono[1] - 0.3).abs() < 1e-6);
/// ```
pub fn downmix_to_mono(samples: &[f32], channels: usize) -> Vec<f32> {
    match channels {
        0 => Vec::new(),
        1 => samples.to_vec(),
        n => samples
            .chunks_exact(n)
            .map(|frame| frame.iter().sum::<f32>() / n as f32)
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// resample_to_16k
// ---------------------------------------------------------------------------

/// Resample mono `samples` from `source_rate` Hz to 16 000 Hz.
///
/// Same-rate and empty inputs are returned as-is.  The filter delay is
/// removed from the start and the tail is flushed, so the output is aligned
/// with the input and exactly `samples.len() * 16_000 / source_rate` long.
pub fn resample_to_16k(samples: &[f32], source_rate: u32) -> Result<Vec<f32>, String> {
    if source_rate == SAMPLE_RATE || samples.is_empty() {
        return Ok(samples.to_vec());
    }
    if source_rate == 0 {
        return Err("source sample rate is zero".into());
    }

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let ratio = SAMPLE_RATE as f64 / source_rate as f64;
    let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, CHUNK_SIZE, 1)
        .map_err(|e| format!("resampler init: {e}"))?;

    let delay = resampler.output_delay();
    let wanted = (samples.len() as f64 * ratio) as usize;
    let mut output = Vec::with_capacity(delay + wanted + CHUNK_SIZE);

    let mut chunks = samples.chunks_exact(CHUNK_SIZE);
    for chunk in &mut chunks {
        let result = resampler
            .process(&[chunk], None)
            .map_err(|e| format!("resample: {e}"))?;
        if let Some(channel) = result.first() {
            output.extend_from_slice(channel);
        }
    }

    let rest = chunks.remainder();
    if !rest.is_empty() {
        let result = resampler
            .process_partial(Some(&[rest][..]), None)
            .map_err(|e| format!("resample: {e}"))?;
        if let Some(channel) = result.first() {
            output.extend_from_slice(channel);
        }
    }

    // Flush what is still inside the filter.
    while output.len() < delay + wanted {
        let result = resampler
            .process_partial::<&[f32]>(None, None)
            .map_err(|e| format!("resample flush: {e}"))?;
        match result.first() {
            Some(channel) if !channel.is_empty() => output.extend_from_slice(channel),
            _ => break,
        }
    }

    Ok(output.into_iter().skip(delay).take(wanted).collect())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downmix_already_mono() {
        let input = vec![0.1_f32, 0.2, 0.3];
        assert_eq!(downmix_to_mono(&input, 1), input);
    }

    #[test]
    fn downmix_four_channel() {
        let out = downmix_to_mono(&[0.4_f32; 4], 4);
        assert_eq!(out.len(), 1);
        assert!((out[0] - 0.4).abs() < 1e-6);
    }

    #[test]
    fn downmix_zero_channels() {
        assert!(downmix_to_mono(&[1.0_f32, 2.0], 0).is_empty());
    }

    #[test]
    fn downmix_drops_incomplete_trailing_frame() {
        let out = downmix_to_mono(&[1.0_f32, 1.0, 0.5], 2);
        assert_eq!(out, vec![1.0]);
    }

    #[test]
    fn resample_already_16k_is_noop() {
        let input: Vec<f32> = (0..160).map(|i| i as f32 / 160.0).collect();
        assert_eq!(resample_to_16k(&input, 16_000).unwrap(), input);
    }

    #[test]
    fn resample_empty_input() {
        assert!(resample_to_16k(&[], 48_000).unwrap().is_empty());
    }

    #[test]
    fn resample_zero_rate_is_error() {
        assert!(resample_to_16k(&[0.0; 10], 0).is_err());
    }

    #[test]
    fn resample_44100_to_16k_output_length() {
        let input = vec![0.0_f32; 44_100];
        let out = resample_to_16k(&input, 44_100).unwrap();
        assert!(
            out.len().abs_diff(16_000) <= 1,
            "expected ~16000, got {}",
            out.len()
        );
    }

    #[test]
    fn resample_keeps_timing_aligned() {
        // Step from 0 to 1 at 0.5 s.
        let mut input = vec![0.0_f32; 48_000];
        input[24_000..].fill(1.0);

        let out = resample_to_16k(&input, 48_000).unwrap();
        assert_eq!(out.len(), 16_000);
        assert!(out[7_980].abs() < 0.1, "step arrived early: {}", out[7_980]);
        assert!(out[8_020] > 0.9, "step arrived late: {}", out[8_020]);
        assert!(out[15_950] > 0.9, "tail lost: {}", out[15_950]);
    }

    #[test]
    fn resample_upsample_from_8k() {
        let input = vec![0.0_f32; 8_000];
        let out = resample_to_16k(&input, 8_000).unwrap();
        assert_eq!(out.len(), 16_000);
    }
}
