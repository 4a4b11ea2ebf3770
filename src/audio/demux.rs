//! Fallback extraction strategy: in-process demuxing with `symphonia`.
//!
//! Used when ffmpeg is missing or chokes on an input.  Handles the
//! containers and codecs compiled into symphonia (MP4/AAC, MKV/WebM with
//! PCM/MP3/AAC, WAV, MP3); anything else is reported as a failure so the
//! extractor can surface it.

use std::fs::File;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, Track};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::extract::{ExtractionOutcome, ExtractionStrategy};
use super::format::{f32_to_i16, write_wav};
use super::resample::{downmix_to_mono, resample_to_16k};

#[derive(Debug, Clone, Copy, Default)]
pub struct DemuxStrategy;

impl DemuxStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl ExtractionStrategy for DemuxStrategy {
    fn name(&self) -> &'static str {
        "demux"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn attempt(&self, video: &Path, output: &Path) -> ExtractionOutcome {
        let mut format = match open(video) {
            Ok(f) => f,
            Err(reason) => return ExtractionOutcome::Failed(reason),
        };

        let Some(track) = find_audio_track(format.tracks()).cloned() else {
            return ExtractionOutcome::NoAudio;
        };

        let samples = match decode_track(format.as_mut(), &track) {
            Ok(s) => s,
            Err(reason) => return ExtractionOutcome::Failed(reason),
        };

        if samples.is_empty() {
            log::warn!("demux: audio track decoded to zero samples");
            return ExtractionOutcome::NoAudio;
        }

        if let Err(e) = write_wav(output, &f32_to_i16(&samples)) {
            return ExtractionOutcome::Failed(format!("failed to write wav: {e}"));
        }

        match std::fs::metadata(output) {
            Ok(meta) if meta.len() > 0 => ExtractionOutcome::Extracted { bytes: meta.len() },
            _ => ExtractionOutcome::Failed("audio file was not created".into()),
        }
    }
}

fn open(video: &Path) -> Result<Box<dyn FormatReader>, String> {
    let file = File::open(video).map_err(|e| format!("open: {e}"))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = video.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| format!("probe: {e}"))?;

    Ok(probed.format)
}

/// First track that carries audio codec parameters.
fn find_audio_track(tracks: &[Track]) -> Option<&Track> {
    tracks
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL && t.codec_params.sample_rate.is_some())
}

/// Decode `track` to 16 kHz mono `f32`.
fn decode_track(format: &mut dyn FormatReader, track: &Track) -> Result<Vec<f32>, String> {
    let params = &track.codec_params;
    let source_rate = params
        .sample_rate
        .ok_or_else(|| "unknown sample rate".to_string())?;

    let mut decoder = symphonia::default::get_codecs()
        .make(params, &DecoderOptions::default())
        .map_err(|e| format!("codec: {e}"))?;

    let mut mono: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(SymphoniaError::IoError(ref e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(format!("packet: {e}")),
        };

        if packet.track_id() != track.id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(SymphoniaError::DecodeError(e)) => {
                log::warn!("demux: skipping corrupt audio frame: {e}");
                continue;
            }
            Err(e) => return Err(format!("decode: {e}")),
        };

        let spec = *decoded.spec();
        let frames = decoded.frames();
        if frames == 0 {
            continue;
        }

        let mut buf = SampleBuffer::<f32>::new(frames as u64, spec);
        buf.copy_interleaved_ref(decoded);
        mono.extend(downmix_to_mono(buf.samples(), spec.channels.count()));
    }

    log::debug!(
        "demux: decoded {} samples at {source_rate} Hz",
        mono.len()
    );

    resample_to_16k(&mono, source_rate)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::format::is_normalized;
    use tempfile::tempdir;

    fn write_stereo_wav(path: &Path, rate: u32, seconds: u32) {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut w = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..rate * seconds {
            let s = ((i as f32 * 0.03).sin() * 10_000.0) as i16;
            w.write_sample(s).unwrap();
            w.write_sample(s).unwrap();
        }
        w.finalize().unwrap();
    }

    #[test]
    fn always_available() {
        assert!(DemuxStrategy::new().is_available());
    }

    #[test]
    fn wav_container_is_normalised() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in.wav");
        let output = dir.path().join("out.wav");
        write_stereo_wav(&input, 44_100, 1);

        let outcome = DemuxStrategy::new().attempt(&input, &output);
        assert!(outcome.succeeded(), "{outcome:?}");

        let reader = hound::WavReader::open(&output).unwrap();
        assert!(is_normalized(&reader.spec()));
        assert!(reader.duration().abs_diff(16_000) <= 1);
    }

    #[test]
    fn video_only_container_is_no_audio() {
        use crate::audio::ffmpeg::tests::{ffmpeg_available, make_video_only_mp4};

        if !ffmpeg_available() {
            return;
        }
        let dir = tempdir().unwrap();
        let Some(video) = make_video_only_mp4(dir.path()) else {
            return;
        };
        let output = dir.path().join("out.wav");

        let outcome = DemuxStrategy::new().attempt(&video, &output);
        assert_eq!(outcome, ExtractionOutcome::NoAudio);
        assert!(!output.exists());
    }

    #[test]
    fn garbage_input_fails() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("garbage.mp4");
        std::fs::write(&input, vec![0x42u8; 4096]).unwrap();

        let outcome = DemuxStrategy::new().attempt(&input, &dir.path().join("out.wav"));
        assert!(matches!(outcome, ExtractionOutcome::Failed(_)), "{outcome:?}");
    }

    #[test]
    fn missing_input_fails() {
        let dir = tempdir().unwrap();
        let outcome = DemuxStrategy::new().attempt(
            &dir.path().join("missing.mp4"),
            &dir.path().join("out.wav"),
        );
        assert!(matches!(outcome, ExtractionOutcome::Failed(ref r) if r.starts_with("open")));
    }
}
