//! Primary extraction strategy: the `ffmpeg` command-line tool.

use std::io;
use std::path::Path;
use std::process::{Command, Stdio};

use super::extract::{ExtractionOutcome, ExtractionStrategy};
use super::format::{CHANNELS, SAMPLE_RATE};

/// ffmpeg stderr fragments meaning the input has no stream `-vn` left to
/// map, i.e. no audio track.
const NO_AUDIO_MARKERS: &[&str] = &["does not contain any stream", "matches no streams"];

/// Runs `ffmpeg` with fixed normalisation arguments.
#[derive(Debug, Clone)]
pub struct FfmpegStrategy {
    binary: String,
}

impl FfmpegStrategy {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Full argument list for one extraction.
    ///
    /// ```
    /// use std::path::Path;
    /// use video_transcriber::audio::FfmpegStrategy;
    ///
    /// let args = FfmpegStrategy::args(Path::new("in.mp4"), Path::new("out.wav"));
    /// assert_eq!(args.join(" "),
    ///     "-loglevel error -i in.mp4 -vn -acodec pcm_s16le -ar 16000 -ac 1 -y out.wav");
    /// ```
    pub fn args(video: &Path, output: &Path) -> Vec<String> {
        vec![
            "-loglevel".into(),
            "error".into(),
            "-i".into(),
            video.display().to_string(),
            "-vn".into(),
            "-acodec".into(),
            "pcm_s16le".into(),
            "-ar".into(),
            SAMPLE_RATE.to_string(),
            "-ac".into(),
            CHANNELS.to_string(),
            "-y".into(),
            output.display().to_string(),
        ]
    }
}

impl Default for FfmpegStrategy {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl ExtractionStrategy for FfmpegStrategy {
    fn name(&self) -> &'static str {
        "ffmpeg"
    }

    /// `ffmpeg -version` exits successfully.
    fn is_available(&self) -> bool {
        Command::new(&self.binary)
            .arg("-version")
            .stdin(Stdio::null())
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    fn attempt(&self, video: &Path, output: &Path) -> ExtractionOutcome {
        let result = Command::new(&self.binary)
            .args(Self::args(video, output))
            .stdin(Stdio::null())
            .output();

        let out = match result {
            Ok(out) => out,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return ExtractionOutcome::ToolUnavailable;
            }
            Err(e) => return ExtractionOutcome::Failed(format!("failed to run ffmpeg: {e}")),
        };

        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr);
            return classify_failure(&out.status.to_string(), &stderr);
        }

        match std::fs::metadata(output) {
            Ok(meta) if meta.len() > 0 => ExtractionOutcome::Extracted { bytes: meta.len() },
            Ok(_) => ExtractionOutcome::Failed("audio file was created but is empty".into()),
            Err(_) => ExtractionOutcome::Failed("audio file was not created".into()),
        }
    }
}

/// Outcome of a non-zero ffmpeg exit.
fn classify_failure(status: &str, stderr: &str) -> ExtractionOutcome {
    if NO_AUDIO_MARKERS.iter().any(|m| stderr.contains(m)) {
        log::debug!("extract: ffmpeg reports no audio stream: {}", stderr.trim());
        return ExtractionOutcome::NoAudio;
    }
    ExtractionOutcome::Failed(format!("ffmpeg exited with {status}: {}", stderr.trim()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tempfile::tempdir;

    pub(crate) fn ffmpeg_available() -> bool {
        FfmpegStrategy::default().is_available()
    }

    /// One second of black 32x32 video in an MP4 with no audio track.
    /// `None` when this ffmpeg build cannot produce it.
    pub(crate) fn make_video_only_mp4(dir: &Path) -> Option<std::path::PathBuf> {
        let path = dir.join("video-only.mp4");
        let status = Command::new("ffmpeg")
            .args(["-loglevel", "error", "-f", "lavfi", "-i", "color=c=black:s=32x32:d=1"])
            .args(["-an", "-c:v", "mpeg4", "-y"])
            .arg(&path)
            .stdin(Stdio::null())
            .status()
            .ok()?;
        status.success().then_some(path)
    }

    #[test]
    fn args_match_normalised_format() {
        let args = FfmpegStrategy::args(Path::new("/v.webm"), Path::new("/a.wav"));
        assert_eq!(args[0..2], ["-loglevel", "error"]);
        assert_eq!(args[2..4], ["-i", "/v.webm"]);
        assert!(args.contains(&"-vn".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("/a.wav"));
        let ar = args.iter().position(|a| a == "-ar").unwrap();
        assert_eq!(args[ar + 1], "16000");
        let ac = args.iter().position(|a| a == "-ac").unwrap();
        assert_eq!(args[ac + 1], "1");
    }

    #[test]
    fn missing_binary_is_unavailable() {
        let strategy = FfmpegStrategy::new("/nonexistent/ffmpeg-binary");
        assert!(!strategy.is_available());
    }

    #[test]
    fn missing_binary_attempt_reports_tool_unavailable() {
        let dir = tempdir().unwrap();
        let strategy = FfmpegStrategy::new("/nonexistent/ffmpeg-binary");
        let outcome = strategy.attempt(&dir.path().join("v.mp4"), &dir.path().join("a.wav"));
        assert_eq!(outcome, ExtractionOutcome::ToolUnavailable);
    }

    #[test]
    fn no_stream_stderr_is_no_audio() {
        let outcome = classify_failure(
            "exit status: 1",
            "Output file #0 does not contain any stream\n",
        );
        assert_eq!(outcome, ExtractionOutcome::NoAudio);

        let outcome = classify_failure(
            "exit status: 1",
            "Stream map '0:a' matches no streams.\n",
        );
        assert_eq!(outcome, ExtractionOutcome::NoAudio);
    }

    #[test]
    fn other_stderr_is_failure_with_message() {
        let outcome = classify_failure("exit status: 1", "  moov atom not found\n");
        assert_eq!(
            outcome,
            ExtractionOutcome::Failed("ffmpeg exited with exit status: 1: moov atom not found".into())
        );
    }

    /// An executable that behaves like ffmpeg on a video-only input.
    #[cfg(unix)]
    fn fake_ffmpeg(dir: &Path) -> std::path::PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("ffmpeg");
        std::fs::write(
            &path,
            "#!/bin/sh\n\
             [ \"$1\" = -version ] && exit 0\n\
             echo 'Output file #0 does not contain any stream' >&2\n\
             exit 1\n",
        )
        .unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[test]
    fn video_without_audio_is_no_audio_without_fallback() {
        use crate::audio::AudioExtractor;

        let dir = tempdir().unwrap();
        let binary = fake_ffmpeg(dir.path());
        let video = dir.path().join("silent.mp4");
        std::fs::write(&video, b"video-only").unwrap();
        let audio = dir.path().join("a.wav");
        std::fs::write(&audio, b"stale").unwrap();

        let extractor = AudioExtractor::new(vec![Box::new(FfmpegStrategy::new(
            binary.display().to_string(),
        ))]);
        let outcome = extractor.extract(&video, &audio).unwrap();

        assert_eq!(outcome, ExtractionOutcome::NoAudio);
        assert_eq!(std::fs::metadata(&audio).unwrap().len(), 0);
    }

    #[test]
    fn real_video_only_file_is_no_audio() {
        if !ffmpeg_available() {
            return;
        }
        let dir = tempdir().unwrap();
        let Some(video) = make_video_only_mp4(dir.path()) else {
            return;
        };

        let outcome = FfmpegStrategy::default().attempt(&video, &dir.path().join("a.wav"));
        assert_eq!(outcome, ExtractionOutcome::NoAudio);
    }

    #[test]
    fn corrupt_input_fails_with_stderr() {
        if !ffmpeg_available() {
            return;
        }
        let dir = tempdir().unwrap();
        let video = dir.path().join("corrupt.mp4");
        std::fs::write(&video, b"definitely not a video").unwrap();

        let outcome = FfmpegStrategy::default().attempt(&video, &dir.path().join("a.wav"));
        assert!(matches!(outcome, ExtractionOutcome::Failed(_)), "{outcome:?}");
    }

    #[test]
    fn wav_input_is_normalised() {
        if !ffmpeg_available() {
            return;
        }
        let dir = tempdir().unwrap();
        let input = dir.path().join("tone.wav");
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 44_100,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut w = hound::WavWriter::create(&input, spec).unwrap();
        for i in 0..44_100 {
            let s = ((i as f32 * 0.05).sin() * 8_000.0) as i16;
            w.write_sample(s).unwrap();
            w.write_sample(s).unwrap();
        }
        w.finalize().unwrap();

        let output = dir.path().join("out.wav");
        let outcome = FfmpegStrategy::default().attempt(&input, &output);
        assert!(outcome.succeeded(), "{outcome:?}");

        let reader = hound::WavReader::open(&output).unwrap();
        assert!(crate::audio::format::is_normalized(&reader.spec()));
    }
}
