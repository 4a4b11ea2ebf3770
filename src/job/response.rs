//! JSON envelope returned to the caller of a transcription request.
//!
//! ```text
//! { "success": true,  "transcript": "...", "output_path": "...", "message"?: "no speech detected" }
//! { "success": false, "error": "<Kind>", "details"?: "..." }
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;

/// Message attached to a successful response with an empty transcript.
pub const NO_SPEECH_MESSAGE: &str = "no speech detected";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscribeResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl TranscribeResponse {
    pub fn success(transcript: String, output_path: PathBuf) -> Self {
        let message = transcript
            .trim()
            .is_empty()
            .then(|| NO_SPEECH_MESSAGE.to_string());
        Self {
            success: true,
            transcript: Some(transcript),
            output_path: Some(output_path),
            message,
            error: None,
            details: None,
        }
    }

    pub fn failure(kind: ErrorKind, details: Option<String>) -> Self {
        Self {
            success: false,
            transcript: None,
            output_path: None,
            message: None,
            error: Some(kind),
            details,
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn success_shape() {
        let resp = TranscribeResponse::success("سطر\n".into(), "/out/clip.txt".into());
        let v: Value = serde_json::from_str(&resp.to_json().unwrap()).unwrap();
        assert_eq!(
            v,
            json!({ "success": true, "transcript": "سطر\n", "output_path": "/out/clip.txt" })
        );
    }

    #[test]
    fn empty_transcript_carries_no_speech_message() {
        let resp = TranscribeResponse::success(String::new(), "/out/clip.txt".into());
        let v = serde_json::to_value(&resp).unwrap();
        assert_eq!(v["transcript"], "");
        assert_eq!(v["message"], NO_SPEECH_MESSAGE);
    }

    #[test]
    fn failure_shape() {
        let resp = TranscribeResponse::failure(ErrorKind::Timeout, None);
        let v = serde_json::to_value(&resp).unwrap();
        assert_eq!(v, json!({ "success": false, "error": "Timeout" }));

        let resp = TranscribeResponse::failure(ErrorKind::ExtractionFailed, Some("boom".into()));
        let v = serde_json::to_value(&resp).unwrap();
        assert_eq!(v["details"], "boom");
    }

    #[test]
    fn parses_back_from_json() {
        let raw = r#"{ "success": false, "error": "OutputMissing" }"#;
        let resp: TranscribeResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(resp.error_kind(), Some(ErrorKind::OutputMissing));
        assert!(resp.transcript.is_none());
    }
}
