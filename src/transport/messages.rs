use serde::{Deserialize, Serialize};

/// Structured reply from the full-consultation endpoint.
///
/// All fields are independently optional; nothing here implies
/// co-occurrence. `response_audio`, when present, is base64 text and must
/// be decoded before use.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConsultationReply {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcription: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<String>,

    /// The text the service chose to voice, when it voiced anything
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_text: Option<String>,

    /// Base64-encoded audio of the spoken reply
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_audio: Option<String>,
}

impl ConsultationReply {
    /// Whether a decodable audio payload is present. Absent and empty both
    /// count as "no": neither may trigger a decode attempt.
    pub fn has_response_audio(&self) -> bool {
        self.response_audio.as_deref().is_some_and(|p| !p.is_empty())
    }
}

/// Request body for the speech-synthesis endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechRequest {
    pub text: String,
    pub language: String,
}

/// Reply from the speech-synthesis endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechReply {
    /// Base64-encoded audio
    pub audio: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// Reply from the dedicated transcription endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionReply {
    pub transcription: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

/// Reply from the dedicated image-analysis endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReply {
    pub analysis: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

/// Error body shape shared by every endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorReply {
    pub error: String,
}
