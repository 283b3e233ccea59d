use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::controller::ControllerState;
use crate::transport::ConsultationReply;

/// The user-visible result of a completed consultation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsultationOutcome {
    /// What the service heard in the submitted audio
    pub transcription: Option<String>,

    /// What the service made of the submitted image
    pub analysis: Option<String>,

    /// The text the service voiced, when it voiced anything
    pub response_text: Option<String>,

    /// Whether a playable audio response was decoded for this result
    pub playback_ready: bool,

    /// When the reply arrived
    pub received_at: DateTime<Utc>,
}

impl ConsultationOutcome {
    pub fn from_reply(reply: &ConsultationReply, playback_ready: bool) -> Self {
        Self {
            transcription: reply.transcription.clone(),
            analysis: reply.analysis.clone(),
            response_text: reply.response_text.clone(),
            playback_ready,
            received_at: Utc::now(),
        }
    }
}

/// Statistics about the controller's lifetime
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerStats {
    /// Current flow state
    pub state: ControllerState,

    /// Whether a submission is outstanding right now
    pub is_submitting: bool,

    /// Consultations completed since construction
    pub submissions_completed: usize,

    /// When the most recent consultation completed
    pub last_completed_at: Option<DateTime<Utc>>,

    /// Whether a playback resource is currently held
    pub playback_loaded: bool,
}
