use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::outcome::{ConsultationOutcome, ControllerStats};
use crate::capture::Recorder;
use crate::error::{ConsultError, Result};
use crate::playback::{PlaybackBackend, PlaybackManager};
use crate::staging::{AudioClip, ImageAsset, InputStaging};
use crate::transport::{ConsultationApi, ConsultationReply};

/// Consultation flow states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ControllerState {
    /// No inputs staged
    Idle,
    /// At least one input staged
    Ready,
    /// A consultation request is outstanding
    Submitting,
    /// A reply has been received and is on display
    ResultShown,
}

/// Drives the capture → stage → submit → play → reset flow.
///
/// Owns the single live instance of the staged inputs, the displayed
/// outcome, and the playback resource; components below it only ever see
/// values or disposable handles. Every failure path lands back in an
/// interactive state with staged inputs preserved.
pub struct ConsultationController {
    api: Arc<dyn ConsultationApi>,
    recorder: Mutex<Option<Recorder>>,
    staging: Mutex<InputStaging>,
    playback: Mutex<PlaybackManager>,
    state: RwLock<ControllerState>,
    outcome: RwLock<Option<ConsultationOutcome>>,
    last_error: RwLock<Option<String>>,
    last_completed_at: RwLock<Option<DateTime<Utc>>>,
    in_flight: AtomicBool,
    completed: AtomicUsize,
    speech_language: String,
}

impl ConsultationController {
    pub fn new(
        api: Arc<dyn ConsultationApi>,
        output: Box<dyn PlaybackBackend>,
        speech_language: impl Into<String>,
    ) -> Self {
        Self {
            api,
            recorder: Mutex::new(None),
            staging: Mutex::new(InputStaging::new()),
            playback: Mutex::new(PlaybackManager::new(output)),
            state: RwLock::new(ControllerState::Idle),
            outcome: RwLock::new(None),
            last_error: RwLock::new(None),
            last_completed_at: RwLock::new(None),
            in_flight: AtomicBool::new(false),
            completed: AtomicUsize::new(0),
            speech_language: speech_language.into(),
        }
    }

    pub async fn state(&self) -> ControllerState {
        *self.state.read().await
    }

    pub async fn can_submit(&self) -> bool {
        self.staging.lock().await.can_submit()
    }

    pub async fn outcome(&self) -> Option<ConsultationOutcome> {
        self.outcome.read().await.clone()
    }

    pub async fn last_error(&self) -> Option<String> {
        self.last_error.read().await.clone()
    }

    pub async fn has_playback(&self) -> bool {
        self.playback.lock().await.has_resource()
    }

    pub async fn playback_resource_id(&self) -> Option<Uuid> {
        self.playback.lock().await.resource_id()
    }

    /// Attach a recorder so questions can be captured live instead of
    /// staged from disk.
    pub async fn attach_recorder(&self, recorder: Recorder) {
        *self.recorder.lock().await = Some(recorder);
    }

    /// Begin capturing a spoken question from the attached recorder.
    pub async fn start_recording(&self) -> Result<()> {
        let mut recorder = self.recorder.lock().await;
        let recorder = recorder
            .as_mut()
            .ok_or_else(|| ConsultError::PermissionDenied("no recorder attached".to_string()))?;
        recorder.start_recording().await
    }

    /// Stop capturing and stage the finalized clip. Returns true when a
    /// clip was produced and staged; false when nothing was recording.
    pub async fn stop_recording(&self) -> Result<bool> {
        let clip = {
            let mut recorder = self.recorder.lock().await;
            match recorder.as_mut() {
                Some(recorder) => recorder.stop_recording().await?,
                None => None,
            }
        };

        match clip {
            Some(clip) => {
                self.stage_audio(clip).await;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Stage an audio clip, replacing any previous one.
    pub async fn stage_audio(&self, clip: AudioClip) {
        info!("Staging audio clip: {} ({} bytes)", clip.name, clip.data.len());
        self.staging.lock().await.set_audio(clip);
        self.mark_ready().await;
    }

    /// Stage an image, replacing any previous one.
    pub async fn stage_image(&self, asset: ImageAsset) {
        info!("Staging image: {} ({} bytes)", asset.name, asset.data.len());
        self.staging.lock().await.set_image(asset);
        self.mark_ready().await;
    }

    async fn mark_ready(&self) {
        let mut state = self.state.write().await;
        if *state == ControllerState::Idle {
            *state = ControllerState::Ready;
        }
    }

    /// Submit the staged inputs as one consultation.
    ///
    /// A second call while one is outstanding is ignored: at most one
    /// consultation request is in flight at a time. On failure the error
    /// message is kept for display and the staged inputs survive, so the
    /// user can retry without re-recording.
    pub async fn submit(&self) -> Result<()> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            warn!("Submission already in flight, ignoring");
            return Ok(());
        }

        let result = self.run_submission().await;
        self.in_flight.store(false, Ordering::SeqCst);

        if let Err(e) = &result {
            let message = e.display_message();
            error!("Consultation failed: {}", message);
            *self.last_error.write().await = Some(message);

            let staged = self.staging.lock().await.can_submit();
            *self.state.write().await = if staged {
                ControllerState::Ready
            } else {
                ControllerState::Idle
            };
        }

        result
    }

    async fn run_submission(&self) -> Result<()> {
        let (audio, image) = {
            let staging = self.staging.lock().await;
            (staging.audio().cloned(), staging.image().cloned())
        };

        if audio.is_none() && image.is_none() {
            // Rejected locally; no transport call is made.
            return Err(ConsultError::MissingInput);
        }

        *self.state.write().await = ControllerState::Submitting;

        let reply = self.api.submit_full_consultation(audio, image).await?;

        let playback_ready = self.prepare_playback(&reply).await;

        *self.outcome.write().await = Some(ConsultationOutcome::from_reply(&reply, playback_ready));
        *self.last_error.write().await = None;
        *self.state.write().await = ControllerState::ResultShown;
        self.completed.fetch_add(1, Ordering::SeqCst);
        *self.last_completed_at.write().await = Some(Utc::now());

        info!(
            "Consultation complete (playback {})",
            if playback_ready { "ready" } else { "unavailable" }
        );

        Ok(())
    }

    /// Make the reply audible: decode its audio payload, or voice the
    /// analysis text through the synthesis endpoint when no payload came
    /// back. Failures here never undo an already-delivered text result.
    async fn prepare_playback(&self, reply: &ConsultationReply) -> bool {
        let payload = if reply.has_response_audio() {
            reply.response_audio.clone()
        } else {
            self.synthesize_reply_audio(reply).await
        };

        let Some(payload) = payload else {
            return false;
        };

        let mut playback = self.playback.lock().await;
        match playback.load_from_encoded(&payload) {
            Ok(id) => {
                info!("Response audio ready as playback resource {}", id);
                true
            }
            Err(e) => {
                warn!("Response audio unusable, continuing without playback: {}", e);
                false
            }
        }
    }

    async fn synthesize_reply_audio(&self, reply: &ConsultationReply) -> Option<String> {
        let text = reply
            .analysis
            .as_deref()
            .filter(|t| !t.is_empty())
            .or_else(|| reply.response_text.as_deref().filter(|t| !t.is_empty()))?;

        match self.api.synthesize_speech(text, &self.speech_language).await {
            Ok(payload) if !payload.is_empty() => Some(payload),
            Ok(_) => None,
            Err(e) => {
                // Non-fatal: the text result has already been delivered.
                warn!("Speech synthesis failed, continuing without playback: {}", e);
                None
            }
        }
    }

    /// Restart playback of the current response audio from the beginning.
    pub async fn replay(&self) -> Result<()> {
        self.playback.lock().await.play().await
    }

    /// Clear staged inputs, release any held playback resource, and return
    /// to idle. Valid from any state.
    pub async fn reset(&self) {
        info!("Resetting consultation state");
        self.staging.lock().await.clear();
        self.playback.lock().await.release();
        *self.outcome.write().await = None;
        *self.last_error.write().await = None;
        *self.state.write().await = ControllerState::Idle;
    }

    pub async fn stats(&self) -> ControllerStats {
        ControllerStats {
            state: *self.state.read().await,
            is_submitting: self.in_flight.load(Ordering::SeqCst),
            submissions_completed: self.completed.load(Ordering::SeqCst),
            last_completed_at: *self.last_completed_at.read().await,
            playback_loaded: self.playback.lock().await.has_resource(),
        }
    }
}
