use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use super::decode::{decode_transport_audio, DecodedAudio};
use super::output::PlaybackBackend;
use crate::error::{ConsultError, Result};

/// A decoded, playable audio payload and its addressable handle.
///
/// Lifetime is bounded to one consultation reply: the owning manager
/// releases it before creating a successor.
#[derive(Debug)]
pub struct PlaybackResource {
    id: Uuid,
    audio: DecodedAudio,
    loaded_at: DateTime<Utc>,
}

impl PlaybackResource {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn audio(&self) -> &DecodedAudio {
        &self.audio
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }
}

/// Owns at most one playback resource at a time.
///
/// Release is tied to this struct's lifetime rather than caller discipline:
/// loading a replacement releases the prior resource first, and dropping
/// the manager releases whatever it still holds.
pub struct PlaybackManager {
    output: Box<dyn PlaybackBackend>,
    resource: Option<PlaybackResource>,
}

impl PlaybackManager {
    pub fn new(output: Box<dyn PlaybackBackend>) -> Self {
        Self {
            output,
            resource: None,
        }
    }

    /// Decode a transport payload and hold it as the current resource.
    ///
    /// A failed decode creates nothing and leaves any prior resource in
    /// place; on success the prior resource is released before the new one
    /// exists.
    pub fn load_from_encoded(&mut self, payload: &str) -> Result<Uuid> {
        let audio = decode_transport_audio(payload)?;

        self.release();

        let resource = PlaybackResource {
            id: Uuid::new_v4(),
            audio,
            loaded_at: Utc::now(),
        };
        let id = resource.id;

        info!(
            "Playback resource {} loaded ({:.1}s of audio)",
            id,
            resource.audio.duration_seconds()
        );

        self.resource = Some(resource);
        Ok(id)
    }

    /// Start playback of the held resource from the beginning. Replaying
    /// restarts; there is no queueing.
    pub async fn play(&mut self) -> Result<()> {
        match &self.resource {
            Some(resource) => self.output.play(&resource.audio).await,
            None => Err(ConsultError::Playback("no audio loaded".to_string())),
        }
    }

    /// Drop the current resource and stop the output. Safe to call when
    /// nothing is held.
    pub fn release(&mut self) {
        if let Some(resource) = self.resource.take() {
            self.output.stop();
            info!("Playback resource {} released", resource.id);
        }
    }

    pub fn has_resource(&self) -> bool {
        self.resource.is_some()
    }

    pub fn resource_id(&self) -> Option<Uuid> {
        self.resource.as_ref().map(|r| r.id)
    }

    pub fn is_playing(&self) -> bool {
        self.output.is_playing()
    }
}

impl Drop for PlaybackManager {
    fn drop(&mut self) {
        self.release();
    }
}
