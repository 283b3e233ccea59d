use std::io::Cursor;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

use super::backend::{AudioFrame, CaptureBackend, CaptureConfig};
use crate::error::{ConsultError, Result};
use crate::staging::AudioClip;

/// Recorder lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    /// No session active
    Idle,
    /// Waiting on the backend to grant the input stream
    RequestingPermission,
    /// Frames are being accumulated
    Recording,
    /// Stream released, payload being assembled
    Finalizing,
}

/// Turns a capture backend's frame stream into a finite, named audio clip.
///
/// Core invariant: the backend stream is released exactly once per session,
/// regardless of how finalization goes. A failed permission grant retains no
/// partial session.
pub struct Recorder {
    backend: Box<dyn CaptureBackend>,
    config: CaptureConfig,
    state: RecorderState,
    session: Option<ActiveSession>,
}

/// A live recording: the accumulated frames and the task appending to them.
struct ActiveSession {
    frames: Arc<Mutex<Vec<AudioFrame>>>,
    accumulator: JoinHandle<()>,
    started_at: DateTime<Utc>,
}

impl Recorder {
    pub fn new(backend: Box<dyn CaptureBackend>, config: CaptureConfig) -> Self {
        Self {
            backend,
            config,
            state: RecorderState::Idle,
            session: None,
        }
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state == RecorderState::Recording
    }

    /// Open the capture stream and begin accumulating frames in arrival
    /// order. Only valid from idle; a start while recording is ignored.
    pub async fn start_recording(&mut self) -> Result<()> {
        if self.state != RecorderState::Idle {
            warn!("Recording already in progress, ignoring start");
            return Ok(());
        }

        self.state = RecorderState::RequestingPermission;

        let mut frame_rx = match self.backend.start().await {
            Ok(rx) => rx,
            Err(e) => {
                // Denied: no partial session is retained.
                self.state = RecorderState::Idle;
                return Err(e);
            }
        };

        let frames = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&frames);

        let accumulator = tokio::spawn(async move {
            while let Some(frame) = frame_rx.recv().await {
                sink.lock().await.push(frame);
            }
        });

        self.session = Some(ActiveSession {
            frames,
            accumulator,
            started_at: Utc::now(),
        });
        self.state = RecorderState::Recording;

        info!("Recording started ({})", self.backend.name());
        Ok(())
    }

    /// Stop the stream and finalize the accumulated frames into a WAV clip.
    ///
    /// A stop while not recording is a no-op. A stop before any frame
    /// arrived yields an empty-but-valid clip. The stream is released
    /// before the payload is touched, so the device is freed even if
    /// finalization fails.
    pub async fn stop_recording(&mut self) -> Result<Option<AudioClip>> {
        if self.state != RecorderState::Recording {
            return Ok(None);
        }

        self.state = RecorderState::Finalizing;

        if let Err(e) = self.backend.stop().await {
            warn!("Capture backend reported an error on stop: {}", e);
        }

        let session = match self.session.take() {
            Some(session) => session,
            None => {
                self.state = RecorderState::Idle;
                return Ok(None);
            }
        };

        // The backend stopping closed the frame channel; wait for the
        // accumulator to drain what already arrived.
        if session.accumulator.await.is_err() {
            warn!("Frame accumulator task panicked");
        }

        let frames = match Arc::try_unwrap(session.frames) {
            Ok(frames) => frames.into_inner(),
            Err(shared) => shared.lock().await.split_off(0),
        };

        let result = encode_clip(&frames, &self.config);
        self.state = RecorderState::Idle;

        let clip = result?;
        let duration = Utc::now().signed_duration_since(session.started_at);
        info!(
            "Recording finalized: {} ({} frames, {} bytes, {:.1}s elapsed)",
            clip.name,
            frames.len(),
            clip.data.len(),
            duration.num_milliseconds() as f64 / 1000.0
        );

        Ok(Some(clip))
    }
}

/// Concatenate frames in arrival order into a single in-memory WAV payload.
fn encode_clip(frames: &[AudioFrame], config: &CaptureConfig) -> Result<AudioClip> {
    let sample_rate = frames
        .first()
        .map(|f| f.sample_rate)
        .unwrap_or(config.sample_rate);
    let channels = frames.first().map(|f| f.channels).unwrap_or(config.channels);

    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .map_err(|e| ConsultError::Decode(format!("failed to open WAV writer: {e}")))?;

        for frame in frames {
            for &sample in &frame.samples {
                writer
                    .write_sample(sample)
                    .map_err(|e| ConsultError::Decode(format!("failed to write sample: {e}")))?;
            }
        }

        writer
            .finalize()
            .map_err(|e| ConsultError::Decode(format!("failed to finalize WAV: {e}")))?;
    }

    Ok(AudioClip::new(
        cursor.into_inner(),
        "audio/wav",
        format!("recording-{}.wav", Uuid::new_v4()),
    ))
}
