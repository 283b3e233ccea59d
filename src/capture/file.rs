use std::path::PathBuf;

use hound::WavReader;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

use super::backend::{AudioFrame, CaptureBackend, CaptureConfig};
use crate::error::{ConsultError, Result};

/// Streams a WAV file as audio frames, for batch processing and tests.
///
/// The whole file is read at start and replayed as frames of
/// `buffer_duration_ms` each, preserving sample order. The channel closes
/// once the file is exhausted.
pub struct FileBackend {
    path: PathBuf,
    config: CaptureConfig,
    feeder: Option<JoinHandle<()>>,
}

impl FileBackend {
    pub fn new(path: PathBuf, config: CaptureConfig) -> Self {
        Self {
            path,
            config,
            feeder: None,
        }
    }
}

#[async_trait::async_trait]
impl CaptureBackend for FileBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        let reader = WavReader::open(&self.path).map_err(|e| {
            ConsultError::PermissionDenied(format!(
                "cannot open {}: {}",
                self.path.display(),
                e
            ))
        })?;

        let spec = reader.spec();
        let samples: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| ConsultError::Decode(format!("malformed WAV file: {e}")))?;

        info!(
            "Streaming {} as frames ({} samples, {}Hz, {}ch)",
            self.path.display(),
            samples.len(),
            spec.sample_rate,
            spec.channels
        );

        let samples_per_frame = (spec.sample_rate as u64 * self.config.buffer_duration_ms
            / 1000) as usize
            * spec.channels as usize;
        let samples_per_frame = samples_per_frame.max(1);

        let (tx, rx) = mpsc::channel(100);
        let sample_rate = spec.sample_rate;
        let channels = spec.channels;

        let feeder = tokio::spawn(async move {
            let mut timestamp_ms = 0u64;
            for chunk in samples.chunks(samples_per_frame) {
                let frame = AudioFrame {
                    samples: chunk.to_vec(),
                    sample_rate,
                    channels,
                    timestamp_ms,
                };
                if tx.send(frame).await.is_err() {
                    break;
                }
                timestamp_ms += chunk.len() as u64 * 1000
                    / (sample_rate as u64 * channels as u64);
            }
            // tx drops here, closing the channel
        });

        self.feeder = Some(feeder);
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        if let Some(feeder) = self.feeder.take() {
            // Frames already sent stay queued for the consumer; anything
            // not yet replayed is discarded, like a stopped live stream.
            if !feeder.is_finished() {
                feeder.abort();
            }
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.feeder.as_ref().map_or(false, |f| !f.is_finished())
    }

    fn name(&self) -> &str {
        "file"
    }
}
